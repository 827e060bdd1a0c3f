//! Miscellaneous utilities: process launching, fixed-width string fields,
//! argument validation.

use std::io;
use std::process::Command;

use log::debug;

use crate::error::{DmError, Result};

// ── Process launching ─────────────────────────────────────────────────────────

/// Exit code and captured output of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; -1 when the process was terminated without one.
    pub code:   i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool { self.code == 0 }
}

/// Launches external utilities from an argument vector.  No shell is involved,
/// so arguments are never re-parsed.
pub trait ProcessLauncher {
    fn launch(&self, program: &str, args: &[String]) -> io::Result<ProcessOutput>;
}

/// [`ProcessLauncher`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, program: &str, args: &[String]) -> io::Result<ProcessOutput> {
        debug!("launch: {program} {}", args.join(" "));
        let out = Command::new(program).args(args).output()?;
        Ok(ProcessOutput {
            code:   out.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

/// Launch `program` and fail with [`DmError::ProcessExecution`] on a non-zero
/// exit code.  Returns the captured stdout.
pub fn run_checked(launcher: &dyn ProcessLauncher, program: &str, args: &[String]) -> Result<String> {
    let out = launcher.launch(program, args).map_err(|source| DmError::Launch {
        program: program.to_string(),
        source,
    })?;
    if !out.success() {
        return Err(DmError::ProcessExecution { program: program.to_string(), code: out.code });
    }
    Ok(out.stdout)
}

// ── Fixed-width fields ────────────────────────────────────────────────────────

/// Truncate `s` to at most `max_units` UTF-16 code units without splitting a
/// surrogate pair.  Mirrors copying into a fixed `WCHAR` array with room
/// reserved for the terminator.
pub fn truncate_utf16(s: &str, max_units: usize) -> String {
    let mut units = 0;
    let mut end = 0;
    for (idx, ch) in s.char_indices() {
        units += ch.len_utf16();
        if units > max_units {
            return s[..idx].to_string();
        }
        end = idx + ch.len_utf8();
    }
    s[..end].to_string()
}

// ── Argument validation ───────────────────────────────────────────────────────

/// Characters rejected in values that end up on an external command line.
const DANGEROUS_CHARS: &[char] = &[
    ';', '&', '|', '$', '`', '(', ')', '{', '}', '[', ']', '<', '>', '!', '*', '?', '"', '\'',
    '^', '%',
];

/// Reject empty values, control characters and shell metacharacters.
pub fn validate_command_value(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DmError::InvalidArgument(format!("{what} is empty")));
    }
    if let Some(c) = value.chars().find(|c| c.is_control() || DANGEROUS_CHARS.contains(c)) {
        return Err(DmError::InvalidArgument(format!(
            "{what} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}
