//! Provisioning backend that drives an external bridge executable.
//!
//! Each primitive is one invocation:
//!
//! ```text
//! <tool> get    <path>          value on stdout
//! <tool> add    <path> <value>
//! <tool> delete <path>
//! <tool> exec   <path>
//! ```
//!
//! A non-zero exit code is the store's failure; its stderr becomes the error
//! message.

use log::debug;

use crate::error::{DmError, Result};
use crate::util::{ProcessLauncher, SystemLauncher};

use super::{ProvisioningPath, Provisioner};

pub struct CommandProvisioner<L: ProcessLauncher = SystemLauncher> {
    tool:     String,
    launcher: L,
}

impl CommandProvisioner<SystemLauncher> {
    pub fn new(tool: impl Into<String>) -> Self {
        Self::with_launcher(tool, SystemLauncher)
    }
}

impl<L: ProcessLauncher> CommandProvisioner<L> {
    pub fn with_launcher(tool: impl Into<String>, launcher: L) -> Self {
        CommandProvisioner { tool: tool.into(), launcher }
    }

    fn run(&self, verb: &str, path: &ProvisioningPath, value: Option<&str>) -> Result<String> {
        let mut args = vec![verb.to_string(), path.as_str().to_string()];
        if let Some(v) = value {
            args.push(v.to_string());
        }
        let out = self.launcher.launch(&self.tool, &args).map_err(|source| DmError::Launch {
            program: self.tool.clone(),
            source,
        })?;
        if !out.success() {
            return Err(DmError::Store {
                path:    path.to_string(),
                code:    out.code,
                message: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout)
    }
}

fn unexpected(path: &ProvisioningPath, kind: &str, raw: &str) -> DmError {
    DmError::Store {
        path:    path.to_string(),
        code:    -1,
        message: format!("expected {kind}, store returned {raw:?}"),
    }
}

impl<L: ProcessLauncher> Provisioner for CommandProvisioner<L> {
    fn get_string(&self, path: &ProvisioningPath) -> Result<String> {
        let out = self.run("get", path, None)?;
        let v = out.trim_end_matches(['\r', '\n']).to_string();
        debug!("prov get {path} = {v}");
        Ok(v)
    }

    fn get_uint(&self, path: &ProvisioningPath) -> Result<u32> {
        let raw = self.get_string(path)?;
        raw.trim().parse().map_err(|_| unexpected(path, "unsigned integer", &raw))
    }

    fn get_bool(&self, path: &ProvisioningPath) -> Result<bool> {
        let raw = self.get_string(path)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1"  => Ok(true),
            "false" | "0" => Ok(false),
            _             => Err(unexpected(path, "boolean", &raw)),
        }
    }

    fn add_data(&self, path: &ProvisioningPath, value: &str) -> Result<()> {
        debug!("prov add {path} ({} bytes)", value.len());
        self.run("add", path, Some(value)).map(drop)
    }

    fn delete(&self, path: &ProvisioningPath) -> Result<()> {
        debug!("prov delete {path}");
        self.run("delete", path, None).map(drop)
    }

    fn exec(&self, path: &ProvisioningPath) -> Result<()> {
        debug!("prov exec {path}");
        self.run("exec", path, None).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;

    use super::*;
    use crate::util::ProcessOutput;

    /// Records every invocation and replies with a canned output.
    struct Recorder {
        reply: ProcessOutput,
        calls: RefCell<Vec<(String, Vec<String>)>>,
    }

    impl Recorder {
        fn replying(code: i32, stdout: &str, stderr: &str) -> Self {
            Recorder {
                reply: ProcessOutput { code, stdout: stdout.into(), stderr: stderr.into() },
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ProcessLauncher for &Recorder {
        fn launch(&self, program: &str, args: &[String]) -> io::Result<ProcessOutput> {
            self.calls.borrow_mut().push((program.to_string(), args.to_vec()));
            Ok(self.reply.clone())
        }
    }

    fn path() -> ProvisioningPath {
        ProvisioningPath::root("./Vendor/MSFT/CertificateStore").join("My")
    }

    #[test]
    fn get_string_strips_line_ending() {
        let rec = Recorder::replying(0, "abc/def\r\n", "");
        let prov = CommandProvisioner::with_launcher("dmprov", &rec);
        assert_eq!(prov.get_string(&path()).unwrap(), "abc/def");
        let calls = rec.calls.borrow();
        assert_eq!(calls[0].0, "dmprov");
        assert_eq!(calls[0].1, vec!["get", "./Vendor/MSFT/CertificateStore/My"]);
    }

    #[test]
    fn add_passes_value_as_own_argument() {
        let rec = Recorder::replying(0, "", "");
        let prov = CommandProvisioner::with_launcher("dmprov", &rec);
        prov.add_data(&path(), "TUlJ; echo hi").unwrap();
        assert_eq!(rec.calls.borrow()[0].1[2], "TUlJ; echo hi");
    }

    #[test]
    fn typed_getters_convert_output() {
        let rec = Recorder::replying(0, "42\n", "");
        let prov = CommandProvisioner::with_launcher("dmprov", &rec);
        assert_eq!(prov.get_uint(&path()).unwrap(), 42);

        let rec = Recorder::replying(0, "True\n", "");
        let prov = CommandProvisioner::with_launcher("dmprov", &rec);
        assert!(prov.get_bool(&path()).unwrap());
    }

    #[test]
    fn unparseable_value_is_a_store_error() {
        let rec = Recorder::replying(0, "soon\n", "");
        let prov = CommandProvisioner::with_launcher("dmprov", &rec);
        assert!(matches!(prov.get_uint(&path()), Err(DmError::Store { code: -1, .. })));
    }

    #[test]
    fn failed_call_surfaces_store_error_verbatim() {
        let rec = Recorder::replying(404, "", "node not found\n");
        let prov = CommandProvisioner::with_launcher("dmprov", &rec);
        match prov.delete(&path()) {
            Err(DmError::Store { path, code, message }) => {
                assert_eq!(path, "./Vendor/MSFT/CertificateStore/My");
                assert_eq!(code, 404);
                assert_eq!(message, "node not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(rec.calls.borrow()[0].1[0], "delete");
    }
}
