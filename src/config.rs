//! Configuration file parser.
//!
//! `key = value` lines, `#` comments.  Unknown keys and empty values are
//! ignored; every key has a compiled-in default.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DmError, Result};

const CERT_STORE_ROOT:  &str = "./Vendor/MSFT/CertificateStore";
const WSTEP_RENEW_ROOT: &str = "./Vendor/MSFT/CertificateStore/My/WSTEP/Renew";
const LOCAL_TIME_PATH:  &str = "./DevDetail/Ext/Microsoft/LocalTime";
const PROV_TOOL:        &str = "dmprov";
const TIME_SYNC_TOOL:   &str = "C:\\windows\\system32\\w32tm.exe";

#[derive(Debug, Clone)]
pub struct DmConfig {
    // ── Provisioning namespaces ───────────────────────────────────────────────
    /// Root of the CertificateStore CSP.
    pub cert_store_root:  String,
    /// Root of the WSTEP renewal policy.
    pub wstep_renew_root: String,
    /// Node holding the device's local time.
    pub local_time_path:  String,
    // ── External tools ────────────────────────────────────────────────────────
    /// Bridge executable that runs provisioning primitives.
    pub prov_tool:        String,
    /// Windows Time service utility.
    pub time_sync_tool:   String,
    // ── Time zone ─────────────────────────────────────────────────────────────
    pub tz_state_file:    PathBuf,
    // ── Process ───────────────────────────────────────────────────────────────
    pub log_syslog:       bool,
}

impl Default for DmConfig {
    fn default() -> Self {
        Self {
            cert_store_root:  CERT_STORE_ROOT.to_string(),
            wstep_renew_root: WSTEP_RENEW_ROOT.to_string(),
            local_time_path:  LOCAL_TIME_PATH.to_string(),
            prov_tool:        PROV_TOOL.to_string(),
            time_sync_tool:   TIME_SYNC_TOOL.to_string(),
            tz_state_file:    PathBuf::from("timezone.json"),
            log_syslog:       false,
        }
    }
}

/// Parse `path` as a key=value configuration file.
pub fn load_config(path: &Path) -> Result<DmConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| DmError::Config(format!("cannot read {}: {e}", path.display())))?;
    Ok(parse_config(&content))
}

fn parse_config(content: &str) -> DmConfig {
    let mut cfg = DmConfig::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, '=');
        let key = match parts.next() {
            Some(k) => k.trim().to_ascii_lowercase(),
            None => continue,
        };
        let val = match parts.next() {
            Some(v) => v.trim().to_string(),
            None => continue,
        };
        if val.is_empty() {
            continue;
        }

        match key.as_str() {
            "cert_store_root"  => cfg.cert_store_root  = val,
            "wstep_renew_root" => cfg.wstep_renew_root = val,
            "local_time_path"  => cfg.local_time_path  = val,
            "prov_tool"        => cfg.prov_tool        = val,
            "time_sync_tool"   => cfg.time_sync_tool   = val,
            "tz_state_file"    => cfg.tz_state_file    = PathBuf::from(&val),
            "log_syslog"       => cfg.log_syslog       = val == "true" || val == "1" || val == "yes",
            _ => {} // ignore unknown keys
        }
    }

    cfg
}

/// Validate that required fields are usable.
pub fn validate_config(cfg: &DmConfig) -> Result<()> {
    for (key, val) in [
        ("cert_store_root",  &cfg.cert_store_root),
        ("wstep_renew_root", &cfg.wstep_renew_root),
        ("local_time_path",  &cfg.local_time_path),
        ("prov_tool",        &cfg.prov_tool),
        ("time_sync_tool",   &cfg.time_sync_tool),
    ] {
        if val.trim().is_empty() {
            return Err(DmError::Config(format!("{key} is required")));
        }
    }
    if cfg.tz_state_file.as_os_str().is_empty() {
        return Err(DmError::Config("tz_state_file is required".into()));
    }
    Ok(())
}
