//! Device-management configuration shim: certificate store, WSTEP renewal
//! policy, NTP server and time zone.
//!
//! Usage:
//!   dm-sysconfig cert hashes Root
//!   dm-sysconfig -c /etc/dm-sysconfig.conf time get
//!   dm-sysconfig time set --request tz.json --stderr

mod config;
mod csp;
mod error;
mod provisioning;
mod timecfg;
mod util;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::error;
use serde::Serialize;

use crate::config::DmConfig;
use crate::csp::{cert_store, CertificateStore, RenewalPolicy};
use crate::error::DmError;
use crate::provisioning::command::CommandProvisioner;
#[cfg(not(windows))]
use crate::timecfg::os::StateFileTimeZone;
use crate::timecfg::os::TimeZoneApi;
#[cfg(windows)]
use crate::timecfg::os::WindowsTimeZone;
use crate::timecfg::{SetTimeRequest, TimeCfg, TimeInfoData};
use crate::util::SystemLauncher;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "dm-sysconfig", about = "Device-management system configuration")]
struct Cli {
    /// Path to the configuration file (compiled-in defaults when absent).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Log to stderr instead of syslog.
    #[arg(long, global = true)]
    stderr: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// System certificate store.
    #[command(subcommand)]
    Cert(CertCommand),
    /// WSTEP certificate renewal policy.
    #[command(subcommand)]
    Renew(RenewCommand),
    /// NTP server and time zone.
    #[command(subcommand)]
    Time(TimeCommand),
}

#[derive(Debug, Subcommand)]
enum CertCommand {
    /// Print the raw hash listing of a certificate group.
    Hashes { sub_path: String },
    /// Install a certificate.
    Add {
        sub_path: String,
        hash:     String,
        /// PEM or DER certificate file.
        #[arg(long, conflicts_with = "base64", required_unless_present = "base64")]
        file:     Option<PathBuf>,
        /// Base64 encoded certificate.
        #[arg(long)]
        base64:   Option<String>,
    },
    /// Remove a certificate.
    Delete { sub_path: String, hash: String },
    /// Print a certificate's metadata.
    Info { sub_path: String, hash: String },
}

#[derive(Debug, Subcommand)]
enum RenewCommand {
    /// Print every renewal-policy field.
    Show,
    /// Request an immediate renewal.
    Now,
}

#[derive(Debug, Subcommand)]
enum TimeCommand {
    /// Print NTP server, local time and time zone.
    Get,
    /// Apply a JSON time settings request.
    Set {
        #[arg(long)]
        request: PathBuf,
    },
    /// Set the NTP peer list.
    Ntp { server: String },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path),
        None => Ok(DmConfig::default()),
    };
    let cfg = match cfg {
        Ok(c) => c,
        Err(e) => {
            eprintln!("dm-sysconfig: config error: {e}");
            process::exit(1);
        }
    };
    if let Err(e) = config::validate_config(&cfg) {
        eprintln!("dm-sysconfig: config validation: {e}");
        process::exit(1);
    }

    let use_syslog = cfg.log_syslog && !cli.stderr;
    if let Err(e) = setup_logging(use_syslog) {
        eprintln!("dm-sysconfig: logging: {e}");
        process::exit(1);
    }

    if let Err(e) = run(&cfg, cli.command) {
        match e.downcast_ref::<DmError>().map(DmError::code) {
            Some(code) => error!("{e:#} (code {code})"),
            None       => error!("{e:#}"),
        }
        eprintln!("dm-sysconfig: {e:#}");
        process::exit(1);
    }
}

fn run(cfg: &DmConfig, command: Command) -> anyhow::Result<()> {
    let prov = CommandProvisioner::new(cfg.prov_tool.as_str());

    match command {
        Command::Cert(cmd) => {
            let store = CertificateStore::new(&prov, &cfg.cert_store_root);
            match cmd {
                CertCommand::Hashes { sub_path } => {
                    println!("{}", store.system_cert_hashes(&sub_path)?);
                }
                CertCommand::Add { sub_path, hash, file, base64 } => {
                    let payload = match (file, base64) {
                        (Some(path), _) => {
                            let raw = std::fs::read(&path)
                                .with_context(|| format!("cannot read {}", path.display()))?;
                            cert_store::certificate_payload(&raw)
                        }
                        (None, Some(b64)) => b64,
                        (None, None) => anyhow::bail!("--file or --base64 is required"),
                    };
                    store.add_system_certificate(&sub_path, &hash, &payload)?;
                }
                CertCommand::Delete { sub_path, hash } => {
                    store.delete_system_certificate(&sub_path, &hash)?;
                }
                CertCommand::Info { sub_path, hash } => {
                    print_json(&store.system_certificate_info(&sub_path, &hash).fetch()?)?;
                }
            }
        }

        Command::Renew(cmd) => {
            let policy = RenewalPolicy::new(&prov, &cfg.wstep_renew_root);
            match cmd {
                RenewCommand::Show => print_json(&policy.snapshot()?)?,
                RenewCommand::Now  => policy.renew_now()?,
            }
        }

        Command::Time(cmd) => {
            let launcher = SystemLauncher;
            let tz = time_zone_backend(cfg);
            let time = TimeCfg::new(cfg, &prov, &launcher, tz.as_ref());
            match cmd {
                TimeCommand::Get => print_json(&TimeInfoData::from(&time.get()?))?,
                TimeCommand::Set { request } => {
                    let req = SetTimeRequest::read_json(&request)
                        .with_context(|| format!("cannot load {}", request.display()))?;
                    time.set(&req)?;
                }
                TimeCommand::Ntp { server } => time.set_ntp_server(&server)?,
            }
        }
    }
    Ok(())
}

#[cfg(windows)]
fn time_zone_backend(_cfg: &DmConfig) -> Box<dyn TimeZoneApi> {
    Box::new(WindowsTimeZone)
}

#[cfg(not(windows))]
fn time_zone_backend(cfg: &DmConfig) -> Box<dyn TimeZoneApi> {
    Box::new(StateFileTimeZone::new(&cfg.tz_state_file))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Logging setup ─────────────────────────────────────────────────────────────

fn setup_logging(use_syslog: bool) -> anyhow::Result<()> {
    if use_syslog {
        setup_syslog()
    } else {
        stderr_logger()
            .try_init()
            .map_err(|e| anyhow::anyhow!("set_logger: {e}"))
    }
}

/// Debug unless `RUST_LOG` says otherwise.
fn stderr_logger() -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Debug).parse_default_env();
    builder
}

#[cfg(unix)]
fn setup_syslog() -> anyhow::Result<()> {
    let formatter = syslog::Formatter3164 {
        facility: syslog::Facility::LOG_DAEMON,
        hostname: None,
        process:  "dm-sysconfig".into(),
        pid:      process::id(),
    };
    let logger = syslog::unix(formatter)
        .map_err(|e| anyhow::anyhow!("syslog connect failed: {e}"))?;
    log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
        .map(|()| log::set_max_level(log::LevelFilter::Info))
        .map_err(|e| anyhow::anyhow!("set_logger: {e}"))
}

#[cfg(not(unix))]
fn setup_syslog() -> anyhow::Result<()> {
    anyhow::bail!("syslog is only available on unix hosts; use --stderr")
}
