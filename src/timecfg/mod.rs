//! Time configuration: NTP peer and time zone.
//!
//! Reading combines three sources: the `w32tm` configuration dump (NTP
//! server), the provisioning store (local time) and the OS time-zone
//! descriptor.  Writing reconfigures `w32tm` and replaces the descriptor.

pub mod os;
pub mod w32tm;
pub mod zone;

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::DmConfig;
use crate::error::{DmError, Result};
use crate::provisioning::{ProvisioningPath, Provisioner};
use crate::util::{self, ProcessLauncher};

use self::os::TimeZoneApi;
use self::zone::{DynamicTimeZone, TransitionRule};

/// Current time settings, assembled per query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeInfo {
    pub ntp_server: String,
    pub local_time: String,
    pub time_zone:  DynamicTimeZone,
}

/// Caller-supplied time settings.  Dates are ISO-8601; an empty date means the
/// zone has no such transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetTimeRequest {
    pub ntp_server:                     String,
    pub time_zone_bias:                 i32,
    pub time_zone_standard_name:        String,
    pub time_zone_standard_date:        String,
    pub time_zone_standard_bias:        i32,
    pub time_zone_standard_day_of_week: u16,
    pub time_zone_daylight_name:        String,
    pub time_zone_daylight_date:        String,
    pub time_zone_daylight_bias:        i32,
    pub time_zone_daylight_day_of_week: u16,
    pub time_zone_key_name:             String,
    pub dynamic_daylight_time_disabled: bool,
}

impl SetTimeRequest {
    /// Load a JSON encoded request.
    pub fn read_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Flattened response view of [`TimeInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInfoData {
    pub local_time:                     String,
    pub ntp_server:                     String,
    pub dynamic_daylight_time_disabled: bool,
    pub time_zone_key_name:             String,
    pub time_zone_bias:                 i32,
    pub time_zone_standard_name:        String,
    pub time_zone_standard_date:        String,
    pub time_zone_standard_bias:        i32,
    pub time_zone_standard_day_of_week: u16,
    pub time_zone_daylight_name:        String,
    pub time_zone_daylight_date:        String,
    pub time_zone_daylight_bias:        i32,
    pub time_zone_daylight_day_of_week: u16,
}

impl From<&TimeInfo> for TimeInfoData {
    fn from(info: &TimeInfo) -> Self {
        let tz = &info.time_zone;
        TimeInfoData {
            local_time:                     info.local_time.clone(),
            ntp_server:                     info.ntp_server.clone(),
            dynamic_daylight_time_disabled: tz.dynamic_daylight_time_disabled,
            time_zone_key_name:             tz.time_zone_key_name.clone(),
            time_zone_bias:                 tz.bias,
            time_zone_standard_name:        tz.standard.name.clone(),
            time_zone_standard_date:        tz.standard.date.to_iso8601(),
            time_zone_standard_bias:        tz.standard.bias,
            time_zone_standard_day_of_week: tz.standard.date.day_of_week,
            time_zone_daylight_name:        tz.daylight.name.clone(),
            time_zone_daylight_date:        tz.daylight.date.to_iso8601(),
            time_zone_daylight_bias:        tz.daylight.bias,
            time_zone_daylight_day_of_week: tz.daylight.date.day_of_week,
        }
    }
}

/// Build the descriptor a [`SetTimeRequest`] describes.  Names are truncated
/// to the OS field widths, never rejected.
pub fn build_time_zone(req: &SetTimeRequest) -> Result<DynamicTimeZone> {
    let mut tz = DynamicTimeZone {
        bias: req.time_zone_bias,
        standard: TransitionRule::from_fields(
            &req.time_zone_standard_name,
            &req.time_zone_standard_date,
            req.time_zone_standard_day_of_week,
            req.time_zone_standard_bias,
        )?,
        daylight: TransitionRule::from_fields(
            &req.time_zone_daylight_name,
            &req.time_zone_daylight_date,
            req.time_zone_daylight_day_of_week,
            req.time_zone_daylight_bias,
        )?,
        time_zone_key_name: String::new(),
        dynamic_daylight_time_disabled: req.dynamic_daylight_time_disabled,
    };
    tz.set_key_name(&req.time_zone_key_name);
    Ok(tz)
}

// ── Accessor ──────────────────────────────────────────────────────────────────

pub struct TimeCfg<'a, P: Provisioner + ?Sized> {
    prov:            &'a P,
    launcher:        &'a dyn ProcessLauncher,
    time_zone:       &'a dyn TimeZoneApi,
    time_sync_tool:  String,
    local_time_path: ProvisioningPath,
}

impl<'a, P: Provisioner + ?Sized> TimeCfg<'a, P> {
    pub fn new(
        cfg:       &DmConfig,
        prov:      &'a P,
        launcher:  &'a dyn ProcessLauncher,
        time_zone: &'a dyn TimeZoneApi,
    ) -> Self {
        TimeCfg {
            prov,
            launcher,
            time_zone,
            time_sync_tool:  cfg.time_sync_tool.clone(),
            local_time_path: ProvisioningPath::root(cfg.local_time_path.as_str()),
        }
    }

    pub fn get(&self) -> Result<TimeInfo> {
        let dump = util::run_checked(self.launcher, &self.time_sync_tool, &w32tm::query_args())?;
        let ntp_server = w32tm::ntp_server(&dump).unwrap_or_default();
        debug!("NTP server = {ntp_server}");

        let local_time = self.prov.get_string(&self.local_time_path)?;

        let time_zone = self.time_zone.query().map_err(|code| DmError::OsQuery { code })?;

        Ok(TimeInfo { ntp_server, local_time, time_zone })
    }

    /// Apply NTP peer and time zone.  The descriptor is built before anything
    /// is changed, so a malformed date leaves the system untouched.  An empty
    /// `ntp_server` keeps the current peer list.
    pub fn set(&self, req: &SetTimeRequest) -> Result<()> {
        debug!("set time: {req:?}");
        let tz = build_time_zone(req)?;

        if req.ntp_server.is_empty() {
            debug!("no NTP server in request, peer list unchanged");
        } else {
            self.set_ntp_server(&req.ntp_server)?;
        }

        self.time_zone.apply(&tz).map_err(|code| DmError::OsApply { code })?;
        info!("time zone {:?} applied (bias {})", tz.time_zone_key_name, tz.bias);
        Ok(())
    }

    /// Make `server` the manual NTP peer list.
    pub fn set_ntp_server(&self, server: &str) -> Result<()> {
        util::validate_command_value("NTP server", server)?;
        util::run_checked(self.launcher, &self.time_sync_tool, &w32tm::config_args(server))?;
        info!("NTP server set to {server}");
        Ok(())
    }
}
