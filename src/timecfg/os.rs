//! OS dynamic time-zone primitive.
//!
//! [`TimeZoneApi`] mirrors the get/set dynamic time-zone calls: failures carry
//! the OS error code only.  On Windows [`WindowsTimeZone`] calls the system
//! directly.  Elsewhere [`StateFileTimeZone`] keeps the descriptor in a JSON
//! file that the platform integration applies to the system clock, and
//! reports the host's current offset until one has been written.

use std::fs;
use std::io;
use std::path::PathBuf;

use log::{debug, warn};

use super::zone::DynamicTimeZone;

/// Windows `ERROR_INVALID_DATA`, used when the stored descriptor is unreadable.
pub const ERROR_INVALID_DATA: u32 = 13;

pub trait TimeZoneApi {
    fn query(&self) -> Result<DynamicTimeZone, u32>;
    /// Replace the active descriptor as a whole.
    fn apply(&self, tz: &DynamicTimeZone) -> Result<(), u32>;
}

fn os_code(e: &io::Error) -> u32 {
    e.raw_os_error().and_then(|c| u32::try_from(c).ok()).unwrap_or(ERROR_INVALID_DATA)
}

// ── Fixed-width UTF-16 fields ─────────────────────────────────────────────────

/// Copy `s` into a NUL-terminated `WCHAR[N]` field.
#[cfg(any(windows, test))]
fn to_wide<const N: usize>(s: &str) -> [u16; N] {
    let mut out = [0u16; N];
    for (dst, unit) in out.iter_mut().take(N.saturating_sub(1)).zip(s.encode_utf16()) {
        *dst = unit;
    }
    out
}

/// Read a `WCHAR[N]` field up to its terminator.
#[cfg(any(windows, test))]
fn from_wide(field: &[u16]) -> String {
    let len = field.iter().position(|&u| u == 0).unwrap_or(field.len());
    String::from_utf16_lossy(&field[..len])
}

// ── Windows ───────────────────────────────────────────────────────────────────

#[cfg(windows)]
pub use self::windows::WindowsTimeZone;

#[cfg(windows)]
mod windows {
    use windows_sys::Win32::Foundation::{GetLastError, SYSTEMTIME};
    use windows_sys::Win32::System::Time::{
        GetDynamicTimeZoneInformation, SetDynamicTimeZoneInformation,
        DYNAMIC_TIME_ZONE_INFORMATION,
    };

    use super::*;
    use crate::timecfg::zone::SystemTime;

    const TIME_ZONE_ID_INVALID: u32 = u32::MAX;

    /// `GetDynamicTimeZoneInformation` / `SetDynamicTimeZoneInformation`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct WindowsTimeZone;

    fn from_systemtime(st: &SYSTEMTIME) -> SystemTime {
        SystemTime {
            year:         st.wYear,
            month:        st.wMonth,
            day_of_week:  st.wDayOfWeek,
            day:          st.wDay,
            hour:         st.wHour,
            minute:       st.wMinute,
            second:       st.wSecond,
            milliseconds: st.wMilliseconds,
        }
    }

    fn to_systemtime(t: &SystemTime) -> SYSTEMTIME {
        SYSTEMTIME {
            wYear:         t.year,
            wMonth:        t.month,
            wDayOfWeek:    t.day_of_week,
            wDay:          t.day,
            wHour:         t.hour,
            wMinute:       t.minute,
            wSecond:       t.second,
            wMilliseconds: t.milliseconds,
        }
    }

    impl TimeZoneApi for WindowsTimeZone {
        fn query(&self) -> Result<DynamicTimeZone, u32> {
            // SAFETY: DYNAMIC_TIME_ZONE_INFORMATION is plain old data; all-zero
            // is a valid value.
            let mut info: DYNAMIC_TIME_ZONE_INFORMATION = unsafe { std::mem::zeroed() };
            // SAFETY: `info` is a live, writable structure of the expected type.
            if unsafe { GetDynamicTimeZoneInformation(&mut info) } == TIME_ZONE_ID_INVALID {
                // SAFETY: no preconditions.
                let code = unsafe { GetLastError() };
                warn!("GetDynamicTimeZoneInformation failed: {code}");
                return Err(code);
            }

            let mut tz = DynamicTimeZone {
                bias:                           info.Bias,
                standard:                       Default::default(),
                daylight:                       Default::default(),
                time_zone_key_name:             from_wide(&info.TimeZoneKeyName),
                dynamic_daylight_time_disabled: info.DynamicDaylightTimeDisabled != 0,
            };
            tz.standard.name = from_wide(&info.StandardName);
            tz.standard.date = from_systemtime(&info.StandardDate);
            tz.standard.bias = info.StandardBias;
            tz.daylight.name = from_wide(&info.DaylightName);
            tz.daylight.date = from_systemtime(&info.DaylightDate);
            tz.daylight.bias = info.DaylightBias;
            debug!("OS time zone {:?} (bias {})", tz.time_zone_key_name, tz.bias);
            Ok(tz)
        }

        fn apply(&self, tz: &DynamicTimeZone) -> Result<(), u32> {
            let info = DYNAMIC_TIME_ZONE_INFORMATION {
                Bias:                        tz.bias,
                StandardName:                to_wide(&tz.standard.name),
                StandardDate:                to_systemtime(&tz.standard.date),
                StandardBias:                tz.standard.bias,
                DaylightName:                to_wide(&tz.daylight.name),
                DaylightDate:                to_systemtime(&tz.daylight.date),
                DaylightBias:                tz.daylight.bias,
                TimeZoneKeyName:             to_wide(&tz.time_zone_key_name),
                DynamicDaylightTimeDisabled: u8::from(tz.dynamic_daylight_time_disabled),
            };
            // SAFETY: `info` is fully initialised and outlives the call.
            if unsafe { SetDynamicTimeZoneInformation(&info) } == 0 {
                // SAFETY: no preconditions.
                let code = unsafe { GetLastError() };
                warn!("SetDynamicTimeZoneInformation failed: {code}");
                return Err(code);
            }
            debug!("OS time zone set to {:?}", tz.time_zone_key_name);
            Ok(())
        }
    }
}

// ── State file ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StateFileTimeZone {
    path: PathBuf,
}

impl StateFileTimeZone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StateFileTimeZone { path: path.into() }
    }
}

/// Descriptor for the host's current UTC offset, without transition rules.
fn host_time_zone() -> DynamicTimeZone {
    let offset = chrono::Local::now().offset().local_minus_utc();
    DynamicTimeZone {
        bias: -offset / 60,
        standard: Default::default(),
        daylight: Default::default(),
        time_zone_key_name: String::new(),
        dynamic_daylight_time_disabled: true,
    }
}

impl TimeZoneApi for StateFileTimeZone {
    fn query(&self) -> Result<DynamicTimeZone, u32> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no time zone state at {}, using host offset", self.path.display());
                return Ok(host_time_zone());
            }
            Err(e) => {
                warn!("cannot read time zone state {}: {e}", self.path.display());
                return Err(os_code(&e));
            }
        };
        serde_json::from_str(&raw).map_err(|e| {
            warn!("corrupt time zone state {}: {e}", self.path.display());
            ERROR_INVALID_DATA
        })
    }

    fn apply(&self, tz: &DynamicTimeZone) -> Result<(), u32> {
        let json = serde_json::to_vec_pretty(tz).map_err(|_| ERROR_INVALID_DATA)?;
        // Write aside, then rename over the old state so readers never see a
        // half-written descriptor.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                warn!("cannot write time zone state {}: {e}", self.path.display());
                os_code(&e)
            })?;
        debug!("time zone state written to {}", self.path.display());
        Ok(())
    }
}

/// In-memory descriptor for unit tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryTimeZone {
    pub current:    std::cell::RefCell<Option<DynamicTimeZone>>,
    pub fail_query: Option<u32>,
    pub fail_apply: Option<u32>,
}

#[cfg(test)]
impl TimeZoneApi for MemoryTimeZone {
    fn query(&self) -> Result<DynamicTimeZone, u32> {
        if let Some(code) = self.fail_query {
            return Err(code);
        }
        self.current.borrow().clone().ok_or(ERROR_INVALID_DATA)
    }

    fn apply(&self, tz: &DynamicTimeZone) -> Result<(), u32> {
        if let Some(code) = self.fail_apply {
            return Err(code);
        }
        *self.current.borrow_mut() = Some(tz.clone());
        Ok(())
    }
}
