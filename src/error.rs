//! Error types for the configuration shim.

use thiserror::Error;

/// Windows `ERROR_INVALID_PARAMETER`, reported for unparseable dates.
pub const ERROR_INVALID_PARAMETER: u32 = 87;

#[derive(Debug, Error)]
pub enum DmError {
    #[error("{program} exited with code {code}")]
    ProcessExecution { program: String, code: i32 },

    #[error("cannot launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source:  std::io::Error,
    },

    #[error("failed to retrieve time zone information (os error {code})")]
    OsQuery { code: u32 },

    #[error("failed to set time zone information (os error {code})")]
    OsApply { code: u32 },

    /// `source` is absent when the date parsed but does not fit the OS record.
    #[error("invalid date/time format {value:?}")]
    DateParse {
        value:  String,
        #[source]
        source: Option<chrono::ParseError>,
    },

    #[error("store: {path}: {message} (code {code})")]
    Store { path: String, code: i32, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Config: {0}")]
    Config(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl DmError {
    /// Numeric code surfaced to the caller's response status.
    pub fn code(&self) -> i64 {
        match self {
            Self::ProcessExecution { code, .. } => i64::from(*code),
            Self::Store { code, .. }            => i64::from(*code),
            Self::OsQuery { code }
            | Self::OsApply { code }            => i64::from(*code),
            Self::DateParse { .. }              => i64::from(ERROR_INVALID_PARAMETER),
            Self::Launch { source, .. } | Self::Io(source) => {
                source.raw_os_error().map(i64::from).unwrap_or(-1)
            }
            Self::InvalidArgument(_)            => i64::from(ERROR_INVALID_PARAMETER),
            Self::Config(_) | Self::Json(_)     => -1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DmError>;
