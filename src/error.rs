//! Error types returned by the capturing logger.

/// Errors surfaced synchronously to the caller of an invalid operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A level name that does not denote any [`Level`](crate::Level).
    #[error("unknown log level `{0}`")]
    UnknownLevel(String),
    /// A configuration value that could not be interpreted.
    #[error("invalid value `{value}` for setting `{key}`: {reason}")]
    InvalidSetting {
        key: String,
        value: String,
        reason: String,
    },
    /// Another logger implementation was already installed in the `log` facade.
    #[error("failed to install the capturing logger")]
    SetLogger(#[from] log::SetLoggerError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
