use thiserror::Error;

/// Reasons a `Settings` value is rejected by `Game::start`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("grid must have at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: u32, cols: u32 },

    #[error("session duration must be positive")]
    NonPositiveDuration,

    #[error("mole up range must satisfy 0 < min <= max (got [{min},{max}])")]
    MoleUpRange { min: u64, max: u64 },

    #[error("idle gap range must satisfy min <= max (got [{min},{max}])")]
    IdleGapRange { min: u64, max: u64 },
}

/// Why a `start()` call did not begin a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    /// A session is already running; use `Game::restart` to force a reset.
    #[error("a session is already running")]
    AlreadyRunning,
}

/// Crate-level error for the I/O facing parts: store, config and CLI.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Start(#[from] StartError),
}

pub type Result<T> = std::result::Result<T, Error>;
