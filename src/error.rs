use thiserror::Error;

/// Errors surfaced by the game engine and its storage collaborators
#[derive(Error, Debug)]
pub enum EngineError {
    /// Level parameters that cannot produce a scoreable session
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// History could not be loaded or saved
    #[error("history persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::PersistenceUnavailable(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::PersistenceUnavailable(e.to_string())
    }
}

impl From<csv::Error> for EngineError {
    fn from(e: csv::Error) -> Self {
        EngineError::PersistenceUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
