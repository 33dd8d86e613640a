use thiserror::Error;

#[derive(Error, Debug)]
pub enum GapwatchError {
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("A run is already in progress")]
    Busy,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GapwatchError>;
