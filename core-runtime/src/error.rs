use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected configure options or logging setup.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Work that needs a tokio runtime was requested outside one.
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

pub type Result<T> = std::result::Result<T, Error>;
