use bridge_traits::error::BridgeError;
use thiserror::Error;

pub const MISSING_API_KEY_MESSAGE: &str = "Nuxie API key is required. Pass apiKey to configure() or set NUXIE_API_KEY via the Expo config plugin.";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{}", MISSING_API_KEY_MESSAGE)]
    MissingApiKey,

    #[error("Native module unavailable: {0}")]
    ModuleUnavailable(String),

    #[error("Native bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl ClientError {
    /// Stable code for host-side error handling.
    pub fn code(&self) -> &str {
        match self {
            ClientError::MissingApiKey => "MISSING_API_KEY",
            ClientError::ModuleUnavailable(_) => "MODULE_UNAVAILABLE",
            ClientError::Bridge(BridgeError::Native { code, .. }) => code,
            ClientError::Bridge(_) => "NATIVE_ERROR",
            ClientError::Runtime(core_runtime::Error::Config(_)) => "INVALID_CONFIGURATION",
            ClientError::Runtime(_) => "RUNTIME_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
