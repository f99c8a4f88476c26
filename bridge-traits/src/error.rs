use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Rejection raised by the native SDK itself (code + message as reported by the host).
    #[error("Native error [{code}]: {message}")]
    Native { code: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Build a native rejection from the host-reported code and message.
    pub fn native(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Native {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The bare failure message, without the variant prefix used by `Display`.
    ///
    /// This is what gets surfaced to callers inside synthesized trigger errors,
    /// so a native rejection `start failed` stays `start failed`.
    pub fn message(&self) -> String {
        match self {
            BridgeError::NotAvailable(message) | BridgeError::OperationFailed(message) => {
                message.clone()
            }
            BridgeError::Native { message, .. } => message.clone(),
            BridgeError::Serialization(err) => err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
