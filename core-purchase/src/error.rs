use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurchaseBridgeError {
    #[error("No purchase controller registered")]
    NoController,

    #[error("{flow} request already in flight: {request_id}")]
    AlreadyInFlight {
        flow: &'static str,
        request_id: String,
    },

    /// The native completion call failed. It is not retried.
    #[error("Failed to report completion for {request_id}: {message}")]
    CompletionFailed { request_id: String, message: String },
}

pub type Result<T> = std::result::Result<T, PurchaseBridgeError>;
