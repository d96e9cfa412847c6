use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),
    #[error("Unsupported gateway resource: {0}")]
    UnsupportedResource(String),
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
    #[error("Channel context already active for channel {active}, refusing to activate {requested}")]
    ContextAlreadyActive { active: String, requested: String },
    #[error("Webhook resource {actual} does not belong to order referencing {expected}")]
    ReferenceMismatch { expected: String, actual: String },
    #[error("Gateway resource not found: {0}")]
    ResourceNotFound(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
