use thiserror::Error;
use uuid::Uuid;

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Cart item not found: {id}")]
    CartItemNotFound { id: Uuid },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("A booking submission is already in progress")]
    SubmissionInFlight,

    #[error("Booking rejected: {message}")]
    BookingRejected { message: String },

    #[error("Partial booking: {} of {requested} requests created", .created.len())]
    PartialBooking {
        requested: usize,
        created: Vec<String>,
    },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Role {role} is not allowed to {action}")]
    Forbidden { role: String, action: String },
}

/// Repository-level errors for the storage slot and the remote booking API
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Storage I/O error on slot {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage key: {key}")]
    InvalidKey { key: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Remote API returned status {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Remote API transport error: {message}")]
    Transport { message: String },

    #[error("Timeout occurred during operation")]
    Timeout,
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Value out of range: {field}, min={min}, max={max}, value={value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::ValidationError {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RepositoryError::Timeout
        } else {
            RepositoryError::Transport {
                message: err.to_string(),
            }
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for cart store operations
pub type CartResult<T> = ServiceResult<T>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
