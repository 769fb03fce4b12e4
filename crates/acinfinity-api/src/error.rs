use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    /* configuration */
    #[error("Invalid configuration")]
    InvalidConfiguration,

    #[error("Invalid configuration: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /* editor */
    #[error("Unknown editor field {0:?}")]
    UnknownField(String),

    #[error("Invalid value for editor field {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    /* registration and lifecycle */
    #[error("Card type {0:?} is already registered")]
    AlreadyRegistered(String),

    #[error("Clock refresh needs a running tokio runtime")]
    NoRuntime,
}

pub type CardResult<T> = Result<T, CardError>;

impl CardError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
