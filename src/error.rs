use thiserror::Error;

use acinfinity_api::error::CardError;

#[derive(Error, Debug)]
pub enum ApiError {
    /* mapped errors */
    #[error(transparent)]
    CardError(#[from] CardError),

    #[error(transparent)]
    ConfigError(#[from] config::ConfigError),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    SerdeYaml(#[from] serde_yml::Error),

    #[error(transparent)]
    SetLoggerError(#[from] log::SetLoggerError),

    /* host errors */
    #[error("Controller {0:?} not found")]
    ControllerNotFound(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
