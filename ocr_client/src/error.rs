use anyhow::anyhow;
use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::AuthError;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum OcrClientError {
    #[error("Auth Error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Configuration Error: {0}")]
    ConfigurationError(String),

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Other Internal Error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Parse Error: {0}")]
    ParseError(#[from] url::ParseError),

    #[error("ReqwestMiddleware Error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),

    #[error("Reqwest Error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Submission rejected ({status}): {detail}")]
    SubmissionRejected { status: StatusCode, detail: String },

    #[error("Unexpected status {status} from {api} API")]
    UnexpectedHttpStatus { api: &'static str, status: StatusCode },
}

// Define our own result type here (this seems to be the standard).
pub type Result<T> = std::result::Result<T, OcrClientError>;

impl PartialEq for OcrClientError {
    fn eq(&self, other: &OcrClientError) -> bool {
        match (self, other) {
            (
                OcrClientError::SubmissionRejected { status: s1, detail: d1 },
                OcrClientError::SubmissionRejected { status: s2, detail: d2 },
            ) => s1 == s2 && d1 == d2,
            (e1, e2) => std::mem::discriminant(e1) == std::mem::discriminant(e2),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for OcrClientError {
    fn from(value: std::sync::PoisonError<T>) -> Self {
        OcrClientError::InternalError(anyhow!("{value:?}"))
    }
}
