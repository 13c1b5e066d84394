#![cfg_attr(feature = "strict", deny(warnings))]

pub use crate::auth::{AuthConfig, AuthError, NoOpTokenRefresher, TokenRefresher};
pub use crate::error::{OcrClientError, Result};
pub use crate::http_client::{build_auth_http_client, build_http_client};
pub use crate::interface::{ExtractionClient, UploadPayload};
pub use crate::remote_client::{DEFAULT_ENDPOINT, RemoteExtractionClient};

mod auth;
mod error;
mod http_client;
mod interface;
mod remote_client;
