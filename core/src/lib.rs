pub mod auth;
pub mod client;
pub mod error;
pub mod response;

pub use auth::{AuthSettings, Credentials, TokenIssuer};
pub use client::{
    APP_STORE_CONNECT_API_URL, ApiClient, ApiMethod, DEFAULT_MAX_PAGES, QueryParams,
    RequestDescriptor,
};
pub use error::{AuthError, ClientError, ErrorEntry};
pub use response::ApiResponse;
