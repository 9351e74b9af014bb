//! Refresh token resolution

mod refresh_token;

pub use refresh_token::{resolve_refresh_token, RefreshTokenSource, REFRESH_TOKEN_ENV};
