//! Infrastructure layer - HTTP transport, authentication and readers

pub mod atlas;
pub mod auth;
pub mod credentials;
pub mod logging;
pub mod services;
