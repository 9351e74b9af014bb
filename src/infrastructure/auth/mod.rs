//! Access token management

mod token;

#[cfg(test)]
pub(crate) use token::test_support;
pub use token::{AccessClaims, AccessToken, TokenManager};
