//! Configuration loading

mod app_config;

pub use app_config::{
    user_config_path, ApiConfig, AtlasConfig, AuthConfig, LogFormat, LoggingConfig,
    DEFAULT_BASE_URL, DEFAULT_TOKEN_URL,
};
