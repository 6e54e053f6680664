use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Config error: {0}")]
    Config(String),

    #[error(
        "Username and password must be provided either via flags (--username, --password) \
         or environment variables (OJ_USERNAME, OJ_PASSWORD)"
    )]
    MissingCredentials,

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
