use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum KegmonError {
    #[error("sample source error on {channel}: {message}")]
    Source { channel: String, message: String },
    #[error("timeout waiting for sensor on {0}")]
    Timeout(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

impl From<toml::de::Error> for KegmonError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("invalid config for channel {channel}: {reason}")]
    InvalidChannel {
        channel: kegmon_traits::Channel,
        reason: &'static str,
    },
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
