use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let err: GatewayError = ConfigError::NoConfigDir.into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Could not determine config directory"
        );

        let err: GatewayError = url::Url::parse("::nope::").unwrap_err().into();
        assert!(matches!(err, GatewayError::InvalidUrl(_)));
    }
}
