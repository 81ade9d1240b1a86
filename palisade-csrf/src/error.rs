use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsrfError {
    /// The guard cannot operate safely with the given setup
    #[error("CSRF configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, CsrfError>;

impl From<CsrfError> for palisade_core::Error {
    fn from(err: CsrfError) -> Self {
        match err {
            CsrfError::Configuration(msg) => palisade_core::Error::Configuration(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_maps_to_server_error() {
        let err: palisade_core::Error = CsrfError::Configuration("no store".into()).into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("no store"));
    }

    #[test]
    fn test_invalid_config_converts_to_configuration_error() {
        let err = crate::CsrfConfig::new()
            .with_token_strength(0)
            .validate()
            .unwrap_err();
        let core: palisade_core::Error = err.into();
        assert!(matches!(core, palisade_core::Error::Configuration(_)));
    }
}
