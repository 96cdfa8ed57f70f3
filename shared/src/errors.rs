use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unrecognized update: {0}")]
    Classification(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// A missing integration fails the same way on every call; everything
    /// else may succeed on a later attempt.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ServiceError::Configuration(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Storage(_) => "storage",
            ServiceError::Delivery(_) => "delivery",
            ServiceError::Configuration(_) => "configuration",
            ServiceError::Classification(_) => "classification",
            ServiceError::Spreadsheet(_) => "spreadsheet",
            ServiceError::Duplicate(_) => "duplicate",
            ServiceError::Validation(_) => "validation",
            ServiceError::Internal(_) => "internal",
        }
    }
}

impl From<redis::RedisError> for ServiceError {
    fn from(err: redis::RedisError) -> Self {
        ServiceError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Storage(format!("malformed stored value: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_is_distinguishable() {
        let err = ServiceError::Configuration("GOOGLE_SHEETS_ACCESS_TOKEN not set".to_string());
        assert!(err.is_configuration());
        assert_eq!(err.kind(), "configuration");

        let transient = ServiceError::Spreadsheet("503 Service Unavailable".to_string());
        assert!(!transient.is_configuration());
    }

    #[test]
    fn test_json_error_maps_to_storage() {
        let err: ServiceError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(err.to_string().contains("malformed stored value"));
    }
}
