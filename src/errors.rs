use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("VALIDATION: missing or invalid fields: {}", .fields.join(", "))]
    Validation { fields: Vec<String> },
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            fields: vec![field.into()],
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::StoreUnavailable(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
