//! Errors for the crewing desk
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrewdeskError {
    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Configuration invalid: {message}")]
    ConfigurationError { message: String },

    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("Invalid record id: {0:?}")]
    InvalidRecordId(String),

    #[error("Unknown crew status: {0:?}")]
    UnknownStatus(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Database migration error")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),
}
