use thiserror::Error;

use crate::models::consent_record::ValidationError;

#[derive(Error, Debug)]
pub enum ConsentError {
    #[error("Failed to decode stored consent: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Stored consent failed validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Integration '{service_id}' failed to load: {reason}")]
    IntegrationLoad { service_id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<std::io::Error> for ConsentError {
    fn from(e: std::io::Error) -> Self {
        ConsentError::Persistence(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsentError>;
