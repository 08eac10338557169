use thiserror::Error;

/// Message the service returns when the selected key no longer resolves.
pub const ENTITY_NOT_FOUND: &str = "Requested entity was not found.";

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("{message}")]
    ServiceError { status: u16, message: String },

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("No image data found in response. The model might have returned text instead.")]
    NoImageData,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StudioError {
    /// True when the service reports the credential's entity as missing,
    /// which is how an expired or revoked key shows up.
    pub fn is_entity_not_found(&self) -> bool {
        self.to_string().contains(ENTITY_NOT_FOUND)
    }
}

impl From<reqwest::Error> for StudioError {
    fn from(err: reqwest::Error) -> Self {
        StudioError::RequestError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
