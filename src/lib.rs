pub mod config;
pub mod credentials;
pub mod download;
pub mod error;
pub mod gemini;
pub mod history;
pub mod logger;
pub mod models;
pub mod shell;
pub mod studio;

pub use config::{GeminiConfig, StudioConfig};
pub use credentials::{CredentialHost, CredentialStatus, KeyStore};
pub use error::{Result, StudioError};
pub use gemini::{ImageClient, ImageGenerator};
pub use history::History;
pub use models::{
    AspectRatio, GeneratedImage, GenerationSession, GenerationSettings, ImageGenerationRequest,
    ImageGenerationResponse, ImageModel, ImageSize, SettingsSnapshot,
};
pub use studio::{Studio, StudioState, SubmitOutcome};
