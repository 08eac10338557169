use super::settings::{AspectRatio, ImageModel, ImageSize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One call's worth of input for the image service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub model: ImageModel,
    pub image_size: ImageSize,
    /// Data URI of a previously generated image used as the edit seed.
    pub source_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGenerationResponse {
    pub url: String, // data:image/png;base64,...
    pub model: ImageModel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub aspect_ratio: AspectRatio,
    pub model: ImageModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
}
