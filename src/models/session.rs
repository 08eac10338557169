use super::image::GeneratedImage;
use super::settings::{AspectRatio, ImageModel, ImageSize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settings as they were when a session's batch was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub model: ImageModel,
    pub aspect_ratio: AspectRatio,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSession {
    pub id: String,
    pub prompt: String,
    pub timestamp: DateTime<Utc>,
    /// Batch order: index `i` came from the `i`-th request of the batch.
    pub images: Vec<GeneratedImage>,
    pub settings: SettingsSnapshot,
}

impl GenerationSession {
    pub fn image(&self, image_id: &str) -> Option<&GeneratedImage> {
        self.images.iter().find(|image| image.id == image_id)
    }
}
