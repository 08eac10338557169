use crate::{
    config::GeminiConfig,
    credentials::CredentialHost,
    error::{Result, StudioError},
    gemini::ImageGenerator,
    models::{
        gemini::{
            Content, ErrorWrapper, GenerateContentRequest, GenerateContentResponse,
            GenerationConfig, GoogleSearch, ImageConfig, InlineData, Part, Tool,
        },
        ImageGenerationRequest, ImageGenerationResponse,
    },
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use std::sync::Arc;

static DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:([a-zA-Z0-9]+/[a-zA-Z0-9-.+]+);base64,(.*)$").expect("valid data URI regex")
});

#[derive(Clone)]
pub struct ImageClient {
    credentials: Arc<dyn CredentialHost>,
    base_url: String,
}

impl ImageClient {
    pub fn new(config: &GeminiConfig, credentials: Arc<dyn CredentialHost>) -> Self {
        Self {
            credentials,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model_id)
    }
}

#[async_trait]
impl ImageGenerator for ImageClient {
    async fn generate(&self, request: ImageGenerationRequest) -> Result<ImageGenerationResponse> {
        let api_key = self.credentials.api_key().ok_or_else(|| {
            StudioError::ConfigError("no API key selected for the image service".into())
        })?;

        let body = build_request(&request);
        let model_id = request.model.id();

        log::info!("Generating image with model: {}", model_id);
        log::debug!(
            "Request carries {} part(s), aspect ratio {}",
            body.contents.first().map(|c| c.parts.len()).unwrap_or(0),
            request.aspect_ratio
        );

        // A new HTTP client per call so a key re-selected mid-session is the
        // one that goes out.
        let client = Client::new();
        let response = client
            .post(self.endpoint(model_id))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::error!("Image service request failed: {}", e);
                StudioError::RequestError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read image service error body".to_string());
            let err = map_http_error(status, &body_text);
            log::error!("Image generation failed: {}", err);
            return Err(err);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| StudioError::ResponseError(e.to_string()))?;

        let url = extract_image(parsed)?;
        Ok(ImageGenerationResponse {
            url,
            model: request.model,
        })
    }
}

/// Splits a `data:<mime>;base64,<payload>` URI. Anything else yields `None`.
pub fn parse_data_uri(uri: &str) -> Option<InlineData> {
    let captures = DATA_URI.captures(uri)?;
    Some(InlineData {
        mime_type: captures.get(1)?.as_str().to_string(),
        data: captures.get(2)?.as_str().to_string(),
    })
}

/// Builds the request body. The source image, when it parses, goes before the
/// prompt; a source that doesn't parse is dropped without error.
pub fn build_request(request: &ImageGenerationRequest) -> GenerateContentRequest {
    let mut parts = Vec::with_capacity(2);

    if let Some(source) = request.source_image.as_deref() {
        match parse_data_uri(source) {
            Some(inline_data) => parts.push(Part::InlineData { inline_data }),
            None => log::warn!("Edit source is not a base64 data URI, sending prompt only"),
        }
    }

    parts.push(Part::Text {
        text: request.prompt.clone(),
    });

    let premium = request.model.is_premium();

    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts,
        }],
        generation_config: GenerationConfig {
            image_config: ImageConfig {
                aspect_ratio: request.aspect_ratio.token().to_string(),
                image_size: premium.then(|| request.image_size.token().to_string()),
            },
        },
        tools: premium.then(|| {
            vec![Tool {
                google_search: GoogleSearch::default(),
            }]
        }),
    }
}

/// Returns the first inline image of the first candidate as a PNG data URI.
/// The image part is not necessarily the first part.
pub fn extract_image(response: GenerateContentResponse) -> Result<String> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| {
            content
                .parts
                .into_iter()
                .find_map(|part| part.inline_data)
        })
        .map(|inline| format!("data:image/png;base64,{}", inline.data))
        .ok_or(StudioError::NoImageData)
}

pub fn map_http_error(status: StatusCode, body: &str) -> StudioError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .and_then(|wrapper| {
            if let Some(status_text) = &wrapper.error.status {
                log::debug!("Image service status: {}", status_text);
            }
            wrapper.error.message
        })
        .filter(|msg| !msg.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("Image service returned {}", status)
            } else {
                body.to_string()
            }
        });

    StudioError::ServiceError {
        status: status.as_u16(),
        message,
    }
}
