//! services/api/src/adapters/image_gen.rs
//!
//! This module contains the adapter for OpenAI's image synthesis (DALL-E) service.
//! It implements the `ImageGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::images::{
        CreateImageRequestArgs, Image, ImageModel, ImageQuality, ImageResponseFormat, ImageSize,
    },
    Client,
};
use async_trait::async_trait;
use dream_journal_core::ports::{ImageGenerationService, PortError, PortResult};
use tracing::error;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ImageGenerationService` port using the OpenAI Images API.
#[derive(Clone)]
pub struct OpenAiImageAdapter {
    client: Client<OpenAIConfig>,
    model: ImageModel,
}

impl OpenAiImageAdapter {
    /// Creates a new `OpenAiImageAdapter` for the named model.
    pub fn new(client: Client<OpenAIConfig>, model: &str) -> Self {
        let model = match model {
            "dall-e-2" => ImageModel::DallE2,
            "dall-e-3" => ImageModel::DallE3,
            other => ImageModel::Other(other.to_string()),
        };
        Self { client, model }
    }
}

//=========================================================================================
// `ImageGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ImageGenerationService for OpenAiImageAdapter {
    /// Requests a single 1024x1024 image and returns the URL the provider hosts it at.
    async fn generate_image(&self, prompt: &str) -> PortResult<String> {
        let request = CreateImageRequestArgs::default()
            .model(self.model.clone())
            .prompt(prompt)
            .n(1)
            .size(ImageSize::S1024x1024)
            .quality(ImageQuality::Standard)
            .response_format(ImageResponseFormat::Url)
            .build()
            .map_err(|e| PortError::ImageGeneration(e.to_string()))?;

        let response = self
            .client
            .images()
            .generate(request)
            .await
            .map_err(|e: OpenAIError| {
                error!("Error generating dream image: {}", e);
                PortError::ImageGeneration(e.to_string())
            })?;

        response
            .data
            .iter()
            .find_map(|image| match image.as_ref() {
                Image::Url { url, .. } => Some(url.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                PortError::ImageGeneration("Image provider returned no image URL.".to_string())
            })
    }
}
