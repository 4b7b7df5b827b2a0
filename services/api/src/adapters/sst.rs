//! services/api/src/adapters/sst.rs
//!
//! This module contains the adapter for OpenAI's Speech-to-Text (Whisper) service.
//! It implements the `SpeechToTextService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::audio::{AudioInput, CreateTranscriptionRequest},
    Client,
};
use async_trait::async_trait;
use dream_journal_core::ports::{PortError, PortResult, SpeechToTextService, Transcript};
use tracing::error;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SpeechToTextService` port using the OpenAI Whisper API.
#[derive(Clone)]
pub struct OpenAiSstAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSstAdapter {
    /// Creates a new `OpenAiSstAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `SpeechToTextService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SpeechToTextService for OpenAiSstAdapter {
    /// Transcribes an uploaded recording. The verbose response is requested
    /// because it is the one that reports the recording's duration.
    async fn transcribe(&self, file_name: &str, audio: Vec<u8>) -> PortResult<Transcript> {
        let request = CreateTranscriptionRequest {
            file: AudioInput::from_vec_u8(file_name.to_string(), audio),
            model: self.model.clone(),
            ..Default::default()
        };

        let response = self
            .client
            .audio()
            .transcription()
            .create_verbose_json(request)
            .await
            .map_err(|e: OpenAIError| {
                error!("Error transcribing audio: {}", e);
                PortError::Transcription(e.to_string())
            })?;

        Ok(Transcript {
            text: response.text,
            duration_seconds: response.duration,
        })
    }
}
