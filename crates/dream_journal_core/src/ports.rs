//! crates/dream_journal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Dream, DreamAnalysis, DreamUpdate, DreamWithRelations, ImageGeneration, Insights,
    Interpretation, NewDream, NewUser, SortOrder, User, UserCredentials, VisualStyle,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Failed to transcribe audio: {0}")]
    Transcription(String),
    #[error("Failed to interpret dream: {0}")]
    Interpretation(String),
    #[error("Failed to generate dream image: {0}")]
    ImageGeneration(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Port
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` when the username or email is already registered.
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<UserCredentials>>;

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>>;

    // --- Dreams ---
    async fn create_dream(&self, dream: NewDream) -> PortResult<Dream>;

    async fn get_dream(&self, dream_id: Uuid) -> PortResult<Dream>;

    async fn get_dream_with_relations(&self, dream_id: Uuid) -> PortResult<DreamWithRelations>;

    async fn list_dreams_with_relations(
        &self,
        user_id: Uuid,
        order: SortOrder,
    ) -> PortResult<Vec<DreamWithRelations>>;

    async fn update_dream(&self, dream_id: Uuid, update: DreamUpdate) -> PortResult<Dream>;

    /// Reads the current flag and writes its negation. Concurrent toggles are last-write-wins.
    async fn toggle_favorite(&self, dream_id: Uuid) -> PortResult<Dream>;

    /// Removes the dream together with its interpretation and image generation.
    /// Returns whether a dream was removed.
    async fn delete_dream(&self, dream_id: Uuid) -> PortResult<bool>;

    // --- Relations ---
    /// Fails with `NotFound` if the dream is gone and `Conflict` if one already exists.
    async fn create_interpretation(
        &self,
        dream_id: Uuid,
        interpretation: &str,
        insights: &Insights,
    ) -> PortResult<Interpretation>;

    async fn get_interpretation_by_dream(&self, dream_id: Uuid) -> PortResult<Option<Interpretation>>;

    /// Fails with `NotFound` if the dream is gone and `Conflict` if one already exists.
    async fn create_image_generation(
        &self,
        dream_id: Uuid,
        image_url: &str,
        style: VisualStyle,
        prompt: &str,
    ) -> PortResult<ImageGeneration>;

    async fn get_image_generation_by_dream(
        &self,
        dream_id: Uuid,
    ) -> PortResult<Option<ImageGeneration>>;
}

//=========================================================================================
// AI Gateway Ports
//=========================================================================================

/// The transcript of an uploaded recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Reported length of the recording; `0.0` when the provider does not say.
    pub duration_seconds: f32,
}

#[async_trait]
pub trait SpeechToTextService: Send + Sync {
    /// Transcribes an encoded audio file (wav, mp3, m4a, ogg or webm).
    /// Errors map to `PortError::Transcription`; no partial text is returned.
    async fn transcribe(&self, file_name: &str, audio: Vec<u8>) -> PortResult<Transcript>;
}

#[async_trait]
pub trait DreamInterpretationService: Send + Sync {
    /// Produces a narrative interpretation plus symbols, emotions and themes.
    async fn interpret(&self, dream_text: &str) -> PortResult<DreamAnalysis>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Synthesizes an illustration from a complete prompt and returns its URL.
    async fn generate_image(&self, prompt: &str) -> PortResult<String>;
}

/// Derives a title and tags for a freshly submitted dream.
///
/// Shaped like `DreamInterpretationService` so a model-backed implementation
/// can replace the heuristic one without touching ingestion.
#[async_trait]
pub trait DreamAnnotationService: Send + Sync {
    async fn suggest_title(&self, dream_text: &str) -> PortResult<String>;

    async fn extract_tags(&self, dream_text: &str) -> PortResult<Vec<String>>;
}
