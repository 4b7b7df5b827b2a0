//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::AudioStore;
use crate::config::Config;
use crate::web::notifications::NotificationRegistry;
use dream_journal_core::ports::{
    DatabaseService, DreamAnnotationService, DreamInterpretationService, ImageGenerationService,
    SpeechToTextService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests, Sockets and Pipelines)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub sst_adapter: Arc<dyn SpeechToTextService>,
    pub interpretation_adapter: Arc<dyn DreamInterpretationService>,
    pub image_adapter: Arc<dyn ImageGenerationService>,
    pub annotator: Arc<dyn DreamAnnotationService>,
    pub audio_store: AudioStore,
    /// The only registry instance; sockets register into it and pipelines publish through it.
    pub notifications: NotificationRegistry,
}
