//! services/api/src/web/pipeline_task.rs
//!
//! The detached processing pipeline that runs after a dream is ingested:
//! interpretation first, then illustration, each stored and pushed to the owner.
//!
//! ```text
//! CREATED -> INTERPRETING -> INTERPRETED -> IMAGING -> IMAGED
//!                 \-> INTERPRET_FAILED ------/    \-> IMAGE_FAILED
//! ```
//!
//! A provider failure while interpreting does not stop the image stage. A failure to
//! store a result ends the pipeline. Nothing is retried.

use crate::web::{
    protocol::{ImageReadyPayload, InterpretationCompletePayload, IMAGE_READY, INTERPRETATION_COMPLETE},
    state::AppState,
};
use dream_journal_core::{
    domain::{Dream, ImageGeneration, Interpretation, VisualStyle},
    ports::PortError,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

/// The states a dream passes through while being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Interpreting,
    Interpreted,
    InterpretFailed,
    Imaging,
    Imaged,
    ImageFailed,
}

/// Everything the pipeline needs to know about the dream it processes.
#[derive(Debug, Clone)]
pub struct DreamJob {
    pub dream_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub style: VisualStyle,
}

impl DreamJob {
    pub fn new(dream: &Dream, style: VisualStyle) -> Self {
        Self {
            dream_id: dream.id,
            user_id: dream.user_id,
            content: dream.content.clone(),
            style,
        }
    }
}

/// The sequence of states one pipeline run went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub dream_id: Uuid,
    pub trace: Vec<PipelineState>,
}

impl PipelineOutcome {
    pub fn final_state(&self) -> PipelineState {
        self.trace.last().copied().unwrap_or(PipelineState::Created)
    }

    pub fn reached(&self, state: PipelineState) -> bool {
        self.trace.contains(&state)
    }
}

/// Why a stage did not produce a stored result.
enum StageError {
    /// The AI provider call failed.
    Provider(PortError),
    /// The result could not be stored.
    Persistence(PortError),
}

struct PipelineRun {
    dream_id: Uuid,
    trace: Vec<PipelineState>,
}

impl PipelineRun {
    fn new(dream_id: Uuid) -> Self {
        Self {
            dream_id,
            trace: vec![PipelineState::Created],
        }
    }

    fn enter(&mut self, state: PipelineState) {
        match state {
            PipelineState::InterpretFailed | PipelineState::ImageFailed => {
                error!(dream_id = %self.dream_id, ?state, "pipeline stage failed")
            }
            _ => info!(dream_id = %self.dream_id, ?state, "pipeline state change"),
        }
        self.trace.push(state);
    }

    fn finish(self) -> PipelineOutcome {
        PipelineOutcome {
            dream_id: self.dream_id,
            trace: self.trace,
        }
    }
}

/// Starts the pipeline on its own task. The caller is not expected to await the handle.
pub fn spawn_pipeline(app_state: Arc<AppState>, job: DreamJob) -> JoinHandle<PipelineOutcome> {
    tokio::spawn(async move { run_pipeline(app_state, job).await })
}

/// Runs both stages for one dream to a terminal state.
pub async fn run_pipeline(app_state: Arc<AppState>, job: DreamJob) -> PipelineOutcome {
    let mut run = PipelineRun::new(job.dream_id);

    // --- Stage 1: interpretation ---
    run.enter(PipelineState::Interpreting);
    match interpret_stage(&app_state, &job).await {
        Ok(interpretation) => {
            run.enter(PipelineState::Interpreted);
            app_state
                .notifications
                .publish(
                    job.user_id,
                    INTERPRETATION_COMPLETE,
                    &InterpretationCompletePayload {
                        dream_id: job.dream_id,
                        interpretation: &interpretation,
                    },
                )
                .await;
        }
        Err(StageError::Provider(e)) => {
            error!(dream_id = %job.dream_id, "Error interpreting dream: {}", e);
            run.enter(PipelineState::InterpretFailed);
        }
        Err(StageError::Persistence(e)) => {
            error!(dream_id = %job.dream_id, "Failed to store interpretation: {}", e);
            run.enter(PipelineState::InterpretFailed);
            return run.finish();
        }
    }

    // --- Stage 2: illustration ---
    run.enter(PipelineState::Imaging);
    match image_stage(&app_state, &job).await {
        Ok(image_generation) => {
            run.enter(PipelineState::Imaged);
            app_state
                .notifications
                .publish(
                    job.user_id,
                    IMAGE_READY,
                    &ImageReadyPayload {
                        dream_id: job.dream_id,
                        image_generation: &image_generation,
                    },
                )
                .await;
        }
        Err(StageError::Provider(e)) => {
            error!(dream_id = %job.dream_id, "Error generating dream image: {}", e);
            run.enter(PipelineState::ImageFailed);
        }
        Err(StageError::Persistence(e)) => {
            error!(dream_id = %job.dream_id, "Failed to store image generation: {}", e);
            run.enter(PipelineState::ImageFailed);
        }
    }

    run.finish()
}

async fn interpret_stage(app_state: &AppState, job: &DreamJob) -> Result<Interpretation, StageError> {
    let analysis = app_state
        .interpretation_adapter
        .interpret(&job.content)
        .await
        .map_err(StageError::Provider)?;

    app_state
        .db
        .create_interpretation(job.dream_id, &analysis.interpretation, &analysis.insights)
        .await
        .map_err(StageError::Persistence)
}

async fn image_stage(app_state: &AppState, job: &DreamJob) -> Result<ImageGeneration, StageError> {
    let prompt = job.style.build_prompt(&job.content);
    let image_url = app_state
        .image_adapter
        .generate_image(&prompt)
        .await
        .map_err(StageError::Provider)?;

    app_state
        .db
        .create_image_generation(job.dream_id, &image_url, job.style, &prompt)
        .await
        .map_err(StageError::Persistence)
}
