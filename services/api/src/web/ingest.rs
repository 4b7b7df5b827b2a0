//! services/api/src/web/ingest.rs
//!
//! The synchronous half of dream submission: transcribe audio if present, settle on
//! a title, tags and date, and store the dream. The pipeline is started by the handler.

use crate::adapters::audio_store::allowed_extension;
use crate::web::state::AppState;
use axum::http::StatusCode;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use dream_journal_core::{
    domain::{Dream, NewDream, VisualStyle},
    ports::PortError,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Titles with this prefix are client-side placeholders and get replaced.
const PLACEHOLDER_TITLE_PREFIX: &str = "Dream on ";
const FALLBACK_TITLE: &str = "Untitled Dream";
const FALLBACK_TAG: &str = "uncategorized";

/// An uploaded recording.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub data: Bytes,
}

/// The raw fields of a dream submission, as sent by the client.
#[derive(Debug, Clone, Default)]
pub struct DreamSubmission {
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub style: Option<String>,
    pub dream_date: Option<String>,
    pub audio: Option<AudioUpload>,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("userId is required")]
    MissingUserId,
    #[error("userId '{0}' is not a valid id")]
    InvalidUserId(String),
    #[error("A dream needs either content or an audio recording")]
    MissingContent,
    #[error("Unsupported audio file '{0}'; expected wav, mp3, m4a, ogg or webm")]
    UnsupportedAudio(String),
    #[error("User {0} does not exist")]
    UnknownUser(Uuid),
    #[error("{0}")]
    Transcription(PortError),
    #[error("Error creating dream: {0}")]
    Persistence(PortError),
}

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// A stored dream and the style its illustration should use.
#[derive(Debug, Clone)]
pub struct IngestedDream {
    pub dream: Dream,
    pub style: VisualStyle,
}

/// Normalizes and stores a submission. Nothing is stored if any step fails.
pub async fn ingest_dream(
    app_state: &AppState,
    submission: DreamSubmission,
) -> Result<IngestedDream, IngestError> {
    let raw_user_id = submission
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(IngestError::MissingUserId)?;
    let user_id = Uuid::parse_str(raw_user_id)
        .map_err(|_| IngestError::InvalidUserId(raw_user_id.to_string()))?;

    let mut content = non_blank(submission.content);
    if content.is_none() && submission.audio.is_none() {
        return Err(IngestError::MissingContent);
    }

    // --- 1. Audio: transcribe first, keep the file only once that worked ---
    let mut audio_url = None;
    let mut audio_duration = None;
    if let Some(audio) = submission.audio {
        let extension = allowed_extension(&audio.file_name)
            .ok_or_else(|| IngestError::UnsupportedAudio(audio.file_name.clone()))?;

        let transcript = app_state
            .sst_adapter
            .transcribe(&audio.file_name, audio.data.to_vec())
            .await
            .map_err(IngestError::Transcription)?;

        if content.is_none() {
            content = non_blank(Some(transcript.text));
        }
        // A blank transcript with no typed content leaves nothing to store.
        if content.is_none() {
            return Err(IngestError::MissingContent);
        }

        let url = app_state
            .audio_store
            .save(&extension, &audio.data)
            .await
            .map_err(IngestError::Persistence)?;
        audio_url = Some(url);
        audio_duration = Some(transcript.duration_seconds.round() as i32);
    }

    let content = content.ok_or(IngestError::MissingContent)?;

    // --- 2. Title ---
    let title = match non_blank(submission.title) {
        Some(title) if !title.starts_with(PLACEHOLDER_TITLE_PREFIX) => title,
        given => match app_state.annotator.suggest_title(&content).await {
            Ok(title) => title,
            Err(e) => {
                warn!("Error generating dream title: {}", e);
                given.unwrap_or_else(|| FALLBACK_TITLE.to_string())
            }
        },
    };

    // --- 3. Tags ---
    let tags = app_state
        .annotator
        .extract_tags(&content)
        .await
        .unwrap_or_else(|e| {
            warn!("Error generating dream tags: {}", e);
            vec![FALLBACK_TAG.to_string()]
        });

    // --- 4. Date ---
    let created_at = resolve_dream_date(submission.dream_date.as_deref(), Utc::now());

    // --- 5. Persist ---
    let dream = app_state
        .db
        .create_dream(NewDream {
            user_id,
            title,
            content,
            audio_url,
            audio_duration,
            tags,
            created_at,
        })
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => IngestError::UnknownUser(user_id),
            other => IngestError::Persistence(other),
        })?;

    let style = submission
        .style
        .as_deref()
        .map(VisualStyle::from_name)
        .unwrap_or_default();

    info!(dream_id = %dream.id, %user_id, %style, "dream ingested");
    Ok(IngestedDream { dream, style })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parses an explicit dream date, falling back to `now` for absent or unparseable input.
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` and plain `YYYY-MM-DD`.
pub fn resolve_dream_date(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.and_utc();
    }
    if let Some(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return parsed.and_utc();
    }

    warn!("Unparseable dream date '{}', using the current time", raw);
    now
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn dream_date_accepts_common_formats() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        assert_eq!(
            resolve_dream_date(Some("2024-03-10"), now),
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(
            resolve_dream_date(Some("2024-03-10T06:30:00+02:00"), now),
            Utc.with_ymd_and_hms(2024, 3, 10, 4, 30, 0).unwrap()
        );
        assert_eq!(
            resolve_dream_date(Some("2024-03-10T06:30:00"), now),
            Utc.with_ymd_and_hms(2024, 3, 10, 6, 30, 0).unwrap()
        );
    }

    #[test]
    fn unparseable_or_missing_date_falls_back_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(resolve_dream_date(Some("last tuesday"), now), now);
        assert_eq!(resolve_dream_date(Some("  "), now), now);
        assert_eq!(resolve_dream_date(None, now), now);
    }

    #[test]
    fn only_persistence_failures_are_server_errors() {
        assert_eq!(IngestError::MissingContent.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            IngestError::Transcription(PortError::Transcription("boom".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IngestError::Persistence(PortError::Unexpected("db".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
