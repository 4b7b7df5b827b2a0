//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the dream REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{AuthResponse, LoginRequest, RegisterRequest},
    ingest::{ingest_dream, AudioUpload, DreamSubmission},
    pipeline_task::{spawn_pipeline, DreamJob},
    state::AppState,
};
use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use dream_journal_core::{
    domain::{
        Dream, DreamUpdate, DreamWithRelations, ImageGeneration, Insights, Interpretation,
        SortOrder, User, VisualStyle,
    },
    ports::PortError,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{IntoParams, OpenApi};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_dream_handler,
        get_dream_handler,
        list_user_dreams_handler,
        update_dream_handler,
        toggle_favorite_handler,
        delete_dream_handler,
        crate::web::auth::register_handler,
        crate::web::auth::login_handler,
    ),
    components(
        schemas(
            Dream, DreamUpdate, DreamWithRelations, Interpretation, Insights, ImageGeneration,
            VisualStyle, User, RegisterRequest, LoginRequest, AuthResponse
        )
    ),
    tags(
        (name = "Dream Journal API", description = "Record dreams and receive AI interpretations and illustrations.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Query Parameters
//=========================================================================================

#[derive(Deserialize, IntoParams, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListDreamsQuery {
    /// `newest` (default), `oldest` or `favorites`.
    pub sort_by: Option<String>,
}

fn port_error_response(e: PortError, action: &str) -> (StatusCode, String) {
    match e {
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, "Dream not found".to_string()),
        PortError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        other => {
            error!("Error {}: {:?}", action, other);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error {}", action))
        }
    }
}

//=========================================================================================
// Dream Handlers
//=========================================================================================

/// Submit a new dream.
///
/// Accepts `multipart/form-data` with the text fields `userId`, `title`, `content`,
/// `style`, `dreamDate` and an optional `audio` file. Interpretation and illustration
/// happen afterwards and are announced over the push channel.
#[utoipa::path(
    post,
    path = "/dreams",
    request_body(content_type = "multipart/form-data", description = "The dream submission."),
    responses(
        (status = 201, description = "Dream created", body = Dream),
        (status = 400, description = "Missing content and audio, bad user id, unsupported audio or failed transcription"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_dream_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut submission = DreamSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                let file_name = field.file_name().unwrap_or("recording.webm").to_string();
                let data = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read audio bytes: {}", e),
                    )
                })?;
                if !data.is_empty() {
                    submission.audio = Some(AudioUpload { file_name, data });
                }
            }
            "userId" => submission.user_id = Some(field_text(field).await?),
            "title" => submission.title = Some(field_text(field).await?),
            "content" => submission.content = Some(field_text(field).await?),
            "style" => submission.style = Some(field_text(field).await?),
            "dreamDate" => submission.dream_date = Some(field_text(field).await?),
            other => warn!("Ignoring unknown multipart field '{}'", other),
        }
    }

    let ingested = ingest_dream(&app_state, submission).await.map_err(|e| {
        if e.status_code().is_server_error() {
            error!("Error creating dream: {:?}", e);
        }
        (e.status_code(), e.to_string())
    })?;

    // Fire and forget: the response does not wait for either stage.
    spawn_pipeline(app_state.clone(), DreamJob::new(&ingested.dream, ingested.style));

    Ok((StatusCode::CREATED, Json(ingested.dream)))
}

async fn field_text(field: Field<'_>) -> Result<String, (StatusCode, String)> {
    field.text().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart field: {}", e),
        )
    })
}

/// Fetch one dream with whatever interpretation and image exist so far.
#[utoipa::path(
    get,
    path = "/dreams/{id}",
    params(("id" = Uuid, Path, description = "Dream id")),
    responses(
        (status = 200, description = "The dream and its relations", body = DreamWithRelations),
        (status = 404, description = "Dream not found")
    )
)]
pub async fn get_dream_handler(
    State(app_state): State<Arc<AppState>>,
    Path(dream_id): Path<Uuid>,
) -> Result<Json<DreamWithRelations>, (StatusCode, String)> {
    app_state
        .db
        .get_dream_with_relations(dream_id)
        .await
        .map(Json)
        .map_err(|e| port_error_response(e, "retrieving dream"))
}

/// List a user's dreams with their relations.
///
/// `favorites` narrows the newest-first list to favorite dreams.
#[utoipa::path(
    get,
    path = "/users/{user_id}/dreams",
    params(("user_id" = Uuid, Path, description = "Owner id"), ListDreamsQuery),
    responses(
        (status = 200, description = "The user's dreams", body = [DreamWithRelations])
    )
)]
pub async fn list_user_dreams_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListDreamsQuery>,
) -> Result<Json<Vec<DreamWithRelations>>, (StatusCode, String)> {
    let sort_by = query.sort_by.as_deref().unwrap_or("newest");
    let order = match sort_by {
        "oldest" => SortOrder::OldestFirst,
        _ => SortOrder::NewestFirst,
    };

    let mut dreams = app_state
        .db
        .list_dreams_with_relations(user_id, order)
        .await
        .map_err(|e| port_error_response(e, "retrieving dreams"))?;

    if sort_by == "favorites" {
        dreams.retain(|d| d.dream.is_favorite);
    }
    Ok(Json(dreams))
}

/// Update some fields of a dream.
#[utoipa::path(
    patch,
    path = "/dreams/{id}",
    params(("id" = Uuid, Path, description = "Dream id")),
    request_body = DreamUpdate,
    responses(
        (status = 200, description = "The updated dream", body = Dream),
        (status = 404, description = "Dream not found")
    )
)]
pub async fn update_dream_handler(
    State(app_state): State<Arc<AppState>>,
    Path(dream_id): Path<Uuid>,
    Json(update): Json<DreamUpdate>,
) -> Result<Json<Dream>, (StatusCode, String)> {
    app_state
        .db
        .update_dream(dream_id, update)
        .await
        .map(Json)
        .map_err(|e| port_error_response(e, "updating dream"))
}

/// Flip the favorite flag of a dream.
#[utoipa::path(
    patch,
    path = "/dreams/{id}/favorite",
    params(("id" = Uuid, Path, description = "Dream id")),
    responses(
        (status = 200, description = "The updated dream", body = Dream),
        (status = 404, description = "Dream not found")
    )
)]
pub async fn toggle_favorite_handler(
    State(app_state): State<Arc<AppState>>,
    Path(dream_id): Path<Uuid>,
) -> Result<Json<Dream>, (StatusCode, String)> {
    app_state
        .db
        .toggle_favorite(dream_id)
        .await
        .map(Json)
        .map_err(|e| port_error_response(e, "toggling favorite status"))
}

/// Delete a dream together with its interpretation and image.
#[utoipa::path(
    delete,
    path = "/dreams/{id}",
    params(("id" = Uuid, Path, description = "Dream id")),
    responses(
        (status = 204, description = "Dream deleted (or already absent)")
    )
)]
pub async fn delete_dream_handler(
    State(app_state): State<Arc<AppState>>,
    Path(dream_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    app_state
        .db
        .delete_dream(dream_id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|e| port_error_response(e, "deleting dream"))
}
