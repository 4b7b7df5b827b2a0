pub mod auth;
pub mod ingest;
pub mod notifications;
pub mod pipeline_task;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::adapters::audio_store::PUBLIC_PREFIX;
use state::AppState;

// Re-export the handlers the binary and the tests reach for most.
pub use rest::ApiDoc;
pub use ws_handler::ws_handler;

/// Builds the application router: dream and user endpoints, the push channel, and
/// static serving of uploaded audio. CORS and Swagger UI are layered on by the binary.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let max_upload_bytes = app_state.config.max_upload_bytes;
    let uploads = ServeDir::new(app_state.audio_store.root());

    Router::new()
        .route("/dreams", post(rest::create_dream_handler))
        .route(
            "/dreams/{id}",
            get(rest::get_dream_handler)
                .patch(rest::update_dream_handler)
                .delete(rest::delete_dream_handler),
        )
        .route("/dreams/{id}/favorite", patch(rest::toggle_favorite_handler))
        .route("/users/{user_id}/dreams", get(rest::list_user_dreams_handler))
        .route("/users/register", post(auth::register_handler))
        .route("/users/login", post(auth::login_handler))
        .route("/ws", get(ws_handler))
        .nest_service(PUBLIC_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
