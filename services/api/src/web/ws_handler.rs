//! services/api/src/web/ws_handler.rs
//!
//! The push channel. A browser opens `/ws?userId=<id>`, the socket is registered
//! with the notification registry, and pipeline events flow out until it closes.

use crate::web::{
    protocol::{PushMessage, PING},
    state::AppState,
};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{
    stream::{SplitSink, SplitStream, StreamExt},
    SinkExt,
};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct WsParams {
    pub user_id: Option<String>,
}

/// The handler for upgrading HTTP requests to WebSocket connections.
///
/// The user id is checked before the upgrade so a bad connect attempt gets a plain `400`.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
) -> Response {
    let Some(raw_user_id) = params
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        warn!("Rejected push connection without userId");
        return (StatusCode::BAD_REQUEST, "userId is required").into_response();
    };
    let Ok(user_id) = Uuid::parse_str(raw_user_id) else {
        warn!("Rejected push connection with invalid userId '{}'", raw_user_id);
        return (StatusCode::BAD_REQUEST, "userId is not a valid id").into_response();
    };

    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
            .into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    let (conn_id, outbound) = app_state.notifications.connect(user_id).await;
    info!(%user_id, %conn_id, "push connection established");

    let (sender, receiver) = socket.split();
    let token = CancellationToken::new();

    let send_task = tokio::spawn(send_loop(
        sender,
        outbound,
        app_state.config.heartbeat_interval,
        token.clone(),
    ));

    receive_loop(receiver, user_id, token.clone()).await;

    // Whichever side ended first, stop the other and leave the registry.
    token.cancel();
    if let Err(e) = send_task.await {
        error!(%user_id, %conn_id, "push send task panicked: {:?}", e);
    }
    app_state.notifications.unregister(user_id, conn_id).await;
    info!(%user_id, %conn_id, "push connection closed");
}

/// Forwards queued frames to the socket and pings it every `heartbeat`.
async fn send_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    heartbeat: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(heartbeat);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        let message = tokio::select! {
            _ = token.cancelled() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => Message::Text(frame.into()),
                None => break,
            },
            _ = ticker.tick() => {
                debug!("sending heartbeat ping");
                Message::Ping(Bytes::new())
            }
        };

        if let Err(e) = sender.send(message).await {
            warn!("Failed to write to push connection: {}", e);
            break;
        }
    }

    token.cancel();
    let _ = sender.close().await;
}

/// Drains client frames until the socket closes or the send side gives up.
async fn receive_loop(mut receiver: SplitStream<WebSocket>, user_id: Uuid, token: CancellationToken) {
    loop {
        let next = tokio::select! {
            _ = token.cancelled() => break,
            next = receiver.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => handle_client_text(text.as_str(), user_id),
            Some(Ok(Message::Close(_))) => {
                info!(%user_id, "client sent close message");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(%user_id, "push connection error: {}", e);
                break;
            }
            None => break,
        }
    }
}

fn handle_client_text(text: &str, user_id: Uuid) {
    match serde_json::from_str::<PushMessage>(text) {
        Ok(msg) if msg.event == PING => debug!(%user_id, "client ping"),
        Ok(msg) => debug!(%user_id, event = %msg.event, "ignoring client event"),
        Err(e) => warn!(%user_id, "Failed to deserialize client message: {}", e),
    }
}
