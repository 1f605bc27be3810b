//! HTTP route handlers

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{error, info};

use crate::agent::Conversation;
use crate::core::MessageView;
use crate::server::state::AppState;

/// Conversation summary: participants by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadView {
    pub id: String,
    pub from: String,
    pub to: String,
}

impl ThreadView {
    fn of(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id().unwrap_or_default(),
            from: conversation.sender().name.clone(),
            to: conversation.recipient().name().to_string(),
        }
    }
}

/// Body of `POST /message`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub thread_id: String,
    pub message: String,
}

fn not_found(id: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("Thread '{}' not found", id) })),
    )
}

pub async fn ping() -> impl IntoResponse {
    Json(serde_json::json!({ "hello": "world" }))
}

pub async fn agency_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.agency.info())
}

pub async fn list_threads(State(state): State<AppState>) -> impl IntoResponse {
    let threads: Vec<ThreadView> = state
        .agency
        .conversations()
        .iter()
        .map(|conversation| ThreadView::of(conversation))
        .collect();
    Json(threads)
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.agency.conversation(&id) {
        Some(conversation) => Json(ThreadView::of(&conversation)).into_response(),
        None => not_found(&id).into_response(),
    }
}

pub async fn thread_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.agency.conversation(&id) {
        Some(conversation) => {
            let messages: Vec<MessageView> =
                conversation.messages().iter().map(|m| m.view()).collect();
            Json(messages).into_response()
        }
        None => not_found(&id).into_response(),
    }
}

/// Live stream of the messages logged on a thread
pub async fn thread_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if state.agency.conversation(&id).is_none() {
        return not_found(&id).into_response();
    }

    let receiver = state.broadcaster.subscribe(&id);
    Sse::new(message_events(BroadcastStream::new(receiver)))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// One SSE event per message; lagged gaps are skipped
fn message_events(
    stream: BroadcastStream<MessageView>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream.filter_map(|item| {
        let message = item.ok()?;
        match Event::default().json_data(&message) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                error!("failed to encode message event: {}", e);
                None
            }
        }
    })
}

/// Accept a user message and run it in the background
///
/// Routing is checked before responding; the reply arrives on the SSE stream.
pub async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> impl IntoResponse {
    if state.agency.conversation(&req.thread_id).is_none() {
        return not_found(&req.thread_id).into_response();
    }
    if let Err(e) = state.agency.user_conversation(&req.thread_id) {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response();
    }

    let agency = state.agency.clone();
    tokio::spawn(async move {
        match agency
            .route_user_message(&req.thread_id, &req.message)
            .await
        {
            Ok(_) => info!(thread = %req.thread_id, "user message answered"),
            Err(e) => error!(thread = %req.thread_id, "user message failed: {}", e),
        }
    });

    Json(serde_json::json!({ "ok": true })).into_response()
}
