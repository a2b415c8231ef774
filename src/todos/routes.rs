//! REST endpoints for tasks, prioritization, and the emailed digest.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::model::{CreateTaskRequest, EmailTasksRequest, UpdateTaskRequest};
use crate::digest::{MailRelay, send_digest};
use crate::prioritize::Prioritizer;
use crate::store::Database;

/// Header the upstream authenticator sets to the caller's owner identifier.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub prioritizer: Arc<Prioritizer>,
    /// Outbound mail relay (None if SMTP is not configured).
    pub mailer: Option<Arc<dyn MailRelay>>,
}

/// The authenticated caller, taken from [`OWNER_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for OwnerId {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| OwnerId(s.to_string()))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": "Unauthorized"})),
                )
            })
    }
}

/// Build the task REST routes.
pub fn todo_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/todos", get(list_tasks).post(create_task))
        .route("/todos/prioritize", post(prioritize_tasks))
        .route("/todos/email-tasks", post(email_tasks))
        .route("/todos/{id}", patch(update_task).delete(delete_task))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

fn parse_task_id(id: &str) -> Result<i64, Response> {
    id.parse::<i64>()
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid task ID"))
}

/// Parse a JSON body, answering malformed input with the crate's error shape.
fn parse_body<T: DeserializeOwned>(body: &Bytes, message: &str) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Malformed request body");
        error_response(StatusCode::BAD_REQUEST, message)
    })
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "todo-assist"
    }))
}

// ── Tasks ───────────────────────────────────────────────────────────────

async fn list_tasks(State(state): State<AppState>, OwnerId(owner): OwnerId) -> Response {
    match state.db.list_tasks(&owner).await {
        Ok(tasks) => Json(tasks).into_response(),
        Err(e) => {
            error!(owner = %owner, error = %e, "Failed to list tasks");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list tasks")
        }
    }
}

async fn create_task(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    body: Bytes,
) -> Response {
    let body: CreateTaskRequest = match parse_body(&body, "text is required") {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let text = body.text.trim();
    if text.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "text is required");
    }

    match state.db.create_task(&owner, text).await {
        Ok(task) => {
            info!(owner = %owner, id = task.id, "Task created");
            (StatusCode::CREATED, Json(task)).into_response()
        }
        Err(e) => {
            error!(owner = %owner, error = %e, "Failed to create task");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create task")
        }
    }
}

async fn update_task(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let id = match parse_task_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body: UpdateTaskRequest = match parse_body(&body, "completed is required") {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let updated = match state.db.set_task_completed(&owner, id, body.completed).await {
        Ok(updated) => updated,
        Err(e) => {
            error!(owner = %owner, id, error = %e, "Failed to update task");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update task");
        }
    };
    if !updated {
        warn!(owner = %owner, id, "Update failed, task not found");
        return error_response(StatusCode::NOT_FOUND, "Task not found");
    }

    match state.db.get_task(&owner, id).await {
        Ok(Some(task)) => Json(task).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Task not found"),
        Err(e) => {
            error!(owner = %owner, id, error = %e, "Failed to reload task");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update task")
        }
    }
}

async fn delete_task(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_task_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.db.delete_task(&owner, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => {
            warn!(owner = %owner, id, "Delete failed, task not found");
            error_response(StatusCode::NOT_FOUND, "Task not found")
        }
        Err(e) => {
            error!(owner = %owner, id, error = %e, "Failed to delete task");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete task")
        }
    }
}

// ── Prioritize ──────────────────────────────────────────────────────────

async fn prioritize_tasks(State(state): State<AppState>, OwnerId(owner): OwnerId) -> Response {
    match state.prioritizer.prioritize(&owner).await {
        Ok(outcome) => {
            (StatusCode::OK, Json(json!({"message": outcome.message()}))).into_response()
        }
        // Cause already logged inside the pipeline span.
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to prioritize tasks"),
    }
}

// ── Digest ──────────────────────────────────────────────────────────────

async fn email_tasks(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    body: Bytes,
) -> Response {
    let request: EmailTasksRequest = if body.iter().all(u8::is_ascii_whitespace) {
        EmailTasksRequest::default()
    } else {
        match parse_body(&body, "targetEmail is required") {
            Ok(request) => request,
            Err(resp) => return resp,
        }
    };

    let Some(target) = request.target() else {
        return error_response(StatusCode::BAD_REQUEST, "targetEmail is required");
    };

    let Some(mailer) = state.mailer.as_ref() else {
        error!(owner = %owner, "Digest requested but no mail relay is configured");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send email");
    };

    match send_digest(state.db.as_ref(), mailer.as_ref(), &owner, target).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({"message": "Email sent successfully"})),
        )
            .into_response(),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send email"),
    }
}
