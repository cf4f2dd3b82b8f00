//! HTTP surface of the history server
//!
//! `GET /history-get/:last_step_id` answers every step recorded after the
//! given id, `POST /history-push` appends one step.

use crate::state::{HistoryState, StateError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use scribe_editor::Step;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("History store lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::State(StateError::DuplicateStep(_)) => StatusCode::CONFLICT,
            ServerError::State(StateError::MissingId) => StatusCode::BAD_REQUEST,
            ServerError::Poisoned | ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Shared handle on the step store
#[derive(Clone, Default)]
pub struct AppState {
    history: Arc<Mutex<HistoryState>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, HistoryState>, ServerError> {
        self.history.lock().map_err(|_| ServerError::Poisoned)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/history-get/:last_step_id", get(history_get))
        .route("/history-push", post(history_push))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the history endpoints until the listener fails
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    tracing::info!("History server listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn history_get(
    State(state): State<AppState>,
    Path(last_step_id): Path<String>,
) -> Result<Json<Vec<Step>>, ServerError> {
    let steps = state.lock()?.steps_after(&last_step_id);
    tracing::debug!(after = %last_step_id, count = steps.len(), "history-get");
    Ok(Json(steps))
}

async fn history_push(
    State(state): State<AppState>,
    Json(step): Json<Step>,
) -> Result<StatusCode, ServerError> {
    let id = step.id.clone();
    let mut history = state.lock()?;
    match history.push(step) {
        Ok(stored) => {
            tracing::debug!(id = %id, at = %stored.received_at, "history-push");
            Ok(StatusCode::CREATED)
        }
        Err(err) => {
            tracing::warn!(id = %id, "Rejected step: {}", err);
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn push_request(id: &str) -> Request<Body> {
        let body = serde_json::json!({ "id": id, "cursor": null, "dom": [] });
        Request::builder()
            .method("POST")
            .uri("/history-push")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn get_ids(app: Router, after: &str) -> Vec<String> {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/history-get/{}", after))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let steps: Vec<Step> = serde_json::from_slice(&bytes).unwrap();
        steps.into_iter().map(|s| s.id).collect()
    }

    #[tokio::test]
    async fn test_push_then_get() {
        let state = AppState::new();
        let app = router(state.clone());

        for id in ["a", "b"] {
            let response = app.clone().oneshot(push_request(id)).await.unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        assert_eq!(get_ids(app.clone(), "0").await, vec!["a", "b"]);
        assert_eq!(get_ids(app.clone(), "a").await, vec!["b"]);
        assert_eq!(get_ids(app.clone(), "b").await, Vec::<String>::new());
        assert_eq!(get_ids(app, "unknown").await, vec!["a", "b"]);
        assert_eq!(state.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_push_conflicts() {
        let app = router(AppState::new());
        let first = app.clone().oneshot(push_request("a")).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = app.clone().oneshot(push_request("a")).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(get_ids(app, "0").await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_empty_id_is_bad_request() {
        let app = router(AppState::new());
        let response = app.oneshot(push_request("")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let app = router(AppState::new());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/history-push")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"dom\": 3}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
