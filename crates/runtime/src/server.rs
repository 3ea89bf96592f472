//! HTTP surface of the agent runtime: `GET /ping` and `POST /invocations`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use docsum_core::{InvocationMode, InvocationRequest, InvocationResult, ObjectKey};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::summarizer::Summarizer;
use crate::tasks::{PingResponse, TaskTracker};

pub struct AppState {
    pub summarizer: Arc<Summarizer>,
    pub tasks: Arc<TaskTracker>,
    /// Used when a payload carries no bucket.
    pub default_bucket: String,
    pub default_mode: InvocationMode,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/invocations", post(invocations))
        .with_state(state)
}

/// How long shutdown waits for background summaries to finish.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
const DRAIN_POLL: Duration = Duration::from_millis(100);

/// Bind `bind_addr` and serve until SIGTERM or Ctrl-C, then let in-flight
/// background summaries finish.
pub async fn serve(bind_addr: &str, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %listener.local_addr()?, "runtime listening");

    let tasks = state.tasks.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("runtime server failed")?;

    let active = tasks.active_count();
    if active > 0 {
        info!(active, "waiting for background summaries");
        if !wait_for_idle(&tasks, DRAIN_TIMEOUT, DRAIN_POLL).await {
            error!(active = tasks.active_count(), "background summaries still running at shutdown");
        }
    }
    info!("runtime stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}

/// Poll `tasks` until no background task is active.  Returns `false` when
/// `timeout` elapses first.
pub async fn wait_for_idle(tasks: &TaskTracker, timeout: Duration, poll: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if tasks.active_count() == 0 {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(poll).await;
    }
}

async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    Json(state.tasks.ping())
}

/// Unreadable bodies are answered like any other validation failure.
async fn invocations(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InvocationRequest>, JsonRejection>,
) -> Json<InvocationResult> {
    match payload {
        Ok(Json(request)) => Json(handle_invocation(&state, request).await),
        Err(rejection) => {
            let reason = rejection.body_text();
            warn!(status = %rejection.status(), %reason, "rejecting invocation body");
            Json(InvocationResult::failure(format!("invalid request body: {reason}")))
        }
    }
}

/// Validate one invocation and run it in the requested mode.
///
/// Validation failures come back as `success: false` results, never as
/// HTTP errors.
pub async fn handle_invocation(state: &Arc<AppState>, request: InvocationRequest) -> InvocationResult {
    let bucket = request
        .bucket
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| state.default_bucket.clone());
    if bucket.trim().is_empty() {
        warn!("invocation without bucket");
        return InvocationResult::failure("bucket name is required");
    }

    let raw_key = request.key.unwrap_or_default();
    if raw_key.trim().is_empty() {
        warn!(%bucket, "invocation without key");
        return InvocationResult::failure("object key is required");
    }
    let key = match ObjectKey::parse(&raw_key) {
        Ok(key) => key,
        Err(e) => {
            warn!(%bucket, key = %raw_key, error = %e, "rejecting invocation");
            return InvocationResult::failure(e.to_string());
        }
    };

    let mode = request.mode.unwrap_or(state.default_mode);
    let session_id = key.session_id(Utc::now());
    info!(%bucket, key = %key, mode = mode.as_str(), %session_id, "invocation received");

    match mode {
        InvocationMode::Sync => {
            state
                .summarizer
                .process_document(&bucket, &key, &session_id)
                .await
        }
        InvocationMode::Async => spawn_summary(state, bucket, key, session_id),
    }
}

fn spawn_summary(
    state: &Arc<AppState>,
    bucket: String,
    key: ObjectKey,
    session_id: String,
) -> InvocationResult {
    let task_id = state.tasks.add_async_task(&format!("summarize {key}"));
    let summary_key = key.summary_key();
    let reply = InvocationResult::accepted(task_id, summary_key, session_id.clone());

    let guard = TaskGuard {
        tasks: state.tasks.clone(),
        id: task_id,
    };
    let summarizer = state.summarizer.clone();
    tokio::spawn(async move {
        let _guard = guard;
        let result = summarizer.process_document(&bucket, &key, &session_id).await;
        info!(task_id, success = result.success, message = %result.message, "background summary finished");
    });

    reply
}

/// Marks a background task complete when dropped, including on panic.
struct TaskGuard {
    tasks: Arc<TaskTracker>,
    id: u64,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.tasks.complete_async_task(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarizer::SummarizerSettings;
    use crate::tasks::PingStatus;
    use crate::testing::{RecordingMemory, ScriptedModel};
    use docsum_core::TaskStatus;
    use docsum_llm::ModelTurn;
    use docsum_tools::InMemoryObjectStore;
    use std::time::Duration;

    const KEY: &str = "alice/uploads/notes.txt";
    const SUMMARY_KEY: &str = "alice/summaries/notes.txt.summary.txt";

    fn state(model: ScriptedModel, store: Arc<InMemoryObjectStore>, default_bucket: &str) -> Arc<AppState> {
        let settings = SummarizerSettings {
            memory_enabled: false,
            ..SummarizerSettings::default()
        };
        let summarizer = Summarizer::new(
            Arc::new(model),
            store,
            Arc::new(RecordingMemory::default()),
            settings,
        );
        Arc::new(AppState {
            summarizer: Arc::new(summarizer),
            tasks: Arc::new(TaskTracker::new()),
            default_bucket: default_bucket.to_string(),
            default_mode: InvocationMode::Sync,
        })
    }

    fn idle_state() -> Arc<AppState> {
        state(ScriptedModel::new(Vec::new()), Arc::new(InMemoryObjectStore::new()), "")
    }

    fn request(bucket: Option<&str>, key: Option<&str>, mode: Option<InvocationMode>) -> InvocationRequest {
        InvocationRequest {
            bucket: bucket.map(str::to_string),
            key: key.map(str::to_string),
            mode,
        }
    }

    #[tokio::test]
    async fn missing_bucket_is_rejected() {
        let result = handle_invocation(&idle_state(), request(None, Some(KEY), None)).await;
        assert!(!result.success);
        assert_eq!(result.message, "bucket name is required");
    }

    #[tokio::test]
    async fn missing_key_is_rejected() {
        let result = handle_invocation(&idle_state(), request(Some("docs"), Some("  "), None)).await;
        assert!(!result.success);
        assert_eq!(result.message, "object key is required");
    }

    #[tokio::test]
    async fn malformed_key_reports_parse_error() {
        let result = handle_invocation(&idle_state(), request(Some("docs"), Some("notes.txt"), None)).await;
        assert!(!result.success);
        assert!(result.message.starts_with("invalid S3 key format: notes.txt"));
    }

    #[tokio::test]
    async fn sync_invocation_uses_default_bucket() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.insert("fallback", KEY, "meeting notes");
        let model = ScriptedModel::summarizing("fallback", KEY, SUMMARY_KEY, "summary");
        let state = state(model, store.clone(), "fallback");

        let result = handle_invocation(&state, request(None, Some(KEY), None)).await;

        assert!(result.success, "{}", result.message);
        assert_eq!(result.status, Some(TaskStatus::Completed));
        assert!(result.session_id.unwrap().starts_with("notes_"));
        assert_eq!(store.text("fallback", SUMMARY_KEY).as_deref(), Some("summary"));
    }

    #[tokio::test]
    async fn async_invocation_returns_at_once_and_finishes_in_background() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.insert("docs", KEY, "meeting notes");
        let model = ScriptedModel::summarizing("docs", KEY, SUMMARY_KEY, "summary");
        let state = state(model, store.clone(), "");

        let result = handle_invocation(&state, request(Some("docs"), Some(KEY), Some(InvocationMode::Async))).await;

        assert!(result.success);
        assert_eq!(result.status, Some(TaskStatus::Accepted));
        assert!(result.task_id.is_some());
        assert_eq!(result.summary_key.as_deref(), Some(SUMMARY_KEY));

        for _ in 0..500 {
            if state.tasks.active_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(state.tasks.ping_status(), PingStatus::Healthy);
        assert_eq!(store.text("docs", SUMMARY_KEY).as_deref(), Some("summary"));
    }

    #[tokio::test]
    async fn failed_background_task_still_completes() {
        let store = Arc::new(InMemoryObjectStore::new());
        let state = state(ScriptedModel::new(vec![ModelTurn::text("")]), store, "docs");

        let result = handle_invocation(&state, request(None, Some(KEY), Some(InvocationMode::Async))).await;
        assert!(result.success);

        for _ in 0..500 {
            if state.tasks.active_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(state.tasks.active_count(), 0);
    }

    async fn spawn_router(state: Arc<AppState>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn post_invocation(base: &str, body: &str) -> (reqwest::StatusCode, InvocationResult) {
        let response = reqwest::Client::new()
            .post(format!("{base}/invocations"))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn wrongly_typed_body_is_a_failure_result_not_an_http_error() {
        let base = spawn_router(idle_state()).await;

        let (status, result) = post_invocation(&base, r#"{"bucket":"docs","key":123}"#).await;
        assert_eq!(status, reqwest::StatusCode::OK);
        assert!(!result.success);
        assert!(result.message.starts_with("invalid request body"), "{}", result.message);

        let (status, result) = post_invocation(&base, "not json").await;
        assert_eq!(status, reqwest::StatusCode::OK);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn uppercase_mode_is_accepted_over_http() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.insert("docs", KEY, "meeting notes");
        let model = ScriptedModel::summarizing("docs", KEY, SUMMARY_KEY, "summary");
        let state = state(model, store.clone(), "");
        let base = spawn_router(state.clone()).await;

        let body = format!(r#"{{"bucket":"docs","key":"{KEY}","mode":"ASYNC"}}"#);
        let (status, result) = post_invocation(&base, &body).await;

        assert_eq!(status, reqwest::StatusCode::OK);
        assert!(result.success, "{}", result.message);
        assert_eq!(result.status, Some(TaskStatus::Accepted));
        assert!(wait_for_idle(&state.tasks, Duration::from_secs(2), Duration::from_millis(5)).await);
        assert_eq!(store.text("docs", SUMMARY_KEY).as_deref(), Some("summary"));
    }

    #[tokio::test]
    async fn ping_is_served_over_http() {
        let base = spawn_router(idle_state()).await;
        let reply: serde_json::Value = reqwest::get(format!("{base}/ping")).await.unwrap().json().await.unwrap();
        assert_eq!(reply["status"], "Healthy");
    }

    #[tokio::test]
    async fn wait_for_idle_returns_once_tasks_complete() {
        let tasks = Arc::new(TaskTracker::new());
        let id = tasks.add_async_task("held");
        let finisher = tasks.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            finisher.complete_async_task(id);
        });

        assert!(wait_for_idle(&tasks, Duration::from_secs(2), Duration::from_millis(5)).await);
        assert_eq!(tasks.active_count(), 0);
    }

    #[tokio::test]
    async fn wait_for_idle_gives_up_after_timeout() {
        let tasks = TaskTracker::new();
        tasks.add_async_task("stuck");
        assert!(!wait_for_idle(&tasks, Duration::from_millis(30), Duration::from_millis(5)).await);
        assert_eq!(tasks.active_count(), 1);
    }

    #[tokio::test]
    async fn ping_reports_tracker_status() {
        let state = idle_state();
        let Json(reply) = ping(State(state.clone())).await;
        assert_eq!(reply.status, PingStatus::Healthy);

        state.tasks.add_async_task("held");
        let Json(reply) = ping(State(state)).await;
        assert_eq!(reply.status, PingStatus::HealthyBusy);
    }
}
