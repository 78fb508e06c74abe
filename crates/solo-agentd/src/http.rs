use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use solo_core::{
    Admission, Provisioner,
    queue::{MemoryQueue, QueueEntry},
    retention::{RetentionDecision, TaskResult},
    worker::WorkerHandle,
};
use solo_model::{LabelExpr, QueueItemId};
use solo_prometheus::PrometheusMetrics;

use crate::error::ApiError;

/// Shared state of the HTTP surface.
#[derive(Clone)]
pub struct AgentState {
    pub provisioner: Arc<Provisioner>,
    pub queue: Arc<MemoryQueue>,
    pub metrics: PrometheusMetrics,
}

/// Routes:
/// - POST /api/v1/tasks - Enqueue a task and run admission
/// - GET /api/v1/tasks/{id} - Queue entry state
/// - GET /api/v1/workers - Registered workers
/// - POST /api/v1/workers/{name}/online - Worker handshake
/// - POST /api/v1/workers/{name}/complete - Task finished on a worker
/// - POST /api/v1/workers/{name}/disconnect - Transport lost a worker
/// - GET /metrics - Prometheus exposition
pub fn router(state: AgentState) -> Router {
    Router::new()
        .route("/api/v1/tasks", post(submit_task))
        .route("/api/v1/tasks/{id}", get(get_task))
        .route("/api/v1/workers", get(list_workers))
        .route("/api/v1/workers/{name}/online", post(worker_online))
        .route("/api/v1/workers/{name}/complete", post(worker_complete))
        .route("/api/v1/workers/{name}/disconnect", post(worker_disconnect))
        .route("/metrics", get(metrics))
        .with_state(state)
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SubmitTaskRequest {
    task: String,
    #[serde(default)]
    label: Option<LabelExpr>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SubmitTaskResponse {
    item: QueueItemId,
    admission: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskView {
    id: QueueItemId,
    task: String,
    state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    binding: Option<String>,
    requeues: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl From<QueueEntry> for TaskView {
    fn from(entry: QueueEntry) -> Self {
        Self {
            id: entry.item.id,
            task: entry.item.task,
            state: entry.state.to_string(),
            label: entry.item.label.map(|l| l.to_string()),
            binding: entry.item.binding.map(|b| b.label().to_string()),
            requeues: entry.item.requeues,
            reason: entry.last_reason,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkerView {
    name: String,
    label: String,
    item: QueueItemId,
    state: String,
    completed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    backing: Option<String>,
    age_ms: u64,
}

impl From<&WorkerHandle> for WorkerView {
    fn from(w: &WorkerHandle) -> Self {
        Self {
            name: w.name().to_string(),
            label: w.label().to_string(),
            item: w.item(),
            state: w.state().to_string(),
            completed: w.completed(),
            backing: w.backing_id(),
            age_ms: w.age().as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OnlineRequest {
    secret: String,
}

#[derive(Debug, Deserialize)]
struct CompleteRequest {
    success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompleteResponse {
    decision: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/tasks
async fn submit_task(
    State(state): State<AgentState>,
    Json(req): Json<SubmitTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.task.trim().is_empty() {
        return Err(ApiError::InvalidRequest("task cannot be empty".into()));
    }

    let item = state.queue.push(req.task, req.label);
    let admission = state.provisioner.listener().on_buildable(&item)?;

    let response = match admission {
        Admission::Skipped(reason) => SubmitTaskResponse {
            item: item.id,
            admission: format!("skipped:{}", reason.as_str()),
            label: None,
        },
        Admission::Provisioning { label } => SubmitTaskResponse {
            item: item.id,
            admission: "provisioning".into(),
            label: Some(label.to_string()),
        },
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/v1/tasks/{id}
async fn get_task(
    State(state): State<AgentState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .queue
        .get(QueueItemId(id))
        .ok_or_else(|| ApiError::NotFound(format!("task {id}")))?;
    Ok(Json(TaskView::from(entry)))
}

/// GET /api/v1/workers
async fn list_workers(State(state): State<AgentState>) -> impl IntoResponse {
    let workers: Vec<WorkerView> = state
        .provisioner
        .inventory()
        .list()
        .iter()
        .map(|w| WorkerView::from(w.as_ref()))
        .collect();
    Json(workers)
}

/// POST /api/v1/workers/{name}/online
async fn worker_online(
    State(state): State<AgentState>,
    Path(name): Path<String>,
    Json(req): Json<OnlineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let worker = state.provisioner.supervisor().handshake(&name, &req.secret)?;
    Ok(Json(WorkerView::from(worker.as_ref())))
}

/// POST /api/v1/workers/{name}/complete
async fn worker_complete(
    State(state): State<AgentState>,
    Path(name): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .provisioner
        .inventory()
        .get(&name)
        .map(|w| w.item())
        .ok_or_else(|| ApiError::NotFound(format!("worker {name}")))?;

    let decision = state
        .provisioner
        .retention()
        .task_completed(&name, TaskResult::from_success(req.success))
        .await?;

    if let Err(e) = state.queue.complete(item, req.success) {
        warn!(worker = %name, item = %item, error = %e, "queue entry not completed");
    }

    let decision = match decision {
        RetentionDecision::Keep => "keep",
        RetentionDecision::Terminate => "terminate",
    };
    Ok(Json(CompleteResponse {
        decision: decision.into(),
    }))
}

/// POST /api/v1/workers/{name}/disconnect
async fn worker_disconnect(
    State(state): State<AgentState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.provisioner.retention().worker_disconnected(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /metrics
async fn metrics(State(state): State<AgentState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .encode_text()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tokio::runtime::Handle;
    use tower::ServiceExt;

    use solo_core::ProvisionContext;
    use solo_model::ProvisionConfig;
    use solo_testkit::FakeLauncher;

    struct TestApp {
        router: Router,
        provisioner: Arc<Provisioner>,
        launcher: FakeLauncher,
    }

    fn app() -> TestApp {
        let metrics = PrometheusMetrics::new().unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let launcher = FakeLauncher::new();
        let provisioner = Arc::new(
            Provisioner::builder(ProvisionConfig::default())
                .with_queue(queue.clone())
                .with_launcher(Arc::new(launcher.clone()))
                .with_context(ProvisionContext::default().with_metrics(Arc::new(metrics.clone())))
                .build(Handle::current())
                .unwrap(),
        );
        let router = router(AgentState {
            provisioner: provisioner.clone(),
            queue,
            metrics,
        });
        TestApp {
            router,
            provisioner,
            launcher,
        }
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    async fn wait_launched(launcher: &FakeLauncher, n: usize) {
        for _ in 0..500 {
            if launcher.launched().len() >= n {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("launcher never started {n} workers");
    }

    #[tokio::test]
    async fn labelled_task_is_bound_and_worker_listed() {
        let app = app();

        let (status, body) = call(&app.router, "POST", "/api/v1/tasks", Some(json!({"task": "build", "label": "docker"}))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["admission"], "provisioning");
        let label = body["label"].as_str().unwrap().to_string();
        assert!(label.starts_with("docker_"));

        let (status, task) = call(&app.router, "GET", "/api/v1/tasks/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(task["binding"], label.as_str());
        assert_eq!(task["state"], "pending");

        let (_, workers) = call(&app.router, "GET", "/api/v1/workers", None).await;
        let workers = workers.as_array().unwrap();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0]["label"], label.as_str());

        app.provisioner.shutdown(std::time::Duration::from_secs(1)).await.ok();
    }

    #[tokio::test]
    async fn unlabelled_task_is_skipped() {
        let app = app();
        let (status, body) = call(&app.router, "POST", "/api/v1/tasks", Some(json!({"task": "lint"}))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["admission"], "skipped:no_label");
        assert!(body.get("label").is_none());
    }

    #[tokio::test]
    async fn handshake_and_completion_tear_the_worker_down() {
        let app = app();
        call(&app.router, "POST", "/api/v1/tasks", Some(json!({"task": "build", "label": "docker"}))).await;
        wait_launched(&app.launcher, 1).await;

        let worker = app.provisioner.inventory().list().pop().unwrap();
        let online = format!("/api/v1/workers/{}/online", worker.name());

        let (status, _) = call(&app.router, "POST", &online, Some(json!({"secret": "wrong"}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, view) = call(&app.router, "POST", &online, Some(json!({"secret": worker.secret()}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "online");

        let complete = format!("/api/v1/workers/{}/complete", worker.name());
        let (status, body) = call(&app.router, "POST", &complete, Some(json!({"success": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["decision"], "terminate");

        let (_, task) = call(&app.router, "GET", "/api/v1/tasks/1", None).await;
        assert_eq!(task["state"], "succeeded");
        let (_, workers) = call(&app.router, "GET", "/api/v1/workers", None).await;
        assert!(workers.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_resources_are_not_found() {
        let app = app();
        let (status, body) = call(&app.router, "GET", "/api/v1/tasks/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);

        let (status, _) = call(&app.router, "POST", "/api/v1/workers/ghost/complete", Some(json!({"success": true}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_expose_admissions() {
        let app = app();
        call(&app.router, "POST", "/api/v1/tasks", Some(json!({"task": "lint"}))).await;

        let (status, body) = call(&app.router, "GET", "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        let text = body.as_str().unwrap();
        assert!(text.contains(r#"solo_admissions_total{outcome="skipped"} 1"#));
    }
}
