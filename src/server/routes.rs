//! Axum route handlers.
//!
//! # Routes
//!
//! - `GET  /health` — liveness probe
//! - `POST /api/v1/chat` — route a query to an agent (`mock_mode` bypasses routing)
//! - `GET  /api/v1/briefing?role_id=` — login briefing for a role
//! - `GET  /api/v1/agents` — online agents
//! - `POST /api/v1/agents/:name/actions/:action` — direct action call
//! - `POST /api/v1/attendance` — mark a student's attendance
//! - `POST /api/v1/workflows/start`, `GET /api/v1/workflows/active`,
//!   `GET /api/v1/workflows/templates`, `GET /api/v1/workflows/:id/status`,
//!   `POST /api/v1/workflows/:id/approve/:step_id`, `POST /api/v1/workflows/:id/run`,
//!   `POST /api/v1/workflows/:id/steps/:step_id/fail`
//! - `GET /api/v1/recommendations/active?role_id=`, `POST /api/v1/recommendations/generate`,
//!   `POST /api/v1/recommendations/:id/{accept,dismiss,explain}`

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::error::{panic_response, ApiError};
use crate::agents::{academic, general, AgentContext, AgentError};
use crate::llms::LlmError;
use crate::platform::Platform;
use crate::recommendations::Recommendation;
use crate::types::response::StructuredResponse;
use crate::workflow::WorkflowInstance;

type ApiResult<T> = Result<T, ApiError>;

/// Shared application state for the HTTP server.
#[derive(Debug, Clone)]
pub struct AppState {
    pub platform: Platform,
}

impl AppState {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/chat", post(chat_handler))
        .route("/briefing", get(briefing_handler))
        .route("/agents", get(list_agents_handler))
        .route("/agents/:name/actions/:action", post(agent_action_handler))
        .route("/attendance", post(attendance_handler))
        .route("/workflows/start", post(start_workflow_handler))
        .route("/workflows/active", get(active_workflows_handler))
        .route("/workflows/templates", get(templates_handler))
        .route("/workflows/:id/status", get(workflow_status_handler))
        .route("/workflows/:id/approve/:step_id", post(approve_step_handler))
        .route("/workflows/:id/run", post(run_workflow_handler))
        .route("/workflows/:id/steps/:step_id/fail", post(fail_step_handler))
        .route("/recommendations/active", get(active_recommendations_handler))
        .route("/recommendations/generate", post(generate_recommendations_handler))
        .route("/recommendations/:id/accept", post(accept_recommendation_handler))
        .route("/recommendations/:id/dismiss", post(dismiss_recommendation_handler))
        .route("/recommendations/:id/explain", post(explain_recommendation_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health — liveness probe.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "campus-agents",
        "agents_online": state.platform.directory.online_agents().len(),
    }))
}

// ---------------------------------------------------------------------------
// Chat and agents
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatRequest {
    query: String,
    #[serde(default)]
    role_id: Option<String>,
    #[serde(default)]
    mock_mode: bool,
    #[serde(default)]
    context: Option<AgentContext>,
}

/// POST /api/v1/chat
///
/// Failures come back as a `success: false` response with status 200, except
/// cascade exhaustion with mock fallback disabled, which is a 502. A body
/// that does not parse is a 400 with the same failure shape.
async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            log::debug!("[api] rejected chat body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(StructuredResponse::failure("System", rejection.body_text())),
            )
                .into_response();
        }
    };
    let platform = &state.platform;

    if request.mock_mode {
        let persona = request.role_id.as_deref().unwrap_or(general::NAME);
        return match platform
            .cascade
            .complete(persona, &request.query, "", true)
            .await
        {
            Ok(response) => Json(response).into_response(),
            Err(err) => chat_failure(AgentError::Llm(err)),
        };
    }

    let mut context = request.context.unwrap_or_default();
    if request.role_id.is_some() {
        context.role_id = request.role_id;
    }

    match platform.router.dispatch(&request.query, &context).await {
        Ok((route, response)) => {
            let response = response.with_metadata("route", json!(route));
            Json(response).into_response()
        }
        Err(err) => chat_failure(err),
    }
}

fn chat_failure(err: AgentError) -> Response {
    let status = match &err {
        AgentError::Llm(LlmError::CascadeExhausted { .. } | LlmError::NoCandidates) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::OK,
    };
    log::warn!("[api] chat failed: {}", err);
    (status, Json(StructuredResponse::failure("System", err.to_string()))).into_response()
}

#[derive(Debug, Deserialize)]
struct RoleQuery {
    #[serde(default = "default_role")]
    role_id: String,
}

fn default_role() -> String {
    "faculty".to_string()
}

/// GET /api/v1/briefing?role_id=
async fn briefing_handler(
    State(state): State<AppState>,
    Query(query): Query<RoleQuery>,
) -> Response {
    match state.platform.router.briefing(&query.role_id).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => chat_failure(err),
    }
}

/// GET /api/v1/agents
async fn list_agents_handler(State(state): State<AppState>) -> Json<Value> {
    let agents = state.platform.directory.online_agents();
    Json(json!({"count": agents.len(), "agents": agents}))
}

/// POST /api/v1/agents/:name/actions/:action — body is the action's parameters.
async fn agent_action_handler(
    State(state): State<AppState>,
    Path((name, action)): Path<(String, String)>,
    body: Option<Json<Map<String, Value>>>,
) -> ApiResult<Json<Value>> {
    let params = body.map(|Json(params)| params).unwrap_or_default();
    let result = state
        .platform
        .directory
        .send_request("api", &name, &action, params)
        .await?;
    Ok(Json(json!({"agent": name, "action": action, "result": result})))
}

#[derive(Debug, Deserialize)]
struct AttendanceRequest {
    student_id: String,
    #[serde(default = "default_attendance_status")]
    status: String,
}

fn default_attendance_status() -> String {
    "ABSENT".to_string()
}

/// POST /api/v1/attendance
async fn attendance_handler(
    State(state): State<AppState>,
    Json(request): Json<AttendanceRequest>,
) -> ApiResult<Json<Value>> {
    if request.student_id.trim().is_empty() {
        return Err(ApiError::bad_request("student_id is required"));
    }
    let status = request.status.to_uppercase();
    let percentage =
        academic::mark_attendance(&state.platform.bus, &request.student_id, &status).await;
    Ok(Json(json!({
        "student_id": request.student_id,
        "status": status,
        "percentage": percentage,
    })))
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StartWorkflowRequest {
    #[serde(default, alias = "template")]
    workflow_template: Option<String>,
    #[serde(default)]
    inputs: Map<String, Value>,
    #[serde(default = "default_initiator")]
    initiator: String,
}

fn default_initiator() -> String {
    "system".to_string()
}

/// POST /api/v1/workflows/start
async fn start_workflow_handler(
    State(state): State<AppState>,
    Json(request): Json<StartWorkflowRequest>,
) -> ApiResult<Json<Value>> {
    let template = request
        .workflow_template
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("workflow_template is required"))?;
    let workflow_id = state
        .platform
        .workflows
        .start_workflow(&template, request.inputs, &request.initiator)
        .await?;
    Ok(Json(json!({"workflow_id": workflow_id, "status": "started"})))
}

/// GET /api/v1/workflows/active
async fn active_workflows_handler(State(state): State<AppState>) -> Json<Value> {
    let workflows = state.platform.workflows.list_active().await;
    Json(json!({"workflows": workflows}))
}

/// GET /api/v1/workflows/templates
async fn templates_handler(State(state): State<AppState>) -> Json<Value> {
    let templates: Vec<Value> = state
        .platform
        .workflows
        .templates()
        .iter()
        .map(|t| json!(t.as_ref()))
        .collect();
    Json(json!({"templates": templates}))
}

fn status_body(instance: &WorkflowInstance) -> Value {
    let steps: Vec<Value> = instance
        .steps
        .iter()
        .map(|s| {
            json!({
                "step_id": s.step.id,
                "name": s.step.name,
                "agent": s.step.agent,
                "action": s.step.action,
                "status": s.status,
                "requires_approval": s.step.requires_approval,
                "approver_role": s.step.approver_role,
                "approved_by": s.approved_by,
                "error": s.error,
            })
        })
        .collect();
    json!({
        "workflow_id": instance.id,
        "template": instance.template,
        "status": instance.status,
        "initiator": instance.initiator,
        "created_at": instance.created_at,
        "updated_at": instance.updated_at,
        "steps": steps,
    })
}

/// GET /api/v1/workflows/:id/status
async fn workflow_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let instance = state.platform.workflows.get_status(&id).await?;
    Ok(Json(status_body(&instance)))
}

#[derive(Debug, Deserialize)]
struct ApproveRequest {
    #[serde(default = "default_approver")]
    approver_role: String,
}

fn default_approver() -> String {
    "Admin".to_string()
}

/// POST /api/v1/workflows/:id/approve/:step_id — every rejection is a 400.
async fn approve_step_handler(
    State(state): State<AppState>,
    Path((id, step_id)): Path<(String, String)>,
    body: Option<Json<ApproveRequest>>,
) -> ApiResult<Json<Value>> {
    let approver_role = body
        .map(|Json(request)| request.approver_role)
        .unwrap_or_else(default_approver);
    let transition = state
        .platform
        .workflows
        .approve_step(&id, &step_id, &approver_role)
        .await
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    Ok(Json(json!({
        "status": "approved",
        "step_id": transition.step_id,
        "step_status": transition.step_status,
        "workflow_status": transition.workflow_status,
    })))
}

/// POST /api/v1/workflows/:id/run
async fn run_workflow_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let instance = state.platform.workflows.run_ready_steps(&id).await?;
    Ok(Json(status_body(&instance)))
}

#[derive(Debug, Deserialize)]
struct FailRequest {
    #[serde(default = "default_fail_reason")]
    reason: String,
}

fn default_fail_reason() -> String {
    "failed by operator".to_string()
}

/// POST /api/v1/workflows/:id/steps/:step_id/fail
async fn fail_step_handler(
    State(state): State<AppState>,
    Path((id, step_id)): Path<(String, String)>,
    body: Option<Json<FailRequest>>,
) -> ApiResult<Json<Value>> {
    let reason = body
        .map(|Json(request)| request.reason)
        .unwrap_or_else(default_fail_reason);
    let instance = state
        .platform
        .workflows
        .fail_step(&id, &step_id, &reason)
        .await?;
    Ok(Json(status_body(&instance)))
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

/// GET /api/v1/recommendations/active?role_id=
async fn active_recommendations_handler(
    State(state): State<AppState>,
    Query(query): Query<RoleQuery>,
) -> Json<Vec<Recommendation>> {
    Json(state.platform.recommendations.list_pending(&query.role_id))
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    query: String,
    #[serde(default)]
    context: Map<String, Value>,
}

/// POST /api/v1/recommendations/generate
async fn generate_recommendations_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Json<Vec<Recommendation>> {
    Json(
        state
            .platform
            .recommendations
            .generate(&request.query, &request.context),
    )
}

/// POST /api/v1/recommendations/:id/accept
async fn accept_recommendation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Recommendation>> {
    Ok(Json(state.platform.recommendations.accept(&id).await?))
}

/// POST /api/v1/recommendations/:id/dismiss
async fn dismiss_recommendation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Recommendation>> {
    Ok(Json(state.platform.recommendations.dismiss(&id).await?))
}

#[derive(Debug, Default, Deserialize)]
struct ExplainRequest {
    #[serde(default)]
    force_mock: bool,
}

/// POST /api/v1/recommendations/:id/explain
async fn explain_recommendation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ExplainRequest>>,
) -> ApiResult<Json<StructuredResponse>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let response = state
        .platform
        .recommendations
        .explain(&id, request.force_mock)
        .await?;
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::knowledge::KeywordKnowledgeBase;
    use crate::llms::{CascadeConfig, ProviderCascade};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        app_router(AppState::new(Platform::offline().unwrap()))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = app();
        let (status, json) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::VERSION);
        assert_eq!(json["service"], "campus-agents");
        assert_eq!(json["agents_online"], 10);
    }

    #[tokio::test]
    async fn test_chat_mock_mode_and_routing() {
        let app = app();
        let (status, json) = call(
            &app,
            "POST",
            "/api/v1/chat",
            Some(json!({"query": "analyze system status", "role_id": "faculty", "mock_mode": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert!(!json["content"].as_str().unwrap().is_empty());

        let (status, json) = call(
            &app,
            "POST",
            "/api/v1/chat",
            Some(json!({"query": "pending fee payment", "role_id": "principal"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["metadata"]["route"]["agent"], "finance");
        assert_eq!(json["metadata"]["route"]["reason"]["kind"], "scored");
    }

    #[tokio::test]
    async fn test_chat_accepts_null_context_and_structures_bad_bodies() {
        let app = app();
        let (status, json) = call(
            &app,
            "POST",
            "/api/v1/chat",
            Some(json!({
                "query": "fee status",
                "role_id": "faculty",
                "mock_mode": false,
                "context": null
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["metadata"]["route"]["agent"], "finance");

        let (status, json) = call(
            &app,
            "POST",
            "/api/v1/chat",
            Some(json!({"role_id": "faculty"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error_message"].as_str().unwrap().contains("query"));

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/chat")
            .header("Content-Type", "application/json")
            .body(Body::from("{\"query\": "))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error_message"].is_string());
    }

    #[tokio::test]
    async fn test_chat_without_fallback_is_bad_gateway() {
        let settings = Settings {
            enable_mock_fallback: false,
            ..Settings::default()
        };
        let cascade = ProviderCascade::new(CascadeConfig::from_settings(&settings));
        let platform =
            Platform::assemble(settings, cascade, Arc::new(KeywordKnowledgeBase::default()))
                .unwrap();
        let app = app_router(AppState::new(platform));

        let (status, json) = call(
            &app,
            "POST",
            "/api/v1/chat",
            Some(json!({"query": "hello", "role_id": "faculty"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["success"], false);
        assert!(json["error_message"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_workflow_routes() {
        let app = app();

        let (status, json) = call(&app, "POST", "/api/v1/workflows/start", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/workflows/start",
            Some(json!({"workflow_template": "fee_waiver"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(
            &app,
            "POST",
            "/api/v1/workflows/start",
            Some(json!({"workflow_template": "student_intervention", "initiator": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "started");
        let id = json["workflow_id"].as_str().unwrap().to_string();

        let (status, json) = call(&app, "GET", &format!("/api/v1/workflows/{id}/status"), None).await;
        assert_eq!(status, StatusCode::OK);
        let steps = json["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0]["status"], "in_progress");
        assert_eq!(steps[2]["requires_approval"], true);

        let (status, json) = call(
            &app,
            "POST",
            &format!("/api/v1/workflows/{id}/approve/hod_approval"),
            Some(json!({"approver_role": "HOD"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error_message"].as_str().unwrap().contains("generate_letters"));

        let (status, json) = call(&app, "POST", &format!("/api/v1/workflows/{id}/run"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "waiting_approval");

        let (status, json) = call(
            &app,
            "POST",
            &format!("/api/v1/workflows/{id}/approve/hod_approval"),
            Some(json!({"approver_role": "Clerk"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (status, json) = call(
            &app,
            "POST",
            &format!("/api/v1/workflows/{id}/approve/hod_approval"),
            Some(json!({"approver_role": "HOD"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "approved");
        assert_eq!(json["step_status"], "completed");

        let (_, json) = call(&app, "GET", "/api/v1/workflows/active", None).await;
        let workflows = json["workflows"].as_array().unwrap();
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0]["workflow_name"], "student_intervention");
        assert_eq!(workflows[0]["current_step"], 4);

        let (status, _) = call(&app, "GET", "/api/v1/workflows/missing/status", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, json) = call(&app, "GET", "/api/v1/workflows/templates", None).await;
        assert_eq!(json["templates"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fail_step_route() {
        let app = app();
        let (_, json) = call(
            &app,
            "POST",
            "/api/v1/workflows/start",
            Some(json!({"workflow_template": "academic_remediation"})),
        )
        .await;
        let id = json["workflow_id"].as_str().unwrap().to_string();

        let (status, json) = call(
            &app,
            "POST",
            &format!("/api/v1/workflows/{id}/steps/identify_students/fail"),
            Some(json!({"reason": "records offline"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["steps"][0]["error"], "records offline");

        let (status, _) = call(&app, "POST", &format!("/api/v1/workflows/{id}/run"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/v1/workflows/{id}/steps/identify_students/fail"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_recommendation_routes() {
        let app = app();

        let (status, json) = call(
            &app,
            "POST",
            "/api/v1/attendance",
            Some(json!({"student_id": "21CS042"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ABSENT");

        let (_, json) = call(&app, "GET", "/api/v1/recommendations/active?role_id=faculty", None).await;
        let recs = json.as_array().unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0]["priority"], "high");
        let id = recs[0]["id"].as_str().unwrap().to_string();

        let (status, json) = call(
            &app,
            "POST",
            &format!("/api/v1/recommendations/{id}/explain"),
            Some(json!({"force_mock": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["metadata"]["rec_id"], id.as_str());

        let (status, json) = call(&app, "POST", &format!("/api/v1/recommendations/{id}/accept"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "accepted");
        let (status, _) = call(&app, "POST", &format!("/api/v1/recommendations/{id}/dismiss"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = call(&app, "POST", "/api/v1/recommendations/missing/accept", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(
            &app,
            "POST",
            "/api/v1/recommendations/generate",
            Some(json!({"query": "research grant", "context": {"role_id": "faculty"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["title"], "Apply for SERB Grant");
        assert_eq!(json[0]["priority"], "medium");
    }

    #[tokio::test]
    async fn test_agent_routes() {
        let app = app();
        let (_, json) = call(&app, "GET", "/api/v1/agents", None).await;
        assert_eq!(json["count"], 10);

        let (status, json) = call(
            &app,
            "POST",
            "/api/v1/agents/academic/actions/identify_shortage_students",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["result"]["count"], 2);

        let (status, _) = call(&app, "POST", "/api/v1/agents/library/actions/issue_book", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/agents/administrative/actions/send_email",
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, json) = call(&app, "GET", "/api/v1/briefing?role_id=faculty", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn test_panics_become_structured_failures() {
        let app = Router::new()
            .route("/boom", get(|| async { std::convert::identity::<()>(panic!("ledger exploded")) }))
            .layer(CatchPanicLayer::custom(panic_response));
        let (status, json) = call(&app, "GET", "/boom", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert_eq!(json["error_message"], "ledger exploded");
    }
}
