//! REST API handlers
//!
//! This module defines the API routes, handlers and response envelopes.

use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        MatchedPath, Path, Query, Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::error::{EngineError, ErrorKind};
use crate::error::{ColorinErrorTrait, Error, ErrorCategory};
use crate::metrics;
use crate::models::{
    Assignment, AssignmentFilter, AssignmentId, DateRange, EventId, NewAssignment, TaskId,
    TaskUpdate, TeacherId,
};
use crate::storage::StoreError;
use crate::utils::reference_date;

use super::server::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            kind: None,
            detail: None,
        }
    }

    pub fn with_kind(mut self, kind: Option<ErrorKind>) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Auto-assignment result
#[derive(Debug, Serialize)]
pub struct AutoAssignResponse {
    pub event_id: EventId,
    pub assigned: usize,
    pub assignments: Vec<Assignment>,
}

// ============================================================================
// Request Types
// ============================================================================

/// Reference date query; defaults to today
#[derive(Debug, Default, Deserialize)]
pub struct AsOfQuery {
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl AsOfQuery {
    fn date(&self) -> NaiveDate {
        reference_date(self.as_of)
    }
}

#[derive(Debug, Deserialize)]
pub struct AutoAssignRequest {
    pub count: i64,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAssignmentRequest {
    pub assignments: Vec<NewAssignment>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub description: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Error returned by handlers, rendered as an [`ErrorResponse`]
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        EngineError::invalid("body", rejection.body_text()).into()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        EngineError::invalid("query", rejection.body_text()).into()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        EngineError::invalid("path", rejection.body_text()).into()
    }
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::DuplicateAssignment | ErrorKind::ConcurrencyConflict => StatusCode::CONFLICT,
        ErrorKind::InsufficientCandidates => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = match (kind, self.0.category()) {
            (Some(kind), _) => status_for(kind),
            (None, ErrorCategory::Storage) => StatusCode::SERVICE_UNAVAILABLE,
            (None, _) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse::new(self.0.localized_desc())
            .with_kind(kind)
            .with_detail(self.0.to_string());
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

fn created<T: Serialize>(data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_text))
        // Candidate ranking and auto-assignment
        .route("/api/events/{id}/candidates", get(get_candidates))
        .route("/api/events/{id}/auto-assign", post(auto_assign))
        // Assignments
        .route(
            "/api/assignments",
            get(list_assignments).post(create_assignment),
        )
        .route("/api/assignments/bulk", post(create_bulk_assignments))
        .route(
            "/api/assignments/{id}",
            axum::routing::delete(delete_assignment),
        )
        // Reports
        .route("/api/reports/distribution", get(distribution_report))
        .route("/api/reports/teachers", get(teacher_statistics))
        .route("/api/reports/teachers/{id}/events", get(teacher_events))
        // Event tasks
        .route("/api/events/{id}/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/events/{id}/tasks/{task_id}",
            put(update_task).delete(delete_task),
        )
        .route("/api/events/{id}/tasks/{task_id}/toggle", patch(toggle_task))
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Record request count and latency per matched route
async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    metrics::record_api_request(
        &endpoint,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

// ============================================================================
// Health Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
    }))
}

/// Prometheus text exposition
async fn metrics_text() -> Response {
    match metrics::encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => ApiError(Error::other(format!("Failed to encode metrics: {e}"))).into_response(),
    }
}

// ============================================================================
// Ranking and Assignment Handlers
// ============================================================================

async fn get_candidates(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<AsOfQuery>, QueryRejection>,
) -> ApiResult<crate::engine::ranker::CandidateRanking> {
    let Path(id) = path?;
    let Query(query) = query?;

    let ranking = state
        .engine
        .rank_candidates(EventId(id), query.date())
        .await?;
    ok(ranking)
}

async fn auto_assign(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AutoAssignRequest>, JsonRejection>,
) -> Created<AutoAssignResponse> {
    let Path(id) = path?;
    let Json(request) = payload?;

    // Non-positive counts become 0 and are rejected by the engine
    let count = usize::try_from(request.count).unwrap_or(0);
    let as_of = reference_date(request.as_of);

    let assignments = state.engine.auto_assign(EventId(id), count, as_of).await?;
    created(AutoAssignResponse {
        event_id: EventId(id),
        assigned: assignments.len(),
        assignments,
    })
}

async fn create_assignment(
    State(state): State<AppState>,
    payload: Result<Json<NewAssignment>, JsonRejection>,
) -> Created<Assignment> {
    let Json(request) = payload?;
    let assignment = state.engine.create_assignment(request).await?;
    created(assignment)
}

async fn list_assignments(
    State(state): State<AppState>,
    query: Result<Query<AssignmentFilter>, QueryRejection>,
) -> ApiResult<Vec<Assignment>> {
    let Query(filter) = query?;
    ok(state.engine.list_assignments(filter).await?)
}

async fn delete_assignment(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Assignment> {
    let Path(id) = path?;
    ok(state.engine.remove_assignment(AssignmentId(id)).await?)
}

/// Bulk create; itemized failures still answer 200
async fn create_bulk_assignments(
    State(state): State<AppState>,
    payload: Result<Json<BulkAssignmentRequest>, JsonRejection>,
) -> ApiResult<crate::engine::bulk::BulkOutcome> {
    let Json(request) = payload?;
    ok(state.engine.create_many(request.assignments).await?)
}

// ============================================================================
// Report Handlers
// ============================================================================

async fn distribution_report(
    State(state): State<AppState>,
    query: Result<Query<AsOfQuery>, QueryRejection>,
) -> ApiResult<crate::engine::report::DistributionReport> {
    let Query(query) = query?;
    ok(state.engine.equitable_report(query.date()).await?)
}

async fn teacher_statistics(
    State(state): State<AppState>,
    query: Result<Query<DateRange>, QueryRejection>,
) -> ApiResult<crate::engine::report::TeacherStatistics> {
    let Query(range) = query?;
    ok(state.engine.teacher_statistics(range).await?)
}

async fn teacher_events(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<DateRange>, QueryRejection>,
) -> ApiResult<crate::engine::report::TeacherEvents> {
    let Path(id) = path?;
    let Query(range) = query?;
    ok(state.engine.teacher_events(TeacherId(id), range).await?)
}

// ============================================================================
// Event Task Handlers
// ============================================================================

async fn list_tasks(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<TaskListQuery>, QueryRejection>,
) -> ApiResult<Vec<crate::models::EventTask>> {
    let Path(event_id) = path?;
    let Query(query) = query?;
    ok(state.store.list_tasks(EventId(event_id), query.completed).await?)
}

async fn create_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Created<crate::models::EventTask> {
    let Path(event_id) = path?;
    let Json(request) = payload?;
    created(
        state
            .store
            .create_task(EventId(event_id), &request.description)
            .await?,
    )
}

async fn update_task(
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
    payload: Result<Json<TaskUpdate>, JsonRejection>,
) -> ApiResult<crate::models::EventTask> {
    let Path((event_id, task_id)) = path?;
    let Json(update) = payload?;
    ok(state
        .store
        .update_task(EventId(event_id), TaskId(task_id), update)
        .await?)
}

async fn toggle_task(
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<crate::models::EventTask> {
    let Path((event_id, task_id)) = path?;
    ok(state
        .store
        .toggle_task(EventId(event_id), TaskId(task_id))
        .await?)
}

async fn delete_task(
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<crate::models::EventTask> {
    let Path((event_id, task_id)) = path?;
    ok(state
        .store
        .delete_task(EventId(event_id), TaskId(task_id))
        .await?)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::EntityKind;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert!(response.data.is_some());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_error_response() {
        let response = ErrorResponse::new("test error").with_kind(Some(ErrorKind::NotFound));
        assert!(!response.success);
        assert_eq!(response.error, "test error");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["kind"], "NotFound");
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::DuplicateAssignment), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::ConcurrencyConflict), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::InsufficientCandidates),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_api_error_status() {
        let response =
            ApiError::from(EngineError::not_found(EntityKind::Event, EventId(3))).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::from(StoreError::Unavailable {
            reason: "closed".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_as_of_defaults_to_today() {
        use chrono::Local;

        let query = AsOfQuery::default();
        assert_eq!(query.date(), Local::now().date_naive());
    }
}
