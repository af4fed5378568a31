use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{DocumentId, DocumentSubmission, WorkflowEvent};
use super::engine::WorkflowError;
use super::matcher::CounterpartyDirectory;
use super::repository::{DocumentRepository, RepositoryError};
use super::service::{DocumentIntakeService, DocumentServiceError};

/// Router builder exposing the document workflow endpoints.
pub fn document_router<R, D>(service: Arc<DocumentIntakeService<R, D>>) -> Router
where
    R: DocumentRepository + 'static,
    D: CounterpartyDirectory + 'static,
{
    Router::new()
        .route("/api/v1/documents", post(ingest_handler::<R, D>))
        .route("/api/v1/documents/:document_id", get(status_handler::<R, D>))
        .route(
            "/api/v1/documents/:document_id/process",
            post(process_handler::<R, D>),
        )
        .route(
            "/api/v1/documents/:document_id/reprocess",
            post(reprocess_handler::<R, D>),
        )
        .route(
            "/api/v1/documents/:document_id/events",
            post(event_handler::<R, D>),
        )
        .route("/api/v1/readiness", get(readiness_handler::<R, D>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventRequest {
    event: WorkflowEvent,
    actor: String,
}

pub(crate) async fn ingest_handler<R, D>(
    State(service): State<Arc<DocumentIntakeService<R, D>>>,
    axum::Json(submission): axum::Json<DocumentSubmission>,
) -> Response
where
    R: DocumentRepository + 'static,
    D: CounterpartyDirectory + 'static,
{
    match service.ingest(submission) {
        Ok(document) => {
            (StatusCode::ACCEPTED, axum::Json(document.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, D>(
    State(service): State<Arc<DocumentIntakeService<R, D>>>,
    Path(document_id): Path<String>,
) -> Response
where
    R: DocumentRepository + 'static,
    D: CounterpartyDirectory + 'static,
{
    let id = DocumentId(document_id);
    match service.get(&id) {
        Ok(document) => (StatusCode::OK, axum::Json(document.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn process_handler<R, D>(
    State(service): State<Arc<DocumentIntakeService<R, D>>>,
    Path(document_id): Path<String>,
) -> Response
where
    R: DocumentRepository + 'static,
    D: CounterpartyDirectory + 'static,
{
    let id = DocumentId(document_id);
    match service.process(&id) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reprocess_handler<R, D>(
    State(service): State<Arc<DocumentIntakeService<R, D>>>,
    Path(document_id): Path<String>,
) -> Response
where
    R: DocumentRepository + 'static,
    D: CounterpartyDirectory + 'static,
{
    let id = DocumentId(document_id);
    match service.reprocess(&id) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn event_handler<R, D>(
    State(service): State<Arc<DocumentIntakeService<R, D>>>,
    Path(document_id): Path<String>,
    axum::Json(request): axum::Json<EventRequest>,
) -> Response
where
    R: DocumentRepository + 'static,
    D: CounterpartyDirectory + 'static,
{
    let id = DocumentId(document_id);
    match service.apply_event(&id, request.event, &request.actor) {
        Ok(document) => (StatusCode::OK, axum::Json(document.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn readiness_handler<R, D>(
    State(service): State<Arc<DocumentIntakeService<R, D>>>,
) -> Response
where
    R: DocumentRepository + 'static,
    D: CounterpartyDirectory + 'static,
{
    match service.readiness() {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: DocumentServiceError) -> Response {
    let status = match &error {
        DocumentServiceError::Workflow(WorkflowError::InvalidTransition { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DocumentServiceError::Workflow(WorkflowError::ConcurrentModification { .. }) => {
            StatusCode::CONFLICT
        }
        DocumentServiceError::Workflow(WorkflowError::UndefinedWorkflow(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DocumentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        DocumentServiceError::Repository(RepositoryError::AlreadyExists)
        | DocumentServiceError::Repository(RepositoryError::Conflict)
        | DocumentServiceError::BcReferenceConflict { .. } => StatusCode::CONFLICT,
        DocumentServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
