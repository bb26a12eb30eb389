use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::store::StoreError;
use deployment::DeploymentError;
use services::services::{
    projects::ProjectServiceError, sites::SiteServiceError, validation::ValidationError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Project(#[from] ProjectServiceError),
    #[error(transparent)]
    Site(#[from] SiteServiceError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

fn store_status(err: &StoreError) -> (StatusCode, &'static str) {
    match err {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        StoreError::AlreadyExists { .. } => (StatusCode::CONFLICT, "conflict"),
        StoreError::Remote(_) | StoreError::Document(_) => (StatusCode::BAD_GATEWAY, "remote"),
        StoreError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database"),
    }
}

fn deployment_status(err: &DeploymentError) -> (StatusCode, &'static str) {
    match err {
        DeploymentError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        DeploymentError::Remote(_) => (StatusCode::BAD_GATEWAY, "remote"),
        DeploymentError::Sqlx(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database"),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ValidationError::new("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(ValidationError::new("query", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(ValidationError::new("path", rejection.body_text()))
    }
}

impl ApiError {
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_)
            | ApiError::Project(ProjectServiceError::Validation(_))
            | ApiError::Site(SiteServiceError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "validation")
            }
            ApiError::Project(ProjectServiceError::NotFound(_))
            | ApiError::Site(SiteServiceError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Project(ProjectServiceError::Store(e))
            | ApiError::Site(SiteServiceError::Store(e)) => store_status(e),
            ApiError::Deployment(e) => deployment_status(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %self, kind, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self, kind, status = status.as_u16(), "request rejected");
        }

        let response = ApiResponse::<()>::error_with_kind(message, kind);
        (status, Json(response)).into_response()
    }
}
