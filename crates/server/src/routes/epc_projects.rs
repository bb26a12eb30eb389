use std::str::FromStr;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, patch},
};
use db::models::epc_project::{
    CreateEpcProject, EpcProjectWithProgress, PhaseName, UpdateEpcProject, UpdatePhase,
};
use deployment::Deployment;
use services::services::{
    dashboard::{EpcDashboardStats, ProjectFilter},
    health_score::HealthAssessment,
    projects::{ProjectListQuery, ProjectPage},
    validation::ValidationError,
};
use utils::response::{ApiResponse, StatsResponse};
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    routes::stats_failure,
};

/// GET /api/epc/projects
pub async fn list_projects(
    State(deployment): State<DeploymentImpl>,
    ApiQuery(query): ApiQuery<ProjectListQuery>,
) -> Result<ResponseJson<ProjectPage>, ApiError> {
    let page = deployment.projects()?.list(&query).await?;
    Ok(ResponseJson(page))
}

/// POST /api/epc/projects
pub async fn create_project(
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<CreateEpcProject>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<EpcProjectWithProgress>>), ApiError> {
    let project = deployment.projects()?.create(payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(project))))
}

/// GET /api/epc/projects/{id}
pub async fn get_project(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<EpcProjectWithProgress>>, ApiError> {
    let project = deployment.projects()?.get(id).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// GET /api/epc/projects/{id}/health
pub async fn get_project_health(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<HealthAssessment>>, ApiError> {
    let health = deployment.projects()?.health(id).await?;
    Ok(ResponseJson(ApiResponse::success(health)))
}

/// PATCH /api/epc/projects/{id}
pub async fn update_project(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateEpcProject>,
) -> Result<ResponseJson<ApiResponse<EpcProjectWithProgress>>, ApiError> {
    let project = deployment.projects()?.update(id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// DELETE /api/epc/projects/{id}
pub async fn delete_project(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.projects()?.delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// PATCH /api/epc/projects/{id}/phases/{phase}
pub async fn update_phase(
    State(deployment): State<DeploymentImpl>,
    ApiPath((id, phase)): ApiPath<(Uuid, String)>,
    ApiJson(payload): ApiJson<UpdatePhase>,
) -> Result<ResponseJson<ApiResponse<EpcProjectWithProgress>>, ApiError> {
    let phase = PhaseName::from_str(&phase).map_err(|_| {
        ValidationError::new(
            "phase",
            format!("unknown phase '{phase}', expected engineering, procurement or construction"),
        )
    })?;
    let project = deployment
        .projects()?
        .update_phase(id, phase, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// GET /api/epc/dashboard
pub async fn get_epc_dashboard_stats(
    State(deployment): State<DeploymentImpl>,
    filter: Result<ApiQuery<ProjectFilter>, ApiError>,
) -> (StatusCode, ResponseJson<StatsResponse<EpcDashboardStats>>) {
    let ApiQuery(filter) = match filter {
        Ok(filter) => filter,
        Err(e) => return stats_failure(e),
    };
    let stats = match deployment.projects() {
        Ok(service) => service.dashboard_stats(&filter).await.map_err(ApiError::from),
        Err(e) => Err(e.into()),
    };
    match stats {
        Ok(stats) => (StatusCode::OK, ResponseJson(StatsResponse::ok(stats))),
        Err(e) => stats_failure(e),
    }
}

/// GET /api/epc/critical
pub async fn get_critical_projects(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<EpcProjectWithProgress>>>, ApiError> {
    let projects = deployment.projects()?.critical_projects().await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/epc",
        Router::new()
            .route("/projects", get(list_projects).post(create_project))
            .route(
                "/projects/{id}",
                get(get_project).patch(update_project).delete(delete_project),
            )
            .route("/projects/{id}/health", get(get_project_health))
            .route("/projects/{id}/phases/{phase}", patch(update_phase))
            .route("/dashboard", get(get_epc_dashboard_stats))
            .route("/critical", get(get_critical_projects)),
    )
}
