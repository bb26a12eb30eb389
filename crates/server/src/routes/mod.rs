use axum::{Router, http::StatusCode, response::Json as ResponseJson};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utils::response::StatsResponse;

use crate::{DeploymentImpl, error::ApiError};

pub mod dashboard;
pub mod epc_projects;
pub mod health;
pub mod sites;

/// Stats endpoints always answer with the `{success: false, error}` envelope,
/// never with the typed error body.
pub(crate) fn stats_failure<T>(err: ApiError) -> (StatusCode, ResponseJson<StatsResponse<T>>) {
    let (status, kind) = err.status_and_kind();
    if status.is_server_error() {
        tracing::error!(error = %err, kind, "stats request failed");
    }
    (status, ResponseJson(StatsResponse::failed(err.to_string())))
}

pub fn router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .merge(health::router(&deployment))
        .merge(epc_projects::router(&deployment))
        .merge(sites::router(&deployment))
        .merge(dashboard::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(deployment)
}
