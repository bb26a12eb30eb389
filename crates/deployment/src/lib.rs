use async_trait::async_trait;
use db::store::Stores;
use services::services::{
    projects::EpcProjectService, remote_store::RemoteStoreError, sites::SiteService,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Remote(#[from] RemoteStoreError),
    #[error("Database not available")]
    Unavailable,
}

/// Everything a request handler needs, independent of where the data lives.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    /// `None` when neither SQLite nor the remote store is configured.
    fn stores(&self) -> Option<&Stores>;

    fn backend_name(&self) -> &'static str {
        self.stores().map_or("none", |s| s.backend.as_str())
    }

    fn require_stores(&self) -> Result<&Stores, DeploymentError> {
        self.stores().ok_or(DeploymentError::Unavailable)
    }

    fn projects(&self) -> Result<EpcProjectService, DeploymentError> {
        Ok(EpcProjectService::new(self.require_stores()?.clone()))
    }

    fn sites(&self) -> Result<SiteService, DeploymentError> {
        Ok(SiteService::new(self.require_stores()?.clone()))
    }
}
