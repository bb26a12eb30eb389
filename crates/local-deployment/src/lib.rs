use async_trait::async_trait;
use db::{DBService, sqlite_store::SqliteStore, store::{BackendKind, Stores}};
use deployment::{Deployment, DeploymentError};
use services::services::{config::StorageConfig, remote_store::remote_stores};
use tracing::{info, warn};

#[derive(Clone)]
pub struct LocalDeployment {
    db: Option<DBService>,
    stores: Option<Stores>,
}

impl LocalDeployment {
    /// Connect to whichever backend `config` selects.
    pub async fn from_config(config: StorageConfig) -> Result<Self, DeploymentError> {
        let mut db = None;
        let stores = match config.selected_backend() {
            Some(BackendKind::Sqlite) => {
                let url = config.database_url.as_deref().unwrap_or_default();
                let service = DBService::new(url).await?;
                let stores = SqliteStore::stores(&service);
                db = Some(service);
                Some(stores)
            }
            Some(BackendKind::Remote) => match &config.remote {
                Some(remote) => Some(remote_stores(remote)?),
                None => None,
            },
            None => {
                warn!("No DATABASE_URL or BAAS_* configuration found; data endpoints will report the database as unavailable");
                None
            }
        };

        if let Some(stores) = &stores {
            info!(backend = stores.backend.as_str(), "Storage backend ready");
        }
        Ok(Self { db, stores })
    }

    /// Deployment over already built stores.
    pub fn with_stores(stores: Stores) -> Self {
        Self {
            db: None,
            stores: Some(stores),
        }
    }

    /// Deployment with no backend at all.
    pub fn unavailable() -> Self {
        Self {
            db: None,
            stores: None,
        }
    }

    /// The SQLite database when it is the active backend.
    pub fn db(&self) -> Option<&DBService> {
        self.db.as_ref()
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        Self::from_config(StorageConfig::from_env()).await
    }

    fn stores(&self) -> Option<&Stores> {
        self.stores.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_config_has_no_backend() {
        let deployment = LocalDeployment::from_config(StorageConfig::default())
            .await
            .unwrap();
        assert_eq!(deployment.backend_name(), "none");
        assert!(matches!(deployment.projects(), Err(DeploymentError::Unavailable)));
    }

    #[tokio::test]
    async fn database_url_opens_sqlite() {
        let config = StorageConfig {
            database_url: Some("sqlite::memory:".into()),
            remote: None,
        };
        let deployment = LocalDeployment::from_config(config).await.unwrap();
        assert_eq!(deployment.backend_name(), "sqlite");
        assert!(deployment.db().is_some());
        assert!(deployment.sites().is_ok());
    }
}
