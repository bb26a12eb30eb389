//! Storage capability shared by every persistence backend.
//!
//! Business logic is written once against [`EntityStore`]; each backend only
//! supplies an adapter.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    energy_production::EnergyProduction, epc_project::EpcProject, railway_site::RailwaySite,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: &'static str, id: Uuid },
    #[error("remote store error: {0}")]
    Remote(String),
    #[error("document error: {0}")]
    Document(String),
}

/// Something that can be persisted by an [`EntityStore`].
pub trait Entity: Clone + Send + Sync + 'static {
    /// Singular, human readable name used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> Uuid;
}

impl Entity for EpcProject {
    const KIND: &'static str = "project";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for RailwaySite {
    const KIND: &'static str = "site";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for EnergyProduction {
    const KIND: &'static str = "energy production record";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    async fn create(&self, entity: &E) -> Result<E, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<E>, StoreError>;

    /// Replace the stored entity. Fails with [`StoreError::NotFound`] when it
    /// does not exist.
    async fn update(&self, entity: &E) -> Result<E, StoreError>;

    /// Returns whether anything was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// The whole collection in natural (insertion) order.
    async fn list(&self) -> Result<Vec<E>, StoreError>;
}

#[async_trait]
pub trait EnergyProductionStore: EntityStore<EnergyProduction> {
    async fn list_by_site(&self, site_id: Uuid) -> Result<Vec<EnergyProduction>, StoreError>;

    /// Cleanup call used after a site is deleted. Returns the rows removed.
    async fn delete_by_site(&self, site_id: Uuid) -> Result<u64, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    Remote,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Remote => "remote",
        }
    }
}

/// One store per entity, all backed by the same backend.
#[derive(Clone)]
pub struct Stores {
    pub backend: BackendKind,
    pub projects: Arc<dyn EntityStore<EpcProject>>,
    pub sites: Arc<dyn EntityStore<RailwaySite>>,
    pub production: Arc<dyn EnergyProductionStore>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
