use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    DBService,
    models::{
        energy_production::EnergyProduction, epc_project::EpcProject, railway_site::RailwaySite,
    },
    store::{BackendKind, Entity, EnergyProductionStore, EntityStore, StoreError, Stores},
};

/// [`EntityStore`] adapter over the local SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn stores(db: &DBService) -> Stores {
        let store = Arc::new(Self::new(db.pool.clone()));
        Stores {
            backend: BackendKind::Sqlite,
            projects: store.clone(),
            sites: store.clone(),
            production: store,
        }
    }
}

fn not_found<E: Entity>(id: Uuid) -> StoreError {
    StoreError::NotFound { kind: E::KIND, id }
}

/// Primary-key collisions surface as `AlreadyExists` so callers such as the
/// seeder can treat them as "nothing to do".
fn map_insert_error<E: Entity>(id: Uuid, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::AlreadyExists { kind: E::KIND, id }
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl EntityStore<EpcProject> for SqliteStore {
    async fn create(&self, entity: &EpcProject) -> Result<EpcProject, StoreError> {
        EpcProject::create(&self.pool, entity)
            .await
            .map_err(|e| map_insert_error::<EpcProject>(entity.id, e))
    }

    async fn get(&self, id: Uuid) -> Result<Option<EpcProject>, StoreError> {
        Ok(EpcProject::find_by_id(&self.pool, id).await?)
    }

    async fn update(&self, entity: &EpcProject) -> Result<EpcProject, StoreError> {
        EpcProject::update(&self.pool, entity)
            .await?
            .ok_or_else(|| not_found::<EpcProject>(entity.id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(EpcProject::delete(&self.pool, id).await? > 0)
    }

    async fn list(&self) -> Result<Vec<EpcProject>, StoreError> {
        Ok(EpcProject::find_all(&self.pool).await?)
    }
}

#[async_trait]
impl EntityStore<RailwaySite> for SqliteStore {
    async fn create(&self, entity: &RailwaySite) -> Result<RailwaySite, StoreError> {
        RailwaySite::create(&self.pool, entity)
            .await
            .map_err(|e| map_insert_error::<RailwaySite>(entity.id, e))
    }

    async fn get(&self, id: Uuid) -> Result<Option<RailwaySite>, StoreError> {
        Ok(RailwaySite::find_by_id(&self.pool, id).await?)
    }

    async fn update(&self, entity: &RailwaySite) -> Result<RailwaySite, StoreError> {
        RailwaySite::update(&self.pool, entity)
            .await?
            .ok_or_else(|| not_found::<RailwaySite>(entity.id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(RailwaySite::delete(&self.pool, id).await? > 0)
    }

    async fn list(&self) -> Result<Vec<RailwaySite>, StoreError> {
        Ok(RailwaySite::find_all(&self.pool).await?)
    }
}

#[async_trait]
impl EntityStore<EnergyProduction> for SqliteStore {
    async fn create(&self, entity: &EnergyProduction) -> Result<EnergyProduction, StoreError> {
        EnergyProduction::create(&self.pool, entity)
            .await
            .map_err(|e| map_insert_error::<EnergyProduction>(entity.id, e))
    }

    async fn get(&self, id: Uuid) -> Result<Option<EnergyProduction>, StoreError> {
        Ok(EnergyProduction::find_by_id(&self.pool, id).await?)
    }

    async fn update(&self, entity: &EnergyProduction) -> Result<EnergyProduction, StoreError> {
        EnergyProduction::update(&self.pool, entity)
            .await?
            .ok_or_else(|| not_found::<EnergyProduction>(entity.id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(EnergyProduction::delete(&self.pool, id).await? > 0)
    }

    async fn list(&self) -> Result<Vec<EnergyProduction>, StoreError> {
        Ok(EnergyProduction::find_all(&self.pool).await?)
    }
}

#[async_trait]
impl EnergyProductionStore for SqliteStore {
    async fn list_by_site(&self, site_id: Uuid) -> Result<Vec<EnergyProduction>, StoreError> {
        Ok(EnergyProduction::find_by_site_id(&self.pool, site_id).await?)
    }

    async fn delete_by_site(&self, site_id: Uuid) -> Result<u64, StoreError> {
        Ok(EnergyProduction::delete_by_site_id(&self.pool, site_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{epc_project::tests::sample_project, railway_site::tests::sample_site};

    #[tokio::test]
    async fn duplicate_create_reports_already_exists() {
        let db = DBService::new_in_memory().await.unwrap();
        let stores = SqliteStore::stores(&db);
        let site = sample_site("Howrah", "Eastern", 120.0);

        stores.sites.create(&site).await.unwrap();
        let err = stores.sites.create(&site).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { kind: "site", .. }));
    }

    #[tokio::test]
    async fn update_missing_entity_is_not_found() {
        let db = DBService::new_in_memory().await.unwrap();
        let stores = SqliteStore::stores(&db);
        let project = sample_project("Ghost");

        let err = stores.projects.update(&project).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "project", id } if id == project.id));
        assert!(!stores.projects.delete(project.id).await.unwrap());
    }

    #[tokio::test]
    async fn list_keeps_insertion_order() {
        let db = DBService::new_in_memory().await.unwrap();
        let stores = SqliteStore::stores(&db);
        for name in ["first", "second", "third"] {
            stores.projects.create(&sample_project(name)).await.unwrap();
        }
        let names: Vec<String> = stores
            .projects
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.project_name)
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }
}
