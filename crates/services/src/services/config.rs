//! Storage backend selection from the process environment.

use db::store::BackendKind;
use secrecy::SecretString;
use utils::env::env_non_empty;

pub const DEFAULT_SITES_COLLECTION: &str = "sites";
pub const DEFAULT_PROJECTS_COLLECTION: &str = "epc_projects";
pub const DEFAULT_PRODUCTION_COLLECTION: &str = "energy_production";

/// Connection settings for the remote backend-as-a-service document store.
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub api_key: SecretString,
    pub sites_collection: String,
    pub projects_collection: String,
    pub production_collection: String,
}

#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub database_url: Option<String>,
    pub remote: Option<RemoteStoreConfig>,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_non_empty)
    }

    /// Build the configuration from an arbitrary variable lookup. Blank values
    /// must already be filtered out by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let remote = match (
            lookup("BAAS_ENDPOINT"),
            lookup("BAAS_PROJECT_ID"),
            lookup("BAAS_DATABASE_ID"),
            lookup("BAAS_API_KEY"),
        ) {
            (Some(endpoint), Some(project_id), Some(database_id), Some(api_key)) => {
                Some(RemoteStoreConfig {
                    endpoint: endpoint.trim_end_matches('/').to_string(),
                    project_id,
                    database_id,
                    api_key: SecretString::from(api_key),
                    sites_collection: lookup("BAAS_SITES_COLLECTION")
                        .unwrap_or_else(|| DEFAULT_SITES_COLLECTION.to_string()),
                    projects_collection: lookup("BAAS_PROJECTS_COLLECTION")
                        .unwrap_or_else(|| DEFAULT_PROJECTS_COLLECTION.to_string()),
                    production_collection: lookup("BAAS_PRODUCTION_COLLECTION")
                        .unwrap_or_else(|| DEFAULT_PRODUCTION_COLLECTION.to_string()),
                })
            }
            _ => None,
        };

        Self {
            database_url: lookup("DATABASE_URL"),
            remote,
        }
    }

    /// SQLite wins whenever `DATABASE_URL` is set; the remote store is only
    /// used as the sole configured backend. `None` means no backend at all.
    pub fn selected_backend(&self) -> Option<BackendKind> {
        if self.database_url.is_some() {
            Some(BackendKind::Sqlite)
        } else if self.remote.is_some() {
            Some(BackendKind::Remote)
        } else {
            None
        }
    }
}
