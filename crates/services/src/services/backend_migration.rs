//! One-shot copy of every entity from one backend to another.

use db::store::{Entity, EntityStore, StoreError, Stores};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("source and target use the same backend ({0})")]
    SameBackend(&'static str),
    #[error("reading {kind} from source: {source}")]
    Read {
        kind: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("writing {kind} to target: {source}")]
    Write {
        kind: &'static str,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub copied: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub sites: CollectionReport,
    pub projects: CollectionReport,
    pub production: CollectionReport,
}

/// Progress notification: which collection, how many processed, how many in
/// total.
#[derive(Debug, Clone, Copy)]
pub struct MigrationProgress {
    pub kind: &'static str,
    pub done: usize,
    pub total: usize,
}

async fn copy_collection<E, F>(
    source: &dyn EntityStore<E>,
    target: &dyn EntityStore<E>,
    on_progress: &mut F,
) -> Result<CollectionReport, MigrationError>
where
    E: Entity,
    F: FnMut(MigrationProgress),
{
    let read = |source| MigrationError::Read { kind: E::KIND, source };
    let write = |source| MigrationError::Write { kind: E::KIND, source };

    let entities = source.list().await.map_err(read)?;
    let total = entities.len();
    let mut report = CollectionReport::default();
    on_progress(MigrationProgress {
        kind: E::KIND,
        done: 0,
        total,
    });

    for (i, entity) in entities.into_iter().enumerate() {
        let exists = target.get(entity.id()).await.map_err(write)?.is_some();
        if exists {
            report.skipped += 1;
        } else {
            match target.create(&entity).await {
                Ok(_) => report.copied += 1,
                Err(StoreError::AlreadyExists { .. }) => report.skipped += 1,
                Err(e) => return Err(write(e)),
            }
        }
        on_progress(MigrationProgress {
            kind: E::KIND,
            done: i + 1,
            total,
        });
    }

    if report.skipped > 0 {
        warn!(kind = E::KIND, skipped = report.skipped, "Existing records left untouched");
    }
    Ok(report)
}

/// Copy sites, then projects, then production rows. Records whose id already
/// exists in `target` are skipped, so an interrupted run can be repeated.
pub async fn migrate<F>(
    source: &Stores,
    target: &Stores,
    mut on_progress: F,
) -> Result<MigrationReport, MigrationError>
where
    F: FnMut(MigrationProgress),
{
    if source.backend == target.backend {
        return Err(MigrationError::SameBackend(source.backend.as_str()));
    }
    info!(
        from = source.backend.as_str(),
        to = target.backend.as_str(),
        "Starting backend migration"
    );

    let report = MigrationReport {
        sites: copy_collection(source.sites.as_ref(), target.sites.as_ref(), &mut on_progress)
            .await?,
        projects: copy_collection(
            source.projects.as_ref(),
            target.projects.as_ref(),
            &mut on_progress,
        )
        .await?,
        production: copy_collection(
            source.production.as_ref(),
            target.production.as_ref(),
            &mut on_progress,
        )
        .await?,
    };

    info!(?report, "Backend migration finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use db::{DBService, sqlite_store::SqliteStore, store::BackendKind};

    use super::*;
    use crate::services::seed::seed;

    async fn sqlite_stores() -> Stores {
        SqliteStore::stores(&DBService::new_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn copies_then_skips_on_rerun() {
        let source = sqlite_stores().await;
        seed(&source).await.unwrap();
        let mut target = sqlite_stores().await;
        // a second SQLite database stands in for the remote store
        target.backend = BackendKind::Remote;

        let mut events = Vec::new();
        let first = migrate(&source, &target, |p| events.push((p.kind, p.done, p.total)))
            .await
            .unwrap();
        assert_eq!(first.sites.copied, 5);
        assert_eq!(first.projects.copied, 4);
        assert_eq!(first.production, CollectionReport::default());
        assert_eq!(events.first(), Some(&("site", 0, 5)));
        assert_eq!(target.sites.list().await.unwrap().len(), 5);

        let second = migrate(&source, &target, |_| {}).await.unwrap();
        assert_eq!(second.sites.copied, 0);
        assert_eq!(second.sites.skipped, 5);
        assert_eq!(second.projects.skipped, 4);
    }

    #[tokio::test]
    async fn refuses_same_backend() {
        let stores = sqlite_stores().await;
        let err = migrate(&stores, &stores, |_| {}).await.unwrap_err();
        assert!(matches!(err, MigrationError::SameBackend("sqlite")));
    }
}
