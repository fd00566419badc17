//! Backend selection: Postgres when reachable, the JSON file store otherwise.

use std::{fmt, sync::Arc};

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    application::repos::{ArticlesRepo, KeywordsRepo, ScheduledPostsRepo, SubscribersRepo, UsersRepo},
    config::{DatabaseSettings, StorageSettings},
    infra::{db::PostgresRepositories, error::InfraError, fs::FileStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Postgres,
    File,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => f.write_str("postgres"),
            Self::File => f.write_str("file"),
        }
    }
}

#[derive(Clone)]
enum Backend {
    Postgres(Arc<PostgresRepositories>),
    File(Arc<FileStore>),
}

/// Repository handles shared by every service, independent of the backend.
#[derive(Clone)]
pub struct Repositories {
    pub articles: Arc<dyn ArticlesRepo>,
    pub users: Arc<dyn UsersRepo>,
    pub subscribers: Arc<dyn SubscribersRepo>,
    pub scheduled: Arc<dyn ScheduledPostsRepo>,
    pub keywords: Arc<dyn KeywordsRepo>,
    backend: Backend,
}

impl Repositories {
    pub fn postgres(repos: PostgresRepositories) -> Self {
        let repos = Arc::new(repos);
        Self {
            articles: repos.clone(),
            users: repos.clone(),
            subscribers: repos.clone(),
            scheduled: repos.clone(),
            keywords: repos.clone(),
            backend: Backend::Postgres(repos),
        }
    }

    pub fn file(store: FileStore) -> Self {
        let store = Arc::new(store);
        Self {
            articles: store.clone(),
            users: store.clone(),
            subscribers: store.clone(),
            scheduled: store.clone(),
            keywords: store.clone(),
            backend: Backend::File(store),
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self.backend {
            Backend::Postgres(_) => StorageKind::Postgres,
            Backend::File(_) => StorageKind::File,
        }
    }

    pub async fn health_check(&self) -> Result<(), InfraError> {
        match &self.backend {
            Backend::Postgres(repos) => repos
                .health_check()
                .await
                .map_err(|err| InfraError::database(err.to_string())),
            Backend::File(store) => store.health_check().await,
        }
    }
}

/// Connect to Postgres when configured, falling back to the file store.
pub async fn open(
    database: &DatabaseSettings,
    storage: &StorageSettings,
) -> Result<Repositories, InfraError> {
    if let Some(url) = database.url.as_deref() {
        match connect_postgres(url, database).await {
            Ok(repos) => {
                info!(
                    target = "peoples_thread::infra::store",
                    backend = %StorageKind::Postgres,
                    "storage ready"
                );
                return Ok(Repositories::postgres(repos));
            }
            Err(err) => {
                warn!(
                    target = "peoples_thread::infra::store",
                    error = %err,
                    data_dir = %storage.data_dir.display(),
                    "database unavailable, falling back to file store"
                );
            }
        }
    } else {
        info!(
            target = "peoples_thread::infra::store",
            data_dir = %storage.data_dir.display(),
            "no database configured, using file store"
        );
    }

    let store = FileStore::open(&storage.data_dir).await?;
    Ok(Repositories::file(store))
}

/// Connect and migrate; used by `open` and by the `migrate` command.
pub async fn connect_postgres(
    url: &str,
    database: &DatabaseSettings,
) -> Result<PostgresRepositories, InfraError> {
    let connect = PostgresRepositories::connect(
        url,
        database.max_connections.get(),
        database.connect_timeout,
    );
    let pool = tokio::time::timeout(database.connect_timeout, connect)
        .await
        .map_err(|_| {
            InfraError::database(format!(
                "connection timed out after {}s",
                database.connect_timeout.as_secs()
            ))
        })?
        .map_err(|err| InfraError::database(err.to_string()))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(format!("migrations failed: {err}")))?;

    Ok(PostgresRepositories::new(pool))
}

#[cfg(test)]
mod tests {
    use std::{num::NonZeroU32, time::Duration};

    use super::*;

    #[tokio::test]
    async fn falls_back_to_file_store_without_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let database = DatabaseSettings {
            url: None,
            max_connections: NonZeroU32::new(1).expect("non-zero"),
            connect_timeout: Duration::from_secs(1),
        };
        let storage = StorageSettings {
            data_dir: dir.path().join("store"),
        };

        let repos = open(&database, &storage).await.expect("storage");
        assert_eq!(repos.kind(), StorageKind::File);
        repos.health_check().await.expect("healthy");
    }

    #[tokio::test]
    async fn unreachable_database_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let database = DatabaseSettings {
            url: Some("postgres://nobody@127.0.0.1:1/none".to_string()),
            max_connections: NonZeroU32::new(1).expect("non-zero"),
            connect_timeout: Duration::from_millis(500),
        };
        let storage = StorageSettings {
            data_dir: dir.path().to_path_buf(),
        };

        let repos = open(&database, &storage).await.expect("storage");
        assert_eq!(repos.kind(), StorageKind::File);
    }
}
