//! JSON document store used when Postgres is not configured or unreachable.
//!
//! Each collection lives in its own file under the data directory and is
//! rewritten in full (temp file + rename) after every mutation.

mod repos;

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    application::repos::RepoError,
    domain::entities::{
        ArticleRecord, KeywordRecord, ScheduledPostRecord, SubscriberRecord, UserRecord,
    },
    infra::error::InfraError,
};

const ARTICLES_FILE: &str = "articles.json";
const USERS_FILE: &str = "users.json";
const SUBSCRIBERS_FILE: &str = "subscribers.json";
const SCHEDULED_FILE: &str = "scheduled_posts.json";
const KEYWORDS_FILE: &str = "keywords.json";

#[derive(Debug, Default)]
struct Collections {
    articles: Vec<ArticleRecord>,
    users: Vec<UserRecord>,
    subscribers: Vec<SubscriberRecord>,
    scheduled: Vec<ScheduledPostRecord>,
    keywords: Vec<KeywordRecord>,
}

pub struct FileStore {
    dir: PathBuf,
    state: RwLock<Collections>,
}

impl FileStore {
    /// Open (or initialise) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, InfraError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let collections = Collections {
            articles: load_collection(&dir, ARTICLES_FILE).await?,
            users: load_collection(&dir, USERS_FILE).await?,
            subscribers: load_collection(&dir, SUBSCRIBERS_FILE).await?,
            scheduled: load_collection(&dir, SCHEDULED_FILE).await?,
            keywords: load_collection(&dir, KEYWORDS_FILE).await?,
        };

        info!(
            target = "peoples_thread::infra::fs",
            dir = %dir.display(),
            articles = collections.articles.len(),
            users = collections.users.len(),
            "file store opened"
        );

        Ok(Self {
            dir,
            state: RwLock::new(collections),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The data directory is writable.
    pub async fn health_check(&self) -> Result<(), InfraError> {
        let metadata = tokio::fs::metadata(&self.dir).await?;
        if metadata.permissions().readonly() {
            return Err(InfraError::file_store(format!(
                "data directory `{}` is read-only",
                self.dir.display()
            )));
        }
        Ok(())
    }

    async fn persist<T: Serialize>(&self, file: &'static str, items: &[T]) -> Result<(), RepoError> {
        let bytes = serde_json::to_vec_pretty(items).map_err(RepoError::from_persistence)?;
        let target = self.dir.join(file);
        let temp = self.dir.join(format!(".{file}.tmp"));

        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(RepoError::from_persistence)?;
        tokio::fs::rename(&temp, &target)
            .await
            .map_err(RepoError::from_persistence)?;

        debug!(
            target = "peoples_thread::infra::fs",
            file,
            records = items.len(),
            "collection written"
        );
        Ok(())
    }
}

async fn load_collection<T: DeserializeOwned>(
    dir: &Path,
    file: &'static str,
) -> Result<Vec<T>, InfraError> {
    let path = dir.join(file);
    match tokio::fs::read(&path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
            InfraError::file_store(format!("failed to parse `{}`: {err}", path.display()))
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}
