use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{KeywordsRepo, RepoError},
    domain::entities::KeywordRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct KeywordRow {
    id: Uuid,
    keyword: String,
    created_at: OffsetDateTime,
}

impl From<KeywordRow> for KeywordRecord {
    fn from(row: KeywordRow) -> Self {
        Self {
            id: row.id,
            keyword: row.keyword,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl KeywordsRepo for PostgresRepositories {
    async fn list_keywords(&self) -> Result<Vec<KeywordRecord>, RepoError> {
        let rows = sqlx::query_as::<_, KeywordRow>(
            "SELECT id, keyword, created_at FROM monitor_keywords ORDER BY keyword ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(KeywordRecord::from).collect())
    }

    async fn add_keyword(&self, keyword: &str) -> Result<KeywordRecord, RepoError> {
        let row = sqlx::query_as::<_, KeywordRow>(
            "INSERT INTO monitor_keywords (id, keyword) VALUES ($1, $2) \
             RETURNING id, keyword, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(keyword)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn remove_keyword(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM monitor_keywords WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn replace_keywords(
        &self,
        keywords: &[String],
    ) -> Result<Vec<KeywordRecord>, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM monitor_keywords")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        for keyword in keywords {
            sqlx::query("INSERT INTO monitor_keywords (id, keyword) VALUES ($1, $2)")
                .bind(Uuid::new_v4())
                .bind(keyword)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        self.list_keywords().await
    }
}
