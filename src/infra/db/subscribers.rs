use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, SubscribersRepo},
    domain::entities::SubscriberRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const SUBSCRIBER_COLUMNS: &str = "id, email, active, created_at, unsubscribed_at";

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    active: bool,
    created_at: OffsetDateTime,
    unsubscribed_at: Option<OffsetDateTime>,
}

impl From<SubscriberRow> for SubscriberRecord {
    fn from(row: SubscriberRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            active: row.active,
            created_at: row.created_at,
            unsubscribed_at: row.unsubscribed_at,
        }
    }
}

#[async_trait]
impl SubscribersRepo for PostgresRepositories {
    async fn find_by_email(&self, email: &str) -> Result<Option<SubscriberRecord>, RepoError> {
        let sql = format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE email = $1");
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(SubscriberRecord::from))
    }

    async fn create_subscriber(&self, email: &str) -> Result<SubscriberRecord, RepoError> {
        let sql = format!(
            "INSERT INTO subscribers (id, email) VALUES ($1, $2) RETURNING {SUBSCRIBER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn set_active(
        &self,
        id: Uuid,
        active: bool,
        at: OffsetDateTime,
    ) -> Result<SubscriberRecord, RepoError> {
        let sql = format!(
            "UPDATE subscribers \
             SET active = $2, unsubscribed_at = CASE WHEN $2 THEN NULL ELSE $3 END \
             WHERE id = $1 \
             RETURNING {SUBSCRIBER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(id)
            .bind(active)
            .bind(at)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn list_subscribers(
        &self,
        active_only: bool,
    ) -> Result<Vec<SubscriberRecord>, RepoError> {
        let sql = format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers \
             WHERE active OR NOT $1 \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(active_only)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(SubscriberRecord::from).collect())
    }

    async fn count_active(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers WHERE active")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }
}
