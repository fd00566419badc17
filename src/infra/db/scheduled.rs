use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateScheduledPostParams, RepoError, ScheduledPostsRepo},
    domain::{
        categories::Category,
        entities::ScheduledPostRecord,
        types::{Recurrence, ScheduleStatus},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

const SCHEDULED_COLUMNS: &str = "id, topic, category, instructions, run_at, recurrence, \
    anchor_day, auto_publish, status, article_id, last_error, created_by, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ScheduledPostRow {
    id: Uuid,
    topic: String,
    category: Category,
    instructions: Option<String>,
    run_at: OffsetDateTime,
    recurrence: Recurrence,
    anchor_day: i16,
    auto_publish: bool,
    status: ScheduleStatus,
    article_id: Option<Uuid>,
    last_error: Option<String>,
    created_by: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ScheduledPostRow> for ScheduledPostRecord {
    fn from(row: ScheduledPostRow) -> Self {
        Self {
            id: row.id,
            topic: row.topic,
            category: row.category,
            instructions: row.instructions,
            run_at: row.run_at,
            recurrence: row.recurrence,
            anchor_day: u8::try_from(row.anchor_day).unwrap_or_else(|_| row.run_at.day()),
            auto_publish: row.auto_publish,
            status: row.status,
            article_id: row.article_id,
            last_error: row.last_error,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ScheduledPostsRepo for PostgresRepositories {
    async fn create_scheduled(
        &self,
        params: CreateScheduledPostParams,
    ) -> Result<ScheduledPostRecord, RepoError> {
        let sql = format!(
            "INSERT INTO scheduled_posts \
             (id, topic, category, instructions, run_at, recurrence, anchor_day, auto_publish, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {SCHEDULED_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ScheduledPostRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.topic)
            .bind(params.category)
            .bind(params.instructions)
            .bind(params.run_at)
            .bind(params.recurrence)
            .bind(i16::from(params.anchor_day))
            .bind(params.auto_publish)
            .bind(params.created_by)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_scheduled(&self, id: Uuid) -> Result<Option<ScheduledPostRecord>, RepoError> {
        let sql = format!("SELECT {SCHEDULED_COLUMNS} FROM scheduled_posts WHERE id = $1");
        let row = sqlx::query_as::<_, ScheduledPostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ScheduledPostRecord::from))
    }

    async fn list_scheduled(
        &self,
        status: Option<ScheduleStatus>,
    ) -> Result<Vec<ScheduledPostRecord>, RepoError> {
        let sql = format!(
            "SELECT {SCHEDULED_COLUMNS} FROM scheduled_posts \
             WHERE ($1::schedule_status IS NULL OR status = $1) \
             ORDER BY run_at ASC, created_at ASC"
        );
        let rows = sqlx::query_as::<_, ScheduledPostRow>(&sql)
            .bind(status)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ScheduledPostRecord::from).collect())
    }

    async fn claim_due(
        &self,
        now: OffsetDateTime,
        stale_before: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<ScheduledPostRecord>, RepoError> {
        let sql = format!(
            "UPDATE scheduled_posts SET status = 'running', updated_at = now() \
             WHERE id IN ( \
                 SELECT id FROM scheduled_posts \
                 WHERE (status = 'pending' AND run_at <= $1) \
                    OR (status = 'running' AND updated_at < $3) \
                 ORDER BY run_at ASC \
                 LIMIT $2 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {SCHEDULED_COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, ScheduledPostRow>(&sql)
            .bind(now)
            .bind(i64::from(limit))
            .bind(stale_before)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        rows.sort_by_key(|row| row.run_at);
        Ok(rows.into_iter().map(ScheduledPostRecord::from).collect())
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        article_id: Uuid,
    ) -> Result<ScheduledPostRecord, RepoError> {
        let sql = format!(
            "UPDATE scheduled_posts \
             SET status = 'completed', article_id = $2, last_error = NULL, updated_at = now() \
             WHERE id = $1 \
             RETURNING {SCHEDULED_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ScheduledPostRow>(&sql)
            .bind(id)
            .bind(article_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<ScheduledPostRecord, RepoError> {
        let sql = format!(
            "UPDATE scheduled_posts \
             SET status = 'failed', last_error = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {SCHEDULED_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ScheduledPostRow>(&sql)
            .bind(id)
            .bind(error)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn cancel_scheduled(
        &self,
        id: Uuid,
    ) -> Result<Option<ScheduledPostRecord>, RepoError> {
        let sql = format!(
            "UPDATE scheduled_posts SET status = 'cancelled', updated_at = now() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {SCHEDULED_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ScheduledPostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Some(row.into())),
            None => match self.find_scheduled(id).await? {
                Some(_) => Ok(None),
                None => Err(RepoError::NotFound),
            },
        }
    }
}
