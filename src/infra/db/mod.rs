//! Postgres-backed repository implementations.

mod articles;
mod keywords;
mod scheduled;
mod subscribers;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::{sync::Arc, time::Duration};

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{ArticleQueryFilter, RepoError};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn apply_article_filter<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        filter: &'q ArticleQueryFilter,
    ) {
        if let Some(status) = filter.status {
            qb.push(" AND a.status = ");
            qb.push_bind(status);
        }

        if let Some(category) = filter.category {
            qb.push(" AND a.category = ");
            qb.push_bind(category);
        }

        if let Some(tag) = filter.tag.as_ref() {
            qb.push(" AND ");
            qb.push_bind(tag.to_lowercase());
            qb.push(" = ANY(a.tags)");
        }

        if let Some(featured) = filter.featured {
            qb.push(" AND a.featured = ");
            qb.push_bind(featured);
        }

        if let Some(breaking) = filter.breaking {
            qb.push(" AND a.breaking = ");
            qb.push_bind(breaking);
        }

        if let Some(ai_generated) = filter.ai_generated {
            qb.push(" AND a.ai_generated = ");
            qb.push_bind(ai_generated);
        }

        if let Some(search) = filter.search.as_ref() {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (a.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(r" ESCAPE '\' OR a.excerpt ILIKE ");
            qb.push_bind(pattern);
            qb.push(r" ESCAPE '\')");
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

/// Escape `LIKE` wildcards so search text matches literally under `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("wage"), "wage");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
    }
}
