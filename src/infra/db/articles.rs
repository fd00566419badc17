use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::{
        pagination::{Page, PageRequest},
        repos::{
            ArticleQueryFilter, ArticleStats, ArticlesRepo, CategoryCount, CreateArticleParams,
            RepoError, TagCount, TopArticle, UpdateArticleParams,
        },
    },
    domain::{categories::Category, entities::ArticleRecord, types::ArticleStatus},
};

use super::{PostgresRepositories, map_sqlx_error};

const ARTICLE_COLUMNS: &str = "a.id, a.slug, a.title, a.excerpt, a.body, a.category, a.tags, \
    a.author, a.status, a.featured, a.breaking, a.view_count, a.ai_generated, a.source_url, \
    a.source_title, a.published_at, a.created_at, a.updated_at";

const ARTICLE_ORDER: &str = " ORDER BY a.published_at DESC NULLS LAST, a.created_at DESC, a.id";

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: Uuid,
    slug: String,
    title: String,
    excerpt: String,
    body: String,
    category: Category,
    tags: Vec<String>,
    author: String,
    status: ArticleStatus,
    featured: bool,
    breaking: bool,
    view_count: i64,
    ai_generated: bool,
    source_url: Option<String>,
    source_title: Option<String>,
    published_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            body: row.body,
            category: row.category,
            tags: row.tags,
            author: row.author,
            status: row.status,
            featured: row.featured,
            breaking: row.breaking,
            view_count: row.view_count,
            ai_generated: row.ai_generated,
            source_url: row.source_url,
            source_title: row.source_title,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    async fn fetch_article_where(
        &self,
        column: &'static str,
        build: impl FnOnce(&mut QueryBuilder<'_, Postgres>),
    ) -> Result<Option<ArticleRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a WHERE a.{column} = "
        ));
        build(&mut qb);
        let row = qb
            .build_query_as::<ArticleRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ArticleRecord::from))
    }
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn list_articles(
        &self,
        filter: &ArticleQueryFilter,
        page: PageRequest,
    ) -> Result<Page<ArticleRecord>, RepoError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM articles a WHERE 1=1");
        Self::apply_article_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a WHERE 1=1"
        ));
        Self::apply_article_filter(&mut qb, filter);
        qb.push(ARTICLE_ORDER);
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<ArticleRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Page::new(
            rows.into_iter().map(ArticleRecord::from).collect(),
            Self::convert_count(total)?,
            page,
        ))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError> {
        self.fetch_article_where("id", |qb| {
            qb.push_bind(id);
        })
        .await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError> {
        let slug = slug.to_string();
        self.fetch_article_where("slug", |qb| {
            qb.push_bind(slug);
        })
        .await
    }

    async fn find_by_source_url(&self, url: &str) -> Result<Option<ArticleRecord>, RepoError> {
        let url = url.to_string();
        self.fetch_article_where("source_url", |qb| {
            qb.push_bind(url);
        })
        .await
    }

    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let sql = format!(
            "INSERT INTO articles AS a (id, slug, title, excerpt, body, category, tags, author, \
             status, featured, breaking, ai_generated, source_url, source_title, published_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.slug)
            .bind(params.title)
            .bind(params.excerpt)
            .bind(params.body)
            .bind(params.category)
            .bind(params.tags)
            .bind(params.author)
            .bind(params.status)
            .bind(params.featured)
            .bind(params.breaking)
            .bind(params.ai_generated)
            .bind(params.source_url)
            .bind(params.source_title)
            .bind(params.published_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_article(
        &self,
        params: UpdateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let sql = format!(
            "UPDATE articles AS a SET slug = $2, title = $3, excerpt = $4, body = $5, \
             category = $6, tags = $7, author = $8, featured = $9, breaking = $10, \
             updated_at = now() \
             WHERE a.id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(params.id)
            .bind(params.slug)
            .bind(params.title)
            .bind(params.excerpt)
            .bind(params.body)
            .bind(params.category)
            .bind(params.tags)
            .bind(params.author)
            .bind(params.featured)
            .bind(params.breaking)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(row.into())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ArticleStatus,
        published_at: Option<OffsetDateTime>,
    ) -> Result<ArticleRecord, RepoError> {
        let sql = format!(
            "UPDATE articles AS a SET status = $2, published_at = $3, updated_at = now() \
             WHERE a.id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .bind(status)
            .bind(published_at)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_article(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn increment_views(&self, slug: &str) -> Result<Option<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE articles SET view_count = view_count + 1 \
             WHERE slug = $1 AND status = 'published' \
             RETURNING view_count",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn category_counts(&self) -> Result<Vec<CategoryCount>, RepoError> {
        let rows = sqlx::query_as::<_, (Category, i64, i64)>(
            "SELECT category, COUNT(*), COALESCE(SUM(view_count), 0)::BIGINT \
             FROM articles WHERE status = 'published' GROUP BY category",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Category::all()
            .iter()
            .map(|category| {
                let (articles, views) = rows
                    .iter()
                    .find(|(found, _, _)| found == category)
                    .map(|(_, count, views)| (*count, *views))
                    .unwrap_or((0, 0));
                Ok(CategoryCount {
                    category: *category,
                    name: category.display_name(),
                    articles: Self::convert_count(articles)?,
                    views,
                })
            })
            .collect()
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepoError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT tag, COUNT(*) AS usage \
             FROM articles, UNNEST(tags) AS tag \
             WHERE status = 'published' \
             GROUP BY tag \
             ORDER BY usage DESC, tag ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(tag, count)| {
                Ok(TagCount {
                    tag,
                    count: Self::convert_count(count)?,
                })
            })
            .collect()
    }

    async fn article_stats(&self, top: u32) -> Result<ArticleStats, RepoError> {
        let (drafts, published, archived, ai_generated, total_views) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                "SELECT \
                    COUNT(*) FILTER (WHERE status = 'draft'), \
                    COUNT(*) FILTER (WHERE status = 'published'), \
                    COUNT(*) FILTER (WHERE status = 'archived'), \
                    COUNT(*) FILTER (WHERE ai_generated), \
                    COALESCE(SUM(view_count), 0)::BIGINT \
                 FROM articles",
            )
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let top_rows = sqlx::query_as::<_, (Uuid, String, String, i64)>(
            "SELECT id, slug, title, view_count FROM articles \
             WHERE status = 'published' \
             ORDER BY view_count DESC, published_at DESC NULLS LAST \
             LIMIT $1",
        )
        .bind(i64::from(top))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ArticleStats {
            drafts: Self::convert_count(drafts)?,
            published: Self::convert_count(published)?,
            archived: Self::convert_count(archived)?,
            ai_generated: Self::convert_count(ai_generated)?,
            total_views,
            top_articles: top_rows
                .into_iter()
                .map(|(id, slug, title, view_count)| TopArticle {
                    id,
                    slug,
                    title,
                    view_count,
                })
                .collect(),
        })
    }
}
