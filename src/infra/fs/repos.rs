use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::{
        pagination::{Page, PageRequest},
        repos::{
            ArticleQueryFilter, ArticleStats, ArticlesRepo, CategoryCount, CreateArticleParams,
            CreateScheduledPostParams, CreateUserParams, KeywordsRepo, RepoError,
            ScheduledPostsRepo, SubscribersRepo, TagCount, TopArticle, UpdateArticleParams,
            UsersRepo,
        },
    },
    domain::{
        categories::Category,
        entities::{
            ArticleRecord, KeywordRecord, ScheduledPostRecord, SubscriberRecord, UserRecord,
        },
        types::{ArticleStatus, ScheduleStatus},
    },
};

use super::{
    ARTICLES_FILE, FileStore, KEYWORDS_FILE, SCHEDULED_FILE, SUBSCRIBERS_FILE, USERS_FILE,
};

fn listing_order(a: &ArticleRecord, b: &ArticleRecord) -> Ordering {
    let published = match (a.published_at, b.published_at) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    published
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn ensure_unique_article(
    articles: &[ArticleRecord],
    skip: Option<Uuid>,
    slug: &str,
    source_url: Option<&str>,
) -> Result<(), RepoError> {
    for article in articles.iter().filter(|a| Some(a.id) != skip) {
        if article.slug == slug {
            return Err(RepoError::duplicate("articles_slug_key"));
        }
        if source_url.is_some() && article.source_url.as_deref() == source_url {
            return Err(RepoError::duplicate("articles_source_url_key"));
        }
    }
    Ok(())
}

fn to_count(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[async_trait]
impl ArticlesRepo for FileStore {
    async fn list_articles(
        &self,
        filter: &ArticleQueryFilter,
        page: PageRequest,
    ) -> Result<Page<ArticleRecord>, RepoError> {
        let state = self.state.read().await;
        let mut matching: Vec<&ArticleRecord> = state
            .articles
            .iter()
            .filter(|article| filter.matches(article))
            .collect();
        matching.sort_by(|a, b| listing_order(a, b));

        let total = to_count(matching.len());
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(Page::new(items, total, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.articles.iter().find(|a| a.slug == slug).cloned())
    }

    async fn find_by_source_url(&self, url: &str) -> Result<Option<ArticleRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .articles
            .iter()
            .find(|a| a.source_url.as_deref() == Some(url))
            .cloned())
    }

    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let mut state = self.state.write().await;
        ensure_unique_article(
            &state.articles,
            None,
            &params.slug,
            params.source_url.as_deref(),
        )?;

        let now = OffsetDateTime::now_utc();
        let record = ArticleRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            title: params.title,
            excerpt: params.excerpt,
            body: params.body,
            category: params.category,
            tags: params.tags,
            author: params.author,
            status: params.status,
            featured: params.featured,
            breaking: params.breaking,
            view_count: 0,
            ai_generated: params.ai_generated,
            source_url: params.source_url,
            source_title: params.source_title,
            published_at: params.published_at,
            created_at: now,
            updated_at: now,
        };

        let mut articles = state.articles.clone();
        articles.push(record.clone());
        self.persist(ARTICLES_FILE, &articles).await?;
        state.articles = articles;
        Ok(record)
    }

    async fn update_article(
        &self,
        params: UpdateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let mut state = self.state.write().await;
        ensure_unique_article(&state.articles, Some(params.id), &params.slug, None)?;

        let mut articles = state.articles.clone();
        let article = articles
            .iter_mut()
            .find(|a| a.id == params.id)
            .ok_or(RepoError::NotFound)?;
        article.slug = params.slug;
        article.title = params.title;
        article.excerpt = params.excerpt;
        article.body = params.body;
        article.category = params.category;
        article.tags = params.tags;
        article.author = params.author;
        article.featured = params.featured;
        article.breaking = params.breaking;
        article.updated_at = OffsetDateTime::now_utc();
        let updated = article.clone();

        self.persist(ARTICLES_FILE, &articles).await?;
        state.articles = articles;
        Ok(updated)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ArticleStatus,
        published_at: Option<OffsetDateTime>,
    ) -> Result<ArticleRecord, RepoError> {
        let mut state = self.state.write().await;
        let mut articles = state.articles.clone();
        let article = articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RepoError::NotFound)?;
        article.status = status;
        article.published_at = published_at;
        article.updated_at = OffsetDateTime::now_utc();
        let updated = article.clone();

        self.persist(ARTICLES_FILE, &articles).await?;
        state.articles = articles;
        Ok(updated)
    }

    async fn delete_article(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if !state.articles.iter().any(|a| a.id == id) {
            return Err(RepoError::NotFound);
        }

        // Scheduled links are cleared on disk before the article row goes.
        let mut scheduled = state.scheduled.clone();
        let mut detached = false;
        for post in scheduled.iter_mut().filter(|p| p.article_id == Some(id)) {
            post.article_id = None;
            detached = true;
        }
        if detached {
            self.persist(SCHEDULED_FILE, &scheduled).await?;
            state.scheduled = scheduled;
        }

        let articles: Vec<ArticleRecord> = state
            .articles
            .iter()
            .filter(|a| a.id != id)
            .cloned()
            .collect();
        self.persist(ARTICLES_FILE, &articles).await?;
        state.articles = articles;
        Ok(())
    }

    async fn increment_views(&self, slug: &str) -> Result<Option<i64>, RepoError> {
        let mut state = self.state.write().await;
        let mut articles = state.articles.clone();
        let Some(article) = articles
            .iter_mut()
            .find(|a| a.slug == slug && a.is_public())
        else {
            return Ok(None);
        };
        article.view_count += 1;
        let count = article.view_count;

        self.persist(ARTICLES_FILE, &articles).await?;
        state.articles = articles;
        Ok(Some(count))
    }

    async fn category_counts(&self) -> Result<Vec<CategoryCount>, RepoError> {
        let state = self.state.read().await;
        Ok(Category::all()
            .iter()
            .map(|category| {
                let published = state
                    .articles
                    .iter()
                    .filter(|a| a.is_public() && a.category == *category);
                let (articles, views) =
                    published.fold((0u64, 0i64), |(count, views), a| (count + 1, views + a.view_count));
                CategoryCount {
                    category: *category,
                    name: category.display_name(),
                    articles,
                    views,
                }
            })
            .collect())
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepoError> {
        let state = self.state.read().await;
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for article in state.articles.iter().filter(|a| a.is_public()) {
            for tag in &article.tags {
                *counts.entry(tag.as_str()).or_default() += 1;
            }
        }

        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount {
                tag: tag.to_string(),
                count,
            })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        Ok(tags)
    }

    async fn article_stats(&self, top: u32) -> Result<ArticleStats, RepoError> {
        let state = self.state.read().await;
        let mut stats = ArticleStats::default();
        for article in &state.articles {
            match article.status {
                ArticleStatus::Draft => stats.drafts += 1,
                ArticleStatus::Published => stats.published += 1,
                ArticleStatus::Archived => stats.archived += 1,
            }
            if article.ai_generated {
                stats.ai_generated += 1;
            }
            stats.total_views += article.view_count;
        }

        let mut published: Vec<&ArticleRecord> =
            state.articles.iter().filter(|a| a.is_public()).collect();
        published.sort_by(|a, b| {
            b.view_count
                .cmp(&a.view_count)
                .then_with(|| listing_order(a, b))
        });
        stats.top_articles = published
            .into_iter()
            .take(top as usize)
            .map(|a| TopArticle {
                id: a.id,
                slug: a.slug.clone(),
                title: a.title.clone(),
                view_count: a.view_count,
            })
            .collect();

        Ok(stats)
    }
}

#[async_trait]
impl UsersRepo for FileStore {
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepoError> {
        let state = self.state.read().await;
        let mut users = state.users.clone();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn count_users(&self) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(to_count(state.users.len()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.write().await;
        if state
            .users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(&params.username))
        {
            return Err(RepoError::duplicate("users_username_key"));
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            email: params.email,
            password_hash: params.password_hash,
            role: params.role,
            created_at: OffsetDateTime::now_utc(),
            last_login_at: None,
        };

        let mut users = state.users.clone();
        users.push(record.clone());
        self.persist(USERS_FILE, &users).await?;
        state.users = users;
        Ok(record)
    }

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let mut users = state.users.clone();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepoError::NotFound)?;
        user.last_login_at = Some(at);

        self.persist(USERS_FILE, &users).await?;
        state.users = users;
        Ok(())
    }
}

#[async_trait]
impl SubscribersRepo for FileStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<SubscriberRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.subscribers.iter().find(|s| s.email == email).cloned())
    }

    async fn create_subscriber(&self, email: &str) -> Result<SubscriberRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.subscribers.iter().any(|s| s.email == email) {
            return Err(RepoError::duplicate("subscribers_email_key"));
        }

        let record = SubscriberRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            active: true,
            created_at: OffsetDateTime::now_utc(),
            unsubscribed_at: None,
        };

        let mut subscribers = state.subscribers.clone();
        subscribers.push(record.clone());
        self.persist(SUBSCRIBERS_FILE, &subscribers).await?;
        state.subscribers = subscribers;
        Ok(record)
    }

    async fn set_active(
        &self,
        id: Uuid,
        active: bool,
        at: OffsetDateTime,
    ) -> Result<SubscriberRecord, RepoError> {
        let mut state = self.state.write().await;
        let mut subscribers = state.subscribers.clone();
        let subscriber = subscribers
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RepoError::NotFound)?;
        subscriber.active = active;
        subscriber.unsubscribed_at = if active { None } else { Some(at) };
        let updated = subscriber.clone();

        self.persist(SUBSCRIBERS_FILE, &subscribers).await?;
        state.subscribers = subscribers;
        Ok(updated)
    }

    async fn list_subscribers(
        &self,
        active_only: bool,
    ) -> Result<Vec<SubscriberRecord>, RepoError> {
        let state = self.state.read().await;
        let mut subscribers: Vec<SubscriberRecord> = state
            .subscribers
            .iter()
            .filter(|s| s.active || !active_only)
            .cloned()
            .collect();
        subscribers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subscribers)
    }

    async fn count_active(&self) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(to_count(
            state.subscribers.iter().filter(|s| s.active).count(),
        ))
    }
}

#[async_trait]
impl ScheduledPostsRepo for FileStore {
    async fn create_scheduled(
        &self,
        params: CreateScheduledPostParams,
    ) -> Result<ScheduledPostRecord, RepoError> {
        let mut state = self.state.write().await;
        let now = OffsetDateTime::now_utc();
        let record = ScheduledPostRecord {
            id: Uuid::new_v4(),
            topic: params.topic,
            category: params.category,
            instructions: params.instructions,
            run_at: params.run_at,
            recurrence: params.recurrence,
            anchor_day: params.anchor_day,
            auto_publish: params.auto_publish,
            status: ScheduleStatus::Pending,
            article_id: None,
            last_error: None,
            created_by: params.created_by,
            created_at: now,
            updated_at: now,
        };

        let mut scheduled = state.scheduled.clone();
        scheduled.push(record.clone());
        self.persist(SCHEDULED_FILE, &scheduled).await?;
        state.scheduled = scheduled;
        Ok(record)
    }

    async fn find_scheduled(&self, id: Uuid) -> Result<Option<ScheduledPostRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.scheduled.iter().find(|p| p.id == id).cloned())
    }

    async fn list_scheduled(
        &self,
        status: Option<ScheduleStatus>,
    ) -> Result<Vec<ScheduledPostRecord>, RepoError> {
        let state = self.state.read().await;
        let mut posts: Vec<ScheduledPostRecord> = state
            .scheduled
            .iter()
            .filter(|p| status.is_none_or(|status| p.status == status))
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            a.run_at
                .cmp(&b.run_at)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(posts)
    }

    async fn claim_due(
        &self,
        now: OffsetDateTime,
        stale_before: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<ScheduledPostRecord>, RepoError> {
        let mut state = self.state.write().await;
        let mut scheduled = state.scheduled.clone();

        let mut due: Vec<usize> = scheduled
            .iter()
            .enumerate()
            .filter(|(_, p)| match p.status {
                ScheduleStatus::Pending => p.run_at <= now,
                ScheduleStatus::Running => p.updated_at < stale_before,
                _ => false,
            })
            .map(|(index, _)| index)
            .collect();
        due.sort_by_key(|index| scheduled[*index].run_at);
        due.truncate(limit as usize);

        if due.is_empty() {
            return Ok(Vec::new());
        }

        let touched = OffsetDateTime::now_utc();
        let mut claimed = Vec::with_capacity(due.len());
        for index in due {
            let post = &mut scheduled[index];
            post.status = ScheduleStatus::Running;
            post.updated_at = touched;
            claimed.push(post.clone());
        }

        self.persist(SCHEDULED_FILE, &scheduled).await?;
        state.scheduled = scheduled;
        Ok(claimed)
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        article_id: Uuid,
    ) -> Result<ScheduledPostRecord, RepoError> {
        let mut state = self.state.write().await;
        let mut scheduled = state.scheduled.clone();
        let post = scheduled
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        post.status = ScheduleStatus::Completed;
        post.article_id = Some(article_id);
        post.last_error = None;
        post.updated_at = OffsetDateTime::now_utc();
        let updated = post.clone();

        self.persist(SCHEDULED_FILE, &scheduled).await?;
        state.scheduled = scheduled;
        Ok(updated)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<ScheduledPostRecord, RepoError> {
        let mut state = self.state.write().await;
        let mut scheduled = state.scheduled.clone();
        let post = scheduled
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        post.status = ScheduleStatus::Failed;
        post.last_error = Some(error.to_string());
        post.updated_at = OffsetDateTime::now_utc();
        let updated = post.clone();

        self.persist(SCHEDULED_FILE, &scheduled).await?;
        state.scheduled = scheduled;
        Ok(updated)
    }

    async fn cancel_scheduled(
        &self,
        id: Uuid,
    ) -> Result<Option<ScheduledPostRecord>, RepoError> {
        let mut state = self.state.write().await;
        let mut scheduled = state.scheduled.clone();
        let post = scheduled
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        if post.status != ScheduleStatus::Pending {
            return Ok(None);
        }
        post.status = ScheduleStatus::Cancelled;
        post.updated_at = OffsetDateTime::now_utc();
        let updated = post.clone();

        self.persist(SCHEDULED_FILE, &scheduled).await?;
        state.scheduled = scheduled;
        Ok(Some(updated))
    }
}

#[async_trait]
impl KeywordsRepo for FileStore {
    async fn list_keywords(&self) -> Result<Vec<KeywordRecord>, RepoError> {
        let state = self.state.read().await;
        let mut keywords = state.keywords.clone();
        keywords.sort_by(|a, b| a.keyword.cmp(&b.keyword));
        Ok(keywords)
    }

    async fn add_keyword(&self, keyword: &str) -> Result<KeywordRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.keywords.iter().any(|k| k.keyword == keyword) {
            return Err(RepoError::duplicate("monitor_keywords_keyword_key"));
        }

        let record = KeywordRecord {
            id: Uuid::new_v4(),
            keyword: keyword.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };

        let mut keywords = state.keywords.clone();
        keywords.push(record.clone());
        self.persist(KEYWORDS_FILE, &keywords).await?;
        state.keywords = keywords;
        Ok(record)
    }

    async fn remove_keyword(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if !state.keywords.iter().any(|k| k.id == id) {
            return Err(RepoError::NotFound);
        }

        let keywords: Vec<KeywordRecord> = state
            .keywords
            .iter()
            .filter(|k| k.id != id)
            .cloned()
            .collect();
        self.persist(KEYWORDS_FILE, &keywords).await?;
        state.keywords = keywords;
        Ok(())
    }

    async fn replace_keywords(
        &self,
        keywords: &[String],
    ) -> Result<Vec<KeywordRecord>, RepoError> {
        let mut state = self.state.write().await;
        let now = OffsetDateTime::now_utc();
        let mut records: Vec<KeywordRecord> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            if records.iter().any(|k| &k.keyword == keyword) {
                return Err(RepoError::duplicate("monitor_keywords_keyword_key"));
            }
            records.push(KeywordRecord {
                id: Uuid::new_v4(),
                keyword: keyword.clone(),
                created_at: now,
            });
        }

        self.persist(KEYWORDS_FILE, &records).await?;
        state.keywords = records.clone();
        records.sort_by(|a, b| a.keyword.cmp(&b.keyword));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Recurrence;

    fn article_params(slug: &str, status: ArticleStatus) -> CreateArticleParams {
        CreateArticleParams {
            slug: slug.to_string(),
            title: format!("Title {slug}"),
            excerpt: "Excerpt".to_string(),
            body: "Body".to_string(),
            category: Category::Labor,
            tags: vec!["unions".to_string()],
            author: "Desk".to_string(),
            status,
            featured: false,
            breaking: false,
            ai_generated: false,
            source_url: None,
            source_title: None,
            published_at: (status == ArticleStatus::Published).then(OffsetDateTime::now_utc),
        }
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = FileStore::open(dir.path()).await.expect("open");
            store
                .create_article(article_params("strike-ends", ArticleStatus::Published))
                .await
                .expect("create");
            store.add_keyword("strike").await.expect("keyword");
        }

        let reopened = FileStore::open(dir.path()).await.expect("reopen");
        let article = reopened
            .find_by_slug("strike-ends")
            .await
            .expect("query")
            .expect("article present");
        assert_eq!(article.category, Category::Labor);
        assert_eq!(reopened.list_keywords().await.expect("keywords").len(), 1);
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).await.expect("open");
        store
            .create_article(article_params("same", ArticleStatus::Draft))
            .await
            .expect("first");
        let err = store
            .create_article(article_params("same", ArticleStatus::Draft))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn views_only_count_for_published_articles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).await.expect("open");
        store
            .create_article(article_params("live", ArticleStatus::Published))
            .await
            .expect("published");
        store
            .create_article(article_params("hidden", ArticleStatus::Draft))
            .await
            .expect("draft");

        assert_eq!(store.increment_views("live").await.expect("views"), Some(1));
        assert_eq!(store.increment_views("live").await.expect("views"), Some(2));
        assert_eq!(store.increment_views("hidden").await.expect("views"), None);
        assert_eq!(store.increment_views("missing").await.expect("views"), None);
    }

    #[tokio::test]
    async fn listing_orders_unpublished_last() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).await.expect("open");
        store
            .create_article(article_params("draft-one", ArticleStatus::Draft))
            .await
            .expect("draft");
        store
            .create_article(article_params("live-one", ArticleStatus::Published))
            .await
            .expect("published");

        let page = store
            .list_articles(&ArticleQueryFilter::default(), PageRequest::default())
            .await
            .expect("list");
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].slug, "live-one");
        assert_eq!(page.items[1].slug, "draft-one");
    }

    #[tokio::test]
    async fn claim_due_moves_rows_to_running_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).await.expect("open");
        let now = OffsetDateTime::now_utc();
        store
            .create_scheduled(CreateScheduledPostParams {
                topic: "Minimum wage".to_string(),
                category: Category::Economy,
                instructions: None,
                run_at: now - time::Duration::minutes(5),
                recurrence: Recurrence::None,
                anchor_day: 1,
                auto_publish: false,
                created_by: "editor".to_string(),
            })
            .await
            .expect("scheduled");
        store
            .create_scheduled(CreateScheduledPostParams {
                topic: "Later".to_string(),
                category: Category::Economy,
                instructions: None,
                run_at: now + time::Duration::hours(1),
                recurrence: Recurrence::None,
                anchor_day: 1,
                auto_publish: false,
                created_by: "editor".to_string(),
            })
            .await
            .expect("scheduled");

        let lease_start = now - time::Duration::minutes(15);
        let claimed = store.claim_due(now, lease_start, 10).await.expect("claim");
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].status, ScheduleStatus::Running);
        assert!(
            store
                .claim_due(now, lease_start, 10)
                .await
                .expect("claim")
                .is_empty()
        );

        let after_lease = OffsetDateTime::now_utc() + time::Duration::seconds(1);
        let reclaimed = store
            .claim_due(now, after_lease, 10)
            .await
            .expect("reclaim");
        assert_eq!(reclaimed.len(), 1);
        assert_eq!(reclaimed[0].id, claimed[0].id);
    }

    #[tokio::test]
    async fn cancel_only_applies_to_pending_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).await.expect("open");
        let post = store
            .create_scheduled(CreateScheduledPostParams {
                topic: "Transit".to_string(),
                category: Category::Climate,
                instructions: None,
                run_at: OffsetDateTime::now_utc(),
                recurrence: Recurrence::Daily,
                anchor_day: 1,
                auto_publish: true,
                created_by: "editor".to_string(),
            })
            .await
            .expect("scheduled");

        let cancelled = store.cancel_scheduled(post.id).await.expect("cancel");
        assert_eq!(
            cancelled.map(|p| p.status),
            Some(ScheduleStatus::Cancelled)
        );
        assert!(store.cancel_scheduled(post.id).await.expect("cancel").is_none());
        assert!(matches!(
            store.cancel_scheduled(Uuid::new_v4()).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn failed_delete_keeps_article_and_its_scheduled_link() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).await.expect("open");
        let article = store
            .create_article(article_params("wage-report", ArticleStatus::Draft))
            .await
            .expect("article");
        let post = store
            .create_scheduled(CreateScheduledPostParams {
                topic: "Wages".to_string(),
                category: Category::Economy,
                instructions: None,
                run_at: OffsetDateTime::now_utc(),
                recurrence: Recurrence::None,
                anchor_day: 1,
                auto_publish: false,
                created_by: "editor".to_string(),
            })
            .await
            .expect("scheduled");
        store
            .mark_completed(post.id, article.id)
            .await
            .expect("completed");

        // A directory in place of the temp file makes the scheduled-posts write fail.
        let blocker = dir.path().join(format!(".{SCHEDULED_FILE}.tmp"));
        std::fs::create_dir(&blocker).expect("blocker");
        assert!(matches!(
            store.delete_article(article.id).await,
            Err(RepoError::Persistence(_))
        ));
        assert!(store.find_by_id(article.id).await.expect("find").is_some());
        assert_eq!(
            store
                .find_scheduled(post.id)
                .await
                .expect("find")
                .and_then(|p| p.article_id),
            Some(article.id)
        );

        std::fs::remove_dir(&blocker).expect("remove blocker");
        store.delete_article(article.id).await.expect("delete");
        let reopened = FileStore::open(dir.path()).await.expect("reopen");
        assert!(reopened.find_by_id(article.id).await.expect("find").is_none());
        let detached = reopened
            .find_scheduled(post.id)
            .await
            .expect("find")
            .expect("post present");
        assert_eq!(detached.article_id, None);
    }
}
