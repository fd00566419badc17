use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    application::repos::{RepoError, SubscribersRepo},
    domain::{entities::SubscriberRecord, error::DomainError},
};

const EMAIL_MAX_CHARS: usize = 254;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)*\.[A-Za-z]{2,}$").expect("email pattern compiles")
});

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeOutcome {
    pub subscriber: SubscriberRecord,
    pub already_subscribed: bool,
    pub reactivated: bool,
}

pub struct NewsletterService {
    repo: Arc<dyn SubscribersRepo>,
}

impl NewsletterService {
    pub fn new(repo: Arc<dyn SubscribersRepo>) -> Self {
        Self { repo }
    }

    pub async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, NewsletterError> {
        let email = normalize_email(email)?;

        if let Some(existing) = self.repo.find_by_email(&email).await? {
            if existing.active {
                return Ok(SubscribeOutcome {
                    subscriber: existing,
                    already_subscribed: true,
                    reactivated: false,
                });
            }
            let subscriber = self
                .repo
                .set_active(existing.id, true, OffsetDateTime::now_utc())
                .await?;
            info!(
                target = "peoples_thread::application::newsletter",
                subscriber_id = %subscriber.id,
                "subscriber reactivated"
            );
            return Ok(SubscribeOutcome {
                subscriber,
                already_subscribed: false,
                reactivated: true,
            });
        }

        let subscriber = match self.repo.create_subscriber(&email).await {
            Ok(subscriber) => subscriber,
            Err(RepoError::Duplicate { .. }) => {
                let existing = self
                    .repo
                    .find_by_email(&email)
                    .await?
                    .ok_or(RepoError::NotFound)?;
                return Ok(SubscribeOutcome {
                    subscriber: existing,
                    already_subscribed: true,
                    reactivated: false,
                });
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            target = "peoples_thread::application::newsletter",
            subscriber_id = %subscriber.id,
            "subscriber added"
        );
        Ok(SubscribeOutcome {
            subscriber,
            already_subscribed: false,
            reactivated: false,
        })
    }

    pub async fn unsubscribe(&self, email: &str) -> Result<SubscriberRecord, NewsletterError> {
        let email = normalize_email(email)?;
        let existing = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| DomainError::not_found("subscriber"))?;

        if !existing.active {
            return Ok(existing);
        }

        let subscriber = self
            .repo
            .set_active(existing.id, false, OffsetDateTime::now_utc())
            .await?;
        info!(
            target = "peoples_thread::application::newsletter",
            subscriber_id = %subscriber.id,
            "subscriber removed"
        );
        Ok(subscriber)
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<SubscriberRecord>, NewsletterError> {
        Ok(self.repo.list_subscribers(active_only).await?)
    }

    pub async fn count_active(&self) -> Result<u64, NewsletterError> {
        Ok(self.repo.count_active().await?)
    }
}

pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(DomainError::validation("email", "email address is required"));
    }
    if email.chars().count() > EMAIL_MAX_CHARS || !EMAIL_RE.is_match(&email) {
        return Err(DomainError::validation("email", "email address is invalid"));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::fs::FileStore;

    async fn service() -> (tempfile::TempDir, NewsletterService) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).await.expect("store");
        (dir, NewsletterService::new(Arc::new(store)))
    }

    #[test]
    fn normalizes_and_validates_addresses() {
        assert_eq!(
            normalize_email("  Reader@Example.ORG ").expect("valid"),
            "reader@example.org"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("a b@example.org").is_err());
        assert!(normalize_email("").is_err());
    }

    #[tokio::test]
    async fn subscribe_is_idempotent() {
        let (_dir, service) = service().await;
        let first = service.subscribe("reader@example.org").await.expect("first");
        assert!(!first.already_subscribed);

        let second = service.subscribe("READER@example.org").await.expect("second");
        assert!(second.already_subscribed);
        assert_eq!(first.subscriber.id, second.subscriber.id);
        assert_eq!(service.count_active().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn unsubscribe_then_resubscribe_reactivates() {
        let (_dir, service) = service().await;
        service.subscribe("reader@example.org").await.expect("subscribe");

        let removed = service
            .unsubscribe("reader@example.org")
            .await
            .expect("unsubscribe");
        assert!(!removed.active);
        assert!(removed.unsubscribed_at.is_some());
        assert_eq!(service.count_active().await.expect("count"), 0);

        let back = service.subscribe("reader@example.org").await.expect("again");
        assert!(back.reactivated);
        assert!(back.subscriber.active);
        assert!(back.subscriber.unsubscribed_at.is_none());
    }

    #[tokio::test]
    async fn unsubscribe_unknown_is_not_found() {
        let (_dir, service) = service().await;
        assert!(matches!(
            service.unsubscribe("ghost@example.org").await,
            Err(NewsletterError::Domain(DomainError::NotFound { .. }))
        ));
    }
}
