//! Scheduled AI posts: topic + category + time, optionally repeating.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::{
        articles::{ArticleError, ArticleService, GeneratedDraft},
        generation::{ArticleGenerator, GenerationError, RetryPolicy, TopicPrompt},
        repos::{CreateScheduledPostParams, RepoError, ScheduledPostsRepo},
    },
    domain::{
        categories::Category,
        entities::{ArticleRecord, ScheduledPostRecord},
        error::DomainError,
        schedule::next_occurrence,
        types::{Recurrence, ScheduleStatus},
    },
    infra::telemetry,
};

pub const TOPIC_MAX_CHARS: usize = 300;
pub const INSTRUCTIONS_MAX_CHARS: usize = 2_000;

/// Author stamped on scheduled articles.
pub const SCHEDULER_AUTHOR: &str = "Peoples Thread AI Desk";

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Article(#[from] ArticleError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateScheduledCommand {
    pub topic: String,
    pub category: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub run_at: OffsetDateTime,
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub auto_publish: bool,
}

/// How a claimed row ended up after a run.
enum Settled {
    Completed,
    Failed,
    /// No status could be written; the row stays `running` until its lease expires.
    Unrecorded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerReport {
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    pub rescheduled: usize,
}

pub struct SchedulerService {
    repo: Arc<dyn ScheduledPostsRepo>,
    articles: Arc<ArticleService>,
    generator: Arc<ArticleGenerator>,
    retry: RetryPolicy,
    batch_size: u32,
    lease: Duration,
}

impl SchedulerService {
    pub fn new(
        repo: Arc<dyn ScheduledPostsRepo>,
        articles: Arc<ArticleService>,
        generator: Arc<ArticleGenerator>,
        retry: RetryPolicy,
        batch_size: u32,
        lease: Duration,
    ) -> Self {
        Self {
            repo,
            articles,
            generator,
            retry,
            batch_size: batch_size.max(1),
            lease,
        }
    }

    pub async fn create(
        &self,
        actor: &str,
        command: CreateScheduledCommand,
    ) -> Result<ScheduledPostRecord, SchedulerError> {
        let topic = command.topic.trim().to_string();
        if topic.is_empty() {
            return Err(DomainError::validation("topic", "topic is required").into());
        }
        if topic.chars().count() > TOPIC_MAX_CHARS {
            return Err(DomainError::validation(
                "topic",
                format!("topic must be at most {TOPIC_MAX_CHARS} characters"),
            )
            .into());
        }
        let category: Category = command.category.parse()?;
        let recurrence = match command.recurrence.as_deref() {
            Some(value) => value.parse()?,
            None => Recurrence::None,
        };
        let instructions = command
            .instructions
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if instructions
            .as_ref()
            .is_some_and(|text| text.chars().count() > INSTRUCTIONS_MAX_CHARS)
        {
            return Err(DomainError::validation(
                "instructions",
                format!("instructions must be at most {INSTRUCTIONS_MAX_CHARS} characters"),
            )
            .into());
        }

        let record = self
            .repo
            .create_scheduled(CreateScheduledPostParams {
                topic,
                category,
                instructions,
                run_at: command.run_at,
                recurrence,
                anchor_day: command.run_at.day(),
                auto_publish: command.auto_publish,
                created_by: actor.to_string(),
            })
            .await?;

        info!(
            target = "peoples_thread::application::scheduler",
            scheduled_id = %record.id,
            run_at = %record.run_at,
            recurrence = record.recurrence.as_str(),
            actor,
            "scheduled post created"
        );
        Ok(record)
    }

    pub async fn list(
        &self,
        status: Option<ScheduleStatus>,
    ) -> Result<Vec<ScheduledPostRecord>, SchedulerError> {
        Ok(self.repo.list_scheduled(status).await?)
    }

    pub async fn cancel(&self, id: Uuid) -> Result<ScheduledPostRecord, SchedulerError> {
        match self.repo.cancel_scheduled(id).await {
            Ok(Some(record)) => {
                info!(
                    target = "peoples_thread::application::scheduler",
                    scheduled_id = %record.id,
                    "scheduled post cancelled"
                );
                Ok(record)
            }
            Ok(None) => Err(DomainError::validation(
                "status",
                "only pending scheduled posts can be cancelled",
            )
            .into()),
            Err(RepoError::NotFound) => Err(DomainError::not_found("scheduled post").into()),
            Err(err) => Err(err.into()),
        }
    }

    /// Claim and execute up to one batch of due posts.
    ///
    /// Rows are claimed one at a time so each lease starts when its work does.
    /// Bookkeeping failures on one row never abort the rest of the batch.
    pub async fn run_due(&self, now: OffsetDateTime) -> Result<SchedulerReport, SchedulerError> {
        let stale_before = now - self.lease;
        let mut report = SchedulerReport::default();

        for _ in 0..self.batch_size {
            let Some(post) = self.repo.claim_due(now, stale_before, 1).await?.pop() else {
                break;
            };
            report.processed += 1;

            match self.settle(&post).await {
                Settled::Completed => report.completed += 1,
                Settled::Failed => report.failed += 1,
                Settled::Unrecorded => {
                    report.failed += 1;
                    continue;
                }
            }

            match self.schedule_follow_up(&post, now).await {
                Ok(true) => report.rescheduled += 1,
                Ok(false) => {}
                Err(err) => warn!(
                    target = "peoples_thread::application::scheduler",
                    scheduled_id = %post.id,
                    error = %err,
                    "failed to schedule recurring follow-up"
                ),
            }
        }

        if report.processed > 0 {
            info!(
                target = "peoples_thread::application::scheduler",
                processed = report.processed,
                completed = report.completed,
                failed = report.failed,
                rescheduled = report.rescheduled,
                "scheduler poll finished"
            );
        }
        Ok(report)
    }

    async fn settle(&self, post: &ScheduledPostRecord) -> Settled {
        let article = match self.execute(post).await {
            Ok(article) => article,
            Err(err) => return self.record_failure(post, &err.to_string()).await,
        };

        match self.repo.mark_completed(post.id, article.id).await {
            Ok(_) => {
                metrics::counter!(telemetry::METRIC_SCHEDULED_PROCESSED, "outcome" => "completed")
                    .increment(1);
                info!(
                    target = "peoples_thread::application::scheduler",
                    scheduled_id = %post.id,
                    article_id = %article.id,
                    status = article.status.as_str(),
                    "scheduled post completed"
                );
                Settled::Completed
            }
            Err(err) => {
                let message = format!("article {} was created but not linked: {err}", article.id);
                self.record_failure(post, &message).await
            }
        }
    }

    async fn record_failure(&self, post: &ScheduledPostRecord, message: &str) -> Settled {
        metrics::counter!(telemetry::METRIC_SCHEDULED_PROCESSED, "outcome" => "failed")
            .increment(1);
        warn!(
            target = "peoples_thread::application::scheduler",
            scheduled_id = %post.id,
            error = message,
            "scheduled post failed"
        );

        match self.repo.mark_failed(post.id, message).await {
            Ok(_) => Settled::Failed,
            Err(err) => {
                warn!(
                    target = "peoples_thread::application::scheduler",
                    scheduled_id = %post.id,
                    error = %err,
                    lease_seconds = self.lease.as_secs(),
                    "could not record scheduled post outcome, row stays running until its lease expires"
                );
                Settled::Unrecorded
            }
        }
    }

    async fn execute(&self, post: &ScheduledPostRecord) -> Result<ArticleRecord, RunError> {
        let prompt = TopicPrompt {
            topic: &post.topic,
            category: post.category,
            instructions: post.instructions.as_deref(),
        }
        .render();
        let article = self
            .generator
            .generate_with_retry(&prompt, post.category, self.retry)
            .await?;
        let record = self
            .articles
            .create_generated(GeneratedDraft {
                article,
                author: SCHEDULER_AUTHOR.to_string(),
                publish: post.auto_publish,
                source_url: None,
                source_title: None,
            })
            .await?;
        Ok(record)
    }

    async fn schedule_follow_up(
        &self,
        post: &ScheduledPostRecord,
        now: OffsetDateTime,
    ) -> Result<bool, SchedulerError> {
        let Some(run_at) = next_occurrence(post.recurrence, post.run_at, post.anchor_day, now)? else {
            return Ok(false);
        };
        let next = self
            .repo
            .create_scheduled(CreateScheduledPostParams::follow_up(post, run_at))
            .await?;
        info!(
            target = "peoples_thread::application::scheduler",
            scheduled_id = %post.id,
            next_id = %next.id,
            run_at = %next.run_at,
            "recurring post rescheduled"
        );
        Ok(true)
    }
}
