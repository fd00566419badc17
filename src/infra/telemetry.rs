use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

pub const METRIC_ARTICLES_GENERATED: &str = "peoples_thread_articles_generated_total";
pub const METRIC_GENERATION_FAILURES: &str = "peoples_thread_generation_failures_total";
pub const METRIC_GENERATION_MS: &str = "peoples_thread_generation_ms";
pub const METRIC_MONITOR_RUNS: &str = "peoples_thread_monitor_runs_total";
pub const METRIC_SCHEDULED_PROCESSED: &str = "peoples_thread_scheduled_processed_total";
pub const METRIC_ARTICLE_VIEWS: &str = "peoples_thread_article_views_total";

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_ARTICLES_GENERATED,
            Unit::Count,
            "Articles persisted from AI completions, labelled by origin."
        );
        describe_counter!(
            METRIC_GENERATION_FAILURES,
            Unit::Count,
            "AI completion attempts that failed, including retried ones."
        );
        describe_histogram!(
            METRIC_GENERATION_MS,
            Unit::Milliseconds,
            "Latency of a successful AI completion in milliseconds."
        );
        describe_counter!(
            METRIC_MONITOR_RUNS,
            Unit::Count,
            "PBS monitor runs, labelled by trigger."
        );
        describe_counter!(
            METRIC_SCHEDULED_PROCESSED,
            Unit::Count,
            "Scheduled posts processed, labelled by outcome."
        );
        describe_counter!(
            METRIC_ARTICLE_VIEWS,
            Unit::Count,
            "Article views recorded by public pages and the API."
        );
    });
}
