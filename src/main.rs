use std::{process, sync::Arc, time::Duration};

use apalis::prelude::{Monitor, WorkerBuilder, WorkerFactoryFn};
use apalis_cron::CronStream;
use peoples_thread::{
    application::{
        auth::CreateUserCommand,
        error::AppError,
        jobs::{
            MonitorJobContext, SchedulerJobContext, parse_schedule, process_monitor_tick,
            process_scheduler_tick,
        },
    },
    config::{self, Settings},
    infra::{
        ai::OpenAiClient,
        app::ApplicationContext,
        error::InfraError,
        fetch::HttpFetcher,
        http::{self, RouterState},
        store, telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SOURCE_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::CreateUser(args) => run_create_user(settings, args).await,
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;

    if let Some(bootstrap) = settings.auth.bootstrap.as_ref() {
        app.auth
            .bootstrap_admin(&bootstrap.username, &bootstrap.password)
            .await
            .map_err(|err| AppError::unexpected(format!("bootstrap admin failed: {err}")))?;
    }

    let monitor_handle = spawn_job_monitor(&app, &settings)?;

    let result = serve_http(&settings, &app).await;

    if let Some(handle) = monitor_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_migrate(settings: Settings) -> Result<(), AppError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        AppError::validation("migrate requires database.url or --database-url")
    })?;
    store::connect_postgres(url, &settings.database).await?;
    info!(target = "peoples_thread::migrate", "migrations applied");
    Ok(())
}

async fn run_create_user(
    settings: Settings,
    args: config::CreateUserArgs,
) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;
    let user = app
        .auth
        .create_user(CreateUserCommand {
            username: args.username,
            email: args.email,
            password: args.password,
            role: args.role,
        })
        .await
        .map_err(|err| AppError::validation(err.to_string()))?;

    info!(
        target = "peoples_thread::create_user",
        user_id = %user.id,
        username = %user.username,
        role = %user.role,
        storage = %app.repositories.kind(),
        "user created"
    );
    Ok(())
}

async fn build_application_context(settings: &Settings) -> Result<ApplicationContext, AppError> {
    let repositories = store::open(&settings.database, &settings.storage).await?;

    if settings.ai.api_key.is_none() {
        warn!(
            target = "peoples_thread::startup",
            "ai.api_key is not set; article generation will be unavailable"
        );
    }
    let client = OpenAiClient::new(&settings.ai)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;
    let fetcher = HttpFetcher::new(SOURCE_FETCH_TIMEOUT)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    Ok(ApplicationContext::new(
        repositories,
        settings,
        Arc::new(client),
        Arc::new(fetcher),
    ))
}

fn spawn_job_monitor(
    app: &ApplicationContext,
    settings: &Settings,
) -> Result<Option<tokio::task::JoinHandle<()>>, AppError> {
    let mut monitor = Monitor::new();
    let mut workers = 0;

    if settings.scheduler.enabled {
        let schedule = parse_schedule("scheduler.schedule", &settings.scheduler.schedule)
            .map_err(|err| AppError::validation(err.to_string()))?;
        let worker = WorkerBuilder::new("scheduled-posts-worker")
            .data(SchedulerJobContext {
                scheduler: app.scheduler.clone(),
            })
            .backend(CronStream::new(schedule))
            .build_fn(process_scheduler_tick);
        monitor = monitor.register(worker);
        workers += 1;
    }

    if settings.monitor.enabled {
        let schedule = parse_schedule("monitor.schedule", &settings.monitor.schedule)
            .map_err(|err| AppError::validation(err.to_string()))?;
        let worker = WorkerBuilder::new("pbs-monitor-worker")
            .data(MonitorJobContext {
                monitor: app.monitor.clone(),
            })
            .backend(CronStream::new(schedule))
            .build_fn(process_monitor_tick);
        monitor = monitor.register(worker);
        workers += 1;
    }

    if workers == 0 {
        info!(
            target = "peoples_thread::jobs",
            "scheduler and monitor disabled, no background workers"
        );
        return Ok(None);
    }

    info!(
        target = "peoples_thread::jobs",
        workers,
        scheduler = settings.scheduler.enabled,
        monitor = settings.monitor.enabled,
        "starting background workers"
    );
    Ok(Some(tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    })))
}

async fn serve_http(settings: &Settings, app: &ApplicationContext) -> Result<(), AppError> {
    let router_state = RouterState::new(app, &settings.rate_limit);
    let router = http::build_router(router_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "peoples_thread::startup",
        addr = %settings.server.addr,
        storage = %app.repositories.kind(),
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
