//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::{categories::Category, types::Role};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "peoples-thread";
const ENV_PREFIX: &str = "PEOPLES_THREAD";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DATA_DIR: &str = "data";
const MIN_JWT_SECRET_LEN: usize = 32;
const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;
const DEFAULT_AI_MAX_TOKENS: u32 = 2000;
const DEFAULT_AI_TEMPERATURE: f32 = 0.7;
const DEFAULT_MONITOR_FEED_URL: &str = "https://www.pbs.org/newshour/feeds/rss/headlines";
const DEFAULT_MONITOR_SCHEDULE: &str = "0 0 * * * *";
const DEFAULT_MONITOR_MAX_ARTICLES: u32 = 3;
const DEFAULT_MONITOR_SCRAPE_MAX_CHARS: u64 = 6000;
const DEFAULT_MONITOR_MAX_RETRIES: u32 = 3;
const DEFAULT_MONITOR_RETRY_DELAY_MS: u64 = 2000;
const DEFAULT_MONITOR_ITEM_DELAY_MS: u64 = 1000;
const DEFAULT_MONITOR_CATEGORY: Category = Category::Politics;
const DEFAULT_SCHEDULER_SCHEDULE: &str = "0 * * * * *";
const DEFAULT_SCHEDULER_BATCH_SIZE: u32 = 10;
const DEFAULT_SCHEDULER_LEASE_SECONDS: u32 = 900;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 120;

/// Command-line arguments for the Peoples Thread binary.
#[derive(Debug, Parser)]
#[command(name = "peoples-thread", version, about = "Peoples Thread news server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PEOPLES_THREAD_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service and background workers.
    Serve(Box<ServeArgs>),
    /// Apply database migrations and exit.
    Migrate(StorageOverrides),
    /// Create a dashboard user.
    #[command(name = "create-user")]
    CreateUser(CreateUserArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct StorageOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the file-store directory used when the database is unavailable.
    #[arg(long = "data-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle the scheduled PBS monitor run.
    #[arg(
        long = "monitor-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub monitor_enabled: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct CreateUserArgs {
    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Login name for the new user.
    #[arg(long, value_name = "NAME")]
    pub username: String,

    /// Password for the new user.
    #[arg(long, env = "PEOPLES_THREAD_NEW_USER_PASSWORD", value_name = "PASSWORD")]
    pub password: String,

    /// Contact email for the new user.
    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    /// Role (admin|editor|writer).
    #[arg(long, default_value = "editor", value_parser = parse_role)]
    pub role: Role,
}

fn parse_role(value: &str) -> Result<Role, String> {
    Role::from_str(value).map_err(|err| err.to_string())
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    pub ai: AiSettings,
    pub monitor: MonitorSettings,
    pub scheduler: SchedulerSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bootstrap: Option<BootstrapAdmin>,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("bootstrap", &self.bootstrap.as_ref().map(|b| &b.username))
            .finish()
    }
}

#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub enabled: bool,
    pub feed_url: String,
    pub schedule: String,
    pub max_articles_per_run: NonZeroU32,
    pub scrape_full_article: bool,
    pub scrape_max_chars: NonZeroU64,
    pub max_retries: NonZeroU32,
    pub retry_delay: Duration,
    pub item_delay: Duration,
    pub default_category: Category,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub schedule: String,
    pub batch_size: NonZeroU32,
    /// How long a `running` row may go untouched before a poll reclaims it.
    pub lease: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(storage)) => raw.apply_storage_overrides(storage),
        Some(Command::CreateUser(args)) => raw.apply_storage_overrides(&args.storage),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    storage: RawStorageSettings,
    auth: RawAuthSettings,
    ai: RawAiSettings,
    monitor: RawMonitorSettings,
    scheduler: RawSchedulerSettings,
    rate_limit: RawRateLimitSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.monitor_enabled {
            self.monitor.enabled = Some(enabled);
        }

        self.apply_storage_overrides(&overrides.storage);
    }

    fn apply_storage_overrides(&mut self, overrides: &StorageOverrides) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(dir) = overrides.data_dir.as_ref() {
            self.storage.data_dir = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            storage,
            auth,
            ai,
            monitor,
            scheduler,
            rate_limit,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            storage: build_storage_settings(storage)?,
            auth: build_auth_settings(auth)?,
            ai: build_ai_settings(ai)?,
            monitor: build_monitor_settings(monitor)?,
            scheduler: build_scheduler_settings(scheduler)?,
            rate_limit: build_rate_limit_settings(rate_limit)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    let timeout_secs = database
        .connect_timeout_seconds
        .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "database.connect_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(DatabaseSettings {
        url,
        max_connections,
        connect_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let data_dir = storage
        .data_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    if data_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "storage.data_dir",
            "path must not be empty",
        ));
    }

    Ok(StorageSettings { data_dir })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let jwt_secret = non_blank(auth.jwt_secret)
        .ok_or_else(|| LoadError::invalid("auth.jwt_secret", "a signing secret is required"))?;
    if jwt_secret.len() < MIN_JWT_SECRET_LEN {
        return Err(LoadError::invalid(
            "auth.jwt_secret",
            format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
        ));
    }

    let ttl_secs = auth.token_ttl_seconds.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "auth.token_ttl_seconds",
            "must be greater than zero",
        ));
    }

    let bootstrap = match (
        non_blank(auth.bootstrap_username),
        non_blank(auth.bootstrap_password),
    ) {
        (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
        (None, None) => None,
        _ => {
            return Err(LoadError::invalid(
                "auth.bootstrap_username",
                "bootstrap username and password must be set together",
            ));
        }
    };

    Ok(AuthSettings {
        jwt_secret,
        token_ttl: Duration::from_secs(ttl_secs),
        bootstrap,
    })
}

fn build_ai_settings(ai: RawAiSettings) -> Result<AiSettings, LoadError> {
    let base_url = non_blank(ai.base_url).unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string());
    validate_http_url(&base_url, "ai.base_url")?;

    let model = non_blank(ai.model).unwrap_or_else(|| DEFAULT_AI_MODEL.to_string());

    let timeout_secs = ai.timeout_seconds.unwrap_or(DEFAULT_AI_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "ai.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let max_tokens = non_zero_u32(
        ai.max_tokens.unwrap_or(DEFAULT_AI_MAX_TOKENS).into(),
        "ai.max_tokens",
    )?
    .get();

    let temperature = ai.temperature.unwrap_or(DEFAULT_AI_TEMPERATURE);
    if !(0.0..=2.0).contains(&temperature) {
        return Err(LoadError::invalid(
            "ai.temperature",
            "must be between 0.0 and 2.0",
        ));
    }

    Ok(AiSettings {
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key: non_blank(ai.api_key),
        model,
        timeout: Duration::from_secs(timeout_secs),
        max_tokens,
        temperature,
    })
}

fn build_monitor_settings(monitor: RawMonitorSettings) -> Result<MonitorSettings, LoadError> {
    let feed_url =
        non_blank(monitor.feed_url).unwrap_or_else(|| DEFAULT_MONITOR_FEED_URL.to_string());
    validate_http_url(&feed_url, "monitor.feed_url")?;

    let schedule =
        non_blank(monitor.schedule).unwrap_or_else(|| DEFAULT_MONITOR_SCHEDULE.to_string());

    let max_articles_per_run = non_zero_u32(
        monitor
            .max_articles_per_run
            .unwrap_or(DEFAULT_MONITOR_MAX_ARTICLES)
            .into(),
        "monitor.max_articles_per_run",
    )?;

    let scrape_max_chars = NonZeroU64::new(
        monitor
            .scrape_max_chars
            .unwrap_or(DEFAULT_MONITOR_SCRAPE_MAX_CHARS),
    )
    .ok_or_else(|| LoadError::invalid("monitor.scrape_max_chars", "must be greater than zero"))?;

    let max_retries = non_zero_u32(
        monitor
            .max_retries
            .unwrap_or(DEFAULT_MONITOR_MAX_RETRIES)
            .into(),
        "monitor.max_retries",
    )?;

    let default_category = match non_blank(monitor.default_category) {
        Some(value) => Category::from_str(&value)
            .map_err(|err| LoadError::invalid("monitor.default_category", err.to_string()))?,
        None => DEFAULT_MONITOR_CATEGORY,
    };

    Ok(MonitorSettings {
        enabled: monitor.enabled.unwrap_or(false),
        feed_url,
        schedule,
        max_articles_per_run,
        scrape_full_article: monitor.scrape_full_article.unwrap_or(true),
        scrape_max_chars,
        max_retries,
        retry_delay: Duration::from_millis(
            monitor
                .retry_delay_ms
                .unwrap_or(DEFAULT_MONITOR_RETRY_DELAY_MS),
        ),
        item_delay: Duration::from_millis(
            monitor
                .item_delay_ms
                .unwrap_or(DEFAULT_MONITOR_ITEM_DELAY_MS),
        ),
        default_category,
    })
}

fn build_scheduler_settings(
    scheduler: RawSchedulerSettings,
) -> Result<SchedulerSettings, LoadError> {
    let schedule =
        non_blank(scheduler.schedule).unwrap_or_else(|| DEFAULT_SCHEDULER_SCHEDULE.to_string());

    let batch_size = non_zero_u32(
        scheduler
            .batch_size
            .unwrap_or(DEFAULT_SCHEDULER_BATCH_SIZE)
            .into(),
        "scheduler.batch_size",
    )?;

    let lease_seconds = non_zero_u32(
        scheduler
            .lease_seconds
            .unwrap_or(DEFAULT_SCHEDULER_LEASE_SECONDS)
            .into(),
        "scheduler.lease_seconds",
    )?;

    Ok(SchedulerSettings {
        enabled: scheduler.enabled.unwrap_or(true),
        schedule,
        batch_size,
        lease: Duration::from_secs(lease_seconds.get().into()),
    })
}

fn build_rate_limit_settings(
    rate_limit: RawRateLimitSettings,
) -> Result<RateLimitSettings, LoadError> {
    let window_seconds = non_zero_u32(
        rate_limit
            .window_seconds
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        "rate_limit.window_seconds",
    )?;
    let max_requests = non_zero_u32(
        rate_limit
            .max_requests
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS),
        "rate_limit.max_requests",
    )?;

    Ok(RateLimitSettings {
        window_seconds,
        max_requests,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    connect_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    jwt_secret: Option<String>,
    token_ttl_seconds: Option<u64>,
    bootstrap_username: Option<String>,
    bootstrap_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAiSettings {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_seconds: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMonitorSettings {
    enabled: Option<bool>,
    feed_url: Option<String>,
    schedule: Option<String>,
    max_articles_per_run: Option<u32>,
    scrape_full_article: Option<bool>,
    scrape_max_chars: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
    item_delay_ms: Option<u64>,
    default_category: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSchedulerSettings {
    enabled: Option<bool>,
    schedule: Option<String>,
    batch_size: Option<u32>,
    lease_seconds: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn validate_http_url(value: &str, key: &'static str) -> Result<(), LoadError> {
    let parsed = url::Url::parse(value)
        .map_err(|err| LoadError::invalid(key, format!("invalid url `{value}`: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{other}`"),
        )),
    }
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
