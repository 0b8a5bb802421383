//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use apalis_cron::Schedule;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::types::Platform;

mod cli;

pub use cli::{
    CliArgs, Command, DatabaseOverride, PublishScheduledArgs, ServeArgs, ServeOverrides,
    VerifyCredentialsArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "blogcast";
const ENV_PREFIX: &str = "BLOGCAST";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com/v23.0/";
const DEFAULT_LINKEDIN_BASE_URL: &str = "https://api.linkedin.com/";
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
const MAX_TOKEN_TTL_SECS: u64 = 30 * 86_400;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_INSTAGRAM_PROPAGATION_DELAY_MS: u64 = 2000;
const DEFAULT_PUBLISH_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SCHEDULER_CRON: &str = "0 * * * * *";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub social: SocialSettings,
    pub publishing: PublishingSettings,
    pub scheduler: SchedulerSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SocialSettings {
    /// Platforms offered to authors; publishers are only built for these.
    pub enabled_platforms: Vec<Platform>,
    pub token_ttl: Duration,
    pub http_timeout: Duration,
    pub facebook: FacebookSettings,
    pub instagram: InstagramSettings,
    pub linkedin: LinkedinSettings,
}

#[derive(Debug, Clone)]
pub struct FacebookSettings {
    pub graph_base_url: Url,
    pub user_access_token: Option<String>,
    pub page_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InstagramSettings {
    pub graph_base_url: Url,
    pub access_token: Option<String>,
    pub business_account_id: Option<String>,
    pub propagation_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct LinkedinSettings {
    pub api_base_url: Url,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PublishingSettings {
    /// Public site root; article and relative document links are built from it.
    pub site_url: Option<Url>,
    pub publish_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub cron: String,
}

impl SchedulerSettings {
    pub fn schedule(&self) -> Result<Schedule, LoadError> {
        parse_schedule(&self.cron)
    }
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

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("social.enabled_platforms")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::PublishScheduled(args)) => raw.apply_database_override(&args.database),
        Some(Command::VerifyCredentials(_)) => {}
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
    social: RawSocialSettings,
    publishing: RawPublishingSettings,
    scheduler: RawSchedulerSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(url) = overrides.site_url.as_ref() {
            self.publishing.site_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.publish_timeout_seconds {
            self.publishing.timeout_seconds = Some(seconds);
        }
        if let Some(enabled) = overrides.scheduler_enabled {
            self.scheduler.enabled = Some(enabled);
        }
        if let Some(cron) = overrides.scheduler_cron.as_ref() {
            self.scheduler.cron = Some(cron.clone());
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            social,
            publishing,
            scheduler,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            social: build_social_settings(social)?,
            publishing: build_publishing_settings(publishing)?,
            scheduler: build_scheduler_settings(scheduler)?,
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

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
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
    let url = non_empty(database.url);
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_social_settings(social: RawSocialSettings) -> Result<SocialSettings, LoadError> {
    let enabled_platforms = match social.enabled_platforms {
        Some(names) => {
            let mut platforms = Vec::new();
            for name in names {
                let platform = name.parse::<Platform>().map_err(|_| {
                    LoadError::invalid(
                        "social.enabled_platforms",
                        format!("unknown platform `{name}`"),
                    )
                })?;
                if !platforms.contains(&platform) {
                    platforms.push(platform);
                }
            }
            platforms
        }
        None => Platform::ALL.to_vec(),
    };

    let token_ttl = bounded_seconds(
        social.token_ttl_seconds.unwrap_or(DEFAULT_TOKEN_TTL_SECS),
        MAX_TOKEN_TTL_SECS,
        "social.token_ttl_seconds",
    )?;
    let http_timeout = positive_seconds(
        social
            .http_timeout_seconds
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        "social.http_timeout_seconds",
    )?;

    let RawSocialSettings {
        facebook,
        instagram,
        linkedin,
        ..
    } = social;

    let facebook = FacebookSettings {
        graph_base_url: parse_base_url(
            facebook.graph_base_url.as_deref(),
            DEFAULT_GRAPH_BASE_URL,
            "social.facebook.graph_base_url",
        )?,
        user_access_token: non_empty(facebook.user_access_token),
        page_id: non_empty(facebook.page_id),
    };

    let instagram = InstagramSettings {
        graph_base_url: parse_base_url(
            instagram.graph_base_url.as_deref(),
            DEFAULT_GRAPH_BASE_URL,
            "social.instagram.graph_base_url",
        )?,
        access_token: non_empty(instagram.access_token),
        business_account_id: non_empty(instagram.business_account_id),
        propagation_delay: Duration::from_millis(
            instagram
                .propagation_delay_ms
                .unwrap_or(DEFAULT_INSTAGRAM_PROPAGATION_DELAY_MS),
        ),
    };

    let linkedin = LinkedinSettings {
        api_base_url: parse_base_url(
            linkedin.api_base_url.as_deref(),
            DEFAULT_LINKEDIN_BASE_URL,
            "social.linkedin.api_base_url",
        )?,
        access_token: non_empty(linkedin.access_token),
    };

    Ok(SocialSettings {
        enabled_platforms,
        token_ttl,
        http_timeout,
        facebook,
        instagram,
        linkedin,
    })
}

fn build_publishing_settings(
    publishing: RawPublishingSettings,
) -> Result<PublishingSettings, LoadError> {
    let site_url = match non_empty(publishing.site_url) {
        Some(raw) => Some(with_trailing_slash(Url::parse(&raw).map_err(|err| {
            LoadError::invalid("publishing.site_url", format!("invalid url: {err}"))
        })?)),
        None => None,
    };

    let publish_timeout = positive_seconds(
        publishing
            .timeout_seconds
            .unwrap_or(DEFAULT_PUBLISH_TIMEOUT_SECS),
        "publishing.timeout_seconds",
    )?;

    Ok(PublishingSettings {
        site_url,
        publish_timeout,
    })
}

fn build_scheduler_settings(
    scheduler: RawSchedulerSettings,
) -> Result<SchedulerSettings, LoadError> {
    let cron = non_empty(scheduler.cron).unwrap_or_else(|| DEFAULT_SCHEDULER_CRON.to_string());
    parse_schedule(&cron)?;

    Ok(SchedulerSettings {
        enabled: scheduler.enabled.unwrap_or(true),
        cron,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
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
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSocialSettings {
    enabled_platforms: Option<Vec<String>>,
    token_ttl_seconds: Option<u64>,
    http_timeout_seconds: Option<u64>,
    facebook: RawFacebookSettings,
    instagram: RawInstagramSettings,
    linkedin: RawLinkedinSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFacebookSettings {
    graph_base_url: Option<String>,
    user_access_token: Option<String>,
    page_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawInstagramSettings {
    graph_base_url: Option<String>,
    access_token: Option<String>,
    business_account_id: Option<String>,
    propagation_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLinkedinSettings {
    api_base_url: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPublishingSettings {
    site_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSchedulerSettings {
    enabled: Option<bool>,
    cron: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_schedule(expression: &str) -> Result<Schedule, LoadError> {
    Schedule::from_str(expression).map_err(|err| {
        LoadError::invalid(
            "scheduler.cron",
            format!("invalid cron expression `{expression}`: {err}"),
        )
    })
}

fn parse_base_url(
    value: Option<&str>,
    default: &str,
    key: &'static str,
) -> Result<Url, LoadError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default);
    let url = Url::parse(raw).map_err(|err| LoadError::invalid(key, format!("invalid url: {err}")))?;
    Ok(with_trailing_slash(url))
}

/// `Url::join` replaces the last path segment unless the base ends with `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn bounded_seconds(value: u64, max: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value > max {
        return Err(LoadError::invalid(key, format!("must be at most {max} seconds")));
    }
    positive_seconds(value, key)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
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
