use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::domain::types::Platform;

/// Command-line arguments for the blogcast binary.
#[derive(Debug, Parser)]
#[command(
    name = "blogcast",
    version,
    about = "Blog backend that syndicates articles to social media"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BLOGCAST_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API and the scheduled-publish worker.
    Serve(Box<ServeArgs>),
    /// Publish every due scheduled blog once and exit.
    #[command(name = "publish-scheduled")]
    PublishScheduled(PublishScheduledArgs),
    /// Resolve credentials for one platform and report whether they work.
    #[command(name = "verify-credentials")]
    VerifyCredentials(VerifyCredentialsArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

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

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the public site URL used for article and document links.
    #[arg(long = "publishing-site-url", value_name = "URL")]
    pub site_url: Option<String>,

    /// Override the per-platform publish timeout.
    #[arg(long = "publishing-timeout-seconds", value_name = "SECONDS")]
    pub publish_timeout_seconds: Option<u64>,

    /// Enable or disable the scheduled-publish worker.
    #[arg(
        long = "scheduler-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub scheduler_enabled: Option<bool>,

    /// Override the scheduled-publish cron expression (seconds field included).
    #[arg(long = "scheduler-cron", value_name = "EXPR")]
    pub scheduler_cron: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PublishScheduledArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Clone)]
pub struct VerifyCredentialsArgs {
    /// Platform to verify (facebook|instagram|linkedin).
    #[arg(value_name = "PLATFORM", value_parser = parse_platform)]
    pub platform: Platform,
}

fn parse_platform(value: &str) -> Result<Platform, String> {
    value
        .parse::<Platform>()
        .map_err(|_| format!("unknown platform `{value}`"))
}
