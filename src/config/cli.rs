use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the archive binary.
#[derive(Debug, Parser)]
#[command(
    name = "sylheti-archive",
    version,
    about = "The Sylheti Archive content server"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "ARCHIVE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API and the cleanup scheduler.
    Serve(Box<ServeArgs>),
    /// Purge view-ledger rows older than the retention window, then exit.
    #[command(name = "cleanup-media-views")]
    CleanupMediaViews(CleanupArgs),
    /// Create a SUPERADMIN account, then exit.
    #[command(name = "create-superadmin")]
    CreateSuperadmin(CreateSuperadminArgs),
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

    /// Take the client address from `X-Forwarded-For` (only behind a proxy).
    #[arg(
        long = "server-trust-forwarded-for",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub server_trust_forwarded_for: Option<bool>,

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

    /// Mark the session cookie `Secure`.
    #[arg(
        long = "auth-cookie-secure",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub auth_cookie_secure: Option<bool>,

    /// Override the rate limit window size.
    #[arg(long = "rate-limit-window-seconds", value_name = "SECONDS")]
    pub rate_limit_window_seconds: Option<u64>,

    /// Override the rate limit request ceiling.
    #[arg(long = "rate-limit-max-requests", value_name = "COUNT")]
    pub rate_limit_max_requests: Option<u64>,

    /// Override the ledger cleanup cron expression.
    #[arg(long = "scheduler-cleanup-cron", value_name = "CRON")]
    pub scheduler_cleanup_cron: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Override the retention window in days.
    #[arg(long = "retention-days", value_name = "DAYS")]
    pub retention_days: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct CreateSuperadminArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(long, value_name = "NAME")]
    pub username: String,

    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    /// Read from `ARCHIVE_SUPERADMIN_PASSWORD` when omitted.
    #[arg(
        long,
        env = "ARCHIVE_SUPERADMIN_PASSWORD",
        hide_env_values = true,
        value_name = "PASSWORD"
    )]
    pub password: String,
}
