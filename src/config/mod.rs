//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CleanupArgs, CliArgs, Command, CreateSuperadminArgs, DatabaseOverride, ServeArgs,
    ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "archive";
const ENV_PREFIX: &str = "ARCHIVE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_SESSION_DAYS: u64 = 7;
const MIN_JWT_SECRET_BYTES: usize = 32;
const DEFAULT_STORAGE_HOSTS: [&str; 2] = ["utfs.io", "ufs.sh"];
const DEFAULT_VIEW_RETENTION_DAYS: u64 = 30;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 20;
const DEFAULT_CLEANUP_CRON: &str = "0 0 3 * * *";
const DEFAULT_ADMIN_ADDRESS: &str = "archive-admin@localhost";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub views: ViewSettings,
    pub system: SystemSettings,
    pub mail: MailSettings,
    pub rate_limit: RateLimitSettings,
    pub scheduler: SchedulerSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    /// Honour `X-Forwarded-For` from the socket peer. Off unless the server
    /// sits behind a reverse proxy that overwrites the header.
    pub trust_forwarded_for: bool,
    /// Extra proxy hops to skip when reading `X-Forwarded-For` right to left.
    pub trusted_proxies: Vec<IpAddr>,
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
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Required to serve; other subcommands run without it.
    pub jwt_secret: Option<String>,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub ip_salt: Option<String>,
    pub retention_days: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SystemSettings {
    /// The trigger endpoint answers 404 while this is unset.
    pub cron_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub transport: Option<MailTransport>,
    pub admin_address: String,
}

#[derive(Debug, Clone)]
pub struct MailTransport {
    pub api_url: Url,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub cleanup_cron: String,
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

impl Settings {
    pub fn database_url(&self) -> Result<&str, LoadError> {
        self.database
            .url
            .as_deref()
            .ok_or_else(|| LoadError::invalid("database.url", "a database URL is required"))
    }

    pub fn jwt_secret(&self) -> Result<&str, LoadError> {
        self.auth
            .jwt_secret
            .as_deref()
            .ok_or_else(|| LoadError::invalid("auth.jwt_secret", "a signing secret is required"))
    }

    pub fn ip_salt(&self) -> Result<&str, LoadError> {
        self.views
            .ip_salt
            .as_deref()
            .ok_or_else(|| LoadError::invalid("views.ip_salt", "a hashing salt is required"))
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
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("storage.hosts")
            .with_list_parse_key("server.trusted_proxies")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::CleanupMediaViews(args)) => {
            raw.apply_database_override(&args.database);
            if let Some(days) = args.retention_days {
                raw.views.retention_days = Some(days.into());
            }
        }
        Some(Command::CreateSuperadmin(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    auth: RawAuthSettings,
    storage: RawStorageSettings,
    views: RawViewSettings,
    system: RawSystemSettings,
    mail: RawMailSettings,
    rate_limit: RawRateLimitSettings,
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
        if let Some(trust) = overrides.server_trust_forwarded_for {
            self.server.trust_forwarded_for = Some(trust);
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
        if let Some(secure) = overrides.auth_cookie_secure {
            self.auth.cookie_secure = Some(secure);
        }
        if let Some(window) = overrides.rate_limit_window_seconds {
            self.rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.rate_limit_max_requests {
            self.rate_limit.max_requests = Some(max);
        }
        if let Some(cron) = overrides.scheduler_cleanup_cron.as_ref() {
            self.scheduler.cleanup_cron = Some(cron.clone());
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
            auth,
            storage,
            views,
            system,
            mail,
            rate_limit,
            scheduler,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            auth: build_auth_settings(auth)?,
            storage: build_storage_settings(storage)?,
            views: build_view_settings(views)?,
            system: SystemSettings {
                cron_secret: non_blank(system.cron_secret),
            },
            mail: build_mail_settings(mail)?,
            rate_limit: build_rate_limit_settings(rate_limit)?,
            scheduler: SchedulerSettings {
                cleanup_cron: non_blank(scheduler.cleanup_cron)
                    .unwrap_or_else(|| DEFAULT_CLEANUP_CRON.to_string()),
            },
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

    let trusted_proxies = server
        .trusted_proxies
        .iter()
        .map(|raw| {
            raw.trim().parse::<IpAddr>().map_err(|err| {
                LoadError::invalid("server.trusted_proxies", format!("`{raw}`: {err}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        trust_forwarded_for: server.trust_forwarded_for.unwrap_or(false),
        trusted_proxies,
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
    let max_connections = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

    Ok(DatabaseSettings {
        url: non_blank(database.url),
        max_connections: non_zero_u32(max_connections.into(), "database.max_connections")?,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let jwt_secret = non_blank(auth.jwt_secret);
    if let Some(secret) = jwt_secret.as_ref() {
        if secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(LoadError::invalid(
                "auth.jwt_secret",
                format!("must be at least {MIN_JWT_SECRET_BYTES} bytes"),
            ));
        }
    }

    let days = non_zero_u32(
        auth.session_days.unwrap_or(DEFAULT_SESSION_DAYS),
        "auth.session_days",
    )?;

    Ok(AuthSettings {
        jwt_secret,
        session_ttl: Duration::from_secs(u64::from(days.get()) * 24 * 60 * 60),
        cookie_secure: auth.cookie_secure.unwrap_or(false),
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let hosts: Vec<String> = match storage.hosts {
        Some(hosts) => hosts
            .into_iter()
            .map(|host| host.trim().to_ascii_lowercase())
            .filter(|host| !host.is_empty())
            .collect(),
        None => DEFAULT_STORAGE_HOSTS
            .iter()
            .map(|host| (*host).to_string())
            .collect(),
    };
    if hosts.iter().any(|host| host.contains('/') || host.contains(':')) {
        return Err(LoadError::invalid(
            "storage.hosts",
            "entries must be bare hostnames",
        ));
    }
    Ok(StorageSettings { hosts })
}

fn build_view_settings(views: RawViewSettings) -> Result<ViewSettings, LoadError> {
    Ok(ViewSettings {
        ip_salt: non_blank(views.ip_salt),
        retention_days: non_zero_u32(
            views.retention_days.unwrap_or(DEFAULT_VIEW_RETENTION_DAYS),
            "views.retention_days",
        )?,
    })
}

fn build_mail_settings(mail: RawMailSettings) -> Result<MailSettings, LoadError> {
    let admin_address =
        non_blank(mail.admin_address).unwrap_or_else(|| DEFAULT_ADMIN_ADDRESS.to_string());

    let transport = match (
        non_blank(mail.api_url),
        non_blank(mail.api_key),
        non_blank(mail.from),
    ) {
        (Some(api_url), Some(api_key), Some(from)) => {
            let api_url = Url::parse(&api_url)
                .map_err(|err| LoadError::invalid("mail.api_url", err.to_string()))?;
            Some(MailTransport {
                api_url,
                api_key,
                from,
            })
        }
        (None, None, None) => None,
        _ => {
            return Err(LoadError::invalid(
                "mail",
                "api_url, api_key and from must be set together",
            ));
        }
    };

    Ok(MailSettings {
        transport,
        admin_address,
    })
}

fn build_rate_limit_settings(
    rate_limit: RawRateLimitSettings,
) -> Result<RateLimitSettings, LoadError> {
    let window_seconds_val = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);
    let window_seconds = non_zero_u32(window_seconds_val, "rate_limit.window_seconds")?;

    let max_requests_val = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);
    let max_requests = non_zero_u32(max_requests_val, "rate_limit.max_requests")?;

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
    graceful_shutdown_seconds: Option<u64>,
    trust_forwarded_for: Option<bool>,
    trusted_proxies: Vec<String>,
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
struct RawAuthSettings {
    jwt_secret: Option<String>,
    session_days: Option<u64>,
    cookie_secure: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    hosts: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawViewSettings {
    ip_salt: Option<String>,
    retention_days: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSystemSettings {
    cron_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMailSettings {
    api_url: Option<String>,
    api_key: Option<String>,
    from: Option<String>,
    admin_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSchedulerSettings {
    cleanup_cron: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
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

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
