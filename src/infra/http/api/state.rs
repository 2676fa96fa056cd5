use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::application::admin::{
    BlogService, CategoryService, FolderService, MediaService, PageService, UserAdminService,
};
use crate::application::auth::{AuthService, SessionIssuer};
use crate::application::contact::{ContactService, Mailer};
use crate::application::repos::{HealthRepo, Repositories};
use crate::application::search::SearchService;
use crate::application::views::ViewService;
use crate::config::{LoadError, Settings};
use crate::domain::media::StorageHosts;

use super::middleware::ClientAddressPolicy;
use super::rate_limit::ApiRateLimiter;

/// Inputs for assembling [`ApiState`], resolved from [`Settings`] at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub session_ttl: time::Duration,
    pub cookie_secure: bool,
    pub storage_hosts: Vec<String>,
    pub ip_salt: String,
    pub retention_days: u32,
    pub admin_address: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,
    pub cron_secret: Option<String>,
    pub trust_forwarded_for: bool,
    pub trusted_proxies: Vec<IpAddr>,
}

impl ApiConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, LoadError> {
        let session_ttl = time::Duration::try_from(settings.auth.session_ttl).map_err(|err| {
            LoadError::Invalid {
                key: "auth.session_days",
                reason: err.to_string(),
            }
        })?;
        Ok(Self {
            jwt_secret: settings.jwt_secret()?.to_string(),
            session_ttl,
            cookie_secure: settings.auth.cookie_secure,
            storage_hosts: settings.storage.hosts.clone(),
            ip_salt: settings.ip_salt()?.to_string(),
            retention_days: settings.views.retention_days.get(),
            admin_address: settings.mail.admin_address.clone(),
            rate_limit_window: Duration::from_secs(u64::from(
                settings.rate_limit.window_seconds.get(),
            )),
            rate_limit_max: settings.rate_limit.max_requests.get(),
            cron_secret: settings.system.cron_secret.clone(),
            trust_forwarded_for: settings.server.trust_forwarded_for,
            trusted_proxies: settings.server.trusted_proxies.clone(),
        })
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthService>,
    pub folders: Arc<FolderService>,
    pub media: Arc<MediaService>,
    pub blogs: Arc<BlogService>,
    pub pages: Arc<PageService>,
    pub users: Arc<UserAdminService>,
    pub categories: Arc<CategoryService>,
    pub search: Arc<SearchService>,
    pub views: Arc<ViewService>,
    pub contact: Arc<ContactService>,
    pub health: Arc<dyn HealthRepo>,
    pub rate_limiter: Arc<ApiRateLimiter>,
    pub client_addresses: Arc<ClientAddressPolicy>,
    pub cookie_secure: bool,
    pub cron_secret: Option<Arc<str>>,
}

impl ApiState {
    /// Wire every service over one repository adapter.
    pub fn new<R: Repositories>(repos: Arc<R>, mailer: Arc<dyn Mailer>, config: ApiConfig) -> Self {
        let sessions = SessionIssuer::new(config.jwt_secret.as_bytes(), config.session_ttl);
        let storage = StorageHosts::new(&config.storage_hosts);

        Self {
            auth: Arc::new(AuthService::new(repos.clone(), sessions)),
            folders: Arc::new(FolderService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
            )),
            media: Arc::new(MediaService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                storage,
            )),
            blogs: Arc::new(BlogService::new(repos.clone(), repos.clone())),
            pages: Arc::new(PageService::new(repos.clone())),
            users: Arc::new(UserAdminService::new(repos.clone())),
            categories: Arc::new(CategoryService::new(repos.clone())),
            search: Arc::new(SearchService::new(repos.clone(), repos.clone())),
            views: Arc::new(ViewService::new(
                repos.clone(),
                config.ip_salt,
                config.retention_days,
            )),
            contact: Arc::new(ContactService::new(mailer, config.admin_address)),
            health: repos,
            rate_limiter: Arc::new(ApiRateLimiter::new(
                config.rate_limit_window,
                config.rate_limit_max,
            )),
            client_addresses: Arc::new(ClientAddressPolicy::new(
                config.trust_forwarded_for,
                config.trusted_proxies,
            )),
            cookie_secure: config.cookie_secure,
            cron_secret: config.cron_secret.map(Arc::from),
        }
    }
}
