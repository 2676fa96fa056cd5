//! View counting with a per-day ledger, and ledger retention.

use std::sync::Arc;

use metrics::counter;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::admin::content::ContentError;
use crate::application::repos::MediaViewsRepo;
use crate::domain::views::{ViewKey, ViewOutcome, retention_cutoff};

pub const METRIC_VIEWS_COUNTED: &str = "archive_media_views_counted_total";
pub const METRIC_VIEWS_DUPLICATE: &str = "archive_media_views_duplicate_total";
pub const METRIC_LEDGER_PURGED: &str = "archive_media_view_ledger_purged_total";

#[derive(Clone)]
pub struct ViewService {
    views: Arc<dyn MediaViewsRepo>,
    ip_salt: String,
    retention_days: u32,
}

impl ViewService {
    pub fn new(views: Arc<dyn MediaViewsRepo>, ip_salt: String, retention_days: u32) -> Self {
        Self {
            views,
            ip_salt,
            retention_days,
        }
    }

    /// Count a view of a published item at most once per client and UTC day.
    pub async fn record(&self, media_id: Uuid, client_ip: &str) -> Result<ViewOutcome, ContentError> {
        let key = ViewKey::new(media_id, &self.ip_salt, client_ip, OffsetDateTime::now_utc());
        let outcome = self
            .views
            .record_view(&key)
            .await?
            .ok_or(ContentError::NotFound("media"))?;

        if outcome.counted {
            counter!(METRIC_VIEWS_COUNTED).increment(1);
        } else {
            counter!(METRIC_VIEWS_DUPLICATE).increment(1);
            debug!(
                target = "sylheti_archive::views",
                media_id = %media_id,
                day = %key.date_day,
                "view already counted today"
            );
        }
        Ok(outcome)
    }

    /// Delete ledger rows older than the retention window.
    pub async fn purge_expired(&self) -> Result<u64, ContentError> {
        let cutoff = retention_cutoff(OffsetDateTime::now_utc(), self.retention_days);
        let purged = self.views.purge_views_before(cutoff).await?;
        counter!(METRIC_LEDGER_PURGED).increment(purged);
        info!(
            target = "sylheti_archive::views",
            purged,
            retention_days = self.retention_days,
            "view ledger purged"
        );
        Ok(purged)
    }
}
