//! Cron job purging view-ledger rows past the retention window.

use std::str::FromStr;
use std::sync::Arc;

use apalis::prelude::*;
use apalis_cron::Schedule;

use crate::application::error::AppError;
use crate::application::views::ViewService;

/// Marker payload emitted by the cron stream on every tick.
#[derive(Default, Debug, Clone)]
pub struct CleanupMediaViewsJob;

impl From<chrono::DateTime<chrono::Utc>> for CleanupMediaViewsJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

#[derive(Clone)]
pub struct CleanupMediaViewsContext {
    pub views: Arc<ViewService>,
}

/// Failures are logged and swallowed; the next tick retries with a later cutoff.
pub async fn process_cleanup_media_views_job(
    _job: CleanupMediaViewsJob,
    ctx: Data<CleanupMediaViewsContext>,
) -> Result<(), apalis::prelude::Error> {
    if let Err(err) = ctx.views.purge_expired().await {
        tracing::warn!(error = %err, "failed to purge media view ledger");
    }
    Ok(())
}

/// Parse the configured six-field cron expression.
pub fn cleanup_media_views_schedule(expression: &str) -> Result<Schedule, AppError> {
    Schedule::from_str(expression).map_err(|err| {
        AppError::validation(format!(
            "scheduler.cleanup_cron `{expression}` is not a valid cron expression: {err}"
        ))
    })
}
