//! Tracing subscriber installation and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::admin::folders::METRIC_FOLDERS_CASCADE_DELETED;
use crate::application::views::{
    METRIC_LEDGER_PURGED, METRIC_VIEWS_COUNTED, METRIC_VIEWS_DUPLICATE,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

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
            METRIC_VIEWS_COUNTED,
            Unit::Count,
            "Media view pings that incremented the public counter."
        );
        describe_counter!(
            METRIC_VIEWS_DUPLICATE,
            Unit::Count,
            "Media view pings already counted for the client on that UTC day."
        );
        describe_counter!(
            METRIC_LEDGER_PURGED,
            Unit::Count,
            "View-ledger rows removed by the retention cleanup."
        );
        describe_counter!(
            METRIC_FOLDERS_CASCADE_DELETED,
            Unit::Count,
            "Folders removed by cascading deletes, descendants included."
        );
    });
}
