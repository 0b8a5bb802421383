use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::social::METRIC_PUBLISH_ATTEMPT;
use crate::cache::{METRIC_TOKEN_CACHE_EVICT, METRIC_TOKEN_CACHE_HIT, METRIC_TOKEN_CACHE_MISS};
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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_PUBLISH_ATTEMPT,
            Unit::Count,
            "Platform publish attempts, labelled by platform and result."
        );
        describe_counter!(
            METRIC_TOKEN_CACHE_HIT,
            Unit::Count,
            "Credential lookups served from the token cache."
        );
        describe_counter!(
            METRIC_TOKEN_CACHE_MISS,
            Unit::Count,
            "Credential lookups that had to ask the platform."
        );
        describe_counter!(
            METRIC_TOKEN_CACHE_EVICT,
            Unit::Count,
            "Cached credentials dropped after the platform rejected them."
        );
    });
}
