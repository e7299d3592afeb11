//! Logging.

use anyhow::Error as GenericError;
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_subscriber::{
    layer::SubscriberExt as _, registry::LookupSpan, util::SubscriberInitExt as _, EnvFilter, Layer,
};

const LOG_LEVEL_ENV_VAR: &str = "FLUXGATE_LOG_LEVEL";
const LOG_FORMAT_JSON_ENV_VAR: &str = "FLUXGATE_LOG_FORMAT_JSON";

/// Initializes the logging subsystem for `tracing`.
///
/// The filtering directives are read from `FLUXGATE_LOG_LEVEL`, falling back to `default_level`, or `INFO` if no
/// default level is given. Invalid directives are ignored. When `FLUXGATE_LOG_FORMAT_JSON` is set to `true` or `1`
/// (case insensitive), logs are written as JSON. Otherwise, they are written in a human-readable format.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error will be returned.
pub fn initialize_logging(default_level: Option<LevelFilter>) -> Result<(), GenericError> {
    let is_json = std::env::var(LOG_FORMAT_JSON_ENV_VAR)
        .map(|s| is_truthy(&s))
        .unwrap_or(false);

    let level_filter = EnvFilter::builder()
        .with_default_directive(default_level.unwrap_or(LevelFilter::INFO).into())
        .with_env_var(LOG_LEVEL_ENV_VAR)
        .from_env_lossy();

    if is_json {
        tracing_subscriber::registry()
            .with(json_layer().with_filter(level_filter))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(pretty_layer().with_filter(level_filter))
            .try_init()?;
    }

    Ok(())
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "true" || value == "1"
}

fn json_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::Layer::new()
        .json()
        .flatten_event(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
}

fn pretty_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::Layer::new().with_target(true)
}
