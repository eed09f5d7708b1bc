//! # Structured Logging Module
//!
//! Environment-aware structured logging for handler resolution and scope lifecycles.

use crate::config::{ActivationConfig, LoggingConfig};
use crate::constants::environments;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging for the configured environment. Safe to call more
/// than once; only the first call installs a subscriber.
pub fn init_structured_logging(config: &ActivationConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = config.environment.as_str();
        let log_level = filter_directive(environment, &config.logging);
        let logging = &config.logging;

        let console = if logging.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::new(log_level.clone()))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(EnvFilter::new(log_level.clone()))
                .boxed()
        };

        // A host application may already own the global subscriber
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            level = %log_level,
            json = logging.json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Explicit level if configured, otherwise the environment's default
fn filter_directive(environment: &str, logging: &LoggingConfig) -> String {
    logging
        .level
        .clone()
        .unwrap_or_else(|| get_log_level(environment))
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        environments::PRODUCTION => "info".to_string(),
        environments::DEVELOPMENT | environments::TEST => "debug".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for a handler resolution
pub fn log_resolution_operation(
    message_type: &str,
    unit_of_work_id: Option<&str>,
    handler_count: usize,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        message_type = %message_type,
        unit_of_work_id = unit_of_work_id,
        handler_count = handler_count,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🎯 RESOLUTION_OPERATION"
    );
}

/// Log structured data for a scope lifecycle event
pub fn log_scope_operation(operation: &str, unit_of_work_id: Option<&str>, tracked: bool) {
    tracing::info!(
        operation = %operation,
        unit_of_work_id = unit_of_work_id,
        tracked = tracked,
        timestamp = %Utc::now().to_rfc3339(),
        "📦 SCOPE_OPERATION"
    );
}
