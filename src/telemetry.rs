//! Tracing setup and request correlation for the landlord service.
//!
//! Every inbound request gets a trace id that rides along in task-local
//! storage, so repositories and error responses deep in the call stack can
//! stamp it without threading it through every signature.

use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::AppConfig;

/// Correlation data carried across a single request's tasks.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

task_local! {
    static CURRENT_TRACE: TraceContext;
}

#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to bridge `log` records into tracing: {0}")]
    LogBridge(#[from] log::SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the global tracing subscriber once per process.
///
/// `RUST_LOG` wins over the configured log level, and `log_format` picks
/// between the json output used in deployment and pretty output for local
/// runs. Repeated calls are no-ops so tests can share a process.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    // Route legacy `log::` macros from dependencies through tracing.
    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
    {
        eprintln!("warning: log bridge already installed, skipping: {err}");
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let format_layer = if config.log_format == "pretty" {
        fmt::layer().pretty().boxed()
    } else {
        fmt::layer().json().boxed()
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(format_layer)
        .try_init()
    {
        INSTALLED.store(false, Ordering::SeqCst);
        eprintln!("warning: a tracing subscriber is already set, keeping it: {err}");
    }

    Ok(())
}

/// Run `future` with `context` bound to the current task.
pub async fn with_trace_context<F>(context: TraceContext, future: F) -> F::Output
where
    F: std::future::Future,
{
    CURRENT_TRACE.scope(context, future).await
}

/// Trace id of the current task, if one is bound.
pub fn current_trace_id() -> Option<String> {
    CURRENT_TRACE.try_with(|ctx| ctx.trace_id.clone()).ok()
}
