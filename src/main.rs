//! Integration Health Sidecar
//!
//! Serves the integration health tracker over HTTP so workers in any
//! language can record outcomes and query or act on broken integrations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Integration Health Sidecar                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │   API        │───▶│   Tracker    │───▶│  Lifecycle   │       │
//! │  │   Listener   │    │  (buckets,   │    │  Manager     │       │
//! │  │              │    │   policy)    │    │              │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! │  ┌──────────────┐           │                                    │
//! │  │ Ops Listener │◀──────────┘  /healthz /livez /readyz /metrics  │
//! │  └──────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use integration_health::adapters::{
    HttpLifecycleManager, InMemoryCounterStore, InMemoryLifecycleManager, LoggingEventPublisher,
    StaticFeatureFlags,
};
use integration_health::api::{self, ApiResponse, ApiState};
use integration_health::domain::LifecycleManager;
use integration_health::monitoring::HealthCheck;
use integration_health::{IntegrationHealthTracker, TrackerConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Integration Health - broken integration detection sidecar
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tracker configuration file (YAML)
    #[arg(long, env = "HEALTH_CONFIG")]
    config: Option<PathBuf>,

    /// API server bind address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen_addr: String,

    /// Health and metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8081")]
    metrics_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Enable auto-disable for every scope
    #[arg(long, env = "AUTO_DISABLE")]
    auto_disable: bool,

    /// Lifecycle manager base URL; disables stay in-process when unset
    #[arg(long, env = "LIFECYCLE_URL")]
    lifecycle_url: Option<String>,

    /// Lifecycle manager request timeout in seconds
    #[arg(long, env = "LIFECYCLE_TIMEOUT_SECONDS", default_value = "10")]
    lifecycle_timeout_seconds: u64,

    /// Interval between sweeps of expired store keys, in seconds
    #[arg(long, env = "PURGE_INTERVAL_SECONDS", default_value = "300")]
    purge_interval_seconds: u64,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    info!("Starting Integration Health sidecar");
    info!("  API address: {}", args.listen_addr);
    info!("  Ops address: {}", args.metrics_addr);
    info!("  Auto-disable: {}", args.auto_disable);

    let config = match &args.config {
        Some(path) => TrackerConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    info!(
        buffer_days = config.buffer_days,
        fatal_window = config.policy.fatal_window,
        slow_window = config.policy.slow_window,
        min_error_days = config.policy.min_error_days,
        "Tracker configuration loaded"
    );

    let store = Arc::new(InMemoryCounterStore::new());

    let lifecycle: Arc<dyn LifecycleManager> = match &args.lifecycle_url {
        Some(url) => {
            info!("  Lifecycle manager: {}", url);
            Arc::new(
                HttpLifecycleManager::new(
                    url.as_str(),
                    Duration::from_secs(args.lifecycle_timeout_seconds),
                )
                .context("Failed to create lifecycle manager client")?,
            )
        }
        None => {
            warn!("No lifecycle URL configured, disables are kept in-process");
            Arc::new(InMemoryLifecycleManager::new())
        }
    };

    let tracker = IntegrationHealthTracker::new(config, store.clone(), lifecycle)
        .context("Invalid tracker configuration")?
        .with_event_publisher(Arc::new(LoggingEventPublisher::info_level()));

    let health = Arc::new(HealthCheck::new(store.clone()));
    let state = ApiState {
        tracker: Arc::new(tracker),
        flags: Arc::new(StaticFeatureFlags::new(args.auto_disable)),
        health: health.clone(),
    };

    // Sweep expired keys
    let purge_store = store.clone();
    let purge_interval = Duration::from_secs(args.purge_interval_seconds.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_interval);
        loop {
            interval.tick().await;
            let purged = purge_store.purge_expired();
            if purged > 0 {
                debug!(purged, "Purged expired integration keys");
            }
        }
    });

    let api_addr: SocketAddr = args
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid API server address: {}", args.listen_addr))?;
    let ops_addr: SocketAddr = args
        .metrics_addr
        .parse()
        .with_context(|| format!("Invalid ops server address: {}", args.metrics_addr))?;

    tokio::select! {
        result = run_api_server(api_addr, state.clone()) => {
            result.context("API server failed")?;
        }
        result = run_ops_server(ops_addr, state.clone()) => {
            result.context("Ops server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            health.set_live(false);
        }
    }

    info!("Sidecar shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=info".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
    Ok(())
}

fn to_hyper(response: ApiResponse) -> Response<Full<Bytes>> {
    let mut hyper_response = Response::new(Full::new(Bytes::from(response.body)));
    *hyper_response.status_mut() = response.status;
    hyper_response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(response.content_type));
    hyper_response
}

// =============================================================================
// API Server
// =============================================================================

async fn run_api_server(addr: SocketAddr, state: ApiState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server on {}", addr))?;

    info!("API server listening on {}", addr);

    loop {
        let (stream, _) = listener.accept().await.context("API server accept error")?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let state = state.clone();
                async move {
                    let response = api::route(
                        &state,
                        req.method(),
                        req.uri().path(),
                        req.uri().query(),
                    )
                    .await;
                    Ok::<_, Infallible>(to_hyper(response))
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("API server connection error: {}", e);
            }
        });
    }
}

// =============================================================================
// Ops Server
// =============================================================================

async fn run_ops_server(addr: SocketAddr, state: ApiState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind ops server on {}", addr))?;

    info!("Ops server listening on {}", addr);

    loop {
        let (stream, _) = listener.accept().await.context("Ops server accept error")?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let state = state.clone();
                async move {
                    let response = api::route_ops(&state, req.uri().path()).await;
                    Ok::<_, Infallible>(to_hyper(response))
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("Ops server connection error: {}", e);
            }
        });
    }
}
