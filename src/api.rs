//! HTTP API
//!
//! Request routing for the sidecar binary, kept independent of the server so
//! it can be tested without sockets.
//!
//! # Routes
//!
//! ```text
//! POST /v1/integrations/{key}/outcomes/{success|error|fatal}   202
//! GET  /v1/integrations/{key}/health                           200
//! POST /v1/integrations/{key}/evaluate?scope={scope}           200 / 502
//!
//! GET  /healthz | /livez | /readyz | /metrics                  (ops listener)
//! ```

use std::sync::Arc;

use hyper::{Method, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::domain::ports::{FeatureFlags, IntegrationKey, OutcomeKind};
use crate::monitoring::HealthCheck;
use crate::tracker::{BrokenReason, DayBucket, DisablePolicy, IntegrationHealthTracker};

const API_PREFIX: &str = "/v1/integrations/";
const DEFAULT_SCOPE: &str = "global";

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

/// Shared state handed to every request.
#[derive(Clone)]
pub struct ApiState {
    pub tracker: Arc<IntegrationHealthTracker>,
    pub flags: Arc<dyn FeatureFlags>,
    pub health: Arc<HealthCheck>,
}

/// A routed response, converted to a hyper response by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
    pub content_type: &'static str,
}

impl ApiResponse {
    fn json(status: StatusCode, value: impl Serialize) -> Self {
        match serde_json::to_string(&value) {
            Ok(body) => Self {
                status,
                body,
                content_type: JSON,
            },
            Err(e) => Self::text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }

    fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: TEXT,
        }
    }

    fn error(status: StatusCode, message: impl std::fmt::Display) -> Self {
        Self::json(status, json!({ "error": message.to_string() }))
    }

    fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, "not found")
    }

    fn method_not_allowed() -> Self {
        Self::error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }
}

#[derive(Debug, Serialize)]
struct HealthBody<'a> {
    integration: &'a IntegrationKey,
    broken: bool,
    reason: Option<BrokenReason>,
    buckets: &'a [DayBucket],
}

// =============================================================================
// API Routes
// =============================================================================

/// Route a request on the API listener.
pub async fn route(state: &ApiState, method: &Method, path: &str, query: Option<&str>) -> ApiResponse {
    let Some(rest) = path.strip_prefix(API_PREFIX) else {
        return ApiResponse::not_found();
    };
    let segments: Vec<&str> = rest.split('/').collect();

    let (raw_key, action) = match segments.as_slice() {
        [key, "outcomes", kind] => (*key, Action::Record(*kind)),
        [key, "health"] => (*key, Action::Health),
        [key, "evaluate"] => (*key, Action::Evaluate),
        _ => return ApiResponse::not_found(),
    };

    if *method != action.method() {
        return ApiResponse::method_not_allowed();
    }

    let key = match decode_key(raw_key) {
        Ok(key) => key,
        Err(message) => return ApiResponse::error(StatusCode::BAD_REQUEST, message),
    };

    match action {
        Action::Record(kind) => record(state, &key, kind).await,
        Action::Health => health(state, &key).await,
        Action::Evaluate => evaluate(state, &key, scope(query).as_deref()).await,
    }
}

enum Action<'a> {
    Record(&'a str),
    Health,
    Evaluate,
}

impl Action<'_> {
    fn method(&self) -> Method {
        match self {
            Action::Record(_) | Action::Evaluate => Method::POST,
            Action::Health => Method::GET,
        }
    }
}

fn decode_key(raw: &str) -> std::result::Result<IntegrationKey, String> {
    let decoded = urlencoding::decode(raw).map_err(|e| format!("invalid key encoding: {}", e))?;
    IntegrationKey::parse(&decoded).map_err(|e| e.to_string())
}

/// The `scope` query parameter, if present and non-empty.
fn scope(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == "scope")
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}

async fn record(state: &ApiState, key: &IntegrationKey, kind: &str) -> ApiResponse {
    let kind: OutcomeKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return ApiResponse::error(StatusCode::BAD_REQUEST, e),
    };

    state.tracker.record(key, kind).await;
    ApiResponse::json(StatusCode::ACCEPTED, json!({ "recorded": kind }))
}

async fn health(state: &ApiState, key: &IntegrationKey) -> ApiResponse {
    let broken = state.tracker.broken_state(key).await;
    let buckets = match state.tracker.request_log(key).await {
        Ok(log) => log.buckets().to_vec(),
        Err(e) => {
            debug!(integration = %key, error = %e, "Serving health without buckets");
            Vec::new()
        }
    };

    ApiResponse::json(
        StatusCode::OK,
        HealthBody {
            integration: key,
            broken: broken.is_broken(),
            reason: broken.reason,
            buckets: &buckets,
        },
    )
}

async fn evaluate(state: &ApiState, key: &IntegrationKey, scope: Option<&str>) -> ApiResponse {
    let scope = scope.unwrap_or(DEFAULT_SCOPE);
    let flag = &state.tracker.config().auto_disable_flag;
    let policy = DisablePolicy::resolve(state.flags.as_ref(), flag, scope).await;

    match state.tracker.evaluate(key, &policy).await {
        Ok(decision) => ApiResponse::json(
            StatusCode::OK,
            json!({
                "broken": decision.state.is_broken(),
                "reason": decision.state.reason,
                "disabled": decision.triggered,
            }),
        ),
        Err(e) => ApiResponse::error(StatusCode::BAD_GATEWAY, e),
    }
}

// =============================================================================
// Ops Routes
// =============================================================================

/// Route a request on the health/metrics listener.
pub async fn route_ops(state: &ApiState, path: &str) -> ApiResponse {
    match path {
        "/healthz" | "/livez" => {
            let check = state.health.liveness_check();
            let status = if check.status.is_operational() {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            ApiResponse::json(status, check)
        }
        "/readyz" => {
            let response = state.health.check_all().await;
            let status = if response.status.is_operational() {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            ApiResponse::json(status, response)
        }
        "/metrics" => match state.tracker.metrics().export_text() {
            Ok(body) => ApiResponse {
                status: StatusCode::OK,
                body,
                content_type: PROMETHEUS_TEXT,
            },
            Err(e) => ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e),
        },
        _ => ApiResponse::not_found(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryCounterStore, InMemoryLifecycleManager, StaticFeatureFlags};
    use crate::tracker::TrackerConfig;

    struct Fixture {
        state: ApiState,
        store: Arc<InMemoryCounterStore>,
        lifecycle: Arc<InMemoryLifecycleManager>,
        flags: Arc<StaticFeatureFlags>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryCounterStore::new());
        let lifecycle = Arc::new(InMemoryLifecycleManager::new());
        let flags = Arc::new(StaticFeatureFlags::new(false));
        let tracker =
            IntegrationHealthTracker::new(TrackerConfig::default(), store.clone(), lifecycle.clone())
                .unwrap();

        Fixture {
            state: ApiState {
                tracker: Arc::new(tracker),
                flags: flags.clone(),
                health: Arc::new(HealthCheck::new(store.clone())),
            },
            store,
            lifecycle,
            flags,
        }
    }

    const KEY_PATH: &str = "/v1/integrations/integration-health%3Aslack%3A1";

    fn path(suffix: &str) -> String {
        format!("{}{}", KEY_PATH, suffix)
    }

    fn body(response: &ApiResponse) -> serde_json::Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_record_outcome_accepted() {
        let f = fixture();
        let response = route(&f.state, &Method::POST, &path("/outcomes/error"), None).await;
        assert_eq!(response.status, StatusCode::ACCEPTED);

        let key = IntegrationKey::for_integration("slack", 1);
        let log = f.state.tracker.request_log(&key).await.unwrap();
        assert_eq!(log.latest().unwrap().error_count, 1);
    }

    #[tokio::test]
    async fn test_record_bad_kind_rejected() {
        let f = fixture();
        let response = route(&f.state, &Method::POST, &path("/outcomes/warning"), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let f = fixture();
        let response = route(&f.state, &Method::GET, &path("/outcomes/error"), None).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);

        let response = route(&f.state, &Method::POST, &path("/health"), None).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let f = fixture();
        for p in ["/", "/v1/integrations/", "/v1/other", path("/outcomes").as_str()] {
            let response = route(&f.state, &Method::GET, p, None).await;
            assert_eq!(response.status, StatusCode::NOT_FOUND, "path {}", p);
        }
    }

    #[tokio::test]
    async fn test_health_reports_buckets() {
        let f = fixture();
        route(&f.state, &Method::POST, &path("/outcomes/fatal"), None).await;

        let response = route(&f.state, &Method::GET, &path("/health"), None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type, JSON);

        let json = body(&response);
        assert_eq!(json["integration"], "integration-health:slack:1");
        assert_eq!(json["broken"], true);
        assert_eq!(json["reason"]["trip"], "fatal");
        assert_eq!(json["buckets"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_uses_scope_flag() {
        let f = fixture();
        route(&f.state, &Method::POST, &path("/outcomes/fatal"), None).await;

        let response = route(&f.state, &Method::POST, &path("/evaluate"), Some("scope=acme")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body(&response)["disabled"], false);
        assert_eq!(f.lifecycle.calls(), 0);

        let flag = f.state.tracker.config().auto_disable_flag.clone();
        f.flags.set(flag, "acme", true);

        let response = route(&f.state, &Method::POST, &path("/evaluate"), Some("scope=acme")).await;
        let json = body(&response);
        assert_eq!(json["broken"], true);
        assert_eq!(json["disabled"], true);
        assert_eq!(f.lifecycle.transitions(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_lifecycle_failure_is_bad_gateway() {
        let f = fixture();
        f.flags.set(f.state.tracker.config().auto_disable_flag.clone(), DEFAULT_SCOPE, true);
        f.lifecycle.set_failing(true);
        route(&f.state, &Method::POST, &path("/outcomes/fatal"), None).await;

        let response = route(&f.state, &Method::POST, &path("/evaluate"), None).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let f = fixture();
        let response = route(&f.state, &Method::GET, "/v1/integrations/%20/health", None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!(scope(None), None);
        assert_eq!(scope(Some("scope=acme")), Some("acme".to_string()));
        assert_eq!(scope(Some("x=1&scope=my%20org")), Some("my org".to_string()));
        assert_eq!(scope(Some("scope=")), None);
    }

    #[tokio::test]
    async fn test_ops_routes() {
        let f = fixture();

        assert_eq!(route_ops(&f.state, "/healthz").await.status, StatusCode::OK);
        assert_eq!(route_ops(&f.state, "/readyz").await.status, StatusCode::OK);

        f.store.set_available(false);
        assert_eq!(
            route_ops(&f.state, "/readyz").await.status,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(route_ops(&f.state, "/livez").await.status, StatusCode::OK);

        f.state.health.set_live(false);
        assert_eq!(
            route_ops(&f.state, "/livez").await.status,
            StatusCode::SERVICE_UNAVAILABLE
        );

        assert_eq!(route_ops(&f.state, "/nope").await.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let f = fixture();
        route(&f.state, &Method::POST, &path("/outcomes/success"), None).await;

        let response = route_ops(&f.state, "/metrics").await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type, PROMETHEUS_TEXT);
        assert!(response.body.contains("integration_health_outcomes_recorded_total"));
    }
}
