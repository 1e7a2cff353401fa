//! Driver Safety API Server
//!
//! REST API behind the driver dashboard: live vital status, the "I'm OK"
//! acknowledgment, emergency contact, SOS history, location, and route
//! planning.

use alerting::{Monitor, MonitorHandle, SosEvent};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use routing::{DirectionsProvider, GoogleDirectionsProvider, RoutePlanner};
use sensors::{spawn_sampler, LocationTracker, Position};
use serde::Serialize;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod error;
pub mod rate_limit;
mod routes;
pub mod settings;

pub use error::ApiError;
pub use rate_limit::RateLimitConfig;
pub use settings::{LoggingSettings, Settings, SettingsError};

/// SOS events kept for the dashboard
const SOS_HISTORY_LIMIT: usize = 50;

/// An emitted SOS with where the vehicle was at the time
#[derive(Debug, Clone, Serialize)]
pub struct SosRecord {
    pub event: SosEvent,
    pub location: Position,
}

/// Application state shared across handlers
pub struct AppState<P> {
    /// Handle to the vital monitor loop
    pub monitor: MonitorHandle,
    /// Route planner and last planned route
    pub planner: RoutePlanner<P>,
    /// Last known vehicle location
    pub location: RwLock<LocationTracker>,
    /// Recent SOS events, oldest first
    pub sos_log: RwLock<VecDeque<SosRecord>>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus exporter, if installed
    pub metrics: Option<PrometheusHandle>,
}

/// State as handed to axum
pub type SharedState<P> = Arc<AppState<P>>;

impl<P: DirectionsProvider + 'static> AppState<P> {
    /// Create new application state
    pub fn new(monitor: MonitorHandle, planner: RoutePlanner<P>, location: LocationTracker) -> Self {
        Self {
            monitor,
            planner,
            location: RwLock::new(location),
            sos_log: RwLock::new(VecDeque::with_capacity(SOS_HISTORY_LIMIT)),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for the metrics route
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Store an SOS together with the current map center
    pub async fn record_sos(&self, event: SosEvent) {
        let location = self.location.read().await.center();
        info!(
            "SOS to {} recorded at {:.5}, {:.5}",
            event.contact, location.lat, location.lng
        );

        let mut log = self.sos_log.write().await;
        while log.len() >= SOS_HISTORY_LIMIT {
            log.pop_front();
        }
        log.push_back(SosRecord { event, location });
    }

    /// Record every SOS the monitor emits
    pub fn spawn_sos_recorder(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        let mut sos_rx = state.monitor.subscribe_sos();

        tokio::spawn(async move {
            loop {
                match sos_rx.recv().await {
                    Ok(event) => state.record_sos(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("SOS recorder lagged, {} events dropped", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create the application router
///
/// Mutating routes are rate limited when `limits` is given.
pub fn create_router<P>(state: SharedState<P>, limits: Option<&RateLimitConfig>) -> Router
where
    P: DirectionsProvider + 'static,
{
    let reads = Router::new()
        .route("/api/v1/health", get(health_handler::<P>))
        .route("/api/v1/status", get(routes::alerts::get_status::<P>))
        .route("/api/v1/sos", get(routes::alerts::get_sos::<P>))
        .route("/api/v1/route", get(routes::route::get_route::<P>))
        .route("/api/v1/metrics", get(metrics_handler::<P>));

    let writes = Router::new()
        .route("/api/v1/acknowledge", post(routes::alerts::acknowledge::<P>))
        .route("/api/v1/contact", put(routes::alerts::set_contact::<P>))
        .route("/api/v1/samples", post(routes::sensors::post_sample::<P>))
        .route("/api/v1/location", put(routes::sensors::put_location::<P>))
        .route("/api/v1/route/plan", post(routes::route::plan_route::<P>));

    let writes = match limits.and_then(rate_limit::create_governor_config) {
        Some(config) => writes.layer(GovernorLayer { config }),
        None => writes,
    };

    reads
        .merge(writes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler<P: DirectionsProvider + 'static>(
    State(state): State<SharedState<P>>,
) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: sensors::now_ms() / 1000,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Prometheus scrape handler
async fn metrics_handler<P: DirectionsProvider + 'static>(
    State(state): State<SharedState<P>>,
) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| ApiError::NotFound("Metrics exporter not installed".to_string()))
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
    let level: Level = settings.level.parse()?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Resolve when the process is asked to stop
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

/// Run the monitor, sampler and API server until shutdown
pub async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = PrometheusBuilder::new().install_recorder()?;

    let (monitor, monitor_task) = Monitor::spawn(settings.escalation.clone());

    let source = settings.sampler.source.build(settings.sampler.seed);
    let sampler = spawn_sampler(source, settings.sampler.interval(), monitor.sender());

    let provider = GoogleDirectionsProvider::new(settings.directions.clone())?;
    if settings.directions.api_key.is_empty() {
        warn!("No directions API key configured; route requests will be denied");
    }

    let state = Arc::new(
        AppState::new(
            monitor.clone(),
            RoutePlanner::new(provider),
            LocationTracker::new(settings.map.default_center),
        )
        .with_metrics(metrics),
    );
    let recorder = state.spawn_sos_recorder();

    let rate_limit = settings
        .server
        .rate_limit_enabled
        .then_some(&settings.rate_limit);
    let app = create_router(state, rate_limit);

    info!("Starting API server on {}", settings.server.bind_addr);
    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sampler.abort();
    monitor.shutdown().await?;
    monitor_task.await?;
    recorder.abort();
    info!("Driver safety service stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlertSnapshot, EscalationConfig, Status};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use routing::{Route, RouteError, RouteRequest};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Provider that always answers with the same result
    struct FixedProvider {
        calls: AtomicUsize,
        result: Result<Route, RouteError>,
    }

    impl DirectionsProvider for FixedProvider {
        async fn directions(&self, request: &RouteRequest) -> Result<Route, RouteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map(|route| Route {
                origin: request.origin.clone(),
                destination: request.destination.clone(),
                ..route
            })
        }
    }

    fn ok_route() -> Result<Route, RouteError> {
        Ok(Route {
            origin: String::new(),
            destination: String::new(),
            summary: "CA-1 S".to_string(),
            distance_meters: 12_000,
            duration_seconds: 900,
            polyline: "_p~iF~ps|U".to_string(),
        })
    }

    fn setup(
        result: Result<Route, RouteError>,
    ) -> (Router, SharedState<FixedProvider>, JoinHandle<()>) {
        let (monitor, monitor_task) = Monitor::spawn(EscalationConfig::default());
        let provider = FixedProvider {
            calls: AtomicUsize::new(0),
            result,
        };
        let state = Arc::new(AppState::new(
            monitor,
            RoutePlanner::new(provider),
            LocationTracker::default(),
        ));
        state.spawn_sos_recorder();
        (create_router(state.clone(), None), state, monitor_task)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_health() {
        let (app, _state, _task) = setup(ok_route());
        let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_sample_status() {
        let (app, _state, _task) = setup(ok_route());
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/samples",
            Some(json!({ "heart_rate": 72, "speed": 35 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let snap: AlertSnapshot = serde_json::from_value(body).unwrap();
        assert_eq!(snap.status, Status::Normal);
        assert_eq!(snap.message, "✅ Normal");
        assert!(!snap.timer_armed);

        let (_, body) = call(&app, Method::GET, "/api/v1/status", None).await;
        assert_eq!(body["alert"]["status"], "normal");
        assert_eq!(body["map_center"]["lat"], 37.7749);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_sample_rejected() {
        let (app, _state, _task) = setup(ok_route());
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/samples",
            Some(json!({ "heart_rate": 72, "speed": -3 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("negative"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacknowledged_low_sends_sos() {
        let (app, state, _task) = setup(ok_route());
        call(
            &app,
            Method::POST,
            "/api/v1/samples",
            Some(json!({ "heart_rate": 55, "speed": 20 })),
        )
        .await;

        tokio::time::sleep(Duration::from_secs(11)).await;

        let (_, body) = call(&app, Method::GET, "/api/v1/sos", None).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["event"]["contact"], "911");
        assert_eq!(state.sos_log.read().await.len(), 1);

        let (_, body) = call(&app, Method::GET, "/api/v1/status", None).await;
        assert_eq!(body["alert"]["message"], "🚨 EMERGENCY: Sending SOS to 911!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_prevents_sos() {
        let (app, state, _task) = setup(ok_route());
        call(
            &app,
            Method::POST,
            "/api/v1/samples",
            Some(json!({ "heart_rate": 55, "speed": 20 })),
        )
        .await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        let (status, body) = call(&app, Method::POST, "/api/v1/acknowledge", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["acknowledged"], true);
        assert_eq!(body["timer_armed"], false);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(state.sos_log.read().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_contact_update() {
        let (app, _state, _task) = setup(ok_route());
        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/v1/contact",
            Some(json!({ "contact": "  +44 7700 900000 " })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["emergency_contact"], "+44 7700 900000");

        let (status, _) = call(
            &app,
            Method::PUT,
            "/api/v1/contact",
            Some(json!({ "contact": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_requires_endpoints() {
        let (app, state, _task) = setup(ok_route());
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/route/plan",
            Some(json!({ "origin": "", "destination": "B" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Please enter both origin and destination.");
        assert_eq!(state.planner.provider().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_success_is_stored() {
        let (app, _state, _task) = setup(ok_route());
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/route/plan",
            Some(json!({ "origin": "A", "destination": "B" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["route"]["summary"], "CA-1 S");

        let (status, body) = call(&app, Method::GET, "/api/v1/route", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["destination"], "B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_provider_failure() {
        let (app, state, _task) = setup(Err(RouteError::Provider {
            status: "NOT_FOUND".to_string(),
        }));
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/route/plan",
            Some(json!({ "origin": "A", "destination": "B" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("NOT_FOUND"));
        assert_eq!(state.planner.provider().calls.load(Ordering::SeqCst), 1);

        let (status, _) = call(&app, Method::GET, "/api/v1/route", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_updates_center() {
        let (app, _state, _task) = setup(ok_route());
        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/v1/location",
            Some(json!({ "lat": 34.05, "lng": -118.25 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["center"]["lat"], 34.05);
        assert_eq!(body["notice"], Value::Null);

        let (_, body) = call(
            &app,
            Method::PUT,
            "/api/v1/location",
            Some(json!({ "error": "permission_denied" })),
        )
        .await;
        assert_eq!(body["center"]["lat"], 34.05);
        assert_eq!(
            body["notice"],
            "Unable to track location. Please enable location services."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_without_exporter() {
        let (app, _state, _task) = setup(ok_route());
        let (status, _) = call(&app, Method::GET, "/api/v1/metrics", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_gone() {
        let (app, state, task) = setup(ok_route());
        state.monitor.shutdown().await.unwrap();
        task.await.unwrap();

        let (status, _) = call(&app, Method::POST, "/api/v1/acknowledge", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
