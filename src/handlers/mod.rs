mod feedback;
mod licenses;
mod verify;
mod webhook;

pub use feedback::*;
pub use licenses::*;
pub use verify::*;
pub use webhook::*;

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use serde::Serialize;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the application router. Rate limiting is only attached when serving
/// for real (it keys on the peer address, which tests don't provide).
pub fn router(state: AppState) -> Router {
    build(state, false)
}

pub fn router_with_rate_limits(state: AppState) -> Router {
    build(state, true)
}

fn build(state: AppState, rate_limits: bool) -> Router {
    let config = state.config.clone();

    // The verify endpoint is called from customer sites in the browser, so
    // it accepts any origin. Everything else honors the configured list.
    let mut verify_routes = Router::new()
        .route("/verify", post(verify_license))
        .layer(permissive_cors());

    let mut admin_license_routes = Router::new()
        .route("/create", post(create_license))
        .route("/stats", get(license_stats))
        .route("/", get(list_licenses))
        .route("/webhook", post(process_webhook))
        .route(
            "/{key}",
            get(get_license).patch(update_license).delete(delete_license),
        )
        .route("/{key}/activate", post(activate_license))
        .route("/{key}/deactivate", post(deactivate_license))
        .layer(allow_list_cors(&config));

    let feedback_routes = Router::new()
        .route("/", post(create_feedback).get(list_feedback))
        .route("/stats", get(feedback_stats))
        .route("/{id}", get(get_feedback))
        .route("/{id}/status", patch(update_feedback_status));

    if rate_limits {
        verify_routes = verify_routes.layer(governor_layer(
            config.verify_rate_limit_replenish_ms,
            config.verify_rate_limit_burst,
        ));
        admin_license_routes = admin_license_routes.layer(governor_layer(
            config.rate_limit_replenish_secs * 1000,
            config.rate_limit_burst,
        ));
    }

    Router::new()
        .route("/health", get(health))
        .nest("/api/licenses", verify_routes.merge(admin_license_routes))
        .nest(
            "/api/feedback",
            feedback_routes.layer(allow_list_cors(&config)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn governor_layer(
    replenish_ms: u64,
    burst: u32,
) -> GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body> {
    let config = GovernorConfigBuilder::default()
        .per_millisecond(replenish_ms)
        .burst_size(burst)
        .finish()
        .expect("rate limit intervals are clamped to non-zero in Config");
    GovernorLayer::new(Arc::new(config))
}

fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

fn allow_list_cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring unparseable CORS origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
