//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;
use yatube_shared::ApiResponse;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
    pub cache: &'static str,
    pub timestamp: String,
}

/// GET /health/
///
/// Reports `degraded` with a 503 when the configured database stops answering.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let healthy = store_reachable(&state).await;

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store: state.store_backend,
        cache: state.cache_backend,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    if healthy {
        HttpResponse::Ok().json(ApiResponse::ok(response))
    } else {
        HttpResponse::ServiceUnavailable().json(ApiResponse::ok(response))
    }
}

#[cfg(feature = "postgres")]
async fn store_reachable(state: &AppState) -> bool {
    match &state.db {
        Some(db) => match db.main.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Database ping failed");
                false
            }
        },
        None => true,
    }
}

#[cfg(not(feature = "postgres"))]
async fn store_reachable(_state: &AppState) -> bool {
    true
}
