//! Staff-only maintenance endpoints.

use actix_web::{HttpResponse, web};
use serde::Serialize;
use yatube_shared::ApiResponse;

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Serialize)]
struct CacheCleared {
    removed: usize,
}

/// POST /admin/cache/clear/
pub async fn clear_page_cache(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    if !identity.has_role("staff") {
        tracing::warn!(user = %identity.username, "Cache clear refused for non-staff user");
        return Err(AppError::Forbidden);
    }

    let removed = state
        .page_cache
        .clear()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        CacheCleared { removed },
        "Page cache cleared",
    )))
}
