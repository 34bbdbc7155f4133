//! Follow and unfollow an author.

use actix_web::{HttpResponse, web};

use yatube_core::DomainError;
use yatube_core::domain::User;
use yatube_core::follow::{FollowOutcome, UnfollowOutcome};

use super::{profile_url, redirect};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

async fn find_author(state: &AppState, username: &str) -> AppResult<User> {
    let author = state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| DomainError::not_found("user", username))?;
    Ok(author)
}

/// GET /profile/{username}/follow/
pub async fn profile_follow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = find_author(&state, &path).await?;

    let outcome = state.follows.follow(identity.user_id, author.id).await?;
    match outcome {
        FollowOutcome::Created => {
            tracing::info!(follower = %identity.username, author = %author.username, "Now following")
        }
        FollowOutcome::AlreadyFollowing | FollowOutcome::SelfFollow => {
            tracing::debug!(follower = %identity.username, ?outcome, "Follow was a no-op")
        }
    }

    Ok(redirect(&profile_url(&author.username)))
}

/// GET /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = find_author(&state, &path).await?;

    let outcome = state.follows.unfollow(identity.user_id, author.id).await?;
    if outcome == UnfollowOutcome::Removed {
        tracing::info!(follower = %identity.username, author = %author.username, "Unfollowed");
    }

    Ok(redirect(&profile_url(&author.username)))
}
