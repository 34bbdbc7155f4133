//! Feed pages: index, group, profile and the follow feed.

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use serde::Serialize;

use yatube_core::domain::{Group, PostCard, UserSummary};
use yatube_core::feed::FeedScope;
use yatube_core::pagination::{Page, RequestedPage};
use yatube_core::DomainError;
use yatube_shared::PageDocument;
use yatube_shared::dto::PageQuery;

use super::page;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Response header telling whether the index came from the page cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

#[derive(Serialize)]
struct IndexPage {
    title: &'static str,
    page_obj: Page<PostCard>,
}

#[derive(Serialize)]
struct GroupPage {
    group: Group,
    page_obj: Page<PostCard>,
}

#[derive(Serialize)]
struct ProfilePage {
    title: String,
    author: UserSummary,
    following: bool,
    page_obj: Page<PostCard>,
}

#[derive(Serialize)]
struct FollowPage {
    title: &'static str,
    page_obj: Page<PostCard>,
}

fn requested(query: &PageQuery) -> RequestedPage {
    RequestedPage::parse(query.page.as_deref())
}

/// GET /
///
/// Served from the page cache; a hit replays the stored body byte for byte.
pub async fn index(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let requested = requested(&query);
    let feed = state.feed.clone();

    let cached = state
        .page_cache
        .get_or_render(req.path(), req.query_string(), || async move {
            let page_obj = feed.page(FeedScope::Index, requested).await?;
            let body = serde_json::to_string(&PageDocument::new(IndexPage {
                title: "Latest updates on the site",
                page_obj,
            }))?;
            Ok::<_, AppError>(body)
        })
        .await?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .insert_header((CACHE_STATUS_HEADER, if cached.hit { "HIT" } else { "MISS" }))
        .insert_header((
            header::CACHE_CONTROL,
            format!("max-age={}", state.page_cache.ttl().as_secs()),
        ))
        .body(cached.body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let group = state
        .groups
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("group", &slug))?;

    let page_obj = state
        .feed
        .page(FeedScope::Group(group.id), requested(&query))
        .await?;

    Ok(page(GroupPage { group, page_obj }))
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("user", &username))?;

    let following = match viewer.user_id() {
        Some(viewer) => state.follows.is_following(viewer, author.id).await?,
        None => false,
    };

    let page_obj = state
        .feed
        .page(FeedScope::Author(author.id), requested(&query))
        .await?;

    Ok(page(ProfilePage {
        title: format!("Profile of {}", author.username),
        author: author.summary(),
        following,
        page_obj,
    }))
}

/// GET /follow/
pub async fn follow_index(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page_obj = state
        .feed
        .page(FeedScope::Following(identity.user_id), requested(&query))
        .await?;

    Ok(page(FollowPage {
        title: "Posts from authors you follow",
        page_obj,
    }))
}
