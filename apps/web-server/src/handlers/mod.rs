//! HTTP handlers and route configuration.

mod admin;
mod auth;
mod feeds;
mod follow;
mod health;
mod posts;

#[cfg(test)]
mod tests;

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use serde::Serialize;
use yatube_shared::{ErrorResponse, PageDocument};

use crate::middleware::error::AppResult;
use crate::observability::RequestId;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(feeds::index))
        .route("/health/", web::get().to(health::health_check))
        .route("/group/{slug}/", web::get().to(feeds::group_posts))
        .route("/follow/", web::get().to(feeds::follow_index))
        .service(
            web::scope("/profile/{username}")
                .route("/", web::get().to(feeds::profile))
                .route("/follow/", web::get().to(follow::profile_follow))
                .route("/unfollow/", web::get().to(follow::profile_unfollow)),
        )
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::create_form))
                .route(web::post().to(posts::create)),
        )
        .service(
            web::scope("/posts/{post_id}")
                .route("/", web::get().to(posts::detail))
                .service(
                    web::resource("/edit/")
                        .route(web::get().to(posts::edit_form))
                        .route(web::post().to(posts::edit)),
                )
                .route("/delete/", web::post().to(posts::delete))
                .route("/comment/", web::post().to(posts::add_comment)),
        )
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/signup/")
                        .route(web::get().to(auth::signup_form))
                        .route(web::post().to(auth::signup)),
                )
                .service(
                    web::resource("/login/")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .route("/logout/", web::get().to(auth::logout)),
        )
        .route("/admin/cache/clear/", web::post().to(admin::clear_page_cache));
}

/// Render a page document with the given status.
fn render<T: Serialize>(status: actix_web::http::StatusCode, content: T) -> HttpResponse {
    HttpResponse::build(status).json(PageDocument::new(content))
}

fn page<T: Serialize>(content: T) -> HttpResponse {
    render(actix_web::http::StatusCode::OK, content)
}

/// 302, used after GET-triggered actions.
fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// 303, used after form submissions.
fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

fn post_url(post_id: uuid::Uuid) -> String {
    format!("/posts/{}/", post_id)
}

/// Fallback for every unmatched route.
pub async fn not_found(req: HttpRequest) -> AppResult<HttpResponse> {
    let mut body = ErrorResponse::not_found("The requested page does not exist.")
        .with_instance(req.path());
    if let Some(request_id) = RequestId::of(&req) {
        body = body.with_request_id(request_id.as_str());
    }
    Ok(HttpResponse::NotFound().json(body))
}
