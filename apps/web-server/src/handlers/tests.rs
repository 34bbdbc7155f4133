use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::{App, test, web};
use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use yatube_core::domain::{Group, Post, User};
use yatube_core::follow::FollowOutcome;
use yatube_core::ports::{BaseRepository, TokenService};
use yatube_infra::auth::JwtConfig;
use yatube_infra::cache::{InMemoryCache, PageCacheKeyStrategy};

use super::feeds::CACHE_STATUS_HEADER;
use crate::config::PageCacheConfig;
use crate::middleware::auth::SESSION_COOKIE;
use crate::state::{AppState, Repositories};

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(NormalizePath::new(TrailingSlash::Always))
                .app_data($state.clone())
                .configure(super::configure_routes)
                .default_service(web::to(super::not_found)),
        )
        .await
    };
}

struct Fixture {
    state: web::Data<AppState>,
    repos: Repositories,
}

impl Fixture {
    fn new() -> Self {
        Self::with_cache(PageCacheConfig::default())
    }

    fn with_cache(page_cache: PageCacheConfig) -> Self {
        let repos = Repositories::in_memory();
        let jwt = JwtConfig {
            secret: "handler-tests".to_string(),
            ..JwtConfig::default()
        };
        let state = AppState::from_parts(
            repos.clone(),
            Arc::new(InMemoryCache::new()),
            &page_cache,
            jwt,
        );
        Self {
            state: web::Data::new(state),
            repos,
        }
    }

    async fn user(&self, username: &str) -> User {
        self.insert_user(username, false).await
    }

    async fn staff(&self, username: &str) -> User {
        self.insert_user(username, true).await
    }

    async fn insert_user(&self, username: &str, is_staff: bool) -> User {
        let mut user = User::new(
            username.to_string(),
            format!("{username}@example.com"),
            "unused".to_string(),
        );
        user.is_staff = is_staff;
        self.repos.users.insert(user).await.unwrap()
    }

    async fn group(&self, slug: &str) -> Group {
        self.repos
            .groups
            .insert(Group::new(
                format!("Group {slug}"),
                slug.to_string(),
                String::new(),
            ))
            .await
            .unwrap()
    }

    /// Insert `n` posts, oldest first, one second apart.
    async fn posts(&self, author: &User, group: Option<&Group>, n: usize) -> Vec<Post> {
        let base = Utc::now() - Duration::hours(1);
        let mut created = Vec::new();
        for i in 0..n {
            let mut post = Post::new(
                author.id,
                group.map(|g| g.id),
                format!("{} post {}", author.username, i + 1),
                None,
            );
            post.created_at = base + Duration::seconds(i as i64);
            created.push(self.repos.posts.insert(post).await.unwrap());
        }
        created
    }

    fn session(&self, user: &User) -> Cookie<'static> {
        let token = self
            .state
            .tokens
            .generate_token(user.id, &user.username, user.roles())
            .unwrap();
        Cookie::new(SESSION_COOKIE, token)
    }
}

fn location(resp: &actix_web::dev::ServiceResponse) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn item_texts(body: &Value) -> Vec<String> {
    body["page_obj"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["text"].as_str().unwrap().to_string())
        .collect()
}

#[actix_web::test]
async fn test_unknown_route_is_404() {
    let fx = Fixture::new();
    let app = test_app!(fx.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/unexisting_page/").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["instance"], "/unexisting_page/");
}

#[actix_web::test]
async fn test_index_paginates_thirteen_posts() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    fx.posts(&author, None, 13).await;
    let app = test_app!(fx.state);

    let first: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/").to_request(),
    )
    .await;
    let texts = item_texts(&first);
    assert_eq!(texts.len(), 10);
    assert_eq!(texts[0], "auth post 13");
    assert_eq!(first["page_obj"]["meta"]["num_pages"], 2);
    assert!(first["year"].is_i64());

    let second: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/?page=2").to_request(),
    )
    .await;
    assert_eq!(
        item_texts(&second),
        vec!["auth post 3", "auth post 2", "auth post 1"]
    );
}

#[actix_web::test]
async fn test_page_parameter_is_forgiving() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    fx.posts(&author, None, 13).await;
    let app = test_app!(fx.state);

    for (query, expected) in [
        ("abc", 1),
        ("1.0", 1),
        ("99", 2),
        ("0", 2),
        ("-3", 2),
        ("99999999999999999999", 2),
    ] {
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri(&format!("/profile/auth/?page={query}"))
                .to_request(),
        )
        .await;
        assert_eq!(body["page_obj"]["meta"]["number"], expected, "page={query}");
    }
}

#[actix_web::test]
async fn test_index_is_served_from_cache_until_cleared() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let admin = fx.staff("admin").await;
    let posts = fx.posts(&author, None, 2).await;
    let app = test_app!(fx.state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.headers().get(CACHE_STATUS_HEADER).unwrap(), "MISS");
    let before = test::read_body(resp).await;

    fx.repos.posts.delete(posts[1].id).await.unwrap();

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.headers().get(CACHE_STATUS_HEADER).unwrap(), "HIT");
    assert_eq!(test::read_body(resp).await, before);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/admin/cache/clear/")
            .cookie(fx.session(&admin))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let after: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(item_texts(&after), vec!["auth post 1"]);
}

#[actix_web::test]
async fn test_path_keyed_cache_repeats_first_page() {
    let fx = Fixture::with_cache(PageCacheConfig {
        key_strategy: PageCacheKeyStrategy::Path,
        ..PageCacheConfig::default()
    });
    let author = fx.user("auth").await;
    fx.posts(&author, None, 13).await;
    let app = test_app!(fx.state);

    let first = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    let second = test::call_and_read_body(
        &app,
        test::TestRequest::get().uri("/?page=2").to_request(),
    )
    .await;

    assert_eq!(first, second);
}

#[actix_web::test]
async fn test_cache_clear_requires_staff() {
    let fx = Fixture::new();
    let user = fx.user("regular").await;
    let app = test_app!(fx.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/admin/cache/clear/")
            .cookie(fx.session(&user))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_anonymous_create_redirects_to_login() {
    let fx = Fixture::new();
    let app = test_app!(fx.state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/create").to_request()).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=%2Fcreate%2F");
}

#[actix_web::test]
async fn test_create_post() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let group = fx.group("cats").await;
    let app = test_app!(fx.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(fx.session(&author))
            .set_form([("text", "Fresh post"), ("group", "cats")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile/auth/");

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/group/cats/").to_request(),
    )
    .await;
    assert_eq!(item_texts(&body), vec!["Fresh post"]);
    assert_eq!(body["group"]["slug"], group.slug);
}

#[actix_web::test]
async fn test_invalid_post_form_is_redisplayed() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let app = test_app!(fx.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(fx.session(&author))
            .set_form([("text", "   "), ("group", "missing")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["form"]["errors"]["text"][0], "This field is required.");
    assert_eq!(body["form"]["errors"]["group"][0], "Select a valid choice.");
    assert_eq!(body["form"]["values"]["group"], "missing");
    assert_eq!(body["is_edit"], false);
}

#[actix_web::test]
async fn test_non_author_edit_redirects_to_detail() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let intruder = fx.user("intruder").await;
    let post = fx.posts(&author, None, 1).await.remove(0);
    let app = test_app!(fx.state);
    let detail_url = format!("/posts/{}/", post.id);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(fx.session(&intruder))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), detail_url);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(fx.session(&intruder))
            .set_form([("text", "hijacked")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), detail_url);

    let unchanged = fx.repos.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, post.text);
}

#[actix_web::test]
async fn test_author_edits_post() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let post = fx.posts(&author, None, 1).await.remove(0);
    let app = test_app!(fx.state);

    let form: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(fx.session(&author))
            .to_request(),
    )
    .await;
    assert_eq!(form["is_edit"], true);
    assert_eq!(form["form"]["values"]["text"], post.text);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(fx.session(&author))
            .set_form([("text", "Edited text")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let edited = fx.repos.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(edited.text, "Edited text");
}

#[actix_web::test]
async fn test_delete_is_author_only() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let other = fx.user("other").await;
    let post = fx.posts(&author, None, 1).await.remove(0);
    let app = test_app!(fx.state);
    let uri = format!("/posts/{}/delete/", post.id);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&uri)
            .cookie(fx.session(&other))
            .to_request(),
    )
    .await;
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    assert!(fx.repos.posts.find_by_id(post.id).await.unwrap().is_some());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&uri)
            .cookie(fx.session(&author))
            .to_request(),
    )
    .await;
    assert_eq!(location(&resp), "/profile/auth/");
    assert!(fx.repos.posts.find_by_id(post.id).await.unwrap().is_none());
}

#[actix_web::test]
async fn test_comments() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let reader = fx.user("reader").await;
    let post = fx.posts(&author, None, 1).await.remove(0);
    let app = test_app!(fx.state);
    let uri = format!("/posts/{}/comment/", post.id);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&uri)
            .set_form([("text", "anonymous")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with("/auth/login/?next="));

    for text in ["   ", "Great post"] {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&uri)
                .cookie(fx.session(&reader))
                .set_form([("text", text)])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    }

    let detail: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/", post.id))
            .to_request(),
    )
    .await;
    let comments = detail["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "Great post");
    assert_eq!(comments[0]["author"]["username"], "reader");
    assert_eq!(detail["author_post_count"], 1);
    assert_eq!(detail["can_edit"], false);
}

#[actix_web::test]
async fn test_missing_post_is_404() {
    let fx = Fixture::new();
    let app = test_app!(fx.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/", Uuid::new_v4()))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_follow_feed() {
    let fx = Fixture::new();
    let a = fx.user("author").await;
    let b = fx.user("follower").await;
    let c = fx.user("stranger").await;
    fx.posts(&a, None, 1).await;
    fx.posts(&c, None, 3).await;
    let app = test_app!(fx.state);

    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/profile/author/follow/")
                .cookie(fx.session(&b))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/profile/author/");
    }
    assert_eq!(
        fx.state.follows.follow(b.id, a.id).await.unwrap(),
        FollowOutcome::AlreadyFollowing
    );

    let b_feed: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/follow/")
            .cookie(fx.session(&b))
            .to_request(),
    )
    .await;
    assert_eq!(item_texts(&b_feed), vec!["author post 1"]);

    let c_feed: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/follow/")
            .cookie(fx.session(&c))
            .to_request(),
    )
    .await;
    assert!(item_texts(&c_feed).is_empty());

    let profile: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/")
            .cookie(fx.session(&b))
            .to_request(),
    )
    .await;
    assert_eq!(profile["following"], true);

    test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/unfollow/")
            .cookie(fx.session(&b))
            .to_request(),
    )
    .await;
    assert!(!fx.state.follows.is_following(b.id, a.id).await.unwrap());
}

#[actix_web::test]
async fn test_self_follow_writes_nothing() {
    let fx = Fixture::new();
    let user = fx.user("narcissus").await;
    let app = test_app!(fx.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/narcissus/follow/")
            .cookie(fx.session(&user))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(!fx.state.follows.is_following(user.id, user.id).await.unwrap());
}

#[actix_web::test]
async fn test_follow_unknown_author_is_404() {
    let fx = Fixture::new();
    let user = fx.user("someone").await;
    let app = test_app!(fx.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/nobody/follow/")
            .cookie(fx.session(&user))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_signup_and_login() {
    let fx = Fixture::new();
    let app = test_app!(fx.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([
                ("username", "newbie"),
                ("email", "newbie@example.com"),
                ("password", "correct-horse"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(resp.response().cookies().any(|c| c.name() == SESSION_COOKIE));

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([
                ("username", "newbie"),
                ("password", "wrong-password"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([
                ("username", "newbie"),
                ("password", "correct-horse"),
                ("next", "/follow/"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/follow/");
    let token = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/follow/")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_signup_rejects_duplicate_username() {
    let fx = Fixture::new();
    fx.user("taken").await;
    let app = test_app!(fx.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([
                ("username", "taken"),
                ("email", "taken@example.com"),
                ("password", "long-enough"),
            ])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["form"]["errors"]["username"].is_array());
    assert!(body["form"]["values"].get("password").is_none());
}

#[actix_web::test]
async fn test_health() {
    let fx = Fixture::new();
    let app = test_app!(fx.state);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/health/").to_request(),
    )
    .await;

    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["store"], "memory");
}
