//! Account handlers: signup, login and logout.

use std::collections::BTreeMap;

use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::{HttpResponse, http::StatusCode, web};
use serde::Serialize;

use yatube_core::DomainError;
use yatube_core::accounts::Registration;
use yatube_core::domain::User;
use yatube_core::ports::AuthError;
use yatube_shared::dto::{FormView, LoginForm, NextQuery, SignupForm, safe_next};

use super::{page, redirect, render};
use crate::middleware::auth::SESSION_COOKIE;
use crate::middleware::error::AppResult;
use crate::state::AppState;

#[derive(Serialize)]
struct SignupPage {
    form: FormView<SignupForm>,
}

#[derive(Serialize)]
struct LoginPage {
    form: FormView<LoginForm>,
}

/// Issue a session token for `user` and attach it as the session cookie.
fn start_session(state: &AppState, user: &User, location: &str) -> AppResult<HttpResponse> {
    let token = state
        .tokens
        .generate_token(user.id, &user.username, user.roles())?;

    let cookie = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(state.tokens.expiration_seconds()))
        .finish();

    Ok(HttpResponse::SeeOther()
        .insert_header((actix_web::http::header::LOCATION, location))
        .cookie(cookie)
        .finish())
}

/// GET /auth/signup/
pub async fn signup_form() -> AppResult<HttpResponse> {
    Ok(page(SignupPage {
        form: FormView::blank(SignupForm::default()),
    }))
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    form: web::Form<SignupForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let registration = Registration {
        username: form.username.clone(),
        email: form.email.clone(),
        password: form.password.clone(),
    };

    match state.accounts.register(&registration).await {
        Ok(user) => start_session(&state, &user, "/"),
        Err(DomainError::InvalidForm(errors)) => Ok(render(
            StatusCode::UNPROCESSABLE_ENTITY,
            SignupPage {
                form: FormView::with_errors(form, errors.into_map()),
            },
        )),
        Err(e) => Err(e.into()),
    }
}

/// GET /auth/login/
pub async fn login_form(query: web::Query<NextQuery>) -> AppResult<HttpResponse> {
    let values = LoginForm {
        next: safe_next(query.next.as_deref()).map(str::to_string),
        ..LoginForm::default()
    };
    Ok(page(LoginPage {
        form: FormView::blank(values),
    }))
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    match state.accounts.authenticate(&form.username, &form.password).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, username = %user.username, "User logged in");
            let location = safe_next(form.next.as_deref()).unwrap_or("/").to_string();
            start_session(&state, &user, &location)
        }
        Err(AuthError::InvalidCredentials) => {
            let errors = BTreeMap::from([(
                "__all__".to_string(),
                vec![
                    "Please enter a correct username and password. Note that both fields may be case-sensitive."
                        .to_string(),
                ],
            )]);
            Ok(render(
                StatusCode::UNPROCESSABLE_ENTITY,
                LoginPage {
                    form: FormView::with_errors(form, errors),
                },
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /auth/logout/
pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();

    let mut response = redirect("/");
    if let Err(e) = response.add_cookie(&cookie) {
        tracing::error!(error = %e, "Failed to clear session cookie");
    }
    response
}
