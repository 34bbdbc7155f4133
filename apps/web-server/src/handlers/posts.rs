//! Post pages and mutations: detail, create, edit, delete and comments.

use actix_web::{HttpResponse, http::StatusCode, web};
use serde::Serialize;
use uuid::Uuid;

use yatube_core::DomainError;
use yatube_core::domain::GroupSummary;
use yatube_core::policy;
use yatube_core::posts::{FieldErrors, PostDetail, PostDraft};
use yatube_shared::dto::{CommentForm, FormView};

use super::{page, post_url, profile_url, render, see_other};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

#[derive(Serialize)]
struct DetailPage {
    title: String,
    #[serde(flatten)]
    detail: PostDetail,
    can_edit: bool,
    form: FormView<CommentForm>,
}

#[derive(Serialize)]
struct PostFormPage {
    is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_id: Option<Uuid>,
    form: FormView<PostDraft>,
    groups: Vec<GroupSummary>,
}

impl PostFormPage {
    async fn build(
        state: &AppState,
        post_id: Option<Uuid>,
        form: FormView<PostDraft>,
    ) -> AppResult<Self> {
        let groups = state
            .groups
            .list()
            .await?
            .iter()
            .map(|g| g.summary())
            .collect();
        Ok(Self {
            is_edit: post_id.is_some(),
            post_id,
            form,
            groups,
        })
    }
}

/// Redisplay a rejected post form with 422.
async fn invalid_form(
    state: &AppState,
    post_id: Option<Uuid>,
    draft: PostDraft,
    errors: FieldErrors,
) -> AppResult<HttpResponse> {
    let form = FormView::with_errors(draft, errors.into_map());
    let content = PostFormPage::build(state, post_id, form).await?;
    Ok(render(StatusCode::UNPROCESSABLE_ENTITY, content))
}

/// GET /posts/{post_id}/
pub async fn detail(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let detail = state.posts.detail(post_id).await?;
    let can_edit = policy::can_modify_post(viewer.user_id(), &detail.post.post);

    Ok(page(DetailPage {
        title: format!("Post {}", post_id),
        detail,
        can_edit,
        form: FormView::blank(CommentForm::default()),
    }))
}

/// GET /create/
pub async fn create_form(
    state: web::Data<AppState>,
    _identity: Identity,
) -> AppResult<HttpResponse> {
    let content = PostFormPage::build(&state, None, FormView::blank(PostDraft::default())).await?;
    Ok(page(content))
}

/// POST /create/
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<PostDraft>,
) -> AppResult<HttpResponse> {
    let draft = form.into_inner();

    match state.posts.create(identity.user_id, draft.clone()).await {
        Ok(post) => {
            tracing::info!(post_id = %post.id, author = %identity.username, "Post created");
            Ok(see_other(&profile_url(&identity.username)))
        }
        Err(DomainError::InvalidForm(errors)) => invalid_form(&state, None, draft, errors).await,
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{post_id}/edit/
pub async fn edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();

    match state.posts.editable(identity.user_id, post_id).await {
        Ok((post, draft)) => {
            let content = PostFormPage::build(&state, Some(post.id), FormView::blank(draft)).await?;
            Ok(page(content))
        }
        Err(DomainError::Forbidden) => Ok(see_other(&post_url(post_id))),
        Err(e) => Err(e.into()),
    }
}

/// POST /posts/{post_id}/edit/
pub async fn edit(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    form: web::Form<PostDraft>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let draft = form.into_inner();

    match state.posts.edit(identity.user_id, post_id, draft.clone()).await {
        Ok(post) => {
            tracing::info!(post_id = %post.id, "Post edited");
            Ok(see_other(&post_url(post.id)))
        }
        Err(DomainError::Forbidden) => {
            tracing::warn!(post_id = %post_id, user = %identity.username, "Edit by non-author refused");
            Ok(see_other(&post_url(post_id)))
        }
        Err(DomainError::InvalidForm(errors)) => {
            invalid_form(&state, Some(post_id), draft, errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /posts/{post_id}/delete/
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();

    match state.posts.delete(identity.user_id, post_id).await {
        Ok(post) => {
            tracing::info!(post_id = %post.id, "Post deleted");
            Ok(see_other(&profile_url(&identity.username)))
        }
        Err(DomainError::Forbidden) => Ok(see_other(&post_url(post_id))),
        Err(e) => Err(e.into()),
    }
}

/// POST /posts/{post_id}/comment/
///
/// Blank comments are dropped; either way the visitor lands on the post.
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();

    let comment = state
        .posts
        .comment(Some(identity.user_id), post_id, &form.text)
        .await?;
    match comment {
        Some(comment) => tracing::debug!(comment_id = %comment.id, post_id = %post_id, "Comment added"),
        None => tracing::debug!(post_id = %post_id, "Blank comment dropped"),
    }

    Ok(see_other(&post_url(post_id)))
}
