use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{follow, user};
use crate::error::{AppError, ErrorBody, is_unique_violation};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::parse_positive;
use crate::models::user::*;
use crate::state::AppState;
use crate::utils::hash;
use crate::utils::interaction::{follow_author, unfollow_author};
use crate::utils::pagination::PageRequest;
use crate::utils::projection::{Viewer, project_subscriptions, project_user, project_users};

#[utoipa::path(
    post,
    path = "/",
    tag = "Users",
    operation_id = "register",
    summary = "Register a new user",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Invalid fields, or username/email taken (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        username: Set(payload.username.trim().to_string()),
        email: Set(payload.email.trim().to_string()),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        password: Set(hash),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| {
        if is_unique_violation(&e) {
            tracing::debug!("Registration collision caught on insert");
            AppError::Validation("A user with this username or email already exists".into())
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(RegisterResponse::from(user))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Page of users", body = UserListResponse),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer, query))]
pub async fn list_users(
    viewer: Viewer,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let page = PageRequest::resolve(
        query.page.as_deref(),
        query.limit.as_deref(),
        &state.config.pagination,
    );

    let select = user::Entity::find().order_by_asc(user::Column::Id);
    let total = select
        .clone()
        .paginate(&state.db, page.per_page)
        .num_items()
        .await?;

    let users = select
        .offset(Some(page.offset()))
        .limit(Some(page.per_page))
        .all(&state.db)
        .await?;

    Ok(Json(UserListResponse {
        data: project_users(&state.db, viewer, users).await?,
        pagination: page.pagination(total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user profile",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer))]
pub async fn get_user(
    viewer: Viewer,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    let model = find_user(&state.db, id).await?;
    Ok(Json(project_user(&state.db, viewer, model).await?))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    operation_id = "me",
    summary = "Current user profile",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let model = find_user(&state.db, auth_user.user_id).await?;
    Ok(Json(project_user(&state.db, auth_user.viewer(), model).await?))
}

#[utoipa::path(
    post,
    path = "/set_password",
    tag = "Users",
    operation_id = "setPassword",
    summary = "Change the current user's password",
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Wrong current password or invalid new one (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn set_password(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_password(&payload.new_password)?;

    let txn = state.db.begin().await?;
    let existing = user::Entity::find_by_id(auth_user.user_id)
        .lock(sea_orm::sea_query::LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let is_valid = hash::verify_password(&payload.current_password, &existing.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::Validation("Current password is incorrect".into()));
    }

    let hash = hash::hash_password(&payload.new_password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let mut active: user::ActiveModel = existing.into();
    active.password = Set(hash);
    active.update(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = "Subscriptions",
    operation_id = "listSubscriptions",
    summary = "Authors the current user follows",
    description = "Paginated, most recent subscription first. Each author carries their newest recipes truncated by `recipes_limit` and the untruncated `recipes_count`.",
    params(SubscriptionQuery),
    responses(
        (status = 200, description = "Followed authors", body = SubscriptionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_subscriptions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Json<SubscriptionListResponse>, AppError> {
    let page = PageRequest::resolve(
        query.page.as_deref(),
        query.limit.as_deref(),
        &state.config.pagination,
    );
    let recipes_limit = parse_positive(query.recipes_limit.as_deref());

    let select = follow::Entity::find().filter(follow::Column::UserId.eq(auth_user.user_id));
    let total = select
        .clone()
        .paginate(&state.db, page.per_page)
        .num_items()
        .await?;

    let author_ids: Vec<i32> = select
        .order_by_desc(follow::Column::CreatedAt)
        .order_by_desc(follow::Column::AuthorId)
        .offset(Some(page.offset()))
        .limit(Some(page.per_page))
        .select_only()
        .column(follow::Column::AuthorId)
        .into_tuple()
        .all(&state.db)
        .await?;

    let mut by_id: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids.iter().copied()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let authors: Vec<user::Model> = author_ids
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect();

    Ok(Json(SubscriptionListResponse {
        data: project_subscriptions(&state.db, auth_user.viewer(), authors, recipes_limit).await?,
        pagination: page.pagination(total),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/subscribe",
    tag = "Subscriptions",
    operation_id = "subscribe",
    summary = "Follow an author",
    params(
        ("id" = i32, Path, description = "Author user ID"),
        RecipesLimitQuery,
    ),
    responses(
        (status = 201, description = "Now following", body = SubscriptionResponse),
        (status = 400, description = "Self-follow (VALIDATION_ERROR) or already following (CONFLICT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Author not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn subscribe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(author_id): Path<i32>,
    Query(query): Query<RecipesLimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let author = find_user(&txn, author_id).await?;
    follow_author(&txn, auth_user.user_id, author_id).await?;
    txn.commit().await?;

    let recipes_limit = parse_positive(query.recipes_limit.as_deref());
    let mut projected =
        project_subscriptions(&state.db, auth_user.viewer(), vec![author], recipes_limit).await?;
    let body = projected
        .pop()
        .ok_or_else(|| AppError::Internal("subscription projection came back empty".into()))?;

    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    delete,
    path = "/{id}/subscribe",
    tag = "Subscriptions",
    operation_id = "unsubscribe",
    summary = "Stop following an author",
    params(("id" = i32, Path, description = "Author user ID")),
    responses(
        (status = 204, description = "Unfollowed"),
        (status = 400, description = "Not following (NOT_PRESENT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Author not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn unsubscribe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(author_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_user(&txn, author_id).await?;
    unfollow_author(&txn, auth_user.user_id, author_id).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}
