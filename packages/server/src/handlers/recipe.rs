use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::Query;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{favorite, recipe, recipe_tag, shopping_cart, tag};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::recipe::*;
use crate::models::shared::parse_flag;
use crate::state::AppState;
use crate::utils::interaction::{RecipeList, add_recipe, remove_recipe};
use crate::utils::pagination::PageRequest;
use crate::utils::projection::{
    Viewer, project_recipe, project_recipes, render_shopping_list, shopping_list,
};
use crate::utils::recipe::{
    delete_recipe_rows, ensure_references_exist, find_recipe, find_recipe_for_update,
    map_recipe_write_error, replace_links, require_author,
};

const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

#[utoipa::path(
    get,
    path = "/",
    tag = "Recipes",
    operation_id = "listRecipes",
    summary = "List recipes",
    description = "Newest first. Filters combine with AND; `tags` matches recipes carrying any of the given slugs.",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "Page of recipes", body = RecipeListResponse),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer, query))]
pub async fn list_recipes(
    viewer: Viewer,
    State(state): State<AppState>,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<RecipeListResponse>, AppError> {
    let page = PageRequest::resolve(
        query.page.as_deref(),
        query.limit.as_deref(),
        &state.config.pagination,
    );

    let mut select = recipe::Entity::find();

    if let Some(uid) = viewer.user_id() {
        if parse_flag(query.is_favorited.as_deref()) {
            select = select.filter(
                recipe::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(favorite::Column::RecipeId)
                        .from(favorite::Entity)
                        .and_where(favorite::Column::OwnerId.eq(uid))
                        .to_owned(),
                ),
            );
        }
        if parse_flag(query.is_in_shopping_cart.as_deref()) {
            select = select.filter(
                recipe::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(shopping_cart::Column::RecipeId)
                        .from(shopping_cart::Entity)
                        .and_where(shopping_cart::Column::OwnerId.eq(uid))
                        .to_owned(),
                ),
            );
        }
    }

    if let Some(author_id) = query
        .author
        .as_deref()
        .and_then(|v| v.trim().parse::<i32>().ok())
    {
        select = select.filter(recipe::Column::AuthorId.eq(author_id));
    }

    let slugs: Vec<&str> = query
        .tags
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !slugs.is_empty() {
        select = select.filter(
            recipe::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(recipe_tag::Column::RecipeId)
                    .from(recipe_tag::Entity)
                    .and_where(
                        recipe_tag::Column::TagId.in_subquery(
                            SeaQuery::select()
                                .column(tag::Column::Id)
                                .from(tag::Entity)
                                .and_where(tag::Column::Slug.is_in(slugs))
                                .to_owned(),
                        ),
                    )
                    .to_owned(),
            ),
        );
    }

    let total = select
        .clone()
        .paginate(&state.db, page.per_page)
        .num_items()
        .await?;

    let recipes = select
        .order_by_desc(recipe::Column::PubDate)
        .order_by_desc(recipe::Column::Id)
        .offset(Some(page.offset()))
        .limit(Some(page.per_page))
        .all(&state.db)
        .await?;

    Ok(Json(RecipeListResponse {
        data: project_recipes(&state.db, viewer, recipes).await?,
        pagination: page.pagination(total),
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Recipes",
    operation_id = "createRecipe",
    summary = "Publish a recipe",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Unknown tag or ingredient (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_recipe(&payload)?;

    let txn = state.db.begin().await?;
    ensure_references_exist(&txn, &payload.tags, &payload.ingredients).await?;

    let created = recipe::ActiveModel {
        author_id: Set(auth_user.user_id),
        name: Set(payload.name.trim().to_string()),
        text: Set(payload.text),
        image: Set(payload.image),
        cooking_time: Set(payload.cooking_time),
        pub_date: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(map_recipe_write_error)?;

    replace_links(&txn, created.id, &payload.tags, &payload.ingredients).await?;
    txn.commit().await?;

    tracing::info!(recipe_id = created.id, "Recipe created");
    let body = project_recipe(&state.db, auth_user.viewer(), created).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Recipes",
    operation_id = "getRecipe",
    summary = "Get a recipe",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe", body = RecipeResponse),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer))]
pub async fn get_recipe(
    viewer: Viewer,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RecipeResponse>, AppError> {
    let model = find_recipe(&state.db, id).await?;
    Ok(Json(project_recipe(&state.db, viewer, model).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Recipes",
    operation_id = "updateRecipe",
    summary = "Update a recipe",
    description = "Tags and ingredients are required and replace the stored sets. Omitted scalar fields keep their values.",
    params(("id" = i32, Path, description = "Recipe ID")),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe, tag or ingredient not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateRecipeRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_recipe_for_update(&txn, id).await?;
    require_author(&existing, auth_user.user_id)?;
    validate_update_recipe(&payload)?;
    ensure_references_exist(&txn, &payload.tags, &payload.ingredients).await?;

    let mut active: recipe::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(text) = payload.text {
        active.text = Set(text);
    }
    if let Some(image) = payload.image {
        active.image = Set(image);
    }
    if let Some(cooking_time) = payload.cooking_time {
        active.cooking_time = Set(cooking_time);
    }

    let updated = if active.is_changed() {
        active.update(&txn).await.map_err(map_recipe_write_error)?
    } else {
        find_recipe(&txn, id).await?
    };

    replace_links(&txn, id, &payload.tags, &payload.ingredients).await?;
    txn.commit().await?;

    Ok(Json(project_recipe(&state.db, auth_user.viewer(), updated).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Recipes",
    operation_id = "deleteRecipe",
    summary = "Delete a recipe",
    description = "Also removes the recipe from every user's favorites and shopping cart.",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_recipe_for_update(&txn, id).await?;
    require_author(&existing, auth_user.user_id)?;
    delete_recipe_rows(&txn, id).await?;
    txn.commit().await?;

    tracing::info!(recipe_id = id, "Recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_list(
    state: &AppState,
    list: RecipeList,
    owner_id: i32,
    recipe_id: i32,
) -> Result<ShortRecipeResponse, AppError> {
    let txn = state.db.begin().await?;
    let recipe = find_recipe(&txn, recipe_id).await?;
    add_recipe(&txn, list, owner_id, recipe_id).await?;
    txn.commit().await?;
    Ok(ShortRecipeResponse::from(recipe))
}

async fn remove_from_list(
    state: &AppState,
    list: RecipeList,
    owner_id: i32,
    recipe_id: i32,
) -> Result<(), AppError> {
    find_recipe(&state.db, recipe_id).await?;
    remove_recipe(&state.db, list, owner_id, recipe_id).await
}

#[utoipa::path(
    post,
    path = "/{id}/favorite",
    tag = "Favorites",
    operation_id = "addFavorite",
    summary = "Add a recipe to favorites",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added", body = ShortRecipeResponse),
        (status = 400, description = "Already in favorites (CONFLICT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn add_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let body = add_to_list(&state, RecipeList::Favorites, auth_user.user_id, id).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    delete,
    path = "/{id}/favorite",
    tag = "Favorites",
    operation_id = "removeFavorite",
    summary = "Remove a recipe from favorites",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 400, description = "Not in favorites (NOT_PRESENT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn remove_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    remove_from_list(&state, RecipeList::Favorites, auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/shopping_cart",
    tag = "Shopping cart",
    operation_id = "addToShoppingCart",
    summary = "Add a recipe to the shopping cart",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added", body = ShortRecipeResponse),
        (status = 400, description = "Already in the cart (CONFLICT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn add_to_shopping_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let body = add_to_list(&state, RecipeList::ShoppingCart, auth_user.user_id, id).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    delete,
    path = "/{id}/shopping_cart",
    tag = "Shopping cart",
    operation_id = "removeFromShoppingCart",
    summary = "Remove a recipe from the shopping cart",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 400, description = "Not in the cart (NOT_PRESENT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn remove_from_shopping_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    remove_from_list(&state, RecipeList::ShoppingCart, auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/download_shopping_cart",
    tag = "Shopping cart",
    operation_id = "downloadShoppingCart",
    summary = "Download the aggregated shopping list",
    description = "Plain text, one `name: amount, unit` line per ingredient and unit, summed over every recipe in the cart.",
    responses(
        (status = 200, description = "Shopping list", content_type = "text/plain", body = String),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn download_shopping_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let lines = shopping_list(&state.db, auth_user.user_id).await?;
    let text = render_shopping_list(&lines);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
        )
        .body(Body::from(text))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
