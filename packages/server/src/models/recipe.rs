use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use super::catalog::TagResponse;
use super::shared::{Pagination, validate_length, validate_unique_ids};
use super::user::UserResponse;
use crate::entity::recipe;
use crate::error::AppError;

/// One ingredient line of a recipe payload.
#[derive(Deserialize, Debug, Clone, PartialEq, utoipa::ToSchema)]
pub struct IngredientAmountRequest {
    /// Ingredient ID.
    #[schema(example = 1123)]
    pub id: i32,
    /// Quantity in the ingredient's measurement unit (>= 1).
    #[schema(example = 10)]
    pub amount: i32,
}

#[derive(Deserialize, Debug, utoipa::ToSchema)]
pub struct CreateRecipeRequest {
    pub ingredients: Vec<IngredientAmountRequest>,
    /// Tag IDs.
    #[schema(example = json!([1, 2]))]
    pub tags: Vec<i32>,
    /// Image URL or data URI.
    pub image: String,
    #[schema(example = "Pancakes")]
    pub name: String,
    pub text: String,
    /// Cooking time in minutes (>= 1).
    #[schema(example = 20)]
    pub cooking_time: i32,
}

/// Tags and ingredients are always replaced wholesale; the scalar fields keep their stored
/// values when omitted.
#[derive(Deserialize, Debug, utoipa::ToSchema)]
pub struct UpdateRecipeRequest {
    pub ingredients: Vec<IngredientAmountRequest>,
    pub tags: Vec<i32>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

/// Validate tag and ingredient lists, amounts and cooking time, in that order.
fn validate_composition(
    tags: &[i32],
    ingredients: &[IngredientAmountRequest],
    cooking_time: Option<i32>,
) -> Result<(), AppError> {
    validate_unique_ids(tags, "Tags")?;
    let ingredient_ids: Vec<i32> = ingredients.iter().map(|i| i.id).collect();
    validate_unique_ids(&ingredient_ids, "Ingredients")?;
    if let Some(bad) = ingredients.iter().find(|i| i.amount < 1) {
        return Err(AppError::Validation(format!(
            "Amount of ingredient {} must be at least 1",
            bad.id
        )));
    }
    if let Some(time) = cooking_time
        && time < 1
    {
        return Err(AppError::Validation(
            "Cooking time must be at least 1 minute".into(),
        ));
    }
    Ok(())
}

fn validate_image(image: &str) -> Result<(), AppError> {
    if image.trim().is_empty() {
        return Err(AppError::Validation("Image must not be empty".into()));
    }
    Ok(())
}

fn validate_text(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("Text must not be empty".into()));
    }
    Ok(())
}

pub fn validate_create_recipe(payload: &CreateRecipeRequest) -> Result<(), AppError> {
    validate_composition(
        &payload.tags,
        &payload.ingredients,
        Some(payload.cooking_time),
    )?;
    validate_length(&payload.name, "Name", 200)?;
    validate_text(&payload.text)?;
    validate_image(&payload.image)
}

pub fn validate_update_recipe(payload: &UpdateRecipeRequest) -> Result<(), AppError> {
    validate_composition(&payload.tags, &payload.ingredients, payload.cooking_time)?;
    if let Some(ref name) = payload.name {
        validate_length(name, "Name", 200)?;
    }
    if let Some(ref text) = payload.text {
        validate_text(text)?;
    }
    if let Some(ref image) = payload.image {
        validate_image(image)?;
    }
    Ok(())
}

/// Ingredient line in a recipe representation.
#[derive(Serialize, Debug, Clone, PartialEq, utoipa::ToSchema)]
pub struct RecipeIngredientResponse {
    /// Ingredient ID.
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe as seen by the requester.
#[derive(Serialize, Debug, Clone, utoipa::ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    /// Always false for anonymous requesters.
    pub is_favorited: bool,
    /// Always false for anonymous requesters.
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// Minimal recipe view used by favorites, the cart and subscriptions.
#[derive(Serialize, Debug, Clone, PartialEq, FromQueryResult, utoipa::ToSchema)]
pub struct ShortRecipeResponse {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<recipe::Model> for ShortRecipeResponse {
    fn from(m: recipe::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            image: m.image,
            cooking_time: m.cooking_time,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeListResponse {
    pub data: Vec<RecipeResponse>,
    pub pagination: Pagination,
}

/// Query string for the recipe listing. All filters combine with AND.
#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct RecipeListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// `1` restricts to the requester's favorites. Ignored for anonymous requesters.
    pub is_favorited: Option<String>,
    /// `1` restricts to the requester's shopping cart. Ignored for anonymous requesters.
    pub is_in_shopping_cart: Option<String>,
    /// Author user ID.
    pub author: Option<String>,
    /// Tag slugs; a recipe matches if it carries any of them. Repeat the parameter for several.
    #[serde(default)]
    pub tags: Vec<String>,
}
