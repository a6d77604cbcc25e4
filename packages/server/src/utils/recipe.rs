//! Recipe aggregate persistence: the recipe row plus its tag and ingredient links.
//!
//! Callers run these inside one transaction so readers never observe a recipe without tags or
//! with half-replaced ingredient links.

use std::collections::HashSet;

use sea_orm::sea_query::LockType;
use sea_orm::*;

use crate::entity::{
    favorite, ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, tag,
};
use crate::error::AppError;
use crate::models::recipe::IngredientAmountRequest;

/// Look up a recipe by ID, returning 404 if not found.
pub async fn find_recipe<C: ConnectionTrait>(db: &C, id: i32) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

/// Look up a recipe and lock its row until the transaction ends.
pub async fn find_recipe_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

/// Only the author may modify or delete a recipe.
pub fn require_author(recipe: &recipe::Model, user_id: i32) -> Result<(), AppError> {
    if recipe.author_id == user_id {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

fn first_missing(requested: &[i32], found: &HashSet<i32>) -> Option<i32> {
    requested.iter().copied().find(|id| !found.contains(id))
}

/// Fail with 404 if any referenced tag or ingredient does not exist.
pub async fn ensure_references_exist<C: ConnectionTrait>(
    db: &C,
    tag_ids: &[i32],
    ingredients: &[IngredientAmountRequest],
) -> Result<(), AppError> {
    let found: HashSet<i32> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tag_ids.iter().copied()))
        .select_only()
        .column(tag::Column::Id)
        .into_tuple()
        .all(db)
        .await?
        .into_iter()
        .collect();
    if let Some(id) = first_missing(tag_ids, &found) {
        return Err(AppError::NotFound(format!("Tag {id} not found")));
    }

    let ingredient_ids: Vec<i32> = ingredients.iter().map(|i| i.id).collect();
    let found: HashSet<i32> = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ingredient_ids.iter().copied()))
        .select_only()
        .column(ingredient::Column::Id)
        .into_tuple()
        .all(db)
        .await?
        .into_iter()
        .collect();
    if let Some(id) = first_missing(&ingredient_ids, &found) {
        return Err(AppError::NotFound(format!("Ingredient {id} not found")));
    }

    Ok(())
}

/// Drop every tag and ingredient link of the recipe and insert the given ones.
pub async fn replace_links(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    tag_ids: &[i32],
    ingredients: &[IngredientAmountRequest],
) -> Result<(), AppError> {
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(txn)
        .await?;
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(txn)
        .await?;

    let tag_links = tag_ids.iter().map(|&tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag_id),
    });
    recipe_tag::Entity::insert_many(tag_links)
        .exec_without_returning(txn)
        .await?;

    let ingredient_links = ingredients
        .iter()
        .map(|line| recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(line.id),
            amount: Set(line.amount),
            ..Default::default()
        });
    recipe_ingredient::Entity::insert_many(ingredient_links)
        .exec_without_returning(txn)
        .await?;

    Ok(())
}

/// Delete the recipe together with its links, favorite entries and cart entries.
pub async fn delete_recipe_rows(txn: &DatabaseTransaction, recipe_id: i32) -> Result<(), AppError> {
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(txn)
        .await?;
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(txn)
        .await?;
    favorite::Entity::delete_many()
        .filter(favorite::Column::RecipeId.eq(recipe_id))
        .exec(txn)
        .await?;
    shopping_cart::Entity::delete_many()
        .filter(shopping_cart::Column::RecipeId.eq(recipe_id))
        .exec(txn)
        .await?;
    recipe::Entity::delete_by_id(recipe_id).exec(txn).await?;
    Ok(())
}

/// Map a failed recipe-row write, turning the unique name constraint into a validation error.
pub fn map_recipe_write_error(err: DbErr) -> AppError {
    if crate::error::is_unique_violation(&err) {
        tracing::debug!("Recipe name collision caught on write");
        AppError::Validation("A recipe with this name already exists".into())
    } else {
        AppError::from(err)
    }
}
