//! Favorites, shopping cart and follows.
//!
//! Every set is a join table whose primary key is the (owner, target) pair. Duplicates are
//! rejected by the database and surfaced as `Conflict`; removing an absent pair is
//! `NothingToRemove`. Both map to 400 with distinct codes.

use sea_orm::*;

use crate::entity::{favorite, follow, shopping_cart};
use crate::error::{AppError, is_unique_violation};

/// A per-user recipe collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn already_present(self) -> &'static str {
        match self {
            RecipeList::Favorites => "Recipe is already in favorites",
            RecipeList::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn nothing_to_remove(self) -> &'static str {
        match self {
            RecipeList::Favorites => "Recipe is not in favorites",
            RecipeList::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

fn conflict_or_internal(err: DbErr, message: &str) -> AppError {
    if is_unique_violation(&err) {
        tracing::debug!("Duplicate pair rejected by unique constraint");
        AppError::Conflict(message.into())
    } else {
        AppError::from(err)
    }
}

fn removed_or_absent(result: DeleteResult, message: &str) -> Result<(), AppError> {
    if result.rows_affected == 0 {
        Err(AppError::NothingToRemove(message.into()))
    } else {
        Ok(())
    }
}

/// Insert the (owner, recipe) pair into the list.
pub async fn add_recipe<C: ConnectionTrait>(
    db: &C,
    list: RecipeList,
    owner_id: i32,
    recipe_id: i32,
) -> Result<(), AppError> {
    let added_at = chrono::Utc::now();
    let result = match list {
        RecipeList::Favorites => favorite::ActiveModel {
            owner_id: Set(owner_id),
            recipe_id: Set(recipe_id),
            added_at: Set(added_at),
        }
        .insert(db)
        .await
        .map(|_| ()),
        RecipeList::ShoppingCart => shopping_cart::ActiveModel {
            owner_id: Set(owner_id),
            recipe_id: Set(recipe_id),
            added_at: Set(added_at),
        }
        .insert(db)
        .await
        .map(|_| ()),
    };

    result.map_err(|e| conflict_or_internal(e, list.already_present()))
}

/// Remove the (owner, recipe) pair from the list.
pub async fn remove_recipe<C: ConnectionTrait>(
    db: &C,
    list: RecipeList,
    owner_id: i32,
    recipe_id: i32,
) -> Result<(), AppError> {
    let result = match list {
        RecipeList::Favorites => {
            favorite::Entity::delete_by_id((owner_id, recipe_id))
                .exec(db)
                .await?
        }
        RecipeList::ShoppingCart => {
            shopping_cart::Entity::delete_by_id((owner_id, recipe_id))
                .exec(db)
                .await?
        }
    };

    removed_or_absent(result, list.nothing_to_remove())
}

/// Subscribe `user_id` to `author_id`.
pub async fn follow_author<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    author_id: i32,
) -> Result<(), AppError> {
    if user_id == author_id {
        return Err(AppError::Validation("You cannot follow yourself".into()));
    }

    follow::ActiveModel {
        user_id: Set(user_id),
        author_id: Set(author_id),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .map(|_| ())
    .map_err(|e| conflict_or_internal(e, "Already following this author"))
}

/// Unsubscribe `user_id` from `author_id`.
pub async fn unfollow_author<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    author_id: i32,
) -> Result<(), AppError> {
    let result = follow::Entity::delete_by_id((user_id, author_id))
        .exec(db)
        .await?;
    removed_or_absent(result, "You are not following this author")
}
