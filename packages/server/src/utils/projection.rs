//! Requester-relative views of users and recipes.
//!
//! The derived flags (`is_subscribed`, `is_favorited`, `is_in_shopping_cart`) are computed here
//! from explicit existence queries, batched per page. Anonymous viewers get `false` everywhere.

use std::collections::{HashMap, HashSet};

use sea_orm::*;

use crate::entity::{
    favorite, follow, ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, tag, user,
};
use crate::error::AppError;
use crate::models::catalog::TagResponse;
use crate::models::recipe::{RecipeIngredientResponse, RecipeResponse, ShortRecipeResponse};
use crate::models::user::{SubscriptionResponse, UserResponse};
use crate::utils::interaction::RecipeList;

/// The requester, as far as projections are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(i32),
}

impl Viewer {
    pub fn user_id(self) -> Option<i32> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(id),
        }
    }
}

/// Subset of `author_ids` the viewer follows.
pub async fn subscribed_author_ids<C: ConnectionTrait>(
    db: &C,
    viewer: Viewer,
    author_ids: &[i32],
) -> Result<HashSet<i32>, AppError> {
    let Some(uid) = viewer.user_id() else {
        return Ok(HashSet::new());
    };
    if author_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<i32> = follow::Entity::find()
        .filter(follow::Column::UserId.eq(uid))
        .filter(follow::Column::AuthorId.is_in(author_ids.iter().copied()))
        .select_only()
        .column(follow::Column::AuthorId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Subset of `recipe_ids` present in the viewer's list.
pub async fn listed_recipe_ids<C: ConnectionTrait>(
    db: &C,
    viewer: Viewer,
    list: RecipeList,
    recipe_ids: &[i32],
) -> Result<HashSet<i32>, AppError> {
    let Some(uid) = viewer.user_id() else {
        return Ok(HashSet::new());
    };
    if recipe_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<i32> = match list {
        RecipeList::Favorites => {
            favorite::Entity::find()
                .filter(favorite::Column::OwnerId.eq(uid))
                .filter(favorite::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                .select_only()
                .column(favorite::Column::RecipeId)
                .into_tuple()
                .all(db)
                .await?
        }
        RecipeList::ShoppingCart => {
            shopping_cart::Entity::find()
                .filter(shopping_cart::Column::OwnerId.eq(uid))
                .filter(shopping_cart::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                .select_only()
                .column(shopping_cart::Column::RecipeId)
                .into_tuple()
                .all(db)
                .await?
        }
    };
    Ok(ids.into_iter().collect())
}

pub async fn project_users<C: ConnectionTrait>(
    db: &C,
    viewer: Viewer,
    users: Vec<user::Model>,
) -> Result<Vec<UserResponse>, AppError> {
    let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
    let subscribed = subscribed_author_ids(db, viewer, &ids).await?;

    Ok(users
        .into_iter()
        .map(|u| {
            let is_subscribed = subscribed.contains(&u.id);
            UserResponse::project(u, is_subscribed)
        })
        .collect())
}

pub async fn project_user<C: ConnectionTrait>(
    db: &C,
    viewer: Viewer,
    user: user::Model,
) -> Result<UserResponse, AppError> {
    project_users(db, viewer, vec![user])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("user projection came back empty".into()))
}

/// Full projection of a page of recipes, preserving input order.
pub async fn project_recipes<C: ConnectionTrait>(
    db: &C,
    viewer: Viewer,
    recipes: Vec<recipe::Model>,
) -> Result<Vec<RecipeResponse>, AppError> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();

    // Tags
    let tag_links = recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.iter().copied()))
        .all(db)
        .await?;
    let tag_ids: HashSet<i32> = tag_links.iter().map(|l| l.tag_id).collect();
    let tags: HashMap<i32, tag::Model> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tag_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();
    let mut tags_by_recipe: HashMap<i32, Vec<TagResponse>> = HashMap::new();
    for link in tag_links {
        if let Some(t) = tags.get(&link.tag_id) {
            tags_by_recipe
                .entry(link.recipe_id)
                .or_default()
                .push(TagResponse::from(t.clone()));
        }
    }
    for list in tags_by_recipe.values_mut() {
        list.sort_by(|a, b| a.name.cmp(&b.name));
    }

    // Ingredient lines
    let lines = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.iter().copied()))
        .order_by_asc(recipe_ingredient::Column::Id)
        .all(db)
        .await?;
    let ingredient_ids: HashSet<i32> = lines.iter().map(|l| l.ingredient_id).collect();
    let ingredients: HashMap<i32, ingredient::Model> = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ingredient_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();
    let mut lines_by_recipe: HashMap<i32, Vec<RecipeIngredientResponse>> = HashMap::new();
    for line in lines {
        if let Some(i) = ingredients.get(&line.ingredient_id) {
            lines_by_recipe
                .entry(line.recipe_id)
                .or_default()
                .push(RecipeIngredientResponse {
                    id: i.id,
                    name: i.name.clone(),
                    measurement_unit: i.measurement_unit.clone(),
                    amount: line.amount,
                });
        }
    }

    // Authors
    let author_ids: HashSet<i32> = recipes.iter().map(|r| r.author_id).collect();
    let authors = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids))
        .all(db)
        .await?;
    let authors: HashMap<i32, UserResponse> = project_users(db, viewer, authors)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let favorited = listed_recipe_ids(db, viewer, RecipeList::Favorites, &recipe_ids).await?;
    let in_cart = listed_recipe_ids(db, viewer, RecipeList::ShoppingCart, &recipe_ids).await?;

    recipes
        .into_iter()
        .map(|r| {
            let author = authors.get(&r.author_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("author {} of recipe {} missing", r.author_id, r.id))
            })?;
            Ok(RecipeResponse {
                id: r.id,
                tags: tags_by_recipe.remove(&r.id).unwrap_or_default(),
                author,
                ingredients: lines_by_recipe.remove(&r.id).unwrap_or_default(),
                is_favorited: favorited.contains(&r.id),
                is_in_shopping_cart: in_cart.contains(&r.id),
                name: r.name,
                image: r.image,
                text: r.text,
                cooking_time: r.cooking_time,
                pub_date: r.pub_date,
            })
        })
        .collect()
}

pub async fn project_recipe<C: ConnectionTrait>(
    db: &C,
    viewer: Viewer,
    recipe: recipe::Model,
) -> Result<RecipeResponse, AppError> {
    project_recipes(db, viewer, vec![recipe])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("recipe projection came back empty".into()))
}

/// Followed authors with their newest recipes (at most `recipes_limit` each) and full counts.
pub async fn project_subscriptions<C: ConnectionTrait>(
    db: &C,
    viewer: Viewer,
    authors: Vec<user::Model>,
    recipes_limit: Option<u64>,
) -> Result<Vec<SubscriptionResponse>, AppError> {
    let users = project_users(db, viewer, authors).await?;
    let mut out = Vec::with_capacity(users.len());

    for user in users {
        let select = recipe::Entity::find().filter(recipe::Column::AuthorId.eq(user.id));
        let recipes_count = select.clone().count(db).await?;
        let recipes = select
            .order_by_desc(recipe::Column::PubDate)
            .order_by_desc(recipe::Column::Id)
            .limit(recipes_limit)
            .select_only()
            .column(recipe::Column::Id)
            .column(recipe::Column::Name)
            .column(recipe::Column::Image)
            .column(recipe::Column::CookingTime)
            .into_model::<ShortRecipeResponse>()
            .all(db)
            .await?;

        out.push(SubscriptionResponse {
            user,
            recipes,
            recipes_count,
        });
    }

    Ok(out)
}

/// One aggregated shopping-list entry.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

const SHOPPING_LIST_SQL: &str = r#"
SELECT i.name AS name,
       i.measurement_unit AS measurement_unit,
       SUM(ri.amount)::BIGINT AS amount
FROM shopping_cart sc
JOIN recipe_ingredient ri ON ri.recipe_id = sc.recipe_id
JOIN ingredient i ON i.id = ri.ingredient_id
WHERE sc.owner_id = $1
GROUP BY i.name, i.measurement_unit
ORDER BY i.name, i.measurement_unit
"#;

/// Sum ingredient amounts over every recipe in the owner's cart, grouped by (name, unit).
pub async fn shopping_list<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
) -> Result<Vec<ShoppingListLine>, AppError> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        SHOPPING_LIST_SQL,
        [owner_id.into()],
    );
    Ok(ShoppingListLine::find_by_statement(stmt).all(db).await?)
}

/// Render as `"<name>: <amount>, <unit>"` lines joined by newlines.
pub fn render_shopping_list(lines: &[ShoppingListLine]) -> String {
    lines
        .iter()
        .map(|l| format!("{}: {}, {}", l.name, l.amount, l.measurement_unit))
        .collect::<Vec<_>>()
        .join("\n")
}
