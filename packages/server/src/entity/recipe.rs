use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub author_id: i32,
    #[sea_orm(belongs_to, from = "author_id", to = "id")]
    pub author: HasOne<super::user::Entity>,

    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub text: String,
    /// Image reference as submitted by the client (URL or data URI).
    #[sea_orm(column_type = "Text")]
    pub image: String,
    pub cooking_time: i32, // in minutes, >= 1

    #[sea_orm(has_many, via = "recipe_tag")]
    pub tags: HasMany<super::tag::Entity>,

    #[sea_orm(has_many)]
    pub ingredients: HasMany<super::recipe_ingredient::Entity>,

    /// Set once on creation.
    #[sea_orm(indexed)]
    pub pub_date: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
