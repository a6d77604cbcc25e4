use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Directed subscription: `user_id` follows `author_id`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follow")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub user_id: i32,
    #[sea_orm(primary_key)]
    pub author_id: i32,
    #[sea_orm(belongs_to, from = "author_id", to = "id")]
    pub author: Option<super::user::Entity>,
    #[sea_orm(belongs_to, relation_enum = "Follower", from = "user_id", to = "id")]
    pub follower: Option<super::user::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
