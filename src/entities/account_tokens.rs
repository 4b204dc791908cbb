use sea_orm::entity::prelude::*;

use crate::domain::TokenPurpose;

/// Single-use password reset / email verification token.
/// Only the SHA-256 of the raw token is stored.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "account_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: Uuid,

    pub purpose: TokenPurpose,

    #[sea_orm(unique, column_type = "String(StringLen::N(64))")]
    pub token_hash: String,

    pub expires_at: ChronoDateTimeUtc,

    pub used_at: Option<ChronoDateTimeUtc>,

    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
