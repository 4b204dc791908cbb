use sea_orm::entity::prelude::*;

use crate::domain::Role;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Lower-cased, trimmed address
    #[sea_orm(unique, column_type = "String(StringLen::N(255))")]
    pub email: String,

    #[sea_orm(unique, column_type = "String(StringLen::N(80))")]
    pub username: String,

    /// Argon2id PHC string
    pub password_hash: String,

    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub first_name: String,

    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub last_name: String,

    pub role: Role,

    pub is_active: bool,

    pub is_verified: bool,

    pub email_verified: bool,

    pub verified_at: Option<ChronoDateTimeUtc>,

    pub failed_login_attempts: i32,

    pub locked_until: Option<ChronoDateTimeUtc>,

    pub last_login: Option<ChronoDateTimeUtc>,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account_tokens::Entity")]
    AccountTokens,
}

impl Related<super::account_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
