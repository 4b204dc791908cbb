use crate::entities::{account_tokens, prelude::*};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

const USER_PURPOSE_INDEX: &str = "idx_account_tokens_user_purpose";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(AccountTokens)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Issuing a token invalidates the outstanding ones for the same user and purpose
        manager
            .create_index(
                Index::create()
                    .name(USER_PURPOSE_INDEX)
                    .table(AccountTokens)
                    .col(account_tokens::Column::UserId)
                    .col(account_tokens::Column::Purpose)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(USER_PURPOSE_INDEX)
                    .table(AccountTokens)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(AccountTokens).to_owned())
            .await?;

        Ok(())
    }
}
