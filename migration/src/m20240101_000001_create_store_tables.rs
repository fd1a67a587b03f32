use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StoreKeys::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(StoreKeys::Key).string().not_null().primary_key())
                    .col(ColumnDef::new(StoreKeys::Value).text().null())
                    .col(ColumnDef::new(StoreKeys::ExpiresAt).big_integer().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderedMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderedMembers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderedMembers::Key).string().not_null())
                    .col(ColumnDef::new(OrderedMembers::Member).text().not_null())
                    .col(ColumnDef::new(OrderedMembers::Score).double().not_null())
                    .to_owned(),
            )
            .await?;

        // A member appears at most once per collection
        manager
            .create_index(
                Index::create()
                    .name("idx_ordered_members_key_member")
                    .table(OrderedMembers::Table)
                    .col(OrderedMembers::Key)
                    .col(OrderedMembers::Member)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Range scans by score within a collection
        manager
            .create_index(
                Index::create()
                    .name("idx_ordered_members_key_score")
                    .table(OrderedMembers::Table)
                    .col(OrderedMembers::Key)
                    .col(OrderedMembers::Score)
                    .to_owned(),
            )
            .await?;

        // Expiry sweeps
        manager
            .create_index(
                Index::create()
                    .name("idx_store_keys_expires_at")
                    .table(StoreKeys::Table)
                    .col(StoreKeys::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderedMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StoreKeys::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StoreKeys {
    Table,
    Key,
    Value,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum OrderedMembers {
    Table,
    Id,
    Key,
    Member,
    Score,
}
