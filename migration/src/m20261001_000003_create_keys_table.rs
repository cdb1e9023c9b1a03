use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Keys {
    Table,
    Id,
    VerificationKeys,
    SigningKey,
    SigningKeyPub,
    NextRotation,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Holds a single row, keyed by a well-known id.
        manager
            .create_table(
                Table::create()
                    .table(Keys::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Keys::Id).text().not_null().primary_key())
                    .col(ColumnDef::new(Keys::VerificationKeys).blob().not_null())
                    .col(ColumnDef::new(Keys::SigningKey).blob().not_null())
                    .col(ColumnDef::new(Keys::SigningKeyPub).blob().not_null())
                    .col(
                        ColumnDef::new(Keys::NextRotation)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Keys::Table).if_exists().to_owned())
            .await
    }
}
