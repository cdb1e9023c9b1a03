use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Client {
    Table,
    Id,
    Secret,
    RedirectUris,
    TrustedPeers,
    Public,
    Name,
    LogoUrl,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Client::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Client::Id).text().not_null().primary_key())
                    .col(ColumnDef::new(Client::Secret).text().not_null())
                    .col(ColumnDef::new(Client::RedirectUris).blob().not_null())
                    .col(ColumnDef::new(Client::TrustedPeers).blob().not_null())
                    .col(ColumnDef::new(Client::Public).boolean().not_null())
                    .col(ColumnDef::new(Client::Name).text().not_null())
                    .col(ColumnDef::new(Client::LogoUrl).text().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Client::Table).if_exists().to_owned())
            .await
    }
}
