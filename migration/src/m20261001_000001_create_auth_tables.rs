use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum AuthRequest {
    Table,
    Id,
    ClientId,
    ResponseTypes,
    Scopes,
    RedirectUri,
    Nonce,
    State,
    ForceApprovalPrompt,
    LoggedIn,
    ClaimsUserId,
    ClaimsUsername,
    ClaimsEmail,
    ClaimsEmailVerified,
    ConnectorId,
    ConnectorData,
    Expiry,
}

#[derive(DeriveIden)]
enum AuthCode {
    Table,
    Id,
    ClientId,
    Scopes,
    Nonce,
    ClaimsUserId,
    ClaimsUsername,
    ClaimsEmail,
    ClaimsEmailVerified,
    ConnectorId,
    ConnectorData,
    Expiry,
}

#[derive(DeriveIden)]
enum RefreshToken {
    Table,
    Id,
    ClientId,
    Scopes,
    Nonce,
    ClaimsUserId,
    ClaimsUsername,
    ClaimsEmail,
    ClaimsEmailVerified,
    ConnectorId,
    ConnectorData,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Composite fields (response types, scopes) are codec-encoded blobs.
        manager
            .create_table(
                Table::create()
                    .table(AuthRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuthRequest::Id)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuthRequest::ClientId).text().not_null())
                    .col(ColumnDef::new(AuthRequest::ResponseTypes).blob().not_null())
                    .col(ColumnDef::new(AuthRequest::Scopes).blob().not_null())
                    .col(ColumnDef::new(AuthRequest::RedirectUri).text().not_null())
                    .col(ColumnDef::new(AuthRequest::Nonce).text().not_null())
                    .col(ColumnDef::new(AuthRequest::State).text().not_null())
                    .col(
                        ColumnDef::new(AuthRequest::ForceApprovalPrompt)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuthRequest::LoggedIn).boolean().not_null())
                    .col(ColumnDef::new(AuthRequest::ClaimsUserId).text().not_null())
                    .col(ColumnDef::new(AuthRequest::ClaimsUsername).text().not_null())
                    .col(ColumnDef::new(AuthRequest::ClaimsEmail).text().not_null())
                    .col(
                        ColumnDef::new(AuthRequest::ClaimsEmailVerified)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuthRequest::ConnectorId).text().not_null())
                    .col(ColumnDef::new(AuthRequest::ConnectorData).blob().not_null())
                    .col(
                        ColumnDef::new(AuthRequest::Expiry)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuthCode::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuthCode::Id).text().not_null().primary_key())
                    .col(ColumnDef::new(AuthCode::ClientId).text().not_null())
                    .col(ColumnDef::new(AuthCode::Scopes).blob().not_null())
                    .col(ColumnDef::new(AuthCode::Nonce).text().not_null())
                    .col(ColumnDef::new(AuthCode::ClaimsUserId).text().not_null())
                    .col(ColumnDef::new(AuthCode::ClaimsUsername).text().not_null())
                    .col(ColumnDef::new(AuthCode::ClaimsEmail).text().not_null())
                    .col(
                        ColumnDef::new(AuthCode::ClaimsEmailVerified)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuthCode::ConnectorId).text().not_null())
                    .col(ColumnDef::new(AuthCode::ConnectorData).blob().not_null())
                    .col(
                        ColumnDef::new(AuthCode::Expiry)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RefreshToken::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RefreshToken::Id)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RefreshToken::ClientId).text().not_null())
                    .col(ColumnDef::new(RefreshToken::Scopes).blob().not_null())
                    .col(ColumnDef::new(RefreshToken::Nonce).text().not_null())
                    .col(ColumnDef::new(RefreshToken::ClaimsUserId).text().not_null())
                    .col(ColumnDef::new(RefreshToken::ClaimsUsername).text().not_null())
                    .col(ColumnDef::new(RefreshToken::ClaimsEmail).text().not_null())
                    .col(
                        ColumnDef::new(RefreshToken::ClaimsEmailVerified)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RefreshToken::ConnectorId).text().not_null())
                    .col(ColumnDef::new(RefreshToken::ConnectorData).blob().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RefreshToken::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuthCode::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuthRequest::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}
