//! Create user table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(User::Username)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(User::CountryCode).string_len(2))
                    .col(
                        ColumnDef::new(User::IsMinor)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(User::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(User::IsModerator)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(User::NsfwStrikes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(User::StrikeUpdatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(User::CooldownUntil).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(User::IsBanned)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(User::ReportsSubmitted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(User::ReportsConfirmed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(User::ReportsRejected)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(User::ReportAccuracy)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(User::ReportCooldownUntil).timestamp_with_time_zone())
                    .col(ColumnDef::new(User::LastRejectedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(User::LastRejectedSeverity).string_len(16))
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Username,
    CountryCode,
    IsMinor,
    IsAdmin,
    IsModerator,
    NsfwStrikes,
    StrikeUpdatedAt,
    CooldownUntil,
    IsBanned,
    ReportsSubmitted,
    ReportsConfirmed,
    ReportsRejected,
    ReportAccuracy,
    ReportCooldownUntil,
    LastRejectedAt,
    LastRejectedSeverity,
    CreatedAt,
    UpdatedAt,
}
