//! Create moderation_action, report, and moderation_log tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ModerationAction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModerationAction::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ModerationAction::PostId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModerationAction::ModeratorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModerationAction::Outcome)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModerationAction::Note).text())
                    .col(
                        ColumnDef::new(ModerationAction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_moderation_action_post")
                    .table(ModerationAction::Table)
                    .col(ModerationAction::PostId)
                    .col(ModerationAction::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Report::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Report::ReporterId).string_len(32).not_null())
                    .col(ColumnDef::new(Report::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(Report::Reason).string_len(128).not_null())
                    .col(ColumnDef::new(Report::Context).text())
                    .col(
                        ColumnDef::new(Report::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Report::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Report::ResolvedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_report_reporter_post")
                    .table(Report::Table)
                    .col(Report::ReporterId)
                    .col(Report::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_report_post_status")
                    .table(Report::Table)
                    .col(Report::PostId)
                    .col(Report::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ModerationLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModerationLog::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ModerationLog::ActorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModerationLog::ActorType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModerationLog::Action).string_len(64).not_null())
                    .col(
                        ColumnDef::new(ModerationLog::TargetId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModerationLog::Reason).text())
                    .col(
                        ColumnDef::new(ModerationLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_moderation_log_created")
                    .table(ModerationLog::Table)
                    .col(ModerationLog::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModerationLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ModerationAction::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ModerationAction {
    Table,
    Id,
    PostId,
    ModeratorId,
    Outcome,
    Note,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Report {
    Table,
    Id,
    ReporterId,
    PostId,
    Reason,
    Context,
    Status,
    CreatedAt,
    ResolvedAt,
}

#[derive(DeriveIden)]
enum ModerationLog {
    Table,
    Id,
    ActorId,
    ActorType,
    Action,
    TargetId,
    Reason,
    CreatedAt,
}
