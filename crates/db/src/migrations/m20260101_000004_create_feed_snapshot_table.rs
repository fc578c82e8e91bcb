//! Create feed_snapshot_item table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FeedSnapshotItem::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FeedSnapshotItem::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FeedSnapshotItem::CommunityId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FeedSnapshotItem::PostId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(FeedSnapshotItem::FeedDate).date().not_null())
                    .col(ColumnDef::new(FeedSnapshotItem::Rank).integer().not_null())
                    .col(
                        ColumnDef::new(FeedSnapshotItem::Score)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(FeedSnapshotItem::Source)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(FeedSnapshotItem::MatchedLabel).string_len(64))
                    .col(
                        ColumnDef::new(FeedSnapshotItem::CreatedAt)
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
                    .name("idx_feed_snapshot_unique")
                    .table(FeedSnapshotItem::Table)
                    .col(FeedSnapshotItem::CommunityId)
                    .col(FeedSnapshotItem::PostId)
                    .col(FeedSnapshotItem::FeedDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_feed_snapshot_page")
                    .table(FeedSnapshotItem::Table)
                    .col(FeedSnapshotItem::CommunityId)
                    .col(FeedSnapshotItem::FeedDate)
                    .col(FeedSnapshotItem::Rank)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FeedSnapshotItem::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum FeedSnapshotItem {
    Table,
    Id,
    CommunityId,
    PostId,
    FeedDate,
    Rank,
    Score,
    Source,
    MatchedLabel,
    CreatedAt,
}
