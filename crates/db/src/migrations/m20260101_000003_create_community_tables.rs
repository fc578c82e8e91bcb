//! Create community, community_member, and label_import_rule tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Community::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Community::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Community::Name)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Community::Description).text())
                    .col(ColumnDef::new(Community::Scope).string_len(16).not_null())
                    .col(ColumnDef::new(Community::Rating).string_len(8).not_null())
                    .col(ColumnDef::new(Community::CountryCode).string_len(2))
                    .col(
                        ColumnDef::new(Community::Categories)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Community::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Community::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CommunityMember::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommunityMember::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CommunityMember::CommunityId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommunityMember::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommunityMember::Role)
                            .string_len(16)
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(CommunityMember::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_community_member_community")
                            .from(CommunityMember::Table, CommunityMember::CommunityId)
                            .to(Community::Table, Community::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_community_member_unique")
                    .table(CommunityMember::Table)
                    .col(CommunityMember::CommunityId)
                    .col(CommunityMember::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LabelImportRule::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LabelImportRule::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LabelImportRule::CommunityId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LabelImportRule::CategoryKey)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LabelImportRule::ImportMode)
                            .string_len(16)
                            .not_null()
                            .default("safe_only"),
                    )
                    .col(
                        ColumnDef::new(LabelImportRule::AllowGlobal)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LabelImportRule::AllowCountry)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LabelImportRule::AllowLocal)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LabelImportRule::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(LabelImportRule::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_label_import_rule_community")
                            .from(LabelImportRule::Table, LabelImportRule::CommunityId)
                            .to(Community::Table, Community::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_label_import_rule_unique")
                    .table(LabelImportRule::Table)
                    .col(LabelImportRule::CommunityId)
                    .col(LabelImportRule::CategoryKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_label_import_rule_category")
                    .table(LabelImportRule::Table)
                    .col(LabelImportRule::CategoryKey)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LabelImportRule::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CommunityMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Community::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Community {
    Table,
    Id,
    Name,
    Description,
    Scope,
    Rating,
    CountryCode,
    Categories,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CommunityMember {
    Table,
    Id,
    CommunityId,
    UserId,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LabelImportRule {
    Table,
    Id,
    CommunityId,
    CategoryKey,
    ImportMode,
    AllowGlobal,
    AllowCountry,
    AllowLocal,
    CreatedAt,
    UpdatedAt,
}
