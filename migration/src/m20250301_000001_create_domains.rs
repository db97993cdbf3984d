use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Domains::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Domains::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Domains::TeamId).uuid().not_null())
                    .col(ColumnDef::new(Domains::Url).string().not_null())
                    .col(
                        ColumnDef::new(Domains::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Domains::ScanFrequency)
                            .string()
                            .not_null()
                            .default("daily"),
                    )
                    .col(ColumnDef::new(Domains::LastScannedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Domains::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // The scheduling sweep filters on these two columns
        manager
            .create_index(
                Index::create()
                    .name("idx_domains_active_frequency")
                    .table(Domains::Table)
                    .col(Domains::IsActive)
                    .col(Domains::ScanFrequency)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Domains::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Domains {
    Table,
    Id,
    TeamId,
    Url,
    IsActive,
    ScanFrequency,
    LastScannedAt,
    CreatedAt,
}
