use crate::m20250301_000001_create_domains::Domains;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Scans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Scans::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Scans::DomainId).uuid().not_null())
                    .col(ColumnDef::new(Scans::ScanType).string().not_null())
                    .col(ColumnDef::new(Scans::Status).string().not_null())
                    .col(ColumnDef::new(Scans::OverallScore).integer())
                    .col(ColumnDef::new(Scans::OverallGrade).string())
                    .col(ColumnDef::new(Scans::RawHeaders).json())
                    .col(ColumnDef::new(Scans::CspPolicy).text())
                    .col(ColumnDef::new(Scans::CspGrade).string())
                    .col(ColumnDef::new(Scans::CspIssues).json().not_null())
                    .col(ColumnDef::new(Scans::ScanDurationMs).big_integer())
                    .col(ColumnDef::new(Scans::ErrorMessage).text())
                    .col(
                        ColumnDef::new(Scans::ScannedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scans_domain")
                            .from(Scans::Table, Scans::DomainId)
                            .to(Domains::Table, Domains::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scans_domain_scanned_at")
                    .table(Scans::Table)
                    .col(Scans::DomainId)
                    .col(Scans::ScannedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SecurityScores::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SecurityScores::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SecurityScores::ScanId).uuid().not_null())
                    .col(ColumnDef::new(SecurityScores::HeaderName).string().not_null())
                    .col(ColumnDef::new(SecurityScores::IsPresent).boolean().not_null())
                    .col(ColumnDef::new(SecurityScores::Score).integer().not_null())
                    .col(ColumnDef::new(SecurityScores::Grade).string().not_null())
                    .col(ColumnDef::new(SecurityScores::Issues).json().not_null())
                    .col(ColumnDef::new(SecurityScores::Recommendations).json().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_security_scores_scan")
                            .from(SecurityScores::Table, SecurityScores::ScanId)
                            .to(Scans::Table, Scans::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_security_scores_scan_id")
                    .table(SecurityScores::Table)
                    .col(SecurityScores::ScanId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SecurityScores::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Scans::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Scans {
    Table,
    Id,
    DomainId,
    ScanType,
    Status,
    OverallScore,
    OverallGrade,
    RawHeaders,
    CspPolicy,
    CspGrade,
    CspIssues,
    ScanDurationMs,
    ErrorMessage,
    ScannedAt,
}

#[derive(DeriveIden)]
enum SecurityScores {
    Table,
    Id,
    ScanId,
    HeaderName,
    IsPresent,
    Score,
    Grade,
    Issues,
    Recommendations,
}
