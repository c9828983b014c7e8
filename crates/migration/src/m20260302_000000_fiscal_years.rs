//! Fiscal years with their lock status and balances.

use sea_orm_migration::prelude::*;

use super::m20260301_000000_init::Clubs;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum FiscalYears {
    Table,
    Id,
    ClubId,
    Year,
    StartDate,
    EndDate,
    Status,
    OpeningCurrentMinor,
    OpeningSavingsMinor,
    ClosingCurrentMinor,
    ClosingSavingsMinor,
    ClosedAt,
    ClosedBy,
    PermanentlyClosedAt,
    PermanentlyClosedBy,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FiscalYears::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FiscalYears::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FiscalYears::ClubId).string().not_null())
                    .col(ColumnDef::new(FiscalYears::Year).integer().not_null())
                    .col(ColumnDef::new(FiscalYears::StartDate).date().not_null())
                    .col(ColumnDef::new(FiscalYears::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(FiscalYears::Status)
                            .string()
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(FiscalYears::OpeningCurrentMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(FiscalYears::OpeningSavingsMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(FiscalYears::ClosingCurrentMinor).big_integer())
                    .col(ColumnDef::new(FiscalYears::ClosingSavingsMinor).big_integer())
                    .col(ColumnDef::new(FiscalYears::ClosedAt).timestamp())
                    .col(ColumnDef::new(FiscalYears::ClosedBy).string())
                    .col(ColumnDef::new(FiscalYears::PermanentlyClosedAt).timestamp())
                    .col(ColumnDef::new(FiscalYears::PermanentlyClosedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fiscal_years-club_id")
                            .from(FiscalYears::Table, FiscalYears::ClubId)
                            .to(Clubs::Table, Clubs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fiscal_years-club_id-year-unique")
                    .table(FiscalYears::Table)
                    .col(FiscalYears::ClubId)
                    .col(FiscalYears::Year)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FiscalYears::Table).to_owned())
            .await?;
        Ok(())
    }
}
