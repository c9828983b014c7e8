//! Initial schema migration.
//!
//! - `clubs`: one row per club, with the owning username
//! - `club_memberships`: role of each user inside a club
//! - `bank_transactions`: imported bank statement lines

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub(crate) enum Clubs {
    Table,
    Id,
    Name,
    Owner,
}

#[derive(Iden)]
enum ClubMemberships {
    Table,
    ClubId,
    UserId,
    Role,
}

#[derive(Iden)]
enum BankTransactions {
    Table,
    Id,
    ClubId,
    SequenceNumber,
    Reconciled,
    CreatedAt,
    OccurredOn,
    AmountMinor,
    Account,
    Counterparty,
    Description,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clubs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Clubs::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Clubs::Name).string().not_null())
                    .col(ColumnDef::new(Clubs::Owner).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ClubMemberships::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ClubMemberships::ClubId).string().not_null())
                    .col(ColumnDef::new(ClubMemberships::UserId).string().not_null())
                    .col(ColumnDef::new(ClubMemberships::Role).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(ClubMemberships::ClubId)
                            .col(ClubMemberships::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-club_memberships-club_id")
                            .from(ClubMemberships::Table, ClubMemberships::ClubId)
                            .to(Clubs::Table, Clubs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-club_memberships-user_id")
                    .table(ClubMemberships::Table)
                    .col(ClubMemberships::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BankTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BankTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BankTransactions::ClubId).string().not_null())
                    .col(
                        ColumnDef::new(BankTransactions::SequenceNumber)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::Reconciled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BankTransactions::OccurredOn).date().not_null())
                    .col(
                        ColumnDef::new(BankTransactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::Account)
                            .string()
                            .not_null()
                            .default("current"),
                    )
                    .col(ColumnDef::new(BankTransactions::Counterparty).string())
                    .col(ColumnDef::new(BankTransactions::Description).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-bank_transactions-club_id")
                            .from(BankTransactions::Table, BankTransactions::ClubId)
                            .to(Clubs::Table, Clubs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Not unique: re-imports may repeat a sequence number until the
        // duplicate cleanup runs.
        manager
            .create_index(
                Index::create()
                    .name("idx-bank_transactions-club_id-sequence_number")
                    .table(BankTransactions::Table)
                    .col(BankTransactions::ClubId)
                    .col(BankTransactions::SequenceNumber)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-bank_transactions-club_id-occurred_on")
                    .table(BankTransactions::Table)
                    .col(BankTransactions::ClubId)
                    .col(BankTransactions::OccurredOn)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BankTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClubMemberships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clubs::Table).to_owned())
            .await?;
        Ok(())
    }
}
