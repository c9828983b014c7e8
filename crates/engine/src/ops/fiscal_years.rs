use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Capability, EngineError, FiscalYear, FiscalYearPatch, NewFiscalYear, ResultEngine,
    compute_closing_balances, fiscal_years,
};

use super::{Engine, with_tx};

impl Engine {
    async fn require_fiscal_year<C: ConnectionTrait>(
        &self,
        db: &C,
        club_id: &str,
        fiscal_year_id: Uuid,
    ) -> ResultEngine<FiscalYear> {
        fiscal_years::Entity::find_by_id(fiscal_year_id.to_string())
            .filter(fiscal_years::Column::ClubId.eq(club_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("fiscal year not exists".to_string()))?
            .try_into()
    }

    async fn load_fiscal_years<C: ConnectionTrait>(
        &self,
        db: &C,
        club_id: &str,
    ) -> ResultEngine<Vec<FiscalYear>> {
        fiscal_years::Entity::find()
            .filter(fiscal_years::Column::ClubId.eq(club_id.to_string()))
            .order_by_asc(fiscal_years::Column::StartDate)
            .all(db)
            .await?
            .into_iter()
            .map(FiscalYear::try_from)
            .collect()
    }

    async fn save_fiscal_year<C: ConnectionTrait>(
        &self,
        db: &C,
        fiscal_year: &FiscalYear,
    ) -> ResultEngine<()> {
        fiscal_years::ActiveModel::from(fiscal_year)
            .update(db)
            .await?;
        Ok(())
    }

    /// Create an `open` fiscal year (`settings.manage`).
    ///
    /// Years are unique per club and their date ranges must not overlap.
    pub async fn new_fiscal_year(
        &self,
        club_id: &str,
        new: NewFiscalYear,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        let fiscal_year = FiscalYear::new(club_id, new)?;
        with_tx!(self, |db_tx| {
            self.require_capability(&db_tx, club_id, user_id, Capability::SettingsManage)
                .await?;
            let existing = self.load_fiscal_years(&db_tx, club_id).await?;
            if existing.iter().any(|fy| fy.year == fiscal_year.year) {
                return Err(EngineError::ExistingKey(format!(
                    "fiscal year {}",
                    fiscal_year.year
                )));
            }
            if let Some(other) = existing
                .iter()
                .find(|fy| fy.overlaps(fiscal_year.start_date, fiscal_year.end_date))
            {
                return Err(EngineError::ExistingKey(format!(
                    "fiscal year overlapping {} ({} - {})",
                    other.year, other.start_date, other.end_date
                )));
            }

            fiscal_years::ActiveModel::from(&fiscal_year)
                .insert(&db_tx)
                .await?;
            Ok(fiscal_year.id)
        })
    }

    /// Read one fiscal year (`settings.view`).
    pub async fn fiscal_year(
        &self,
        club_id: &str,
        fiscal_year_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<FiscalYear> {
        self.require_capability(&self.database, club_id, user_id, Capability::SettingsView)
            .await?;
        self.require_fiscal_year(&self.database, club_id, fiscal_year_id)
            .await
    }

    /// All fiscal years of the club, chronological (`settings.view`).
    pub async fn list_fiscal_years(
        &self,
        club_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<FiscalYear>> {
        self.require_capability(&self.database, club_id, user_id, Capability::SettingsView)
            .await?;
        self.load_fiscal_years(&self.database, club_id).await
    }

    /// Close an `open` year, computing its closing balances from the records
    /// booked inside it.
    pub async fn close_fiscal_year(
        &self,
        club_id: &str,
        fiscal_year_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<FiscalYear> {
        with_tx!(self, |db_tx| {
            let session = self
                .require_capability(&db_tx, club_id, user_id, Capability::SettingsManage)
                .await?;
            let mut fiscal_year = self
                .require_fiscal_year(&db_tx, club_id, fiscal_year_id)
                .await?;
            let records = self.load_transactions(&db_tx, club_id).await?;
            let closing = compute_closing_balances(
                &fiscal_year.opening_balances,
                &records,
                fiscal_year.start_date,
                fiscal_year.end_date,
            )?;

            fiscal_year.close(&session, closing, now)?;
            self.save_fiscal_year(&db_tx, &fiscal_year).await?;
            tracing::info!(
                "fiscal year {} of club {club_id} closed by {user_id}",
                fiscal_year.year
            );
            Ok(fiscal_year)
        })
    }

    /// Reopen a `closed` year.
    pub async fn reopen_fiscal_year(
        &self,
        club_id: &str,
        fiscal_year_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<FiscalYear> {
        with_tx!(self, |db_tx| {
            let session = self.load_session(&db_tx, club_id, user_id).await?;
            let mut fiscal_year = self
                .require_fiscal_year(&db_tx, club_id, fiscal_year_id)
                .await?;

            fiscal_year.reopen(&session)?;
            self.save_fiscal_year(&db_tx, &fiscal_year).await?;
            tracing::info!(
                "fiscal year {} of club {club_id} reopened by {user_id}",
                fiscal_year.year
            );
            Ok(fiscal_year)
        })
    }

    /// Lock a `closed` year for good. `confirmed_irreversible` must be set by
    /// the caller after an explicit acknowledgment.
    pub async fn permanently_close_fiscal_year(
        &self,
        club_id: &str,
        fiscal_year_id: Uuid,
        confirmed_irreversible: bool,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<FiscalYear> {
        with_tx!(self, |db_tx| {
            let session = self.load_session(&db_tx, club_id, user_id).await?;
            let mut fiscal_year = self
                .require_fiscal_year(&db_tx, club_id, fiscal_year_id)
                .await?;

            fiscal_year.permanently_close(&session, confirmed_irreversible, now)?;
            self.save_fiscal_year(&db_tx, &fiscal_year).await?;
            tracing::info!(
                "fiscal year {} of club {club_id} permanently closed by {user_id}",
                fiscal_year.year
            );
            Ok(fiscal_year)
        })
    }

    /// Edit dates or opening balances of a year that is not permanently
    /// closed. A closed year gets its closing balances recomputed over the new
    /// range.
    pub async fn update_fiscal_year(
        &self,
        club_id: &str,
        fiscal_year_id: Uuid,
        patch: FiscalYearPatch,
        user_id: &str,
    ) -> ResultEngine<FiscalYear> {
        with_tx!(self, |db_tx| {
            let session = self.load_session(&db_tx, club_id, user_id).await?;
            let mut fiscal_year = self
                .require_fiscal_year(&db_tx, club_id, fiscal_year_id)
                .await?;

            fiscal_year.apply_patch(&session, patch)?;
            let others = self.load_fiscal_years(&db_tx, club_id).await?;
            if let Some(other) = others.iter().find(|fy| {
                fy.id != fiscal_year.id
                    && fy.overlaps(fiscal_year.start_date, fiscal_year.end_date)
            }) {
                return Err(EngineError::ExistingKey(format!(
                    "fiscal year overlapping {} ({} - {})",
                    other.year, other.start_date, other.end_date
                )));
            }
            if fiscal_year.closing_balances.is_some() {
                let records = self.load_transactions(&db_tx, club_id).await?;
                fiscal_year.closing_balances = Some(compute_closing_balances(
                    &fiscal_year.opening_balances,
                    &records,
                    fiscal_year.start_date,
                    fiscal_year.end_date,
                )?);
            }
            self.save_fiscal_year(&db_tx, &fiscal_year).await?;
            tracing::info!(
                "fiscal year {} of club {club_id} updated by {user_id}",
                fiscal_year.year
            );
            Ok(fiscal_year)
        })
    }
}
