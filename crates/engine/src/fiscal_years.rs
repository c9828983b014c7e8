//! Fiscal years and their lock lifecycle.
//!
//! ```text
//!        close                permanently_close
//! open ────────▶ closed ───────────────────────▶ permanently_closed
//!      ◀────────
//!        reopen
//! ```
//!
//! `permanently_closed` is absorbing. Every transition first checks the
//! caller's capability, then the absorbing state, then the source state, and
//! only mutates the year once all three checks pass.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Balances, Capability, EngineError, FiscalYearVariance, ResultEngine, Session,
    util::parse_uuid,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalYearStatus {
    Open,
    Closed,
    PermanentlyClosed,
}

impl FiscalYearStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::PermanentlyClosed => "permanently_closed",
        }
    }
}

impl TryFrom<&str> for FiscalYearStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "permanently_closed" => Ok(Self::PermanentlyClosed),
            other => Err(EngineError::Validation(format!(
                "invalid fiscal year status: {other}"
            ))),
        }
    }
}

impl core::fmt::Display for FiscalYearStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phrase a user has to type before a year is permanently closed.
pub fn confirmation_phrase(year: i32) -> String {
    format!("PERMANENTLY CLOSE {year}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear {
    pub id: Uuid,
    pub club_id: String,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: FiscalYearStatus,
    pub opening_balances: Balances,
    /// `Some` exactly when the year is not `open`.
    pub closing_balances: Option<Balances>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
    pub permanently_closed_at: Option<DateTime<Utc>>,
    pub permanently_closed_by: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFiscalYear {
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub opening_balances: Balances,
}

/// Direct field edits. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearPatch {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub opening_balances: Option<Balances>,
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> ResultEngine<()> {
    if start > end {
        return Err(EngineError::Validation(format!(
            "fiscal year starts after it ends: {start} > {end}"
        )));
    }
    Ok(())
}

impl FiscalYear {
    pub fn new(club_id: &str, new: NewFiscalYear) -> ResultEngine<Self> {
        validate_range(new.start_date, new.end_date)?;
        Ok(Self {
            id: Uuid::new_v4(),
            club_id: club_id.to_string(),
            year: new.year,
            start_date: new.start_date,
            end_date: new.end_date,
            status: FiscalYearStatus::Open,
            opening_balances: new.opening_balances,
            closing_balances: None,
            closed_at: None,
            closed_by: None,
            permanently_closed_at: None,
            permanently_closed_by: None,
        })
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end_date && end >= self.start_date
    }

    fn reject_terminal(&self) -> ResultEngine<()> {
        if self.status == FiscalYearStatus::PermanentlyClosed {
            return Err(EngineError::TerminalState(format!(
                "fiscal year {} is permanently closed",
                self.year
            )));
        }
        Ok(())
    }

    fn require_status(&self, expected: FiscalYearStatus, action: &str) -> ResultEngine<()> {
        if self.status != expected {
            return Err(EngineError::Validation(format!(
                "cannot {action} fiscal year {}: status is {}, expected {expected}",
                self.year, self.status
            )));
        }
        Ok(())
    }

    /// `open → closed`, fixing the closing balances.
    pub fn close(
        &mut self,
        session: &Session,
        closing: Balances,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        session.require(Capability::SettingsManage)?;
        self.reject_terminal()?;
        self.require_status(FiscalYearStatus::Open, "close")?;

        self.status = FiscalYearStatus::Closed;
        self.closing_balances = Some(closing);
        self.closed_at = Some(now);
        self.closed_by = Some(session.user_id.clone());
        Ok(())
    }

    /// `closed → open`. Drops the closing data so the year can be closed again.
    pub fn reopen(&mut self, session: &Session) -> ResultEngine<()> {
        session.require(Capability::SettingsManage)?;
        self.reject_terminal()?;
        self.require_status(FiscalYearStatus::Closed, "reopen")?;

        self.status = FiscalYearStatus::Open;
        self.closing_balances = None;
        self.closed_at = None;
        self.closed_by = None;
        Ok(())
    }

    /// `closed → permanently_closed`. Irreversible, so the caller must pass
    /// `confirmed_irreversible = true` on top of the ordinary confirmation.
    pub fn permanently_close(
        &mut self,
        session: &Session,
        confirmed_irreversible: bool,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        session.require(Capability::SettingsManage)?;
        self.reject_terminal()?;
        self.require_status(FiscalYearStatus::Closed, "permanently close")?;
        if !confirmed_irreversible {
            return Err(EngineError::Validation(format!(
                "permanently closing fiscal year {} was not confirmed",
                self.year
            )));
        }

        self.status = FiscalYearStatus::PermanentlyClosed;
        self.permanently_closed_at = Some(now);
        self.permanently_closed_by = Some(session.user_id.clone());
        Ok(())
    }

    /// Closing minus opening balances. `None` while the year is `open`.
    pub fn variance(&self) -> Option<FiscalYearVariance> {
        if self.status == FiscalYearStatus::Open {
            return None;
        }
        self.closing_balances
            .as_ref()
            .map(|closing| FiscalYearVariance::between(&self.opening_balances, closing))
    }

    /// Checks whether `session` may edit this year or the records dated
    /// inside it.
    pub fn check_records_writable(&self, session: &Session) -> ResultEngine<()> {
        self.reject_terminal()?;
        if self.status == FiscalYearStatus::Closed {
            session.require(Capability::FiscalYearsEditClosed)?;
        }
        Ok(())
    }

    pub fn apply_patch(&mut self, session: &Session, patch: FiscalYearPatch) -> ResultEngine<()> {
        session.require(Capability::SettingsManage)?;
        self.check_records_writable(session)?;

        let start_date = patch.start_date.unwrap_or(self.start_date);
        let end_date = patch.end_date.unwrap_or(self.end_date);
        validate_range(start_date, end_date)?;

        self.start_date = start_date;
        self.end_date = end_date;
        if let Some(opening) = patch.opening_balances {
            self.opening_balances = opening;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fiscal_years")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub club_id: String,
    pub year: i32,
    pub start_date: Date,
    pub end_date: Date,
    pub status: String,
    pub opening_current_minor: i64,
    pub opening_savings_minor: i64,
    pub closing_current_minor: Option<i64>,
    pub closing_savings_minor: Option<i64>,
    pub closed_at: Option<DateTimeUtc>,
    pub closed_by: Option<String>,
    pub permanently_closed_at: Option<DateTimeUtc>,
    pub permanently_closed_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clubs::Entity",
        from = "Column::ClubId",
        to = "super::clubs::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Clubs,
}

impl Related<super::clubs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clubs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for FiscalYear {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let closing_balances = match (model.closing_current_minor, model.closing_savings_minor) {
            (Some(current), Some(savings)) => Some(Balances::new(current, savings)),
            _ => None,
        };
        Ok(Self {
            id: parse_uuid(&model.id, "fiscal year")?,
            club_id: model.club_id,
            year: model.year,
            start_date: model.start_date,
            end_date: model.end_date,
            status: FiscalYearStatus::try_from(model.status.as_str())?,
            opening_balances: Balances::new(
                model.opening_current_minor,
                model.opening_savings_minor,
            ),
            closing_balances,
            closed_at: model.closed_at,
            closed_by: model.closed_by,
            permanently_closed_at: model.permanently_closed_at,
            permanently_closed_by: model.permanently_closed_by,
        })
    }
}

impl From<&FiscalYear> for ActiveModel {
    fn from(fy: &FiscalYear) -> Self {
        Self {
            id: ActiveValue::Set(fy.id.to_string()),
            club_id: ActiveValue::Set(fy.club_id.clone()),
            year: ActiveValue::Set(fy.year),
            start_date: ActiveValue::Set(fy.start_date),
            end_date: ActiveValue::Set(fy.end_date),
            status: ActiveValue::Set(fy.status.as_str().to_string()),
            opening_current_minor: ActiveValue::Set(fy.opening_balances.current_minor),
            opening_savings_minor: ActiveValue::Set(fy.opening_balances.savings_minor),
            closing_current_minor: ActiveValue::Set(fy.closing_balances.map(|b| b.current_minor)),
            closing_savings_minor: ActiveValue::Set(fy.closing_balances.map(|b| b.savings_minor)),
            closed_at: ActiveValue::Set(fy.closed_at),
            closed_by: ActiveValue::Set(fy.closed_by.clone()),
            permanently_closed_at: ActiveValue::Set(fy.permanently_closed_at),
            permanently_closed_by: ActiveValue::Set(fy.permanently_closed_by.clone()),
        }
    }
}
