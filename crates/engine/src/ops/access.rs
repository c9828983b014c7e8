use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};

use crate::{
    Capability, EngineError, FiscalYear, ResultEngine, Role, Session, club_memberships, clubs,
    fiscal_years,
};

use super::Engine;

impl Engine {
    pub(super) async fn require_club<C: ConnectionTrait>(
        &self,
        db: &C,
        club_id: &str,
    ) -> ResultEngine<clubs::Model> {
        clubs::Entity::find_by_id(club_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("club not exists".to_string()))
    }

    pub(super) async fn membership_role<C: ConnectionTrait>(
        &self,
        db: &C,
        club_id: &str,
        user_id: &str,
    ) -> ResultEngine<Option<Role>> {
        let row = club_memberships::Entity::find_by_id((club_id.to_string(), user_id.to_string()))
            .one(db)
            .await?;
        row.as_ref()
            .map(|m| Role::try_from(m.role.as_str()))
            .transpose()
    }

    pub(super) async fn load_session<C: ConnectionTrait>(
        &self,
        db: &C,
        club_id: &str,
        user_id: &str,
    ) -> ResultEngine<Session> {
        let club = self.require_club(db, club_id).await?;
        let role = self.membership_role(db, club_id, user_id).await?;
        Ok(Session::new(club_id, user_id, role, club.owner == user_id))
    }

    /// Resolve `user_id` against a club and check one capability.
    pub(super) async fn require_capability<C: ConnectionTrait>(
        &self,
        db: &C,
        club_id: &str,
        user_id: &str,
        capability: Capability,
    ) -> ResultEngine<Session> {
        let session = self.load_session(db, club_id, user_id).await?;
        session.require(capability)?;
        Ok(session)
    }

    /// Resolve the caller's session for a club.
    pub async fn session(&self, club_id: &str, user_id: &str) -> ResultEngine<Session> {
        self.load_session(&self.database, club_id, user_id).await
    }

    pub(super) async fn fiscal_year_covering<C: ConnectionTrait>(
        &self,
        db: &C,
        club_id: &str,
        date: NaiveDate,
    ) -> ResultEngine<Option<FiscalYear>> {
        fiscal_years::Entity::find()
            .filter(fiscal_years::Column::ClubId.eq(club_id.to_string()))
            .filter(fiscal_years::Column::StartDate.lte(date))
            .filter(fiscal_years::Column::EndDate.gte(date))
            .one(db)
            .await?
            .map(FiscalYear::try_from)
            .transpose()
    }

    /// Records dated inside a locked fiscal year are only writable with the
    /// elevated capability, and never once the year is permanently closed.
    pub(super) async fn require_period_writable<C: ConnectionTrait>(
        &self,
        db: &C,
        session: &Session,
        date: NaiveDate,
    ) -> ResultEngine<()> {
        match self.fiscal_year_covering(db, &session.club_id, date).await? {
            Some(fiscal_year) => fiscal_year.check_records_writable(session),
            None => Ok(()),
        }
    }
}
