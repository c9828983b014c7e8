use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Capability, Club, EngineError, ResultEngine, Role, club_memberships, clubs,
    util::normalize_required_name,
};

use super::{Engine, with_tx};

impl Engine {
    /// Add a new club. The owner becomes its first admin.
    pub async fn new_club(&self, name: &str, owner: &str) -> ResultEngine<String> {
        let name = normalize_required_name(name, "club")?;
        let owner = normalize_required_name(owner, "owner")?;
        let club = Club::new(name, &owner);
        let club_id = club.id.clone();

        with_tx!(self, |db_tx| {
            clubs::ActiveModel::from(&club).insert(&db_tx).await?;
            let membership = club_memberships::ActiveModel {
                club_id: ActiveValue::Set(club_id.clone()),
                user_id: ActiveValue::Set(owner.clone()),
                role: ActiveValue::Set(Role::Admin.as_str().to_string()),
            };
            membership.insert(&db_tx).await?;
            tracing::info!("created club {} owned by {owner}", club.name);
            Ok(club_id)
        })
    }

    pub async fn club(&self, club_id: &str, user_id: &str) -> ResultEngine<Club> {
        let session = self.load_session(&self.database, club_id, user_id).await?;
        if session.role.is_none() && !session.is_owner {
            return Err(EngineError::KeyNotFound("club not exists".to_string()));
        }
        Ok(self.require_club(&self.database, club_id).await?.into())
    }

    /// Adds a member or changes their role (`settings.manage`). Roles at or
    /// above the caller's own need `fiscal_years.edit_closed` too.
    pub async fn set_member_role(
        &self,
        club_id: &str,
        member: &str,
        role: Role,
        user_id: &str,
    ) -> ResultEngine<()> {
        let member = normalize_required_name(member, "member")?;
        with_tx!(self, |db_tx| {
            let session = self.load_session(&db_tx, club_id, user_id).await?;
            let current = self.membership_role(&db_tx, club_id, &member).await?;
            session.require_role_change(current, Some(role))?;
            let club = self.require_club(&db_tx, club_id).await?;
            if club.owner == member {
                return Err(EngineError::Validation(
                    "cannot change the role of the club owner".to_string(),
                ));
            }

            let active = club_memberships::ActiveModel {
                club_id: ActiveValue::Set(club_id.to_string()),
                user_id: ActiveValue::Set(member.clone()),
                role: ActiveValue::Set(role.as_str().to_string()),
            };

            match current {
                Some(_) => {
                    active.update(&db_tx).await?;
                }
                None => {
                    active.insert(&db_tx).await?;
                }
            }
            Ok(())
        })
    }

    /// Removes a member (`settings.manage`, plus `fiscal_years.edit_closed`
    /// for members ranked at or above the caller). The owner cannot be removed.
    pub async fn remove_member(
        &self,
        club_id: &str,
        member: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let session = self.load_session(&db_tx, club_id, user_id).await?;
            let current = self.membership_role(&db_tx, club_id, member).await?;
            session.require_role_change(current, None)?;
            let club = self.require_club(&db_tx, club_id).await?;
            if club.owner == member {
                return Err(EngineError::Validation(
                    "cannot remove the club owner".to_string(),
                ));
            }
            let res =
                club_memberships::Entity::delete_by_id((club_id.to_string(), member.to_string()))
                    .exec(&db_tx)
                    .await?;
            if res.rows_affected == 0 {
                return Err(EngineError::KeyNotFound("member not exists".to_string()));
            }
            tracing::info!("removed {member} from club {club_id} by {user_id}");
            Ok(())
        })
    }

    /// Lists members and roles (`settings.view`).
    pub async fn list_members(
        &self,
        club_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<(String, Role)>> {
        self.require_capability(&self.database, club_id, user_id, Capability::SettingsView)
            .await?;
        let rows = club_memberships::Entity::find()
            .filter(club_memberships::Column::ClubId.eq(club_id.to_string()))
            .all(&self.database)
            .await?;
        rows.into_iter()
            .map(|m| Role::try_from(m.role.as_str()).map(|role| (m.user_id, role)))
            .collect()
    }
}
