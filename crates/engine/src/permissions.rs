//! Static permission matrix.
//!
//! Every club member holds one [`Role`]. A role maps to a fixed set of
//! [`Capability`]s through [`ROLE_MATRIX`]. Two overrides sit on top of the
//! table:
//!
//! - the club owner holds every capability, whatever the stored role is;
//! - a user without a membership holds nothing.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    SettingsView,
    SettingsManage,
    TransactionsView,
    TransactionsManage,
    /// Edit a fiscal year, or the records it covers, while it is `closed`.
    FiscalYearsEditClosed,
    ExpensesSubmit,
    ExpensesApprove,
    EventsManage,
    EmailTemplatesManage,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SettingsView => "settings.view",
            Self::SettingsManage => "settings.manage",
            Self::TransactionsView => "transactions.view",
            Self::TransactionsManage => "transactions.manage",
            Self::FiscalYearsEditClosed => "fiscal_years.edit_closed",
            Self::ExpensesSubmit => "expenses.submit",
            Self::ExpensesApprove => "expenses.approve",
            Self::EventsManage => "events.manage",
            Self::EmailTemplatesManage => "email_templates.manage",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Treasurer,
    Board,
    Member,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Treasurer => "treasurer",
            Self::Board => "board",
            Self::Member => "member",
        }
    }

    /// Position in the club hierarchy. Higher ranks hold a superset of the
    /// capabilities of lower ones.
    pub fn rank(self) -> u8 {
        match self {
            Self::Admin => 3,
            Self::Treasurer => 2,
            Self::Board => 1,
            Self::Member => 0,
        }
    }

    /// Table lookup, without the owner override.
    pub fn grants(self, capability: Capability) -> bool {
        ROLE_MATRIX
            .iter()
            .find(|(cap, _)| *cap == capability)
            .is_some_and(|(_, roles)| roles.contains(&self))
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "treasurer" => Ok(Self::Treasurer),
            "board" => Ok(Self::Board),
            "member" => Ok(Self::Member),
            other => Err(EngineError::Validation(format!(
                "invalid membership role: {other}"
            ))),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

use Role::{Admin, Board, Member, Treasurer};

/// Which roles hold each capability.
pub const ROLE_MATRIX: &[(Capability, &[Role])] = &[
    (Capability::SettingsView, &[Admin, Treasurer, Board]),
    (Capability::SettingsManage, &[Admin, Treasurer]),
    (Capability::TransactionsView, &[Admin, Treasurer, Board]),
    (Capability::TransactionsManage, &[Admin, Treasurer]),
    (Capability::FiscalYearsEditClosed, &[Admin]),
    (Capability::ExpensesSubmit, &[Admin, Treasurer, Board, Member]),
    (Capability::ExpensesApprove, &[Admin, Treasurer, Board]),
    (Capability::EventsManage, &[Admin, Board]),
    (Capability::EmailTemplatesManage, &[Admin]),
];

/// The caller of an engine operation, resolved against one club.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub club_id: String,
    pub user_id: String,
    pub role: Option<Role>,
    pub is_owner: bool,
}

impl Session {
    pub fn new(club_id: &str, user_id: &str, role: Option<Role>, is_owner: bool) -> Self {
        Self {
            club_id: club_id.to_string(),
            user_id: user_id.to_string(),
            role,
            is_owner,
        }
    }

    pub fn has_permission(&self, capability: Capability) -> bool {
        if self.is_owner {
            return true;
        }
        self.role.is_some_and(|role| role.grants(capability))
    }

    /// Fails with [`EngineError::Permission`] when `capability` is missing.
    pub fn require(&self, capability: Capability) -> ResultEngine<()> {
        if !self.has_permission(capability) {
            return Err(EngineError::Permission(format!(
                "{} requires {capability}",
                self.user_id
            )));
        }
        Ok(())
    }

    /// Checks that the caller may move a member from `current` to `target`
    /// (`None` is no membership).
    ///
    /// `settings.manage` covers roles strictly below the caller's own. Touching
    /// a role at or above it also needs `fiscal_years.edit_closed`.
    pub fn require_role_change(
        &self,
        current: Option<Role>,
        target: Option<Role>,
    ) -> ResultEngine<()> {
        self.require(Capability::SettingsManage)?;
        if self.has_permission(Capability::FiscalYearsEditClosed) {
            return Ok(());
        }
        let own_rank = self.role.map_or(0, Role::rank);
        if let Some(role) = [current, target]
            .into_iter()
            .flatten()
            .find(|role| role.rank() >= own_rank)
        {
            return Err(EngineError::Permission(format!(
                "{} requires {} to assign or change the {role} role",
                self.user_id,
                Capability::FiscalYearsEditClosed
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn treasurer_manages_settings_but_not_closed_years() {
        let session = Session::new("club", "tess", Some(Role::Treasurer), false);
        assert!(session.has_permission(Capability::SettingsManage));
        assert!(!session.has_permission(Capability::FiscalYearsEditClosed));
    }

    #[test]
    fn owner_override_grants_everything() {
        let session = Session::new("club", "olga", Some(Role::Member), true);
        assert!(session.has_permission(Capability::FiscalYearsEditClosed));
        assert!(session.has_permission(Capability::EmailTemplatesManage));
    }

    #[test]
    fn no_membership_grants_nothing() {
        let session = Session::new("club", "mallory", None, false);
        assert!(!session.has_permission(Capability::ExpensesSubmit));
        assert_eq!(
            session.require(Capability::SettingsView),
            Err(EngineError::Permission(
                "mallory requires settings.view".to_string()
            ))
        );
    }

    #[test]
    fn member_can_only_submit_expenses() {
        let session = Session::new("club", "max", Some(Role::Member), false);
        assert!(session.has_permission(Capability::ExpensesSubmit));
        assert!(!session.has_permission(Capability::TransactionsView));
        assert!(!session.has_permission(Capability::SettingsManage));
    }

    #[test]
    fn every_capability_is_in_the_matrix() {
        for cap in [
            Capability::SettingsView,
            Capability::SettingsManage,
            Capability::TransactionsView,
            Capability::TransactionsManage,
            Capability::FiscalYearsEditClosed,
            Capability::ExpensesSubmit,
            Capability::ExpensesApprove,
            Capability::EventsManage,
            Capability::EmailTemplatesManage,
        ] {
            assert!(Role::Admin.grants(cap), "admin misses {cap}");
        }
    }

    #[test]
    fn treasurer_only_manages_lower_roles() {
        let tess = Session::new("club", "tess", Some(Role::Treasurer), false);
        assert_eq!(tess.require_role_change(None, Some(Role::Board)), Ok(()));
        assert_eq!(
            tess.require_role_change(Some(Role::Member), Some(Role::Board)),
            Ok(())
        );
        assert_eq!(tess.require_role_change(Some(Role::Board), None), Ok(()));
        assert!(matches!(
            tess.require_role_change(Some(Role::Treasurer), Some(Role::Admin)),
            Err(EngineError::Permission(_))
        ));
        assert!(matches!(
            tess.require_role_change(None, Some(Role::Treasurer)),
            Err(EngineError::Permission(_))
        ));
        assert!(matches!(
            tess.require_role_change(Some(Role::Admin), Some(Role::Member)),
            Err(EngineError::Permission(_))
        ));
    }

    #[test]
    fn admins_and_owner_manage_any_role() {
        let ada = Session::new("club", "ada", Some(Role::Admin), false);
        assert_eq!(
            ada.require_role_change(Some(Role::Admin), Some(Role::Member)),
            Ok(())
        );
        let olga = Session::new("club", "olga", None, true);
        assert_eq!(olga.require_role_change(None, Some(Role::Admin)), Ok(()));

        let bob = Session::new("club", "bob", Some(Role::Board), false);
        assert!(matches!(
            bob.require_role_change(None, Some(Role::Member)),
            Err(EngineError::Permission(_))
        ));
    }

    #[test]
    fn role_parsing() {
        assert_eq!(Role::try_from(" Board "), Ok(Role::Board));
        assert!(Role::try_from("owner").is_err());
    }
}
