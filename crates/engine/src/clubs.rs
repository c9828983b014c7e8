//! Clubs. Each club owns its members, bank transactions and fiscal years.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: String,
    pub name: String,
    /// Username of the founder. The owner holds every capability.
    pub owner: String,
}

impl Club {
    pub fn new(name: String, owner: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            owner: owner.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "clubs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub owner: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::club_memberships::Entity")]
    Memberships,
}

impl Related<super::club_memberships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Club {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            owner: model.owner,
        }
    }
}

impl From<&Club> for ActiveModel {
    fn from(club: &Club) -> Self {
        Self {
            id: ActiveValue::Set(club.id.clone()),
            name: ActiveValue::Set(club.name.clone()),
            owner: ActiveValue::Set(club.owner.clone()),
        }
    }
}
