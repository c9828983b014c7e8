//! Bank transaction records.
//!
//! A `TransactionRecord` is one line of a bank statement as imported into the
//! club ledger. The bank `sequence_number` is meant to identify it, but
//! re-imports can produce several records with the same number.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Account, EngineError, ResultEngine,
    util::{normalize_optional_text, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub club_id: String,
    pub sequence_number: String,
    pub reconciled: bool,
    pub created_at: DateTime<Utc>,
    pub occurred_on: NaiveDate,
    /// Signed amount in cents.
    pub amount_minor: i64,
    pub account: Account,
    pub counterparty: Option<String>,
    pub description: Option<String>,
}

/// Input for a new record. The store assigns `id` and `created_at`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub sequence_number: String,
    pub occurred_on: NaiveDate,
    pub amount_minor: i64,
    pub account: Account,
    pub counterparty: Option<String>,
    pub description: Option<String>,
    pub reconciled: bool,
}

impl TransactionRecord {
    pub fn new(
        club_id: &str,
        new: NewTransaction,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let sequence_number = new.sequence_number.trim();
        if sequence_number.is_empty() {
            return Err(EngineError::Validation(
                "sequence number must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            club_id: club_id.to_string(),
            sequence_number: sequence_number.to_string(),
            reconciled: new.reconciled,
            created_at,
            occurred_on: new.occurred_on,
            amount_minor: new.amount_minor,
            account: new.account,
            counterparty: normalize_optional_text(new.counterparty.as_deref()),
            description: normalize_optional_text(new.description.as_deref()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bank_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub club_id: String,
    pub sequence_number: String,
    pub reconciled: bool,
    pub created_at: DateTimeUtc,
    pub occurred_on: Date,
    pub amount_minor: i64,
    pub account: String,
    pub counterparty: Option<String>,
    pub description: Option<String>,
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

impl TryFrom<Model> for TransactionRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            club_id: model.club_id,
            sequence_number: model.sequence_number,
            reconciled: model.reconciled,
            created_at: model.created_at,
            occurred_on: model.occurred_on,
            amount_minor: model.amount_minor,
            account: Account::try_from(model.account.as_str())?,
            counterparty: model.counterparty,
            description: model.description,
        })
    }
}

impl From<&TransactionRecord> for ActiveModel {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: ActiveValue::Set(record.id.to_string()),
            club_id: ActiveValue::Set(record.club_id.clone()),
            sequence_number: ActiveValue::Set(record.sequence_number.clone()),
            reconciled: ActiveValue::Set(record.reconciled),
            created_at: ActiveValue::Set(record.created_at),
            occurred_on: ActiveValue::Set(record.occurred_on),
            amount_minor: ActiveValue::Set(record.amount_minor),
            account: ActiveValue::Set(record.account.as_str().to_string()),
            counterparty: ActiveValue::Set(record.counterparty.clone()),
            description: ActiveValue::Set(record.description.clone()),
        }
    }
}
