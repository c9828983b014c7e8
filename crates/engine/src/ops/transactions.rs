use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Capability, EngineError, NewTransaction, ResultEngine, Session, TransactionRecord,
    transactions,
};

use super::{Engine, with_tx};

impl Engine {
    /// Store a bank transaction (`transactions.manage`).
    ///
    /// `created_at` is the moment the record enters the ledger.
    pub async fn add_transaction(
        &self,
        club_id: &str,
        new: NewTransaction,
        user_id: &str,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Uuid> {
        let record = TransactionRecord::new(club_id, new, created_at)?;
        with_tx!(self, |db_tx| {
            let session = self
                .require_capability(&db_tx, club_id, user_id, Capability::TransactionsManage)
                .await?;
            self.require_period_writable(&db_tx, &session, record.occurred_on)
                .await?;
            transactions::ActiveModel::from(&record)
                .insert(&db_tx)
                .await?;
            Ok(record.id)
        })
    }

    /// Every record of the club, oldest first (`transactions.view`).
    pub async fn list_transactions(
        &self,
        club_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<TransactionRecord>> {
        self.require_capability(
            &self.database,
            club_id,
            user_id,
            Capability::TransactionsView,
        )
        .await?;
        self.load_transactions(&self.database, club_id).await
    }

    pub(super) async fn load_transactions<C: ConnectionTrait>(
        &self,
        db: &C,
        club_id: &str,
    ) -> ResultEngine<Vec<TransactionRecord>> {
        transactions::Entity::find()
            .filter(transactions::Column::ClubId.eq(club_id.to_string()))
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(TransactionRecord::try_from)
            .collect()
    }

    async fn require_transaction<C: ConnectionTrait>(
        &self,
        db: &C,
        club_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<TransactionRecord> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::ClubId.eq(club_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?
            .try_into()
    }

    /// Mark a record as matched (or unmatched) to an accounting entry.
    pub async fn set_reconciled(
        &self,
        club_id: &str,
        transaction_id: Uuid,
        reconciled: bool,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let session = self
                .require_capability(&db_tx, club_id, user_id, Capability::TransactionsManage)
                .await?;
            let record = self
                .require_transaction(&db_tx, club_id, transaction_id)
                .await?;
            self.require_period_writable(&db_tx, &session, record.occurred_on)
                .await?;
            let model = transactions::ActiveModel {
                id: ActiveValue::Set(record.id.to_string()),
                reconciled: ActiveValue::Set(reconciled),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Delete one record (`transactions.manage`).
    pub async fn delete_transaction(
        &self,
        club_id: &str,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let session = self
                .require_capability(&db_tx, club_id, user_id, Capability::TransactionsManage)
                .await?;
            self.delete_with_session(&db_tx, &session, transaction_id)
                .await
        })
    }

    /// Delete a record after the period lock check, for an already resolved
    /// session.
    pub(super) async fn delete_with_session<C: ConnectionTrait>(
        &self,
        db: &C,
        session: &Session,
        transaction_id: Uuid,
    ) -> ResultEngine<()> {
        let record = self
            .require_transaction(db, &session.club_id, transaction_id)
            .await?;
        self.require_period_writable(db, session, record.occurred_on)
            .await?;
        let res = transactions::Entity::delete_by_id(record.id.to_string())
            .exec(db)
            .await?;
        if res.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(
                "transaction not exists".to_string(),
            ));
        }
        Ok(())
    }
}
