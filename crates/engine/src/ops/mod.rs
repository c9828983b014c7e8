use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod access;
mod clubs;
mod duplicates;
mod fiscal_years;
mod transactions;

/// Run `$body` inside a database transaction. Commits on `Ok`; an `Err` or an
/// early `?` drops the transaction, which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Club ledger operations over one database connection.
///
/// Every public operation takes the acting `user_id` and resolves its
/// [`Session`](crate::Session) before touching data.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Database the engine reads and writes. It must already be migrated.
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
