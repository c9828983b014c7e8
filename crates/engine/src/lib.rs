//! Club ledger engine.
//!
//! Pure building blocks ([`find_duplicate_groups`], the [`FiscalYear`]
//! lifecycle, the permission matrix) plus an async [`Engine`] that applies
//! them to a sea-orm database.

pub use balances::{
    Account, BalanceVariance, Balances, FiscalYearVariance, compute_closing_balances,
};
pub use clubs::Club;
pub use duplicates::{
    CleanupFailure, CleanupPlan, CleanupReport, DuplicateGroup, find_duplicate_groups,
    plan_cleanup,
};
pub use error::EngineError;
pub use fiscal_years::{
    FiscalYear, FiscalYearPatch, FiscalYearStatus, NewFiscalYear, confirmation_phrase,
};
pub use ops::{Engine, EngineBuilder};
pub use permissions::{Capability, ROLE_MATRIX, Role, Session};
pub use transactions::{NewTransaction, TransactionRecord};

mod balances;
mod club_memberships;
mod clubs;
mod duplicates;
mod error;
mod fiscal_years;
mod ops;
mod permissions;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
