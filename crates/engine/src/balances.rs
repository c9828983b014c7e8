//! Account balances of a club and the variance between two of them.
//!
//! Amounts are stored as integer cents (`i64`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, TransactionRecord};

/// The two bank accounts a club keeps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Account {
    #[default]
    Current,
    Savings,
}

impl Account {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Savings => "savings",
        }
    }
}

impl TryFrom<&str> for Account {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "savings" => Ok(Self::Savings),
            other => Err(EngineError::Validation(format!("invalid account: {other}"))),
        }
    }
}

impl core::fmt::Display for Account {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pair of named account balances, in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub current_minor: i64,
    pub savings_minor: i64,
}

impl Balances {
    pub const fn new(current_minor: i64, savings_minor: i64) -> Self {
        Self {
            current_minor,
            savings_minor,
        }
    }

    pub fn get(&self, account: Account) -> i64 {
        match account {
            Account::Current => self.current_minor,
            Account::Savings => self.savings_minor,
        }
    }

    fn add(&mut self, account: Account, amount_minor: i64) -> ResultEngine<()> {
        let balance = match account {
            Account::Current => &mut self.current_minor,
            Account::Savings => &mut self.savings_minor,
        };
        *balance = balance.checked_add(amount_minor).ok_or_else(|| {
            EngineError::Validation(format!("{account} balance out of range"))
        })?;
        Ok(())
    }
}

/// Difference between a closing and an opening balance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceVariance {
    /// Wider than a balance: the gap between two `i64` values can exceed it.
    pub diff_minor: i128,
    /// Relative change in percent. `0.0` when the opening balance is zero.
    pub percent: f64,
}

impl BalanceVariance {
    pub fn between(opening_minor: i64, closing_minor: i64) -> Self {
        let diff_minor = i128::from(closing_minor) - i128::from(opening_minor);
        let percent = if opening_minor == 0 {
            0.0
        } else {
            diff_minor as f64 / opening_minor.unsigned_abs() as f64 * 100.0
        };
        Self {
            diff_minor,
            percent,
        }
    }
}

/// Variance of both accounts of a fiscal year.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FiscalYearVariance {
    pub current: BalanceVariance,
    pub savings: BalanceVariance,
}

impl FiscalYearVariance {
    pub fn between(opening: &Balances, closing: &Balances) -> Self {
        Self {
            current: BalanceVariance::between(opening.current_minor, closing.current_minor),
            savings: BalanceVariance::between(opening.savings_minor, closing.savings_minor),
        }
    }
}

/// Default closing rule: opening balances plus every record booked between
/// `start` and `end` (both inclusive), per account.
///
/// Fails with [`EngineError::Validation`] when a balance leaves the `i64`
/// range.
pub fn compute_closing_balances(
    opening: &Balances,
    records: &[TransactionRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> ResultEngine<Balances> {
    let mut closing = *opening;
    for record in records
        .iter()
        .filter(|r| r.occurred_on >= start && r.occurred_on <= end)
    {
        closing.add(record.account, record.amount_minor)?;
    }
    Ok(closing)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn record(occurred_on: NaiveDate, account: Account, amount_minor: i64) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            club_id: "club".to_string(),
            sequence_number: Uuid::new_v4().to_string(),
            reconciled: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            occurred_on,
            amount_minor,
            account,
            counterparty: None,
            description: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn variance_of_growth() {
        let v = BalanceVariance::between(1000, 1200);
        assert_eq!(v.diff_minor, 200);
        assert_eq!(v.percent, 20.0);
    }

    #[test]
    fn variance_against_zero_opening_is_zero_percent() {
        let v = BalanceVariance::between(0, 50);
        assert_eq!(v.diff_minor, 50);
        assert_eq!(v.percent, 0.0);
        assert!(v.percent.is_finite());
    }

    #[test]
    fn variance_uses_absolute_opening() {
        let v = BalanceVariance::between(-1000, -500);
        assert_eq!(v.diff_minor, 500);
        assert_eq!(v.percent, 50.0);
    }

    #[test]
    fn closing_balances_only_count_records_in_range() {
        let opening = Balances::new(10_000, 50_000);
        let records = vec![
            record(date(2023, 12, 31), Account::Current, 999),
            record(date(2024, 1, 1), Account::Current, 2_500),
            record(date(2024, 6, 15), Account::Current, -1_000),
            record(date(2024, 12, 31), Account::Savings, 300),
            record(date(2025, 1, 1), Account::Savings, 777),
        ];

        let closing =
            compute_closing_balances(&opening, &records, date(2024, 1, 1), date(2024, 12, 31))
                .unwrap();

        assert_eq!(closing, Balances::new(11_500, 50_300));
    }

    #[test]
    fn variance_of_extreme_balances_does_not_overflow() {
        let v = BalanceVariance::between(i64::MIN, 0);
        assert_eq!(v.diff_minor, -i128::from(i64::MIN));
        assert_eq!(v.percent, 100.0);

        let v = BalanceVariance::between(-5, i64::MAX);
        assert_eq!(v.diff_minor, i128::from(i64::MAX) + 5);
        assert!(v.percent.is_finite() && v.percent > 0.0);

        let v = BalanceVariance::between(i64::MAX, i64::MIN);
        assert_eq!(v.diff_minor, i128::from(i64::MIN) - i128::from(i64::MAX));
    }

    #[test]
    fn closing_balance_overflow_is_a_validation_error() {
        let opening = Balances::new(i64::MAX - 10, 0);
        let records = vec![record(date(2024, 5, 1), Account::Current, 11)];
        assert!(matches!(
            compute_closing_balances(&opening, &records, date(2024, 1, 1), date(2024, 12, 31)),
            Err(EngineError::Validation(_))
        ));

        let opening = Balances::new(0, i64::MIN);
        let records = vec![record(date(2024, 5, 1), Account::Savings, -1)];
        assert!(matches!(
            compute_closing_balances(&opening, &records, date(2024, 1, 1), date(2024, 12, 31)),
            Err(EngineError::Validation(_))
        ));
    }
}
