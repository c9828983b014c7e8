//! Duplicate bank transactions.
//!
//! Re-importing a bank statement creates records that share a
//! `sequence_number`. [`find_duplicate_groups`] groups them and picks the one
//! record to keep per group. [`plan_cleanup`] summarises the deletions for a
//! confirmation prompt. Both functions are pure: the deletions themselves are
//! run by `Engine::clean_up_duplicates`.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
};

use serde::Serialize;
use uuid::Uuid;

use crate::TransactionRecord;

/// Records sharing one sequence number, sorted by retention priority.
///
/// Always holds at least two members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub sequence_number: String,
    members: Vec<TransactionRecord>,
}

impl DuplicateGroup {
    /// All members, the record to keep first.
    pub fn members(&self) -> &[TransactionRecord] {
        &self.members
    }

    pub fn to_keep(&self) -> &TransactionRecord {
        &self.members[0]
    }

    /// Members to delete, in retention order.
    pub fn to_delete(&self) -> &[TransactionRecord] {
        &self.members[1..]
    }
}

/// Retention order: reconciled first, then most recently created.
///
/// Records equal on both keys fall back to `id` so the choice does not depend
/// on the order the store returned them in.
fn retention_order(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    b.reconciled
        .cmp(&a.reconciled)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Groups `records` by sequence number and returns one group per number seen
/// at least twice, in first-seen order.
pub fn find_duplicate_groups(records: &[TransactionRecord]) -> Vec<DuplicateGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<(&str, Vec<&TransactionRecord>)> = Vec::new();

    for record in records {
        let key = record.sequence_number.as_str();
        match index.get(key) {
            Some(&pos) => buckets[pos].1.push(record),
            None => {
                index.insert(key, buckets.len());
                buckets.push((key, vec![record]));
            }
        }
    }

    buckets
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(key, members)| {
            let mut members: Vec<TransactionRecord> = members.into_iter().cloned().collect();
            members.sort_by(retention_order);
            DuplicateGroup {
                sequence_number: key.to_string(),
                members,
            }
        })
        .collect()
}

/// Summary shown before any deletion runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleanupPlan {
    pub to_delete_ids: BTreeSet<Uuid>,
    pub total_groups: usize,
    pub total_to_delete: usize,
    /// Deleting an already reconciled record loses a human match.
    pub reconciled_to_delete: usize,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.to_delete_ids.is_empty()
    }
}

pub fn plan_cleanup(groups: &[DuplicateGroup]) -> CleanupPlan {
    let mut plan = CleanupPlan {
        total_groups: groups.len(),
        ..CleanupPlan::default()
    };
    for record in groups.iter().flat_map(DuplicateGroup::to_delete) {
        plan.to_delete_ids.insert(record.id);
        plan.total_to_delete += 1;
        if record.reconciled {
            plan.reconciled_to_delete += 1;
        }
    }
    plan
}

/// One deletion that did not go through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub id: Uuid,
    pub reason: String,
}

/// Tally of a cleanup run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl core::fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} of {} deleted", self.succeeded, self.attempted)?;
        if !self.failures.is_empty() {
            write!(f, " ({} failed)", self.failures.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::Account;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    fn record(seq: &str, reconciled: bool, created_at: DateTime<Utc>) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            club_id: "club".to_string(),
            sequence_number: seq.to_string(),
            reconciled,
            created_at,
            occurred_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            amount_minor: -4_599,
            account: Account::Current,
            counterparty: Some("Sports Hall".to_string()),
            description: None,
        }
    }

    #[test]
    fn singletons_produce_no_group() {
        let records = vec![
            record("A1", false, at(2024, 1, 1)),
            record("A2", false, at(2024, 1, 1)),
        ];
        assert!(find_duplicate_groups(&records).is_empty());
        assert!(find_duplicate_groups(&[]).is_empty());
    }

    #[test]
    fn reconciled_wins_over_newer() {
        let kept = record("A1", true, at(2024, 1, 1));
        let newer = record("A1", false, at(2024, 3, 1));
        let groups = find_duplicate_groups(&[newer.clone(), kept.clone()]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].to_keep().id, kept.id);
        assert_eq!(groups[0].to_delete(), &[newer]);
    }

    #[test]
    fn newest_wins_among_unreconciled() {
        let old = record("A1", false, at(2024, 1, 1));
        let new = record("A1", false, at(2024, 6, 1));
        let groups = find_duplicate_groups(&[old.clone(), new.clone()]);

        assert_eq!(groups[0].to_keep().id, new.id);
        assert_eq!(groups[0].to_delete()[0].id, old.id);
    }

    #[test]
    fn seq_42_scenario() {
        let jan1 = record("SEQ-42", false, at(2024, 1, 1));
        let jan2 = record("SEQ-42", true, at(2024, 1, 2));
        let jan3 = record("SEQ-42", false, at(2024, 1, 3));
        let groups = find_duplicate_groups(&[jan1.clone(), jan2.clone(), jan3.clone()]);

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.sequence_number, "SEQ-42");
        assert_eq!(group.to_keep().id, jan2.id);
        let deleted: Vec<Uuid> = group.to_delete().iter().map(|r| r.id).collect();
        assert_eq!(deleted, vec![jan3.id, jan1.id]);
    }

    #[test]
    fn keep_and_delete_partition_members() {
        let records: Vec<TransactionRecord> = (0..5)
            .map(|i| record(if i % 2 == 0 { "X" } else { "Y" }, i == 3, at(2024, 1, i + 1)))
            .collect();
        let groups = find_duplicate_groups(&records);
        assert_eq!(groups.len(), 2);

        for group in &groups {
            assert!(group.members().len() >= 2);
            let mut ids: Vec<Uuid> = group.to_delete().iter().map(|r| r.id).collect();
            assert!(!ids.contains(&group.to_keep().id));
            ids.push(group.to_keep().id);
            ids.sort();
            let mut expected: Vec<Uuid> = records
                .iter()
                .filter(|r| r.sequence_number == group.sequence_number)
                .map(|r| r.id)
                .collect();
            expected.sort();
            assert_eq!(ids, expected);
        }
    }

    #[test]
    fn groups_follow_first_seen_order() {
        let records = vec![
            record("B", false, at(2024, 1, 1)),
            record("A", false, at(2024, 1, 1)),
            record("A", false, at(2024, 1, 2)),
            record("B", false, at(2024, 1, 2)),
        ];
        let keys: Vec<String> = find_duplicate_groups(&records)
            .into_iter()
            .map(|g| g.sequence_number)
            .collect();
        assert_eq!(keys, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn full_ties_do_not_depend_on_input_order() {
        let a = record("T", false, at(2024, 1, 1));
        let b = record("T", false, at(2024, 1, 1));
        let forward = find_duplicate_groups(&[a.clone(), b.clone()]);
        let backward = find_duplicate_groups(&[b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward, find_duplicate_groups(forward[0].members()));
    }

    #[test]
    fn plan_counts_reconciled_deletions() {
        let records = vec![
            record("A", true, at(2024, 1, 1)),
            record("A", true, at(2024, 1, 2)),
            record("A", false, at(2024, 1, 3)),
            record("B", false, at(2024, 1, 1)),
            record("B", false, at(2024, 1, 2)),
            record("C", false, at(2024, 1, 1)),
        ];
        let plan = plan_cleanup(&find_duplicate_groups(&records));

        assert_eq!(plan.total_groups, 2);
        assert_eq!(plan.total_to_delete, 3);
        assert_eq!(plan.reconciled_to_delete, 1);
        assert_eq!(plan.to_delete_ids.len(), 3);
        assert!(plan.to_delete_ids.contains(&records[0].id));
        assert!(!plan.to_delete_ids.contains(&records[1].id));
    }

    #[test]
    fn report_renders_tally() {
        let report = CleanupReport {
            attempted: 3,
            succeeded: 2,
            failures: vec![CleanupFailure {
                id: Uuid::nil(),
                reason: "gone".to_string(),
            }],
        };
        assert_eq!(report.to_string(), "2 of 3 deleted (1 failed)");
        assert!(!report.is_complete());
    }
}
