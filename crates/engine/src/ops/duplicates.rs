use crate::{
    Capability, CleanupFailure, CleanupPlan, CleanupReport, DuplicateGroup, ResultEngine,
    find_duplicate_groups,
};

use super::Engine;

impl Engine {
    /// Load every record of the club and group the duplicated ones
    /// (`transactions.view`).
    pub async fn scan_duplicates(
        &self,
        club_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<DuplicateGroup>> {
        self.require_capability(
            &self.database,
            club_id,
            user_id,
            Capability::TransactionsView,
        )
        .await?;
        let records = self.load_transactions(&self.database, club_id).await?;
        let groups = find_duplicate_groups(&records);
        tracing::debug!(
            "scanned {} transactions of club {club_id}: {} duplicate groups",
            records.len(),
            groups.len()
        );
        Ok(groups)
    }

    /// Delete the planned records one by one (`transactions.manage`).
    ///
    /// The run is not atomic: a failing deletion is recorded in the report and
    /// the loop moves on to the next record.
    pub async fn clean_up_duplicates(
        &self,
        club_id: &str,
        plan: &CleanupPlan,
        user_id: &str,
    ) -> ResultEngine<CleanupReport> {
        let session = self
            .require_capability(
                &self.database,
                club_id,
                user_id,
                Capability::TransactionsManage,
            )
            .await?;

        let mut report = CleanupReport::default();
        for id in &plan.to_delete_ids {
            report.attempted += 1;
            match self.delete_with_session(&self.database, &session, *id).await {
                Ok(()) => report.succeeded += 1,
                Err(err) => {
                    tracing::warn!("failed to delete duplicate transaction {id}: {err}");
                    report.failures.push(CleanupFailure {
                        id: *id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!("duplicate cleanup of club {club_id}: {report}");
        Ok(report)
    }
}
