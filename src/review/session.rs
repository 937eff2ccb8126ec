use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CommitReport, CommitRow, CommitSink, ReviewError};
use crate::models::{Deal, DealStatus, FieldName};
use crate::pipeline::builder::EditError;

/// Where a session stands as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Reviewing,
    /// Every deal up to the last has been decided on; the summary and the
    /// commit/discard/reprocess actions are offered.
    Complete,
    Committed,
    Discarded,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Committed | SessionPhase::Discarded)
    }
}

/// A field edit waiting for the user's next free-form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEdit {
    pub index: usize,
    pub field: FieldName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
}

/// One user's review of the deals extracted from a message.
///
/// `statuses` always has exactly one entry per deal and `current_index`
/// always points inside the deal list, so no transition can leave a status
/// referring to a deal that does not exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSession {
    user_id: String,
    deals: Vec<Deal>,
    current_index: usize,
    statuses: Vec<DealStatus>,
    editing: Option<PendingEdit>,
    phase: SessionPhase,
    last_activity: DateTime<Utc>,
}

impl ReviewSession {
    pub fn new(user_id: impl Into<String>, deals: Vec<Deal>) -> Self {
        let statuses = vec![DealStatus::Pending; deals.len()];
        Self {
            user_id: user_id.into(),
            deals,
            current_index: 0,
            statuses,
            editing: None,
            phase: SessionPhase::Reviewing,
            last_activity: Utc::now(),
        }
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_deal(&self) -> Option<&Deal> {
        self.deals.get(self.current_index)
    }

    pub fn statuses(&self) -> &[DealStatus] {
        &self.statuses
    }

    pub fn status(&self, index: usize) -> Option<DealStatus> {
        self.statuses.get(index).copied()
    }

    pub fn editing(&self) -> Option<PendingEdit> {
        self.editing
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// True when nothing happened for longer than `timeout` before `now`.
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        let idle = now.signed_duration_since(self.last_activity);
        idle.to_std().map(|d| d > timeout).unwrap_or(false)
    }

    fn ensure_open(&self) -> Result<(), ReviewError> {
        if self.phase.is_terminal() {
            return Err(ReviewError::SessionClosed);
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), ReviewError> {
        if index >= self.deals.len() {
            return Err(ReviewError::IndexOutOfRange {
                index,
                len: self.deals.len(),
            });
        }
        Ok(())
    }

    // ── Navigation ──────────────────────────────────────────

    /// Move by `delta`. Returns false, changing nothing, when the target
    /// falls outside the deal list.
    pub fn navigate(&mut self, delta: isize) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        let target = self.current_index as isize + delta;
        if target < 0 || target as usize >= self.deals.len() {
            return false;
        }
        self.current_index = target as usize;
        self.touch();
        true
    }

    pub fn next(&mut self) -> bool {
        self.navigate(1)
    }

    pub fn prev(&mut self) -> bool {
        self.navigate(-1)
    }

    // ── Decisions ───────────────────────────────────────────

    /// Record a decision for `index`. Deciding the last deal completes the
    /// review; any other index advances to the following deal. Deciding
    /// again overwrites the previous status.
    pub fn set_status(&mut self, index: usize, status: DealStatus) -> Result<SessionPhase, ReviewError> {
        self.ensure_open()?;
        self.check_index(index)?;

        self.statuses[index] = status;
        if index + 1 == self.deals.len() {
            self.current_index = index;
            self.phase = SessionPhase::Complete;
        } else {
            self.current_index = index + 1;
            self.phase = SessionPhase::Reviewing;
        }
        self.touch();
        tracing::debug!(user_id = %self.user_id, index, status = %status, "Deal status set");
        Ok(self.phase)
    }

    pub fn approve(&mut self, index: usize) -> Result<SessionPhase, ReviewError> {
        self.set_status(index, DealStatus::Approved)
    }

    pub fn reject(&mut self, index: usize) -> Result<SessionPhase, ReviewError> {
        self.set_status(index, DealStatus::Rejected)
    }

    // ── Field edits ─────────────────────────────────────────

    pub fn begin_edit(&mut self, index: usize, field: FieldName) -> Result<(), ReviewError> {
        self.ensure_open()?;
        self.check_index(index)?;
        self.current_index = index;
        self.editing = Some(PendingEdit { index, field });
        self.touch();
        Ok(())
    }

    /// Consume free-form input as the new value of the pending field.
    ///
    /// On an invalid value the deal is unchanged and the edit stays pending
    /// so the user can try again.
    pub fn submit_edit(&mut self, input: &str) -> Result<PendingEdit, ReviewError> {
        self.ensure_open()?;
        let pending = self.editing.ok_or(ReviewError::NoPendingEdit)?;
        self.touch();

        let deal = self
            .deals
            .get_mut(pending.index)
            .ok_or(ReviewError::IndexOutOfRange {
                index: pending.index,
                len: self.statuses.len(),
            })?;

        deal.apply_edit(pending.field, input).map_err(|e| {
            let reason = match &e {
                EditError::InvalidInput { input, .. } => format!("cannot use {input:?}"),
                EditError::Validation(v) => v.reason.clone(),
            };
            ReviewError::InvalidEditInput {
                field: pending.field,
                reason,
                expected: pending.field.expected_format(),
            }
        })?;

        self.editing = None;
        tracing::info!(user_id = %self.user_id, index = pending.index, field = %pending.field, "Deal field edited");
        Ok(pending)
    }

    /// Drop the pending edit. Returns false when there was none.
    pub fn cancel_edit(&mut self) -> bool {
        self.touch();
        self.editing.take().is_some()
    }

    // ── Session-level transitions ───────────────────────────

    /// Start the review over with the same deals.
    pub fn reprocess(&mut self) -> Result<(), ReviewError> {
        self.ensure_open()?;
        self.statuses.iter_mut().for_each(|s| *s = DealStatus::Pending);
        self.current_index = 0;
        self.editing = None;
        self.phase = SessionPhase::Reviewing;
        self.touch();
        Ok(())
    }

    /// Close the session and drop every deal and status with it.
    pub fn discard(&mut self) {
        self.deals.clear();
        self.statuses.clear();
        self.current_index = 0;
        self.editing = None;
        self.phase = SessionPhase::Discarded;
        tracing::info!(user_id = %self.user_id, "Review session discarded");
    }

    pub fn summary(&self) -> ReviewSummary {
        let count = |wanted: DealStatus| self.statuses.iter().filter(|s| **s == wanted).count();
        ReviewSummary {
            total: self.deals.len(),
            approved: count(DealStatus::Approved),
            rejected: count(DealStatus::Rejected),
            pending: count(DealStatus::Pending),
        }
    }

    pub fn approved_deals(&self) -> Vec<&Deal> {
        self.deals
            .iter()
            .zip(&self.statuses)
            .filter(|(_, status)| **status == DealStatus::Approved)
            .map(|(deal, _)| deal)
            .collect()
    }

    /// Send the approved deals to `sink`.
    ///
    /// Succeeds only when every row is accepted; the session is then closed.
    /// On any failure the session is left as it was so the commit can be
    /// retried.
    pub async fn commit(&mut self, sink: &dyn CommitSink) -> Result<CommitReport, ReviewError> {
        self.ensure_open()?;
        let rows: Vec<CommitRow> = self.approved_deals().into_iter().map(CommitRow::from).collect();
        if rows.is_empty() {
            return Err(ReviewError::NothingApproved);
        }
        self.touch();

        let outcomes = sink.submit(&rows).await?;
        // A row counts once however many outcomes the sink reports for it,
        // and any reported failure outweighs an acknowledgement.
        let accepted: HashSet<Uuid> = outcomes.iter().filter(|o| o.success).map(|o| o.deal_id).collect();
        let rejected: HashSet<Uuid> = outcomes.iter().filter(|o| !o.success).map(|o| o.deal_id).collect();
        let failed = rows
            .iter()
            .filter(|r| !accepted.contains(&r.deal_id) || rejected.contains(&r.deal_id))
            .count();
        if failed > 0 {
            tracing::warn!(user_id = %self.user_id, failed, total = rows.len(), sink = sink.name(), "Commit incomplete");
            return Err(ReviewError::CommitFailed {
                failed,
                total: rows.len(),
            });
        }

        self.phase = SessionPhase::Committed;
        self.editing = None;
        tracing::info!(user_id = %self.user_id, deals = rows.len(), sink = sink.name(), "Review session committed");
        Ok(CommitReport {
            submitted: rows.len(),
            outcomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provenance;
    use crate::pipeline::extraction::PatternStrategy;
    use crate::pipeline::processor::DealPipeline;
    use crate::review::MemorySink;
    use std::sync::Arc;

    const THREE: &str = "Partner: Sutra\nAU - 1300+13% - Beatskai iq (fb)\nUK - 1350+10% - Immediate core (native/fb)\nDE - 1000+10%";

    async fn session() -> ReviewSession {
        let report = DealPipeline::new(Arc::new(PatternStrategy::new())).process(THREE).await;
        assert_eq!(report.deals.len(), 3);
        ReviewSession::new("u1", report.deals)
    }

    #[tokio::test]
    async fn navigation_stays_in_bounds() {
        let mut s = session().await;
        assert!(!s.prev());
        assert_eq!(s.current_index(), 0);
        assert!(s.next());
        assert!(s.next());
        assert!(!s.next());
        assert_eq!(s.current_index(), 2);
        assert!(!s.navigate(-5));
        assert_eq!(s.current_index(), 2);
    }

    #[tokio::test]
    async fn status_advances_until_last() {
        let mut s = session().await;
        assert_eq!(s.approve(0).unwrap(), SessionPhase::Reviewing);
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.reject(1).unwrap(), SessionPhase::Reviewing);
        assert_eq!(s.current_index(), 2);
        assert_eq!(s.approve(2).unwrap(), SessionPhase::Complete);
        assert_eq!(s.current_index(), 2);
        assert_eq!(
            s.summary(),
            ReviewSummary { total: 3, approved: 2, rejected: 1, pending: 0 }
        );
    }

    #[tokio::test]
    async fn re_deciding_overwrites() {
        let mut s = session().await;
        s.approve(0).unwrap();
        s.reject(0).unwrap();
        assert_eq!(s.status(0), Some(DealStatus::Rejected));
    }

    #[tokio::test]
    async fn out_of_range_status_rejected() {
        let mut s = session().await;
        let err = s.approve(3).unwrap_err();
        assert!(matches!(err, ReviewError::IndexOutOfRange { index: 3, len: 3 }));
        assert!(s.statuses().iter().all(|st| *st == DealStatus::Pending));
    }

    #[tokio::test]
    async fn edit_percentage_flips_flag() {
        let mut s = session().await;
        s.begin_edit(0, FieldName::Crg).unwrap();
        s.submit_edit("15%").unwrap();
        let deal = &s.deals()[0];
        assert_eq!(deal.parsed_data.crg, Some(0.15));
        assert_eq!(deal.flag(FieldName::Crg), Provenance::Explicit);
        assert!(s.editing().is_none());
    }

    #[tokio::test]
    async fn invalid_edit_keeps_editing() {
        let mut s = session().await;
        let before = s.deals()[0].clone();
        s.begin_edit(0, FieldName::Crg).unwrap();
        let err = s.submit_edit("abc").unwrap_err();
        assert!(matches!(err, ReviewError::InvalidEditInput { field: FieldName::Crg, .. }));
        assert_eq!(s.deals()[0], before);
        assert_eq!(s.editing(), Some(PendingEdit { index: 0, field: FieldName::Crg }));

        // Retry without losing position
        s.submit_edit("12").unwrap();
        assert_eq!(s.deals()[0].parsed_data.crg, Some(0.12));
    }

    #[tokio::test]
    async fn pricing_model_edit_checked_against_enumeration() {
        let mut s = session().await;
        s.begin_edit(1, FieldName::PricingModel).unwrap();
        assert!(s.submit_edit("CPM").is_err());
        // CPL without a cpl value breaks the record invariant
        assert!(s.submit_edit("CPL").is_err());
        s.submit_edit("cpa").unwrap();
        assert_eq!(s.deals()[1].parsed_data.pricing_model.as_str(), "CPA");
    }

    #[tokio::test]
    async fn submit_without_pending_edit() {
        let mut s = session().await;
        assert!(matches!(s.submit_edit("x"), Err(ReviewError::NoPendingEdit)));
    }

    #[tokio::test]
    async fn cancel_edit_clears_pending() {
        let mut s = session().await;
        s.begin_edit(2, FieldName::Partner).unwrap();
        assert_eq!(s.current_index(), 2);
        assert!(s.cancel_edit());
        assert!(!s.cancel_edit());
    }

    #[tokio::test]
    async fn reprocess_resets_statuses_and_position() {
        let mut s = session().await;
        s.approve(0).unwrap();
        s.approve(1).unwrap();
        s.approve(2).unwrap();
        s.reprocess().unwrap();
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.phase(), SessionPhase::Reviewing);
        assert_eq!(s.summary().pending, 3);
        assert_eq!(s.len(), 3);
    }

    #[tokio::test]
    async fn commit_submits_exactly_the_approved_subset() {
        let mut s = session().await;
        s.approve(0).unwrap();
        s.reject(1).unwrap();
        assert_eq!(s.approve(2).unwrap(), SessionPhase::Complete);

        let sink = MemorySink::new();
        let report = s.commit(&sink).await.unwrap();
        assert_eq!(report.submitted, 2);
        let committed: Vec<_> = sink.rows().iter().map(|r| r.deal_id).collect();
        assert_eq!(committed, vec![s.deals()[0].id, s.deals()[2].id]);
        assert_eq!(s.phase(), SessionPhase::Committed);
        assert!(matches!(s.approve(0), Err(ReviewError::SessionClosed)));
    }

    #[tokio::test]
    async fn failed_commit_keeps_session() {
        let mut s = session().await;
        s.approve(0).unwrap();
        s.approve(1).unwrap();
        let sink = MemorySink::new();
        sink.fail_deal(s.deals()[1].id);

        let err = s.commit(&sink).await.unwrap_err();
        assert!(matches!(err, ReviewError::CommitFailed { failed: 1, total: 2 }));
        assert_eq!(s.phase(), SessionPhase::Reviewing);
        assert_eq!(s.summary().approved, 2);

        sink.clear_failures();
        assert!(s.commit(&sink).await.is_ok());
    }

    #[tokio::test]
    async fn unavailable_sink_keeps_session() {
        let mut s = session().await;
        s.approve(0).unwrap();
        let err = s.commit(&MemorySink::unavailable()).await.unwrap_err();
        assert!(matches!(err, ReviewError::Sink(_)));
        assert!(!s.phase().is_terminal());
    }

    /// Reports every row twice, optionally with a failure for the second copy.
    struct RepeatingSink {
        second_fails: bool,
    }

    #[async_trait::async_trait]
    impl CommitSink for RepeatingSink {
        fn name(&self) -> &str {
            "repeating"
        }

        async fn submit(&self, rows: &[CommitRow]) -> Result<Vec<crate::review::RowOutcome>, crate::review::SinkError> {
            use crate::review::RowOutcome;
            Ok(rows
                .iter()
                .flat_map(|r| {
                    let second = if self.second_fails {
                        RowOutcome::failed(r.deal_id, "rejected")
                    } else {
                        RowOutcome::ok(r.deal_id)
                    };
                    [RowOutcome::ok(r.deal_id), second]
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn repeated_acknowledgements_count_once() {
        let mut s = session().await;
        s.approve(0).unwrap();
        let report = s.commit(&RepeatingSink { second_fails: false }).await.unwrap();
        assert_eq!(report.submitted, 1);
        assert_eq!(s.phase(), SessionPhase::Committed);
    }

    #[tokio::test]
    async fn reported_failure_outweighs_acknowledgement() {
        let mut s = session().await;
        s.approve(0).unwrap();
        s.approve(1).unwrap();
        let err = s.commit(&RepeatingSink { second_fails: true }).await.unwrap_err();
        assert!(matches!(err, ReviewError::CommitFailed { failed: 2, total: 2 }));
        assert_eq!(s.phase(), SessionPhase::Reviewing);
    }

    #[tokio::test]
    async fn commit_requires_an_approval() {
        let mut s = session().await;
        s.reject(0).unwrap();
        assert!(matches!(s.commit(&MemorySink::new()).await, Err(ReviewError::NothingApproved)));
    }

    #[tokio::test]
    async fn discard_clears_everything() {
        let mut s = session().await;
        s.approve(0).unwrap();
        s.begin_edit(1, FieldName::Geo).unwrap();
        s.discard();
        assert!(s.is_empty());
        assert!(s.statuses().is_empty());
        assert!(s.editing().is_none());
        assert_eq!(s.phase(), SessionPhase::Discarded);
    }

    #[tokio::test]
    async fn idle_detection() {
        let s = session().await;
        let later = s.last_activity() + chrono::Duration::minutes(61);
        assert!(s.is_idle(later, Duration::from_secs(3600)));
        assert!(!s.is_idle(s.last_activity(), Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let mut s = session().await;
        s.approve(0).unwrap();
        s.begin_edit(1, FieldName::Cpa).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        let back: ReviewSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.statuses(), s.statuses());
        assert_eq!(back.editing(), s.editing());
        assert_eq!(back.current_index(), 1);
    }
}
