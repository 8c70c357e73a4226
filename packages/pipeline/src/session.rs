//! Run supersession.
//!
//! An [`AnalysisSession`] hands out [`RunTicket`]s with increasing
//! generation numbers. Only the newest ticket is current: a pipeline
//! holding an older one stops at its next checkpoint, and its result is
//! refused by [`AnalysisSession::commit`], so a slow run can never replace
//! the output of a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use crate::{AnalysisReport, PipelineError};

/// Identifies one analysis run within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTicket {
    /// Unique id, reported back to clients.
    pub run_id: Uuid,
    /// Generation at the time the run started.
    pub generation: u64,
}

#[derive(Default)]
struct SessionInner {
    generation: AtomicU64,
    latest: RwLock<Option<AnalysisReport>>,
}

/// Shared owner of the current run and its committed report.
///
/// Cloning is cheap and every clone refers to the same session.
#[derive(Clone, Default)]
pub struct AnalysisSession {
    inner: Arc<SessionInner>,
}

impl AnalysisSession {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run, superseding every earlier ticket.
    #[must_use]
    pub fn begin(&self) -> RunTicket {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let ticket = RunTicket {
            run_id: Uuid::new_v4(),
            generation,
        };
        log::debug!("Run {} started (generation {generation})", ticket.run_id);
        ticket
    }

    /// Whether `ticket` belongs to the newest run.
    #[must_use]
    pub fn is_current(&self, ticket: &RunTicket) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Checkpoint between stages.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Superseded`] if a newer run has started.
    pub fn ensure_current(&self, ticket: &RunTicket) -> Result<(), PipelineError> {
        if self.is_current(ticket) {
            Ok(())
        } else {
            log::info!(
                "Run {} superseded (generation {} < {})",
                ticket.run_id,
                ticket.generation,
                self.inner.generation.load(Ordering::SeqCst)
            );
            Err(PipelineError::Superseded)
        }
    }

    /// Stores `report` as the session's latest result.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Superseded`] if a newer run has started; the
    /// report is dropped.
    pub fn commit(&self, ticket: &RunTicket, report: AnalysisReport) -> Result<(), PipelineError> {
        let mut latest = self
            .inner
            .latest
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // Checked under the write lock so a concurrent begin+commit cannot
        // interleave between the check and the store.
        self.ensure_current(ticket)?;
        *latest = Some(report);
        Ok(())
    }

    /// The most recently committed report.
    #[must_use]
    pub fn latest(&self) -> Option<AnalysisReport> {
        self.inner
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::empty_report;

    #[test]
    fn newer_ticket_supersedes_older() {
        let session = AnalysisSession::new();
        let first = session.begin();
        assert!(session.is_current(&first));

        let second = session.begin();
        assert!(!session.is_current(&first));
        assert!(session.is_current(&second));
        assert_ne!(first.run_id, second.run_id);
        assert!(matches!(
            session.ensure_current(&first),
            Err(PipelineError::Superseded)
        ));
    }

    #[test]
    fn commit_refuses_superseded_results() {
        let session = AnalysisSession::new();
        let old = session.begin();
        let new = session.begin();

        session.commit(&new, empty_report("new")).unwrap();
        assert!(matches!(
            session.commit(&old, empty_report("old")),
            Err(PipelineError::Superseded)
        ));
        assert_eq!(session.latest().unwrap().label, "new");
    }

    #[test]
    fn clones_share_state() {
        let session = AnalysisSession::new();
        let ticket = session.begin();
        let clone = session.clone();
        let _ = clone.begin();
        assert!(!session.is_current(&ticket));
        assert!(session.latest().is_none());
    }
}
