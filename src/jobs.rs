//! Job records and the in-memory job store.
//!
//! A job moves Queued -> Processing -> Completed | Failed and never leaves a
//! terminal state. The store owns the records; callers get snapshot clones
//! and mutate through targeted transition methods, so readers polling
//! progress can never observe a half-written update.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AnalysisResult, DashboardSummary};

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One analysis job. `results` and `summary` are only populated once the job
/// completes; a failed job keeps whatever progress it had reached.
#[derive(Debug, Clone)]
pub struct Job {
    // ---
    pub id: Uuid,
    pub status: JobStatus,
    pub total_samples: usize,
    pub processed_samples: usize,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub results: Vec<AnalysisResult>,
    pub summary: Option<DashboardSummary>,
}

impl Job {
    // ---
    fn new(total_samples: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            total_samples,
            processed_samples: 0,
            created_at: Utc::now(),
            completed_at: None,
            error_message: None,
            results: Vec::new(),
            summary: None,
        }
    }

    /// Percentage of the batch processed, rounded to two decimals.
    /// Zero-sample jobs report zero rather than dividing by zero.
    pub fn progress_percent(&self) -> f64 {
        // ---
        if self.total_samples == 0 {
            return 0.0;
        }
        let percent = self.processed_samples as f64 / self.total_samples as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    }
}

/// Thread-safe in-memory job store. Cloning clones the handle, not the jobs.
#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobStore {
    // ---

    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in `Queued`; returns a snapshot of it.
    pub fn create(&self, total_samples: usize) -> Job {
        // ---
        let job = Job::new(total_samples);
        self.inner.write().unwrap().insert(job.id, job.clone());
        job
    }

    /// Snapshot of a job, if it exists.
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.inner.read().unwrap().get(&id).cloned()
    }

    /// Queued -> Processing. Returns false if the job is missing or has
    /// already left Queued.
    pub fn mark_processing(&self, id: Uuid) -> bool {
        // ---
        let mut jobs = self.inner.write().unwrap();
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Queued => {
                job.status = JobStatus::Processing;
                true
            }
            _ => false,
        }
    }

    /// Record progress on a running job. Monotonic: the count never goes
    /// backwards, never exceeds the total, and is ignored once terminal.
    pub fn set_progress(&self, id: Uuid, processed: usize) {
        // ---
        let mut jobs = self.inner.write().unwrap();
        if let Some(job) = jobs.get_mut(&id) {
            if job.status == JobStatus::Processing {
                job.processed_samples =
                    job.processed_samples.max(processed.min(job.total_samples));
            }
        }
    }

    /// Publish results and summary and move to `Completed` in one step, so a
    /// completed job is always fully populated. The first terminal
    /// transition wins; returns false if the job was missing or terminal.
    pub fn complete(
        &self,
        id: Uuid,
        results: Vec<AnalysisResult>,
        summary: DashboardSummary,
    ) -> bool {
        // ---
        let mut jobs = self.inner.write().unwrap();
        match jobs.get_mut(&id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = JobStatus::Completed;
                job.processed_samples = job.total_samples;
                job.completed_at = Some(Utc::now());
                job.results = results;
                job.summary = Some(summary);
                true
            }
            _ => false,
        }
    }

    /// Move to `Failed` with a cause. Progress already made is kept; results
    /// and summary stay unset. Returns false if missing or already terminal.
    pub fn fail(&self, id: Uuid, message: impl Into<String>) -> bool {
        // ---
        let mut jobs = self.inner.write().unwrap();
        match jobs.get_mut(&id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = JobStatus::Failed;
                job.error_message = Some(message.into());
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::DashboardSummary;

    #[test]
    fn test_new_job_starts_queued() {
        // ---
        let store = JobStore::new();
        let job = store.create(100);

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.total_samples, 100);
        assert_eq!(job.processed_samples, 0);
        assert!(job.completed_at.is_none());
        assert!(job.results.is_empty());
        assert!(job.summary.is_none());
    }

    #[test]
    fn test_full_lifecycle() {
        // ---
        let store = JobStore::new();
        let id = store.create(10).id;

        assert!(store.mark_processing(id));
        assert_eq!(store.get(id).unwrap().status, JobStatus::Processing);

        store.set_progress(id, 5);
        assert_eq!(store.get(id).unwrap().processed_samples, 5);

        assert!(store.complete(id, Vec::new(), DashboardSummary::default()));
        let done = store.get(id).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        // Completion forces the progress count to the total
        assert_eq!(done.processed_samples, 10);
        assert!(done.completed_at.is_some());
        assert!(done.summary.is_some());
    }

    #[test]
    fn test_terminal_states_absorb_later_transitions() {
        // ---
        let store = JobStore::new();
        let id = store.create(10).id;
        store.mark_processing(id);
        assert!(store.complete(id, Vec::new(), DashboardSummary::default()));

        // A late failure cannot overwrite the completed job
        assert!(!store.fail(id, "too late"));
        assert!(!store.complete(id, Vec::new(), DashboardSummary::default()));

        let job = store.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_failed_job_keeps_progress_and_no_results() {
        // ---
        let store = JobStore::new();
        let id = store.create(10).id;
        store.mark_processing(id);
        store.set_progress(id, 4);

        assert!(store.fail(id, "boom"));
        let job = store.get(id).unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
        assert_eq!(job.processed_samples, 4);
        assert!(job.completed_at.is_none());
        assert!(job.results.is_empty());
        assert!(job.summary.is_none());
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        // ---
        let store = JobStore::new();
        let id = store.create(10).id;

        // Ignored while still queued
        store.set_progress(id, 3);
        assert_eq!(store.get(id).unwrap().processed_samples, 0);

        store.mark_processing(id);
        store.set_progress(id, 7);
        // A stale lower update never rolls the count back
        store.set_progress(id, 3);
        assert_eq!(store.get(id).unwrap().processed_samples, 7);

        // Clamped at the total
        store.set_progress(id, 99);
        assert_eq!(store.get(id).unwrap().processed_samples, 10);

        store.fail(id, "boom");
        store.set_progress(id, 10);
        assert_eq!(store.get(id).unwrap().processed_samples, 10);
    }

    #[test]
    fn test_mark_processing_requires_queued() {
        // ---
        let store = JobStore::new();
        let id = store.create(10).id;

        assert!(store.mark_processing(id));
        // Second attempt is rejected
        assert!(!store.mark_processing(id));
        // Unknown jobs are rejected too
        assert!(!store.mark_processing(Uuid::new_v4()));
    }

    #[test]
    fn test_progress_percent_rounds_to_two_decimals() {
        // ---
        let mut job = Job::new(3);
        job.processed_samples = 1;
        assert_eq!(job.progress_percent(), 33.33);

        job.processed_samples = 3;
        assert_eq!(job.progress_percent(), 100.0);

        let empty = Job::new(0);
        assert_eq!(empty.progress_percent(), 0.0);
    }

    #[test]
    fn test_get_returns_a_snapshot() {
        // ---
        let store = JobStore::new();
        let id = store.create(10).id;

        let mut snapshot = store.get(id).unwrap();
        snapshot.status = JobStatus::Failed;

        // Mutating the snapshot does not touch the stored job
        assert_eq!(store.get(id).unwrap().status, JobStatus::Queued);
    }
}
