//! Job Orchestrator: a single-flight register over an owned
//! `Mutex<HashMap<JobKind, JobStatus>>`, one instance per process, passed
//! explicitly to HTTP handlers rather than reached for as global state.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};

/// The kinds of background job the orchestrator single-flights. Conference
/// jobs are parameterized by id at call time (the scope is recorded on the
/// `JobStatus`, not encoded into the kind) so the register stays a small
/// fixed enum rather than growing one variant per conference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    FetchArxiv,
    GenCandidatePool,
    GenRecommendation,
    GenContent,
    ConferenceImport,
    ConferencePool,
    ConferenceContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Running,
    Success,
    Error,
}

/// One job kind's current state.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub status: Status,
    pub count: u64,
    pub last_ran_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// Conference id or other scope qualifier, set for the `Conference*` kinds.
    pub scope: Option<String>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self { status: Status::Idle, count: 0, last_ran_at: None, error_message: None, scope: None }
    }
}

/// Process-local, mutex-protected single-flight register. Horizontal
/// scaling of the orchestrator is out of scope; this register lives in
/// one process only.
pub struct Orchestrator {
    jobs: Mutex<HashMap<JobKind, JobStatus>>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self { jobs: Mutex::new(HashMap::new()) }
    }

    /// Snapshot every tracked job's status, for `GET /v1/factory/status`.
    pub fn snapshot(&self) -> HashMap<JobKind, JobStatus> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Mark a job kind as started, or reject with a `Conflict` if the same
    /// kind is already running. Returns a guard whose `finish` methods
    /// record the outcome.
    pub fn start(&self, kind: JobKind, scope: Option<String>) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = jobs.get(&kind) {
            if existing.status == Status::Running {
                return Err(AppError::Conflict(format!("{kind:?} job is already running")));
            }
        }
        jobs.insert(
            kind,
            JobStatus { status: Status::Running, count: 0, last_ran_at: None, error_message: None, scope },
        );
        Ok(())
    }

    pub fn finish_success(&self, kind: JobKind, count: u64) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let entry = jobs.entry(kind).or_default();
        entry.status = Status::Success;
        entry.count = count;
        entry.last_ran_at = Some(Utc::now());
        entry.error_message = None;
    }

    pub fn finish_error(&self, kind: JobKind, message: String) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let entry = jobs.entry(kind).or_default();
        entry.status = Status::Error;
        entry.last_ran_at = Some(Utc::now());
        entry.error_message = Some(message);
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_a_running_job_is_a_conflict() {
        let orch = Orchestrator::new();
        orch.start(JobKind::FetchArxiv, None).expect("first start succeeds");
        let err = orch.start(JobKind::FetchArxiv, None).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn finishing_allows_restart() {
        let orch = Orchestrator::new();
        orch.start(JobKind::GenCandidatePool, None).expect("start");
        orch.finish_success(JobKind::GenCandidatePool, 42);
        orch.start(JobKind::GenCandidatePool, None).expect("restart after finish");
        let snap = orch.snapshot();
        assert_eq!(snap[&JobKind::GenCandidatePool].status, Status::Running);
    }

    #[test]
    fn distinct_kinds_do_not_conflict() {
        let orch = Orchestrator::new();
        orch.start(JobKind::FetchArxiv, None).expect("start a");
        orch.start(JobKind::GenContent, None).expect("start b, distinct kind");
    }
}
