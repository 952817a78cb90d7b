//! Print job records and the in-memory job history.
//!
//! A job is created when a send is requested and is mutated only by the
//! orchestrator that owns it. Once its status is terminal the record never
//! changes again. The history is append-only apart from an explicit clear
//! and does not survive a restart.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{EtiquetaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Sending,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "sending" => Ok(Self::Sending),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            other => Err(EtiquetaError::Config(format!("unknown job status '{}'", other))),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Sending => "sending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What happened to one channel while a job walked the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChannelOutcome {
    /// Pre-check failed; not an attempt.
    Skipped { reason: String },
    Failed { error: String },
    Succeeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAttempt {
    pub channel: String,
    #[serde(flatten)]
    pub outcome: ChannelOutcome,
    pub duration_ms: u64,
}

impl ChannelAttempt {
    /// True for real send attempts, false for skipped channels.
    pub fn was_sent(&self) -> bool {
        !matches!(self.outcome, ChannelOutcome::Skipped { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub channel_used: Option<String>,
    pub error: Option<String>,
    /// Labels in the transmitted stream.
    pub label_count: usize,
    /// Every channel visited, in chain order.
    pub attempts: Vec<ChannelAttempt>,
}

impl PrintJob {
    pub fn new(label_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            completed_at: None,
            status: JobStatus::Queued,
            channel_used: None,
            error: None,
            label_count,
            attempts: Vec::new(),
        }
    }

    /// Milliseconds from creation to completion, if completed.
    pub fn duration_ms(&self) -> Option<u64> {
        self.completed_at
            .map(|done| (done - self.created_at).num_milliseconds().max(0) as u64)
    }
}

/// Criteria for [`JobStore::list`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub channel: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

impl JobFilter {
    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn matches(&self, job: &PrintJob) -> bool {
        self.status.is_none_or(|s| job.status == s)
            && self
                .channel
                .as_deref()
                .is_none_or(|c| job.channel_used.as_deref() == Some(c))
            && self.since.is_none_or(|t| job.created_at >= t)
    }
}

/// Job history owned by one orchestrator.
///
/// Cloning shares the same history.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<Vec<PrintJob>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, job: PrintJob) {
        self.jobs.write().await.push(job);
    }

    /// Apply `f` to job `id` unless the job is already terminal.
    pub(crate) async fn update(&self, id: Uuid, f: impl FnOnce(&mut PrintJob)) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(EtiquetaError::JobNotFound(id))?;
        if !job.status.is_terminal() {
            f(job);
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<PrintJob> {
        self.jobs
            .read()
            .await
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or(EtiquetaError::JobNotFound(id))
    }

    /// Matching jobs, oldest first.
    pub async fn list(&self, filter: &JobFilter) -> Vec<PrintJob> {
        self.jobs
            .read()
            .await
            .iter()
            .filter(|j| filter.matches(j))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Drop every record. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let mut jobs = self.jobs.write().await;
        let removed = jobs.len();
        jobs.clear();
        removed
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(status: JobStatus, channel: Option<&str>) -> PrintJob {
        let mut job = PrintJob::new(1);
        job.status = status;
        job.channel_used = channel.map(str::to_string);
        job.completed_at = Some(Utc::now());
        job
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(JobStatus::parse("Failed").unwrap(), JobStatus::Failed);
        assert!(JobStatus::parse("lost").is_err());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(!JobStatus::Sending.is_terminal());
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_frozen() {
        let store = JobStore::new();
        let job = finished(JobStatus::Failed, None);
        let id = job.id;
        store.insert(job).await;

        store.update(id, |j| j.status = JobStatus::Succeeded).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = JobStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(store.get(id).await, Err(EtiquetaError::JobNotFound(found)) if found == id));
    }

    #[tokio::test]
    async fn test_filter_and_clear() {
        let store = JobStore::new();
        let start = Utc::now();
        store.insert(finished(JobStatus::Succeeded, Some("socket"))).await;
        store.insert(finished(JobStatus::Failed, None)).await;
        store.insert(finished(JobStatus::Succeeded, Some("cli"))).await;

        assert_eq!(store.list(&JobFilter::default()).await.len(), 3);
        assert_eq!(store.list(&JobFilter::default().status(JobStatus::Succeeded)).await.len(), 2);
        assert_eq!(store.list(&JobFilter::default().channel("cli")).await.len(), 1);
        assert_eq!(store.list(&JobFilter::default().since(start)).await.len(), 3);

        assert_eq!(store.clear().await, 3);
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_attempt_serialization() {
        let attempt = ChannelAttempt {
            channel: "native-sdk".into(),
            outcome: ChannelOutcome::Skipped {
                reason: "library not found".into(),
            },
            duration_ms: 0,
        };
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "library not found");
        assert!(!attempt.was_sent());
    }
}
