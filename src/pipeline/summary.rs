use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::ProducerState;

/// What the producer did before it closed the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerReport {
    pub state: ProducerState,
    pub pages_fetched: u64,
    pub records_enqueued: u64,
}

/// Counters one worker accumulates until the queue is closed and empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerTally {
    pub records_processed: u64,
    pub actions_succeeded: u64,
    pub actions_failed: u64,
}

impl WorkerTally {
    pub fn merge(&mut self, other: WorkerTally) {
        self.records_processed += other.records_processed;
        self.actions_succeeded += other.actions_succeeded;
        self.actions_failed += other.actions_failed;
    }
}

/// Structured record of one pipeline run. Logged and printed only; it has
/// no effect on the exit status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub producer_state: ProducerState,
    pub pages_fetched: u64,
    pub records_enqueued: u64,
    pub records_processed: u64,
    pub actions_succeeded: u64,
    pub actions_failed: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunSummary {
    pub fn new(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        producer: ProducerReport,
        workers: WorkerTally,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            producer_state: producer.state,
            pages_fetched: producer.pages_fetched,
            records_enqueued: producer.records_enqueued,
            records_processed: workers.records_processed,
            actions_succeeded: workers.actions_succeeded,
            actions_failed: workers.actions_failed,
            started_at,
            completed_at: now,
            duration_ms: (now - started_at).num_milliseconds(),
        }
    }

    pub fn actions_invoked(&self) -> u64 {
        self.actions_succeeded + self.actions_failed
    }
}
