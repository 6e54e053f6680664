//! Producer/consumer pipeline over the submission listing.
//!
//! One producer task walks [`PageWindows`] and pushes ids into a bounded
//! `mpsc` channel; a fixed pool of worker tasks pulls ids off that channel
//! and triggers every configured [`ActionKind`] for each one. The channel is
//! the only thing the tasks share besides the read-only API handle.
//!
//! The receiver sits behind an async mutex so any number of workers can pull
//! from it while each id is still delivered to exactly one of them. A full
//! channel suspends the producer, which bounds memory to `queue_capacity` ids.
//! The producer owns the only sender; dropping it when pagination ends is what
//! closes the queue, and workers stop once it is closed and empty.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::api::{ActionKind, ActionOutcome, SubmissionApi, SubmissionId};

use super::state::{ProducerEvent, ProducerMachine, ProducerState};
use super::summary::{ProducerReport, RunSummary, WorkerTally};
use super::window::PageWindows;

pub const DEFAULT_CHUNK_SIZE: u64 = 100;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
pub const DEFAULT_CONSUMERS: usize = 5;

/// Everything the coordinator needs to know about one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan {
    /// First listing offset to fetch.
    pub offset: u64,
    /// Number of listing positions to cover from `offset`.
    pub count: u64,
    /// Page size requested per fetch, and the step between fetches.
    pub chunk_size: u64,
    /// Maximum number of ids buffered between producer and workers.
    pub queue_capacity: usize,
    /// Size of the worker pool.
    pub consumers: usize,
    /// Actions triggered for every id, in this order.
    pub actions: Vec<ActionKind>,
}

impl Default for PipelinePlan {
    fn default() -> Self {
        Self {
            offset: 0,
            count: 10,
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            consumers: DEFAULT_CONSUMERS,
            actions: vec![ActionKind::Code],
        }
    }
}

type SharedQueue = Arc<Mutex<mpsc::Receiver<SubmissionId>>>;

/// Run the pipeline to completion and summarize what happened.
///
/// Returns once every worker has stopped. Page fetch failures and action
/// failures are logged and counted, never returned.
pub async fn run_pipeline<A: SubmissionApi>(api: Arc<A>, plan: &PipelinePlan) -> RunSummary {
    let run_id = Uuid::new_v4();
    coordinate(api, plan, run_id)
        .instrument(info_span!("run", %run_id))
        .await
}

async fn coordinate<A: SubmissionApi>(
    api: Arc<A>,
    plan: &PipelinePlan,
    run_id: Uuid,
) -> RunSummary {
    let started_at = Utc::now();
    let (sender, receiver) = mpsc::channel(plan.queue_capacity.max(1));

    let windows = PageWindows::new(plan.offset, plan.count, plan.chunk_size);
    let producer = tokio::spawn(
        produce(Arc::clone(&api), windows, sender).instrument(info_span!("producer")),
    );

    info!(consumers = plan.consumers, "starting workers");
    let queue: SharedQueue = Arc::new(Mutex::new(receiver));
    let actions: Arc<[ActionKind]> = plan.actions.clone().into();
    let mut workers = JoinSet::new();
    for worker_id in 1..=plan.consumers {
        workers.spawn(
            consume(Arc::clone(&api), Arc::clone(&queue), Arc::clone(&actions))
                .instrument(info_span!("worker", id = worker_id)),
        );
    }
    // Workers hold the only receiver handles from here on; if they all die,
    // the producer sees a closed queue instead of blocking forever.
    drop(queue);

    let mut tally = WorkerTally::default();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(worker) => tally.merge(worker),
            Err(e) => error!(error = %e, "worker task did not complete"),
        }
    }

    let producer = producer.await.unwrap_or_else(|e| {
        error!(error = %e, "producer task did not complete");
        ProducerReport {
            state: ProducerState::Failed,
            pages_fetched: 0,
            records_enqueued: 0,
        }
    });

    let summary = RunSummary::new(run_id, started_at, producer, tally);
    info!(
        producer_state = %summary.producer_state,
        records = summary.records_processed,
        succeeded = summary.actions_succeeded,
        failed = summary.actions_failed,
        "all processing finished"
    );
    summary
}

async fn produce<A: SubmissionApi>(
    api: Arc<A>,
    windows: PageWindows,
    queue: mpsc::Sender<SubmissionId>,
) -> ProducerReport {
    let mut machine = ProducerMachine::default();
    let mut pages_fetched: u64 = 0;
    let mut records_enqueued: u64 = 0;

    'pages: for window in windows {
        info!(
            offset = window.offset,
            count = window.count,
            "fetching submission ids"
        );
        let ids = match api.fetch_page(window.offset, window.count).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(
                    error = %e,
                    status = ?e.status(),
                    offset = window.offset,
                    "fetching submission ids failed, producer stopping"
                );
                machine.next(ProducerEvent::FetchFailed);
                break;
            }
        };
        pages_fetched += 1;

        if machine.next(ProducerEvent::PageFetched(ids.len())) == ProducerState::Exhausted {
            info!(offset = window.offset, "no submission ids returned, source exhausted");
            break;
        }

        info!(found = ids.len(), "pushing submission ids to queue");
        for id in ids {
            if queue.send(id).await.is_err() {
                warn!("no workers left to receive submission ids, producer stopping");
                machine.next(ProducerEvent::QueueClosed);
                break 'pages;
            }
            records_enqueued += 1;
        }
        machine.next(ProducerEvent::PageDrained);
    }

    let state = machine.finish();
    drop(queue);
    info!(%state, pages_fetched, records_enqueued, "producer finished, queue closed");

    ProducerReport {
        state,
        pages_fetched,
        records_enqueued,
    }
}

async fn consume<A: SubmissionApi>(
    api: Arc<A>,
    queue: SharedQueue,
    actions: Arc<[ActionKind]>,
) -> WorkerTally {
    info!("worker started");
    let mut tally = WorkerTally::default();

    loop {
        // Lock only for the dequeue so other workers can pull while this one migrates.
        let next = queue.lock().await.recv().await;
        let Some(submission_id) = next else {
            break;
        };

        info!(%submission_id, "processing submission");
        tally.records_processed += 1;

        for &action in actions.iter() {
            match api.invoke(&submission_id, action).await {
                ActionOutcome::Success { status } => {
                    info!(%submission_id, %action, status, "migration triggered");
                    tally.actions_succeeded += 1;
                }
                ActionOutcome::Failure { status, detail } => {
                    warn!(%submission_id, %action, ?status, %detail, "migration failed");
                    tally.actions_failed += 1;
                }
            }
        }
    }

    info!(records = tally.records_processed, "worker finished");
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// In-memory API that replays scripted pages and records every call.
    #[derive(Default)]
    struct ScriptedApi {
        pages: StdMutex<VecDeque<Result<Vec<String>, ApiError>>>,
        fetches: StdMutex<Vec<(u64, u64)>>,
        invocations: StdMutex<Vec<(String, ActionKind)>>,
        failing: HashSet<(String, ActionKind)>,
    }

    impl ScriptedApi {
        fn with_pages(pages: Vec<Result<Vec<String>, ApiError>>) -> Self {
            Self {
                pages: StdMutex::new(pages.into()),
                ..Default::default()
            }
        }

        fn failing_on(mut self, id: &str, action: ActionKind) -> Self {
            self.failing.insert((id.to_string(), action));
            self
        }

        fn fetches(&self) -> Vec<(u64, u64)> {
            self.fetches.lock().unwrap().clone()
        }

        fn invocations(&self) -> Vec<(String, ActionKind)> {
            self.invocations.lock().unwrap().clone()
        }
    }

    impl SubmissionApi for ScriptedApi {
        async fn fetch_page(&self, offset: u64, count: u64) -> Result<Vec<String>, ApiError> {
            self.fetches.lock().unwrap().push((offset, count));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn invoke(&self, submission_id: &str, action: ActionKind) -> ActionOutcome {
            {
                self.invocations
                    .lock()
                    .unwrap()
                    .push((submission_id.to_string(), action));
            }
            tokio::task::yield_now().await;
            if self.failing.contains(&(submission_id.to_string(), action)) {
                ActionOutcome::Failure {
                    status: Some(500),
                    detail: "boom".into(),
                }
            } else {
                ActionOutcome::Success { status: 200 }
            }
        }
    }

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn window_plan(offset: u64, count: u64, chunk_size: u64) -> PipelinePlan {
        PipelinePlan {
            offset,
            count,
            chunk_size,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn short_final_page_is_fetched_once() {
        let api = Arc::new(ScriptedApi::with_pages(vec![Ok(ids("s", 3))]));

        let summary = run_pipeline(Arc::clone(&api), &window_plan(0, 5, 100)).await;

        assert_eq!(api.fetches(), vec![(0, 5)]);
        assert_eq!(summary.records_enqueued, 3);
        assert_eq!(summary.records_processed, 3);
        // The next step would be offset 100, past the requested range.
        assert_eq!(summary.producer_state, ProducerState::Done);
    }

    #[tokio::test]
    async fn short_page_inside_range_does_not_stop_pagination() {
        let api = Arc::new(ScriptedApi::with_pages(vec![
            Ok(ids("a", 3)),
            Ok(ids("b", 2)),
            Ok(ids("c", 1)),
        ]));

        let summary = run_pipeline(Arc::clone(&api), &window_plan(0, 250, 100)).await;

        assert_eq!(api.fetches(), vec![(0, 100), (100, 100), (200, 50)]);
        assert_eq!(summary.pages_fetched, 3);
        assert_eq!(summary.records_enqueued, 6);
        assert_eq!(summary.producer_state, ProducerState::Done);
    }

    #[tokio::test]
    async fn empty_page_stops_pagination_early() {
        let api = Arc::new(ScriptedApi::with_pages(vec![
            Ok(ids("a", 100)),
            Ok(Vec::new()),
            Ok(ids("never", 100)),
        ]));

        let summary = run_pipeline(Arc::clone(&api), &window_plan(0, 500, 100)).await;

        assert_eq!(api.fetches(), vec![(0, 100), (100, 100)]);
        assert_eq!(summary.records_processed, 100);
        assert_eq!(summary.producer_state, ProducerState::Exhausted);
        assert!(api.invocations().iter().all(|(id, _)| id.starts_with('a')));
    }

    #[tokio::test]
    async fn fetch_error_keeps_already_queued_work() {
        let api = Arc::new(ScriptedApi::with_pages(vec![
            Ok(vec!["a".into(), "b".into()]),
            Err(ApiError::Fetch { status: 500 }),
            Ok(vec!["c".into()]),
        ]));

        let summary = run_pipeline(Arc::clone(&api), &window_plan(10, 300, 100)).await;

        assert_eq!(api.fetches(), vec![(10, 100), (110, 100)]);
        assert_eq!(summary.producer_state, ProducerState::Failed);
        assert_eq!(summary.records_enqueued, 2);
        let mut seen: Vec<String> = api.invocations().into_iter().map(|(id, _)| id).collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn single_worker_runs_every_action_in_order() {
        let api = Arc::new(ScriptedApi::with_pages(vec![Ok(ids("r", 10))]));
        let plan = PipelinePlan {
            consumers: 1,
            actions: vec![ActionKind::Code, ActionKind::Output],
            ..window_plan(0, 10, 100)
        };

        let summary = run_pipeline(Arc::clone(&api), &plan).await;

        let calls = api.invocations();
        assert_eq!(calls.len(), 20);
        assert_eq!(summary.actions_invoked(), 20);
        for (i, pair) in calls.chunks(2).enumerate() {
            let id = format!("r{i}");
            assert_eq!(pair[0], (id.clone(), ActionKind::Code));
            assert_eq!(pair[1], (id, ActionKind::Output));
        }
    }

    #[tokio::test]
    async fn failed_action_does_not_skip_later_kinds_or_records() {
        let api = Arc::new(
            ScriptedApi::with_pages(vec![Ok(vec!["a".into(), "b".into(), "c".into()])])
                .failing_on("b", ActionKind::Code),
        );
        let plan = PipelinePlan {
            consumers: 1,
            actions: vec![ActionKind::Code, ActionKind::Output],
            ..window_plan(0, 3, 100)
        };

        let summary = run_pipeline(Arc::clone(&api), &plan).await;

        assert_eq!(summary.actions_failed, 1);
        assert_eq!(summary.actions_succeeded, 5);
        assert!(
            api.invocations()
                .contains(&("b".to_string(), ActionKind::Output))
        );
        assert!(
            api.invocations()
                .contains(&("c".to_string(), ActionKind::Code))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn each_record_reaches_exactly_one_worker() {
        let api = Arc::new(ScriptedApi::with_pages(vec![
            Ok(ids("p0-", 100)),
            Ok(ids("p1-", 100)),
            Ok(ids("p2-", 100)),
        ]));
        let plan = PipelinePlan {
            consumers: 8,
            queue_capacity: 16,
            ..window_plan(0, 300, 100)
        };

        let summary = run_pipeline(Arc::clone(&api), &plan).await;

        let calls = api.invocations();
        assert_eq!(calls.len(), 300);
        let unique: HashSet<_> = calls.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(unique.len(), 300);
        assert_eq!(summary.records_processed, 300);
        assert_eq!(summary.records_enqueued, 300);
    }

    #[tokio::test]
    async fn duplicate_ids_are_passed_through() {
        let api = Arc::new(ScriptedApi::with_pages(vec![
            Ok(vec!["x".into(), "y".into()]),
            Ok(vec!["y".into(), "z".into()]),
        ]));

        let summary = run_pipeline(Arc::clone(&api), &window_plan(0, 4, 2)).await;

        assert_eq!(summary.records_processed, 4);
        let ys = api
            .invocations()
            .iter()
            .filter(|(id, _)| id == "y")
            .count();
        assert_eq!(ys, 2);
    }

    #[tokio::test]
    async fn zero_count_fetches_nothing() {
        let api = Arc::new(ScriptedApi::default());

        let summary = run_pipeline(Arc::clone(&api), &window_plan(0, 0, 100)).await;

        assert!(api.fetches().is_empty());
        assert_eq!(summary.producer_state, ProducerState::Done);
        assert_eq!(summary.records_processed, 0);
    }

    #[tokio::test]
    async fn producer_enqueues_in_page_order_then_closes() {
        let api = Arc::new(ScriptedApi::with_pages(vec![
            Ok(vec!["a".into(), "b".into()]),
            Ok(vec!["c".into()]),
        ]));
        let (tx, mut rx) = mpsc::channel(10);

        let report = produce(Arc::clone(&api), PageWindows::new(0, 4, 2), tx).await;

        let mut received = Vec::new();
        while let Some(id) = rx.recv().await {
            received.push(id);
        }
        assert_eq!(received, vec!["a", "b", "c"]);
        assert_eq!(report.records_enqueued, 3);
        assert_eq!(report.state, ProducerState::Done);
    }

    #[tokio::test]
    async fn full_queue_suspends_producer() {
        let api = Arc::new(ScriptedApi::with_pages(vec![Ok(ids("q", 5))]));
        let (tx, mut rx) = mpsc::channel(2);

        let handle = tokio::spawn(produce(Arc::clone(&api), PageWindows::new(0, 5, 100), tx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        let mut received = Vec::new();
        while let Some(id) = rx.recv().await {
            received.push(id);
        }
        let report = handle.await.unwrap();
        assert_eq!(received.len(), 5);
        assert_eq!(report.records_enqueued, 5);
    }

    #[tokio::test]
    async fn producer_stops_when_no_receiver_is_left() {
        let api = Arc::new(ScriptedApi::with_pages(vec![Ok(ids("z", 3))]));
        let (tx, rx) = mpsc::channel(10);
        drop(rx);

        let report = produce(Arc::clone(&api), PageWindows::new(0, 300, 100), tx).await;

        assert_eq!(report.state, ProducerState::Failed);
        assert_eq!(report.records_enqueued, 0);
        assert_eq!(api.fetches().len(), 1);
    }
}
