//! Background analysis pipeline.
//!
//! Uploads are queued onto an unbounded channel consumed by a single worker
//! task, so batches run strictly one at a time in arrival order. Within a
//! batch the driver runs two phases: a sequential fit of the batch statistics,
//! then per-reading analysis fanned out across a small task pool. Results are
//! collected unordered and sorted once at the end, and progress is persisted
//! in strides so large batches do not hammer the job store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analyzer::SampleAnalyzer;
use crate::jobs::JobStore;
use crate::models::{
    AnalysisResult, NotificationMessage, NotificationReason, OverallStatus, SensorReading,
    VariableStatus,
};
use crate::notify::NotificationSink;
use crate::summary::build_summary;
use crate::thresholds::ThresholdConfig;

// ---

/// Persist progress every this many readings (plus once at the end).
const PROGRESS_STRIDE: usize = 500;

/// One queued batch. The job record already exists in the store when the
/// item is enqueued.
pub struct WorkItem {
    pub job_id: Uuid,
    pub readings: Vec<SensorReading>,
}

/// Why a batch did not complete. The display text doubles as the job's
/// error message.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Processing was cancelled.")]
    Cancelled,
    #[error("{0}")]
    Fault(String),
}

// ---

/// Register a job for `readings` and hand the batch to the background
/// worker. Fire-and-forget: the caller gets the job id back immediately and
/// follows progress through the store.
pub fn submit(
    store: &JobStore,
    queue: &mpsc::UnboundedSender<WorkItem>,
    readings: Vec<SensorReading>,
) -> Uuid {
    // ---
    let job = store.create(readings.len());

    let item = WorkItem { job_id: job.id, readings };
    if queue.send(item).is_err() {
        // Worker is gone (shutdown); the job stays Queued.
        warn!(job_id = %job.id, "Work queue is closed; job will not be processed");
    }

    job.id
}

/// Spawn the single background consumer. Returns the submit side of the work
/// queue and the consumer's task handle; cancelling `shutdown` stops the
/// consumer after the batch in flight fails over.
pub fn spawn_worker(
    store: JobStore,
    thresholds: ThresholdConfig,
    workers: usize,
    sink: Arc<dyn NotificationSink>,
    shutdown: CancellationToken,
) -> (mpsc::UnboundedSender<WorkItem>, JoinHandle<()>) {
    // ---
    let (tx, mut rx) = mpsc::unbounded_channel::<WorkItem>();

    let handle = tokio::spawn(async move {
        info!(workers, sink = sink.name(), "Analysis worker started");

        loop {
            let item = tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(item) => item,
                    None => break,
                },
                _ = shutdown.cancelled() => break,
            };

            let job_id = item.job_id;
            let cancel = shutdown.child_token();
            if let Err(e) = process_batch(&store, &thresholds, workers, &sink, item, cancel).await
            {
                // The job is failed over and the consumer keeps serving the
                // queue; one bad batch must not take the worker down.
                error!(job_id = %job_id, error = %e, "Analysis job failed");
                store.fail(job_id, e.to_string());
            }
        }

        info!("Analysis worker stopped");
    });

    (tx, handle)
}

/// Drive one batch end to end: fit, fan out, collect, sort, publish.
async fn process_batch(
    store: &JobStore,
    thresholds: &ThresholdConfig,
    workers: usize,
    sink: &Arc<dyn NotificationSink>,
    item: WorkItem,
    cancel: CancellationToken,
) -> Result<(), ProcessError> {
    // ---
    let WorkItem { job_id, readings } = item;
    let total = readings.len();

    if !store.mark_processing(job_id) {
        return Err(ProcessError::Fault(format!(
            "job '{job_id}' is missing from the store or not queued"
        )));
    }
    info!(job_id = %job_id, total, "Starting analysis job");

    if cancel.is_cancelled() {
        return Err(ProcessError::Cancelled);
    }

    // Phase 1: fit the batch statistics. Needs the whole batch at once and
    // is cheap relative to phase 2, so it runs sequentially.
    let mut analyzer = SampleAnalyzer::new(*thresholds);
    analyzer.fit(&readings);

    if cancel.is_cancelled() {
        return Err(ProcessError::Cancelled);
    }

    // Phase 2: per-reading analysis across the pool. Workers pull the next
    // unclaimed index, so uneven readings cannot stall a fixed stripe. Each
    // result keeps its batch index for the tie-break in the final sort.
    let pool_size = workers.max(1);
    let analyzer = Arc::new(analyzer);
    let readings = Arc::new(readings);
    let next = Arc::new(AtomicUsize::new(0));
    let processed = Arc::new(AtomicUsize::new(0));
    let results = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let notifications = Arc::new(Mutex::new(Vec::new()));

    let mut pool = JoinSet::new();
    for _ in 0..pool_size {
        let analyzer = Arc::clone(&analyzer);
        let readings = Arc::clone(&readings);
        let next = Arc::clone(&next);
        let processed = Arc::clone(&processed);
        let results = Arc::clone(&results);
        let notifications = Arc::clone(&notifications);
        let store = store.clone();
        let sink = Arc::clone(sink);
        let cancel = cancel.clone();

        pool.spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    return;
                }

                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(reading) = readings.get(index) else {
                    return;
                };

                let result = analyzer.analyze(reading);

                if let Some(message) = build_notification(&result) {
                    if let Err(e) = sink.publish(&message).await {
                        warn!(sink = sink.name(), error = %e, "Notification publish failed");
                    }
                    notifications.lock().unwrap().push(message);
                }

                results.lock().unwrap().push((index, result));

                let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if current % PROGRESS_STRIDE == 0 || current == readings.len() {
                    store.set_progress(job_id, current);
                }
            }
        });
    }

    let mut fault: Option<ProcessError> = None;
    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            if fault.is_none() {
                // Stop the siblings before they sink more work into a batch
                // that is already lost.
                cancel.cancel();
                fault = Some(ProcessError::Fault(format!("analysis task failed: {e}")));
            }
        }
    }
    if let Some(fault) = fault {
        return Err(fault);
    }
    if cancel.is_cancelled() {
        return Err(ProcessError::Cancelled);
    }

    let mut indexed = std::mem::take(&mut *results.lock().unwrap());
    let collected = std::mem::take(&mut *notifications.lock().unwrap());

    if indexed.len() != total {
        return Err(ProcessError::Fault(format!(
            "incomplete analysis: {} of {total} readings",
            indexed.len()
        )));
    }

    // Chronological order for display; ties keep their upload order.
    indexed.sort_by(|a, b| a.1.timestamp.cmp(&b.1.timestamp).then(a.0.cmp(&b.0)));
    let ordered: Vec<AnalysisResult> = indexed.into_iter().map(|(_, result)| result).collect();

    let summary = build_summary(&ordered, collected);
    info!(
        job_id = %job_id,
        normal = summary.total_normal,
        anomalies = summary.total_anomaly,
        invalid = summary.total_invalid,
        notifications = summary.notifications.len(),
        "Analysis job completed"
    );
    store.complete(job_id, ordered, summary);

    Ok(())
}

/// Notification rule for one analyzed reading: a critical breach on any
/// variable wins over an anomaly verdict; anything milder emits nothing.
fn build_notification(result: &AnalysisResult) -> Option<NotificationMessage> {
    // ---
    let critical = result.temperature.status == VariableStatus::Critical
        || result.humidity.status == VariableStatus::Critical
        || result.dew_point.status == VariableStatus::Critical;

    let anomaly = result.anomaly.status == OverallStatus::Anomaly;

    if !critical && !anomaly {
        return None;
    }

    Some(NotificationMessage {
        sensor_id: result.sensor_id.clone(),
        timestamp: result.timestamp,
        reason: if critical {
            NotificationReason::Critical
        } else {
            NotificationReason::Anomaly
        },
    })
}
