use axum::Router;
use tokio::sync::mpsc;

use crate::jobs::JobStore;
use crate::pipeline::WorkItem;

mod analysis;
mod health;

// ---

/// Shared state for all routes: the job store and the submit side of the
/// analysis work queue.
pub type AppState = (JobStore, mpsc::UnboundedSender<WorkItem>);

pub fn router(store: JobStore, queue: mpsc::UnboundedSender<WorkItem>) -> Router {
    // ---
    Router::new()
        .merge(analysis::router())
        .merge(health::router())
        .with_state((store, queue))
}
