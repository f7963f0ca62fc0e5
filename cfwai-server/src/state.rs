use std::sync::Arc;

use cfwai_pipeline::{ItemQueue, Supervisor};
use cfwai_store::Store;

/// Shared handles every ingress handler needs: the supervisor to
/// start/stop stages, the store for `get_item`, and the decision queue
/// that `/api/notify` and `/enqueue` feed directly.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub store: Arc<Store>,
    pub decision_queue: Arc<ItemQueue>,
}
