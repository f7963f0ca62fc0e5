use std::sync::Arc;

use cfwai_model::{Item, Outcome, Stage};
use cfwai_store::{Store, StoreError};

use crate::queue::{AgingQueue, ItemQueue};

/// The stages' only channel to one another. Spec §9's design notes flag
/// the source's cyclic decision/aging/download imports as a missing
/// abstraction; this is that abstraction — a stage hands an item
/// downstream by name, never by holding a reference to another stage's
/// worker.
pub struct Dispatcher {
    store: Arc<Store>,
    decision: Arc<ItemQueue>,
    aging: Arc<AgingQueue>,
    download: Arc<ItemQueue>,
}

impl Dispatcher {
    pub fn new(store: Arc<Store>, decision: Arc<ItemQueue>, aging: Arc<AgingQueue>, download: Arc<ItemQueue>) -> Self {
        Self { store, decision, aging, download }
    }

    pub async fn enqueue_to(&self, stage: Stage, item: Item) -> Result<(), StoreError> {
        match stage {
            Stage::Decision => self.decision.push(item).await,
            Stage::Aging => self.aging.push(item).await,
            Stage::Download => {
                // §4.8: accepting an item onto the download queue is itself
                // an archival point, independent of the terminal pass/fail
                // archive recorded once the download actually runs.
                self.store.archive_append(Outcome::AllProcessed, &item)?;
                self.store.archive_append(Outcome::DownloadEnqueue, &item)?;
                self.download.push(item).await
            }
        }
    }
}
