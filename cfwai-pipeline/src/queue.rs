use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use cfwai_model::{Item, Stage};
use cfwai_store::{Store, StoreError};
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

/// Maximum time an aging-queue wait sleeps for before re-checking, even
/// if no item's `next_aging` is known to fall sooner. Keeps the worker
/// responsive to pushes that arrive via `notify` without busy-polling.
const AGING_POLL_CAP: Duration = Duration::from_secs(30);

/// A FIFO queue for the decision and download stages: one mutex guarding
/// the in-memory order, one condition variable (`Notify`) woken on push,
/// persisted to its backing file on every mutation — per spec §5's
/// "each queue is guarded by one mutex plus one condition variable".
pub struct ItemQueue {
    stage: Stage,
    store: Arc<Store>,
    inner: Mutex<VecDeque<Item>>,
    notify: Notify,
    /// Decision-queue flip-flop mode (spec §3/§6): when set, `wait_pop`
    /// reverses the remaining tail after every dequeue. Always `false`
    /// for the download queue, which stays strictly FIFO.
    flip_flop: bool,
}

impl ItemQueue {
    pub fn load(stage: Stage, store: Arc<Store>, flip_flop: bool) -> Result<Arc<Self>, StoreError> {
        let items: VecDeque<Item> = store.load_queue(stage)?.into();
        Ok(Arc::new(Self { stage, store, inner: Mutex::new(items), notify: Notify::new(), flip_flop }))
    }

    pub async fn push(&self, item: Item) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().await;
        guard.push_back(item);
        self.persist(&guard)?;
        drop(guard);
        self.notify.notify_one();
        Ok(())
    }

    fn persist(&self, queue: &VecDeque<Item>) -> Result<(), StoreError> {
        let items: Vec<Item> = queue.iter().cloned().collect();
        self.store.save_queue(self.stage, &items)
    }

    /// Blocks until an item is available or `shutdown` fires, popping
    /// and persisting the new head atomically. Returns `None` only on
    /// shutdown. In flip-flop mode, reverses the remaining tail after
    /// every pop so the dequeue direction alternates.
    pub async fn wait_pop(&self, shutdown: &CancellationToken) -> Option<Item> {
        loop {
            {
                let mut guard = self.inner.lock().await;
                if let Some(item) = guard.pop_front() {
                    if self.flip_flop {
                        guard.make_contiguous().reverse();
                    }
                    if let Err(err) = self.persist(&guard) {
                        tracing::warn!(stage = %self.stage, %err, "failed to persist queue after pop");
                    }
                    return Some(item);
                }
            }
            tokio::select! {
                _ = shutdown.cancelled() => return None,
                _ = self.notify.notified() => {}
            }
        }
    }

    /// Remove the first item that is `Item`-equal to `needle`. Used by
    /// the `/dequeue_item` ingress route.
    pub async fn remove_matching(&self, needle: &Item) -> Result<bool, StoreError> {
        let mut guard = self.inner.lock().await;
        let Some(pos) = guard.iter().position(|item| item == needle) else {
            return Ok(false);
        };
        guard.remove(pos);
        self.persist(&guard)?;
        Ok(true)
    }
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// The aging queue's dispatch order differs from FIFO: it always yields
/// the ready item (`next_aging <= now`) with the smallest `next_aging`,
/// per spec §4.7 / §8's invariant, so it keeps its own list rather than
/// reusing [`ItemQueue`].
pub struct AgingQueue {
    store: Arc<Store>,
    inner: Mutex<Vec<Item>>,
    notify: Notify,
}

impl AgingQueue {
    pub fn load(store: Arc<Store>) -> Result<Arc<Self>, StoreError> {
        let items = store.load_queue(Stage::Aging)?;
        Ok(Arc::new(Self { store, inner: Mutex::new(items), notify: Notify::new() }))
    }

    pub async fn push(&self, item: Item) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().await;
        guard.push(item);
        self.persist(&guard)?;
        drop(guard);
        self.notify.notify_one();
        Ok(())
    }

    fn persist(&self, items: &[Item]) -> Result<(), StoreError> {
        self.store.save_queue(Stage::Aging, items)
    }

    /// Blocks until an item with `next_aging <= now` exists (or one with
    /// `next_aging` unset, treated as immediately ready), then removes
    /// and returns the one with the smallest `next_aging`. Returns
    /// `None` only on shutdown.
    pub async fn wait_pop_ready(&self, shutdown: &CancellationToken) -> Option<Item> {
        loop {
            let now = unix_now();
            let mut wake_in = AGING_POLL_CAP;
            {
                let mut guard = self.inner.lock().await;
                let ready_index = guard
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| item.next_aging.map(|t| t <= now).unwrap_or(true))
                    .min_by_key(|(_, item)| item.next_aging.unwrap_or(0))
                    .map(|(idx, _)| idx);

                if let Some(idx) = ready_index {
                    let item = guard.remove(idx);
                    if let Err(err) = self.persist(&guard) {
                        tracing::warn!(%err, "failed to persist aging queue after pop");
                    }
                    return Some(item);
                }

                if let Some(next) = guard.iter().filter_map(|item| item.next_aging).min() {
                    let secs = (next - now).max(1) as u64;
                    wake_in = Duration::from_secs(secs).min(AGING_POLL_CAP);
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => return None,
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(wake_in) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> Item {
        Item::new("creator", "title", "20250101", "https://example/x")
    }

    #[tokio::test]
    async fn fifo_queue_pops_in_push_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path()));
        let queue = ItemQueue::load(Stage::Decision, store, false).unwrap();
        let shutdown = CancellationToken::new();

        let mut first = item();
        first.title = "first".to_string();
        let mut second = item();
        second.title = "second".to_string();
        queue.push(first).await.unwrap();
        queue.push(second).await.unwrap();

        assert_eq!(queue.wait_pop(&shutdown).await.unwrap().title, "first");
        assert_eq!(queue.wait_pop(&shutdown).await.unwrap().title, "second");
    }

    #[tokio::test]
    async fn wait_pop_returns_none_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path()));
        let queue = ItemQueue::load(Stage::Decision, store, false).unwrap();
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        assert!(queue.wait_pop(&shutdown).await.is_none());
    }

    #[tokio::test]
    async fn flip_flop_mode_reverses_the_tail_after_each_pop() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path()));
        let queue = ItemQueue::load(Stage::Decision, store, true).unwrap();
        let shutdown = CancellationToken::new();

        let mut first = item();
        first.title = "first".to_string();
        let mut second = item();
        second.title = "second".to_string();
        let mut third = item();
        third.title = "third".to_string();
        queue.push(first).await.unwrap();
        queue.push(second).await.unwrap();
        queue.push(third).await.unwrap();

        // pop "first", leaving [second, third] -> reversed to [third, second]
        assert_eq!(queue.wait_pop(&shutdown).await.unwrap().title, "first");
        // pop "third", leaving [second] -> reversed to [second] (no-op)
        assert_eq!(queue.wait_pop(&shutdown).await.unwrap().title, "third");
        assert_eq!(queue.wait_pop(&shutdown).await.unwrap().title, "second");
    }

    #[tokio::test]
    async fn aging_queue_yields_smallest_ready_next_aging_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path()));
        let queue = AgingQueue::load(store).unwrap();
        let shutdown = CancellationToken::new();
        let now = unix_now();

        let mut later = item();
        later.title = "later".to_string();
        later.next_aging = Some(now - 10);
        let mut sooner = item();
        sooner.title = "sooner".to_string();
        sooner.next_aging = Some(now - 100);

        queue.push(later).await.unwrap();
        queue.push(sooner).await.unwrap();

        assert_eq!(queue.wait_pop_ready(&shutdown).await.unwrap().title, "sooner");
        assert_eq!(queue.wait_pop_ready(&shutdown).await.unwrap().title, "later");
    }

    #[tokio::test]
    async fn aging_queue_skips_items_not_yet_ready() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path()));
        let queue = AgingQueue::load(store).unwrap();
        let shutdown = CancellationToken::new();
        let now = unix_now();

        let mut not_ready = item();
        not_ready.next_aging = Some(now + 3600);
        queue.push(not_ready).await.unwrap();
        shutdown.cancel();
        assert!(queue.wait_pop_ready(&shutdown).await.is_none());
    }
}
