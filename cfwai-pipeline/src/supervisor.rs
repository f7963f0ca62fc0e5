use std::collections::HashMap;
use std::sync::Arc;

use cfwai_model::Stage;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::aging::AgingStage;
use crate::decision::DecisionStage;
use crate::download::DownloadStage;

/// Owns the single shutdown token shared by all three stage workers, per
/// spec §4.9. Grounded on the teacher's `OrchestratorRuntime`
/// (`ferrex-core/src/scan/orchestration/runtime/supervisor.rs`): one
/// `CancellationToken`, one `JoinHandle` per spawned worker, `tokio::select!`
/// between work and the shutdown signal — simplified here to a single
/// worker per stage rather than a sized pool, since this system never
/// runs more than one current item per stage.
pub struct Supervisor {
    decision: Arc<DecisionStage>,
    aging: Arc<AgingStage>,
    download: Arc<DownloadStage>,
    handles: Mutex<HashMap<Stage, (CancellationToken, tokio::task::JoinHandle<()>)>>,
}

impl Supervisor {
    pub fn new(decision: Arc<DecisionStage>, aging: Arc<AgingStage>, download: Arc<DownloadStage>) -> Self {
        Self { decision, aging, download, handles: Mutex::new(HashMap::new()) }
    }

    /// Starts every stage. Starting an already-running stage is a no-op.
    pub async fn start_all(&self) {
        for stage in Stage::ALL {
            self.start(stage).await;
        }
    }

    pub async fn start(&self, stage: Stage) {
        let mut handles = self.handles.lock().await;
        if handles.contains_key(&stage) {
            tracing::debug!(%stage, "stage already running; start is a no-op");
            return;
        }
        let token = CancellationToken::new();
        let handle = match stage {
            Stage::Decision => {
                let worker = Arc::clone(&self.decision);
                let token = token.clone();
                tokio::spawn(async move { worker.run(token).await })
            }
            Stage::Aging => {
                let worker = Arc::clone(&self.aging);
                let token = token.clone();
                tokio::spawn(async move { worker.run(token).await })
            }
            Stage::Download => {
                let worker = Arc::clone(&self.download);
                let token = token.clone();
                tokio::spawn(async move { worker.run(token).await })
            }
        };
        tracing::info!(%stage, "stage started");
        handles.insert(stage, (token, handle));
    }

    /// Stops one stage by cancelling its token and waiting for its
    /// worker to return. Stopping an already-stopped stage is a no-op.
    pub async fn stop(&self, stage: Stage) {
        let entry = self.handles.lock().await.remove(&stage);
        let Some((token, handle)) = entry else {
            tracing::debug!(%stage, "stage already stopped; stop is a no-op");
            return;
        };
        token.cancel();
        if let Err(err) = handle.await {
            tracing::warn!(%stage, %err, "stage worker task panicked");
        }
        tracing::info!(%stage, "stage stopped");
    }

    /// Shuts down every running stage and waits for all workers to join.
    pub async fn shutdown(&self) {
        for stage in Stage::ALL {
            self.stop(stage).await;
        }
    }

    pub async fn running_stages(&self) -> Vec<Stage> {
        self.handles.lock().await.keys().copied().collect()
    }
}
