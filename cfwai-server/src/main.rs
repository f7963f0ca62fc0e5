//! # cfwai-server
//!
//! Process entry point for the webhook acquisition initiator: ingests
//! video-publication notifications, fuzzy-matches them against a
//! Sonarr-shaped library catalog, downloads and tags matches, and hands
//! them off for import — driven by three persistent stage workers
//! (decision, aging, download) behind an axum HTTP front end.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cfwai_downloader::{Downloader, DownloaderConfig};
use cfwai_library::LibraryClient;
use cfwai_pipeline::{AgingQueue, AgingStage, DecisionStage, Dispatcher, DownloadStage, ItemQueue, Supervisor};
use cfwai_server::state::AppState;
use cfwai_server::{Config, create_router};
use cfwai_store::Store;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LIBRARY_VALIDATION_ATTEMPTS: u32 = 5;
const LIBRARY_VALIDATION_RETRY_DELAY: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cfwai_server=info,cfwai_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(data_dir = %config.data_dir.display(), "configuration loaded");
    std::fs::create_dir_all(&config.data_dir)?;

    let store = Arc::new(Store::new(&config.data_dir));
    let library = Arc::new(LibraryClient::new(&config.sonarr_url, &config.sonarr_api));

    validate_library_config(&library).await?;

    let downloader = Downloader::new(downloader_config(&config));
    let settings = config.pipeline_settings();

    let decision_queue =
        ItemQueue::load(cfwai_model::Stage::Decision, Arc::clone(&store), config.flip_flop_queue)?;
    let aging_queue = AgingQueue::load(Arc::clone(&store))?;
    let download_queue = ItemQueue::load(cfwai_model::Stage::Download, Arc::clone(&store), false)?;

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&store),
        Arc::clone(&decision_queue),
        Arc::clone(&aging_queue),
        Arc::clone(&download_queue),
    ));

    let decision_stage = Arc::new(DecisionStage::new(
        Arc::clone(&store),
        Arc::clone(&library),
        Arc::clone(&dispatcher),
        Arc::clone(&decision_queue),
        settings.clone(),
    ));
    let aging_stage = Arc::new(AgingStage::new(
        Arc::clone(&store),
        Arc::clone(&library),
        Arc::clone(&dispatcher),
        Arc::clone(&aging_queue),
        settings.clone(),
    ));
    let download_stage = Arc::new(DownloadStage::new(
        Arc::clone(&store),
        Arc::clone(&library),
        downloader,
        Arc::clone(&download_queue),
        settings,
    ));

    let supervisor = Arc::new(Supervisor::new(decision_stage, aging_stage, download_stage));

    if config.run_decision_queue {
        supervisor.start(cfwai_model::Stage::Decision).await;
    }
    if config.run_aging_queue {
        supervisor.start(cfwai_model::Stage::Aging).await;
    }
    if config.run_download_queue {
        supervisor.start(cfwai_model::Stage::Download).await;
    }

    let state = AppState { supervisor: Arc::clone(&supervisor), store, decision_queue };

    let app = create_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting cfwai-server");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&supervisor)))
        .await?;

    Ok(())
}

/// Retries `validate_config` up to [`LIBRARY_VALIDATION_ATTEMPTS`] times
/// at [`LIBRARY_VALIDATION_RETRY_DELAY`] intervals before a fatal exit,
/// per spec §6.
async fn validate_library_config(library: &LibraryClient) -> anyhow::Result<()> {
    for attempt in 1..=LIBRARY_VALIDATION_ATTEMPTS {
        match library.validate_config().await {
            Ok(()) => return Ok(()),
            Err(err) if attempt == LIBRARY_VALIDATION_ATTEMPTS => {
                error!(%err, "library service validation failed after {attempt} attempts");
                return Err(anyhow::anyhow!("library service unreachable: {err}"));
            }
            Err(err) => {
                warn!(%err, attempt, "library service validation failed; retrying");
                tokio::time::sleep(LIBRARY_VALIDATION_RETRY_DELAY).await;
            }
        }
    }
    unreachable!("loop always returns before exhausting its range")
}

fn downloader_config(config: &Config) -> DownloaderConfig {
    let candidate = |name: &str| {
        let path = config.conf_dir.join(name);
        path.exists().then_some(path)
    };
    DownloaderConfig {
        config_file: candidate("yt-dlp.conf"),
        netrc_file: candidate("netrc"),
        cookies_file: candidate("cookies.txt"),
        ..DownloaderConfig::default()
    }
}

/// Waits for Ctrl-C, SIGTERM, or SIGHUP, then routes to the supervisor's
/// shutdown so in-flight items finish or fail naturally before the
/// process exits (spec §4.9's "interrupt, terminate, hangup all route
/// here"/§4.11).
async fn shutdown_signal(supervisor: Arc<Supervisor>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    #[cfg(unix)]
    let hangup = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
            .expect("failed to install SIGHUP handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let hangup = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = hangup => {}
    }

    info!("shutdown signal received");
    supervisor.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(conf_dir: std::path::PathBuf) -> Config {
        Config {
            port: 8000,
            data_dir: std::path::PathBuf::new(),
            conf_dir,
            sonarr_url: "http://localhost".to_string(),
            sonarr_api: "key".to_string(),
            sonarr_in_path: std::path::PathBuf::new(),
            wai_out_path: std::path::PathBuf::new(),
            wai_out_temp: None,
            aging_ripeness_per_day: 4,
            decision_queue_interval_minutes: 5,
            aging_queue_interval_minutes: 5,
            download_queue_interval_minutes: 5,
            honor_unmon_series: false,
            honor_unmon_eps: false,
            overwrite_eps: false,
            flip_flop_queue: false,
            run_decision_queue: true,
            run_aging_queue: true,
            run_download_queue: true,
            debug_print: false,
        }
    }

    #[test]
    fn downloader_config_only_sets_files_that_exist_under_conf_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("yt-dlp.conf"), b"").unwrap();

        let resolved = downloader_config(&config(dir.path().to_path_buf()));
        assert!(resolved.config_file.is_some());
        assert!(resolved.netrc_file.is_none());
        assert!(resolved.cookies_file.is_none());
    }
}
