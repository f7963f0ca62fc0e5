use std::env;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::Parser;

/// CLI overrides layered on top of the environment, mirroring the
/// teacher's `Args`/`Config::from_env` split: the environment is the
/// source of truth, the command line only overrides the two knobs an
/// operator is likely to want to flip per-invocation.
#[derive(Parser, Debug)]
#[command(name = "cfwai-server")]
#[command(about = "Three-stage acquisition pipeline: decision, aging, download")]
struct Args {
    /// HTTP listen port (overrides config)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Persistence root (overrides config)
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,
}

/// Server configuration, populated once at startup from the environment
/// (with CLI overrides for `port`/`data_dir`), per spec §4.10/§6.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub conf_dir: PathBuf,

    pub sonarr_url: String,
    pub sonarr_api: String,
    pub sonarr_in_path: PathBuf,

    pub wai_out_path: PathBuf,
    pub wai_out_temp: Option<PathBuf>,

    pub aging_ripeness_per_day: i64,
    pub decision_queue_interval_minutes: u64,
    pub aging_queue_interval_minutes: u64,
    pub download_queue_interval_minutes: u64,

    pub honor_unmon_series: bool,
    pub honor_unmon_eps: bool,
    pub overwrite_eps: bool,
    pub flip_flop_queue: bool,
    pub run_decision_queue: bool,
    pub run_aging_queue: bool,
    pub run_download_queue: bool,
    pub debug_print: bool,
}

impl Config {
    /// Parses CLI args, then loads the environment, applying the CLI
    /// overrides last. Fails fast (per §6) if `SONARR_URL`, `SONARR_API`,
    /// or `SONARR_IN_PATH` is absent or empty.
    pub fn load() -> anyhow::Result<Self> {
        let args = Args::parse();

        let sonarr_url = required_var("SONARR_URL")?;
        let sonarr_api = required_var("SONARR_API")?;
        let sonarr_in_path = required_var("SONARR_IN_PATH")?;

        let mut config = Self {
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8000),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()).into(),
            conf_dir: env::var("CONF_DIR").unwrap_or_else(|_| "./conf".to_string()).into(),

            sonarr_url,
            sonarr_api,
            sonarr_in_path: sonarr_in_path.into(),

            wai_out_path: env::var("WAI_OUT_PATH").unwrap_or_else(|_| "./out".to_string()).into(),
            wai_out_temp: env::var("WAI_OUT_TEMP").ok().map(PathBuf::from),

            aging_ripeness_per_day: env_parsed("AGING_RIPENESS_PER_DAY", 4),
            decision_queue_interval_minutes: env_parsed("DECISION_QUEUE_INTERVAL", 5),
            aging_queue_interval_minutes: env_parsed("AGING_QUEUE_INTERVAL", 5),
            download_queue_interval_minutes: env_parsed("DOWNLOAD_QUEUE_INTERVAL", 5),

            honor_unmon_series: env_flag_default("HONOR_UNMON_SERIES", true),
            honor_unmon_eps: env_flag_default("HONOR_UNMON_EPS", true),
            overwrite_eps: env_flag("OVERWRITE_EPS"),
            flip_flop_queue: env_flag("FLIP_FLOP_QUEUE"),
            run_decision_queue: env::var("RUN_DECISION_QUEUE").map(|v| v != "0").unwrap_or(true),
            run_aging_queue: env::var("RUN_AGING_QUEUE").map(|v| v != "0").unwrap_or(true),
            run_download_queue: env::var("RUN_DOWNLOAD_QUEUE").map(|v| v != "0").unwrap_or(true),
            debug_print: env_flag("DEBUG_PRINT"),
        };

        if let Some(port) = args.port {
            config.port = port;
        }
        if let Some(data_dir) = args.data_dir {
            config.data_dir = data_dir;
        }

        Ok(config)
    }

    pub fn pipeline_settings(&self) -> cfwai_pipeline::PipelineSettings {
        cfwai_pipeline::PipelineSettings {
            honor_unmon_series: self.honor_unmon_series,
            honor_unmon_eps: self.honor_unmon_eps,
            overwrite_eps: self.overwrite_eps,
            flip_flop_queue: self.flip_flop_queue,
            aging_ripeness_per_day: self.aging_ripeness_per_day,
            decision_interval: std::time::Duration::from_secs(self.decision_queue_interval_minutes * 60),
            aging_interval: std::time::Duration::from_secs(self.aging_queue_interval_minutes * 60),
            download_interval: std::time::Duration::from_secs(self.download_queue_interval_minutes * 60),
            sonarr_in_path: self.sonarr_in_path.clone(),
            wai_out_path: self.wai_out_path.clone(),
            wai_out_temp: self.wai_out_temp.clone(),
        }
    }
}

fn required_var(name: &str) -> anyhow::Result<String> {
    let value = env::var(name).with_context(|| format!("missing required environment variable {name}"))?;
    if value.trim().is_empty() {
        return Err(anyhow!("environment variable {name} is set but empty"));
    }
    Ok(value)
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// The source's `int(os.getenv(..., 0)) == 1` convention: "1" means on,
/// anything else (including absence) means off.
fn env_flag(name: &str) -> bool {
    env::var(name).ok().as_deref() == Some("1")
}

/// Same convention as [`env_flag`], but for the two vars
/// `original_source/aging_queue_manager.py` defaults to enabled
/// (`int(os.getenv("HONOR_UNMON_SERIES", 1)) == 1`): absence means
/// `default`, not off.
fn env_flag_default(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => v == "1",
        Err(_) => default,
    }
}
