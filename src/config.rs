use anyhow::Context;
use clap::Parser;
use reqwest::Url;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf, time::Duration};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_TITLE_LIMIT: usize = 50;
pub const DEFAULT_UPCOMING_DAYS: i64 = 7;
pub const DEFAULT_REDIRECT_SECS: u64 = 3;
pub const DEFAULT_TICK_MS: u64 = 250;
pub const MAX_UPCOMING_DAYS: i64 = 3650;
pub const MAX_REDIRECT_SECS: u64 = 3600;
pub const MAX_TIMEOUT_SECS: u64 = 3600;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Terminal Kanban board for the tasks API", long_about = None)]
pub struct Args {
    /// Base URL of the server exposing /api/tasks
    #[arg(long, env = "TASKBOARD_API_URL")]
    pub api_url: Option<String>,

    /// JSON config file; flags and env vars override its values
    #[arg(short, long, env = "TASKBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to open first, e.g. "/" or "/task/12"
    #[arg(short, long, default_value = "/")]
    pub path: String,

    /// Card titles longer than this are cut with "..."
    #[arg(long)]
    pub title_limit: Option<usize>,

    /// Request timeout in seconds; transport default when unset
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long, env = "TASKBOARD_LOG_FILE", default_value = "taskboard.log")]
    pub log_file: PathBuf,
}

/// Values read from the optional config file. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub title_limit: Option<usize>,
    pub upcoming_days: Option<i64>,
    pub redirect_secs: Option<u64>,
    pub tick_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub title_limit: usize,
    pub upcoming_window: chrono::Duration,
    pub redirect_delay: Duration,
    pub tick_rate: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            title_limit: DEFAULT_TITLE_LIMIT,
            upcoming_window: chrono::Duration::days(DEFAULT_UPCOMING_DAYS),
            redirect_delay: Duration::from_secs(DEFAULT_REDIRECT_SECS),
            tick_rate: Duration::from_millis(DEFAULT_TICK_MS),
            request_timeout: None,
        }
    }
}

impl Config {
    /// Defaults, then the config file, then flags and env.
    pub fn resolve(args: &Args) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let mut config = Config::default();

        if let Some(url) = args.api_url.as_deref().or(file.api_url.as_deref()) {
            config.api_url =
                Url::parse(url).with_context(|| format!("invalid API URL {url:?}"))?;
        }
        if let Some(limit) = args.title_limit.or(file.title_limit) {
            anyhow::ensure!(limit > 0, "title limit must be positive");
            config.title_limit = limit;
        }
        if let Some(days) = file.upcoming_days {
            anyhow::ensure!(
                (0..=MAX_UPCOMING_DAYS).contains(&days),
                "upcoming_days must be between 0 and {MAX_UPCOMING_DAYS}, got {days}"
            );
            config.upcoming_window = chrono::Duration::days(days);
        }
        if let Some(secs) = file.redirect_secs {
            anyhow::ensure!(
                secs <= MAX_REDIRECT_SECS,
                "redirect_secs must be at most {MAX_REDIRECT_SECS}, got {secs}"
            );
            config.redirect_delay = Duration::from_secs(secs);
        }
        if let Some(ms) = file.tick_ms {
            config.tick_rate = Duration::from_millis(ms.max(10));
        }
        if let Some(secs) = args.timeout.or(file.timeout_secs) {
            anyhow::ensure!(
                secs <= MAX_TIMEOUT_SECS,
                "timeout must be at most {MAX_TIMEOUT_SECS} seconds, got {secs}"
            );
            config.request_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}
