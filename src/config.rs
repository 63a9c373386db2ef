use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    // Host address to listen on
    pub host: String,
    // Port to listen on
    pub port: u16,
    // Number of http workers, defaults to the number of cores
    pub workers: Option<usize>,
    // Directory holding the dashboard & error pages
    pub static_dir: PathBuf,
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        toml::ser::to_string_pretty(self)
            .map_err(|_| fmt::Error)
            .and_then(|value| write!(f, "{}", value))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
            workers: None,
            static_dir: default_static_dir(),
        }
    }
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    // SQLite database file
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stocks.db"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    // Ticker shown on the dashboard and used for announcement listings
    pub symbol: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            symbol: String::from("T"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    Lexicon,
    Remote,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    // Inference endpoint, required for `remote`
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

fn default_classifier_timeout() -> u64 {
    5000
}

fn default_retries() -> u32 {
    2
}

fn default_backoff() -> u64 {
    250
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::Lexicon,
            endpoint: None,
            api_token: None,
            timeout_ms: default_classifier_timeout(),
            retries: default_retries(),
            backoff_ms: default_backoff(),
        }
    }
}

/// What to do with a submission when the classifier cannot answer
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    Reject,
    KeywordsOnly,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ScorerConfig {
    pub on_classifier_failure: FailurePolicy,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            on_classifier_failure: FailurePolicy::Reject,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MarketDataConfig {
    pub base_url: String,
    // History window & candle size, in the provider's notation
    pub range: String,
    pub interval: String,
    pub timeout_ms: u64,
}

fn default_market_timeout() -> u64 {
    10_000
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://query1.finance.yahoo.com"),
            range: String::from("1mo"),
            interval: String::from("1d"),
            timeout_ms: default_market_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    // One of error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
        }
    }
}

pub fn load_config(config_path: &str) -> Result<Config, String> {
    let mut file_str = String::new();
    let file_path = Path::new(config_path);
    let mut open_file = File::open(file_path).map_err(|e| {
        format!(
            "Could not open file: {file}. Reason: {error}",
            file = config_path,
            error = e
        )
    })?;
    open_file.read_to_string(&mut file_str).map_err(|e| {
        format!(
            "Could not read the config file: {file}. Reason: {error}",
            file = config_path,
            error = e
        )
    })?;
    parse_config(&file_str).map_err(|e| {
        format!(
            "Unable to load config: {file}. Reason: {error}",
            file = config_path,
            error = e
        )
    })
}

fn parse_config(content: &str) -> Result<Config, String> {
    let config: Config = toml::from_str(content).map_err(|e| e.to_string())?;
    if config.classifier.kind == ClassifierKind::Remote && config.classifier.endpoint.is_none() {
        return Err(String::from("classifier.endpoint is required for a remote classifier"));
    }
    Ok(config)
}
