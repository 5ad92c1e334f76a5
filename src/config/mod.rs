use serde::{Deserialize, Serialize};

pub mod sandbox;

pub use sandbox::SandboxConfig;

pub const DEFAULT_CONFIG_PATH: &str = "casebench.toml";

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub logs: LogsConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let cfg = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&cfg)?)
    }

    /// Loads the file if it exists, otherwise falls back to defaults
    /// (in-memory storage, default port).
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    8719
}

#[derive(Deserialize, Debug, Clone, Default, Serialize)]
#[serde(tag = "provider")]
pub enum StorageConfig {
    #[default]
    #[serde(rename = "memory")]
    InMemory,
    #[serde(rename = "mongodb")]
    MongoDb(MongoDbConfig),
}

#[derive(Deserialize, Debug, Clone, Serialize)]
pub struct MongoDbConfig {
    pub connection: String,
    pub db_name: String,
    #[serde(default = "default_test_cases_collection")]
    pub test_cases: String,
    #[serde(default = "default_projects_collection")]
    pub projects: String,
    #[serde(default = "default_environments_collection")]
    pub environments: String,
    #[serde(default = "default_comments_collection")]
    pub comments: String,
}

fn default_test_cases_collection() -> String {
    "testcases".to_string()
}

fn default_projects_collection() -> String {
    "projects".to_string()
}

fn default_environments_collection() -> String {
    "environments".to_string()
}

fn default_comments_collection() -> String {
    "comments".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct LogsConfig {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Historical entries sent when a log stream opens.
    #[serde(default = "default_stream_preload_count")]
    pub stream_preload_count: usize,
    /// Directory for daily rolling log files. Stdout only when unset.
    pub directory: Option<String>,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            level: default_log_level(),
            stream_preload_count: default_stream_preload_count(),
            directory: None,
        }
    }
}

fn default_buffer_capacity() -> usize {
    10_000
}

fn default_stream_preload_count() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}
