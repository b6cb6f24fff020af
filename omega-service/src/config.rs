//! Service configuration.
//!
//! Every setting has a default, so the service starts with no config file at
//! all. See [`loader`] for how file and environment sources are layered.

mod loader;

pub use loader::load_config;

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for the service
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_ollama")]
    pub ollama: OllamaConfig,

    #[serde(default = "default_chain")]
    pub chain: ChainConfig,

    #[serde(default)]
    pub web: WebConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            ollama: default_ollama(),
            chain: default_chain(),
            web: WebConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Upload storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving uploaded report files
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Ollama LLM configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl OllamaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// QA chain configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Feed text-like uploaded reports to the model as context
    #[serde(default = "default_include_reports")]
    pub include_reports: bool,

    /// Upper bound on report characters sent per query
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

/// Static frontend configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebConfig {
    /// Directory with the chat page. Not served when unset.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        upload_dir: default_upload_dir(),
        max_upload_bytes: default_max_upload_bytes(),
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_ollama() -> OllamaConfig {
    OllamaConfig {
        base_url: default_ollama_url(),
        model: default_model(),
        temperature: default_temperature(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_chain() -> ChainConfig {
    ChainConfig {
        system_prompt: default_system_prompt(),
        include_reports: default_include_reports(),
        max_context_chars: default_max_context_chars(),
    }
}

fn default_system_prompt() -> String {
    "You are Dr. Omega, an assistant that reads medical reports uploaded by the user. \
     Identify conditions or diseases the reports suggest, explain findings in plain \
     language, and say clearly when the reports do not contain enough information. \
     Always remind the user to confirm any conclusion with a licensed physician."
        .to_string()
}

fn default_include_reports() -> bool {
    true
}

fn default_max_context_chars() -> usize {
    12_000
}
