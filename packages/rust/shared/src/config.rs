//! Application configuration for Tramitero.
//!
//! User config lives at `~/.tramitero/tramitero.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are referenced by environment-variable name and never stored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TramiteroError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tramitero.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tramitero";

// ---------------------------------------------------------------------------
// Config structs (matching tramitero.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Vector index (Chroma server) settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Embeddings endpoint settings.
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Groq completion settings.
    #[serde(default)]
    pub groq: GroqConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Number of documents retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the Chroma server.
    #[serde(default = "default_index_url")]
    pub base_url: String,

    /// Collection holding the trámite documents.
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: default_index_url(),
            collection: default_collection(),
        }
    }
}

fn default_index_url() -> String {
    "http://localhost:8000".into()
}
fn default_collection() -> String {
    "tramites".into()
}

/// `[embeddings]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Base URL of an OpenAI-compatible embeddings endpoint.
    #[serde(default = "default_embeddings_url")]
    pub base_url: String,

    /// Embedding model name. Changing this invalidates the published index;
    /// re-ingest after switching models.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Name of the env var holding the API key, if the endpoint needs one.
    #[serde(default = "default_embeddings_key_env")]
    pub api_key_env: String,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: default_embeddings_url(),
            model: default_embedding_model(),
            api_key_env: default_embeddings_key_env(),
        }
    }
}

fn default_embeddings_url() -> String {
    "http://localhost:8080/v1".into()
}
fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".into()
}
fn default_embeddings_key_env() -> String {
    "EMBEDDINGS_API_KEY".into()
}

/// `[groq]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    /// Base URL of the OpenAI-compatible completion endpoint.
    #[serde(default = "default_groq_url")]
    pub base_url: String,

    /// Completion model used for query rewriting and answering.
    #[serde(default = "default_groq_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_groq_key_env")]
    pub api_key_env: String,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: default_groq_url(),
            model: default_groq_model(),
            api_key_env: default_groq_key_env(),
        }
    }
}

fn default_groq_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_groq_model() -> String {
    "llama3-8b-8192".into()
}
fn default_groq_key_env() -> String {
    "GROQ_API_KEY".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tramitero/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TramiteroError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tramitero/tramitero.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TramiteroError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TramiteroError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TramiteroError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TramiteroError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TramiteroError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the Groq API key env var is set and non-empty.
pub fn validate_groq_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.groq.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(TramiteroError::config(format!(
            "Groq API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://console.groq.com/keys"
        ))),
    }
}
