use std::path::PathBuf;

use serde::Deserialize;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// OpenAI-compatible chat completion endpoint (Groq by default).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Bearer token. Optional so local OpenAI-compatible servers work without one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Sampling temperature for answers and extraction.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_chat_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_chat_model() -> String {
    "llama3-70b-8192".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_chat_timeout_secs() -> u64 {
    30
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_base_url(),
            model: default_chat_model(),
            api_key: None,
            temperature: default_temperature(),
            timeout_secs: default_chat_timeout_secs(),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_var("CHAT_BASE_URL").unwrap_or(defaults.base_url),
            model: env_var("CHAT_MODEL").unwrap_or(defaults.model),
            api_key: env_var("GROQ_API_KEY").or_else(|| env_var("CHAT_API_KEY")),
            temperature: env_var("CHAT_TEMPERATURE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.temperature),
            timeout_secs: env_var("CHAT_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

/// OpenAI-compatible `/embeddings` endpoint serving a sentence-embedding model.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_base_url() -> String {
    "http://localhost:8080/v1".into()
}
fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".into()
}
fn default_embedding_timeout_secs() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            api_key: None,
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_var("EMBEDDING_BASE_URL").unwrap_or(defaults.base_url),
            model: env_var("EMBEDDING_MODEL").unwrap_or(defaults.model),
            api_key: env_var("EMBEDDING_API_KEY"),
            timeout_secs: env_var("EMBEDDING_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

/// Index location and retrieval depth.
#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    /// Persisted index artifact (JSON), replaced atomically on every build.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("sheet_index.json")
}
fn default_top_k() -> usize {
    6
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            top_k: default_top_k(),
        }
    }
}

impl RagConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            index_path: env_var("INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_path),
            top_k: env_var("RAG_TOP_K")
                .and_then(|s| s.parse().ok())
                .filter(|k| *k > 0)
                .unwrap_or(defaults.top_k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let chat = ChatConfig::default();
        assert_eq!(chat.model, "llama3-70b-8192");
        assert!((chat.temperature - 0.2).abs() < f32::EPSILON);
        assert!(chat.api_key.is_none());

        let embedding = EmbeddingConfig::default();
        assert_eq!(embedding.model, "sentence-transformers/all-MiniLM-L6-v2");

        let rag = RagConfig::default();
        assert_eq!(rag.top_k, 6);
        assert_eq!(rag.index_path, PathBuf::from("sheet_index.json"));
    }

    #[test]
    fn chat_config_from_toml() {
        let config: ChatConfig = toml::from_str(
            r#"
base_url = "http://localhost:11434/v1"
model = "llama3.1:8b"
temperature = 0.0
"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.model, "llama3.1:8b");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn rag_config_from_toml() {
        let config: RagConfig = toml::from_str(r#"index_path = "/var/lib/sheetdesk/index.json""#).unwrap();
        assert_eq!(config.index_path, PathBuf::from("/var/lib/sheetdesk/index.json"));
        assert_eq!(config.top_k, 6);
    }
}
