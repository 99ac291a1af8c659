use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum chunk length handed to the speech-to-text service, in seconds.
    pub max_chunk_secs: u64,
    pub stt: SttConfig,
    pub summarizer: SummarizerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SttConfig {
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub model: String,
    /// System prompt steering the note style.
    pub system_prompt: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
