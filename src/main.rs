use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use voxnotes::pipeline::PollPolicy;
use voxnotes::{
    create_router, AppState, Config, HttpSpeechToText, HttpSummarizer, SessionConfig, Store,
};

#[derive(Debug, Parser)]
#[command(name = "voxnotes", about = "Voice recordings to structured notes")]
struct Args {
    /// Config file (without extension), as understood by the config crate
    #[arg(long, default_value = "config/voxnotes")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);

    let store = Store::open(&cfg.storage.db_path)?;

    let stt = Arc::new(HttpSpeechToText::new(
        cfg.pipeline.stt.base_url.clone(),
        api_key(&cfg.pipeline.stt.api_key_env),
    ));
    let summarizer = Arc::new(HttpSummarizer::new(
        cfg.pipeline.summarizer.base_url.clone(),
        api_key(&cfg.pipeline.summarizer.api_key_env),
        cfg.pipeline.summarizer.model.clone(),
    ));

    let session_config = SessionConfig {
        max_chunk_secs: cfg.pipeline.max_chunk_secs,
        poll: PollPolicy {
            interval: Duration::from_millis(cfg.pipeline.stt.poll_interval_ms),
            max_attempts: cfg.pipeline.stt.max_poll_attempts,
        },
        system_prompt: cfg.pipeline.summarizer.system_prompt.clone(),
    };

    let state = AppState::new(store, stt, summarizer, session_config);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state)).await?;

    Ok(())
}

fn api_key(env_var: &str) -> String {
    match std::env::var(env_var) {
        Ok(key) => key,
        Err(_) => {
            warn!("{} is not set; remote service calls will be rejected", env_var);
            String::new()
        }
    }
}
