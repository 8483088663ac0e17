use anyhow::Result;
use clap::{Arg, Command};
use std::sync::Arc;
use tracing::{info, warn};

use vidscribe::api::start_http_server;
use vidscribe::config::Config;
use vidscribe::db::SupabaseDb;
use vidscribe::frames::VideoFrameSampler;
use vidscribe::pipeline::UploadPipeline;
use vidscribe::storage::SupabaseStorage;
use vidscribe::transcription::WhisperEngine;

/// Default log filter; `RUST_LOG` takes precedence when set
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "vidscribe=debug,tower_http=debug,info"
    } else {
        "vidscribe=info,tower_http=info,warn"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("vidscribe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Video upload transcription and frame archival service")
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("ADDR")
                .help("Address to bind the HTTP server to"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to listen on"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize logging
    let verbose = matches.get_flag("verbose");
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_filter(verbose).to_string()),
        )
        .init();

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }

    if let Some(port) = matches.get_one::<String>("port") {
        config.server.port = port.parse()?;
    }

    config.validate()?;

    info!("vidscribe starting on {}:{}", config.server.host, config.server.port);
    info!("Whisper model: {}", config.transcription.model);
    info!("Frame bucket: {}", config.storage.bucket);

    // Wire up the pipeline collaborators
    let engine = Arc::new(WhisperEngine::new(config.transcription.clone()));
    let storage = Arc::new(SupabaseStorage::new(config.storage.clone())?);
    let sampler = Arc::new(VideoFrameSampler::new(storage));
    let db = Arc::new(SupabaseDb::new(config.database.clone())?);

    let pipeline = Arc::new(UploadPipeline::new(engine, sampler, db));

    start_http_server(pipeline, Arc::new(config)).await
}
