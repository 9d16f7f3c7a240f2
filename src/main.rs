use clap::Parser;
use prodsim_api::RestApi;
use prodsim_core::{MatchingConfig, ScoreScale};
use prodsim_storage::{DataConfig, DataManager};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Product similarity, recommendation and matching service
#[derive(Parser, Debug)]
#[command(name = "prodsim")]
#[command(about = "Product similarity and matching service", long_about = None)]
struct Args {
    /// Directory holding the catalog, matching dumps and feedback log
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// HTTP API port
    #[arg(long, default_value_t = 3000)]
    http_port: u16,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Present match scores in 90-99% instead of 60-99%
    #[arg(long)]
    strict_scores: bool,

    /// Random competitors injected into every client bucket
    #[arg(long, default_value_t = 0)]
    distractors: usize,

    /// Seed for distractor injection
    #[arg(long, default_value_t = 42)]
    distractor_seed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    prodsim::logging::init(prodsim::logging::parse_level(&args.log_level))?;

    info!("Starting prodsim v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", args.data_dir);
    info!("HTTP API: {}:{}", args.host, args.http_port);

    let mut config = DataConfig::new(&args.data_dir);
    if args.strict_scores {
        config.presentation = ScoreScale::STRICT;
    }
    config.matching = MatchingConfig {
        distractors_per_client: args.distractors,
        distractor_seed: args.distractor_seed,
    };
    if args.distractors > 0 {
        info!(
            "Injecting {} distractors per client (seed {})",
            args.distractors, args.distractor_seed
        );
    }

    let manager = Arc::new(DataManager::new(config));
    info!("Data manager initialized");

    let manager_http = manager.clone();
    let host = args.host.clone();
    let http_port = args.http_port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on {}:{}", host, http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(manager_http, &host, http_port).await {
                error!("HTTP server error: {}", e);
            }
        })
    });

    info!("prodsim started successfully");
    info!("HTTP API: http://localhost:{}/api/search?q=", args.http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    if let Err(e) = manager.feedback_log().sync() {
        error!("Flushing feedback log failed: {:#}", e);
    }
    Ok(())
}
