use blendx_api::RestApi;
use blendx_core::{BlendConfig, ExtractorConfig};
use blendx_storage::ModelManager;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Recommends tracks that blend well in a DJ set
#[derive(Parser, Debug)]
#[command(name = "blendx")]
#[command(about = "DJ track blending recommender", long_about = None)]
struct Args {
    /// Directory holding the feature table and the trained model
    #[arg(long, env = "DATA_DIR", default_value = "/data")]
    data_dir: PathBuf,

    /// Directory scanned for audio files
    #[arg(long, env = "MUSIC_DIR", default_value = "/music")]
    music_dir: PathBuf,

    /// Feature table path (default: <data-dir>/features.csv)
    #[arg(long)]
    feature_table: Option<PathBuf>,

    /// Model bundle directory (default: <data-dir>/model)
    #[arg(long)]
    bundle_dir: Option<PathBuf>,

    /// Upper bound on neighbours retained by the index
    #[arg(long)]
    k_neighbors_cap: Option<usize>,

    /// Recommendations returned when a query does not ask for a count
    #[arg(long)]
    default_top_n: Option<usize>,

    /// Feature extraction program, run once per audio file
    #[arg(long, env = "BLENDX_EXTRACTOR")]
    extractor: Option<PathBuf>,

    /// Argument passed to the extractor before the audio path (repeatable)
    #[arg(long = "extractor-arg")]
    extractor_args: Vec<String>,

    /// Extraction attempts per track
    #[arg(long)]
    extraction_attempts: Option<u32>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the REST API (default)
    Serve {
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Extract features from the music directory
    BuildFeatures,
    /// Fit and persist a new model
    Train {
        /// Fit on the existing feature table instead of re-extracting
        #[arg(long)]
        no_rebuild: bool,
    },
    /// Print recommendations for a track as JSON
    Recommend {
        filename: String,
        #[arg(long)]
        top_n: Option<usize>,
    },
}

impl Args {
    fn config(&self) -> BlendConfig {
        let mut config = BlendConfig::new(&self.data_dir, &self.music_dir);
        if let Some(path) = &self.feature_table {
            config.feature_table_path = path.clone();
        }
        if let Some(path) = &self.bundle_dir {
            config.bundle_path = path.clone();
        }
        if let Some(cap) = self.k_neighbors_cap {
            config.k_neighbors_cap = cap;
        }
        if let Some(top_n) = self.default_top_n {
            config.default_top_n = top_n;
        }
        if let Some(attempts) = self.extraction_attempts {
            config.extraction_attempts = attempts;
        }
        config.extractor = self.extractor.as_ref().map(|program| ExtractorConfig {
            program: program.clone(),
            args: self.extractor_args.clone(),
        });
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = args.config();
    info!("Data directory: {:?}", config.data_dir);
    info!("Music directory: {:?}", config.music_dir);

    let manager = Arc::new(ModelManager::new(config)?);

    match args.command.unwrap_or(Command::Serve { port: 8000 }) {
        Command::Serve { port } => serve(manager, port).await?,
        Command::BuildFeatures => {
            let summary = tokio::task::spawn_blocking(move || manager.build_features()).await??;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Train { no_rebuild } => {
            let summary = tokio::task::spawn_blocking(move || manager.train(!no_rebuild)).await??;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Recommend { filename, top_n } => {
            let recs = manager.recommend(&filename, top_n)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "query": filename,
                    "recommendations": recs,
                }))?
            );
        }
    }

    Ok(())
}

async fn serve(manager: Arc<ModelManager>, port: u16) -> anyhow::Result<()> {
    info!("Starting BlendX v{}", env!("CARGO_PKG_VERSION"));
    info!("Model trained: {}", manager.is_trained());

    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(manager, port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    info!("HTTP API: http://localhost:{}/", port);

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
    Ok(())
}
