//! eumetsat2ani: EUMETSAT products to an animated GIF.
//!
//! Searches the EUMETSAT Data Store for products of a collection in a time
//! window over a named area, downloads them, renders each into a captioned
//! image and combines the images into a looping animation. Everything is
//! cached under the root directory, so re-running with the same parameters
//! only redoes what is missing.

mod config;
mod inspect;
mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use archive::{CancellationToken, Credentials, DataStoreClient, DataStoreConfig};
use clap::Parser;
use renderer::{frame_duration_from_secs, CaptionFont, SceneRenderer};
use sat_common::TimeWindow;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::{load_area_catalog, CollectionsConfig};
use pipeline::{log_summary, Pipeline, RunParams, RunSummary};

/// Exit status after a second interrupt (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "eumetsat2ani")]
#[command(about = "Download EUMETSAT satellite products and animate them")]
struct Args {
    /// Data Store API key
    #[arg(long, env = "EUMETSAT_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Data Store API secret
    #[arg(long, env = "EUMETSAT_API_SECRET", hide_env_values = true)]
    api_secret: String,

    /// Collection to search
    #[arg(short, long, default_value = "EO:EUM:DAT:MSG:HRSEVIRI")]
    collection: String,

    /// Start of the time window (ISO 8601, UTC)
    #[arg(short, long, default_value = "2015-04-14T09:00:00")]
    start: String,

    /// End of the time window (ISO 8601, UTC)
    #[arg(short, long, default_value = "2015-04-14T13:00:00")]
    end: String,

    /// Named area to render onto
    #[arg(short, long, default_value = "euro")]
    area: String,

    /// Directory for downloads, images and the animation
    #[arg(short, long, default_value = "data")]
    root: PathBuf,

    /// Product (composite) to render
    #[arg(short, long, default_value = "natural_color")]
    product: String,

    /// Seconds each frame is shown
    #[arg(long, default_value = "0.5")]
    frame_duration: f64,

    /// Open an interactive prompt when the run fails
    #[arg(long)]
    inspect_on_error: bool,

    /// Configuration directory (contains areas.yaml and collections.yaml)
    #[arg(long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// TrueType font for captions (default: first system font found)
    #[arg(long, env = "CAPTION_FONT")]
    font: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Data Store base URL
    #[arg(long, env = "EUMETSAT_API_URL", default_value = archive::datastore::DEFAULT_BASE_URL)]
    api_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "600")]
    request_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_tracing(&args)?;

    let params = RunParams {
        credentials: Credentials::new(args.api_key.clone(), args.api_secret.clone()),
        collection_id: args.collection.clone(),
        window: TimeWindow::parse(&args.start, &args.end).context("Invalid time window")?,
        area: args.area.clone(),
        root: args.root.clone(),
        product: args.product.clone(),
        frame_duration: frame_duration_from_secs(args.frame_duration)?,
    };

    info!(
        collection = %params.collection_id,
        product = %params.product,
        area = %params.area,
        start = %params.window.start,
        end = %params.window.end,
        output = %params.animation_path().display(),
        "Starting eumetsat2ani"
    );

    // First Ctrl+C cancels the run, a second one exits immediately
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Received interrupt, cancelling (press Ctrl+C again to exit)");
        trigger.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received second interrupt, exiting");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    match run(&args, &params, &cancel).await {
        Ok(summary) => {
            log_summary(&summary);
            Ok(())
        }
        Err(e) => {
            if args.inspect_on_error {
                inspect::inspect_error(&e, &params)?;
            }
            Err(e)
        }
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}

/// Load configuration and run the pipeline.
async fn run(args: &Args, params: &RunParams, cancel: &CancellationToken) -> Result<RunSummary> {
    let catalog = load_area_catalog(&args.config_dir)?;

    let collections = CollectionsConfig::load_from_dir(&args.config_dir)?;
    let registry = collections.build_registry()?;

    let font = CaptionFont::locate(args.font.as_deref()).context("Failed to load caption font")?;
    info!(font = %font.path().display(), "Using caption font");

    let renderer = SceneRenderer::new(registry, Arc::new(font))
        .with_warning_filter(collections.warning_filter());

    let client = DataStoreClient::new(DataStoreConfig {
        base_url: args.api_url.clone(),
        request_timeout: Duration::from_secs(args.request_timeout),
        ..Default::default()
    })?;

    Pipeline::new(client, renderer, catalog)
        .run(params, cancel)
        .await
}
