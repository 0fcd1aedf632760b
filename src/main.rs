//! text-detector - run brightness-adaptive text detection on one image
//!
//! Prints the detection response as JSON on stdout.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use text_detector::config::{self, AppConfig};
use text_detector::vision::{
    PreprocessingSelection, RecognitionLevel, Recognizer, ReplayRecognizer, UnavailableRecognizer,
};
use text_detector::{DetectRequest, TextDetector};

/// text-detector - multi-pass text detection for overexposed photos
#[derive(Parser, Debug)]
#[command(name = "text-detector")]
#[command(about = "Detect text in bright or washed-out images with multi-pass recognition")]
struct Args {
    /// Image to scan
    image: PathBuf,

    /// Recognition accuracy level (fast or accurate)
    #[arg(long)]
    recognition_level: Option<RecognitionLevel>,

    /// Language hint; repeat for several. Omit for automatic detection
    #[arg(short, long = "language")]
    languages: Vec<String>,

    /// Disable brightness enhancement
    #[arg(long)]
    no_enhance: bool,

    /// Preprocessing level (auto, light, moderate, aggressive)
    #[arg(long)]
    preprocessing_level: Option<PreprocessingSelection>,

    /// Recognize the original image only
    #[arg(long)]
    single_pass: bool,

    /// JSON file with recorded engine observations
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_or_default_config(args.config.as_deref());

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let recognizer: Arc<dyn Recognizer> = match &args.replay {
        Some(path) => Arc::new(ReplayRecognizer::from_file(path)?),
        None => {
            info!("No recognition engine configured");
            Arc::new(UnavailableRecognizer)
        }
    };

    let detector = TextDetector::with_settings(recognizer, config.recognition.clone());
    let request = build_request(&args, &config);

    match detector.detect_text(&request).await {
        Ok(blocks) => {
            println!("{}", serde_json::to_string_pretty(&blocks)?);
            Ok(())
        }
        Err(e) => {
            error!("Text detection failed: {} ({})", e, e.code());
            println!("{}", serde_json::to_string_pretty(&e.to_payload())?);
            std::process::exit(1);
        }
    }
}

/// Load configuration from file or fall back to defaults
fn load_or_default_config(explicit: Option<&Path>) -> AppConfig {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => config::default_config_path().ok().filter(|p| p.exists()),
    };

    // Logging is not set up yet, so problems go straight to stderr
    if let Some(path) = path {
        match config::load_config(&path) {
            Ok(config) => return config,
            Err(e) => eprintln!("Ignoring configuration {:?}: {:#}", path, e),
        }
    }
    AppConfig::default()
}

fn build_request(args: &Args, config: &AppConfig) -> DetectRequest {
    let mut request = DetectRequest::with_defaults(&args.image, &config.detection);
    if let Some(level) = args.recognition_level {
        request.recognition_level = level;
    }
    request.languages = args.languages.clone();
    if args.no_enhance {
        request.enhance_for_brightness = false;
    }
    if let Some(level) = args.preprocessing_level {
        request.preprocessing_level = level;
    }
    if args.single_pass {
        request.multi_pass = false;
    }
    request
}
