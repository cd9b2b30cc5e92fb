use anyhow::{Context, Result};
use clap::Parser;
use facesync_core::config::MatcherKind;
use facesync_core::matcher::{CosineMatcher, EuclideanMatcher, Matcher};
use facesync_core::recognizer::{load_gallery, GalleryRecognizer};
use facesync_core::throttle::DetectionThrottle;
use facesync_core::{AttendanceCache, Config, GraceScheduler, Reconciler, SystemClock};
use facesync_erp::ErpClient;
use facesync_feed::JsonLinesSource;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod engine;
mod logging;

use engine::DetectionLoop;

#[derive(Parser)]
#[command(name = "facesyncd", about = "Face recognition attendance daemon")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;
    let _log_guard = logging::init(config.log_file.as_deref());

    tracing::info!(
        erp_url = %config.erp_url,
        camera = %config.camera_id,
        feed = %config.feed,
        "facesyncd starting"
    );

    let api = ErpClient::from_config(&config).context("building ERP client")?;
    let cache = AttendanceCache::load(&config.cache_path);

    let gallery = load_gallery(&config.gallery_dir)?;
    if gallery.is_empty() {
        tracing::warn!(dir = %config.gallery_dir.display(), "no known faces; every face will be unknown");
    }
    let matcher: Box<dyn Matcher> = match config.matcher {
        MatcherKind::Euclidean => Box::new(EuclideanMatcher {
            tolerance: config.match_tolerance,
        }),
        MatcherKind::Cosine => Box::new(CosineMatcher {
            threshold: config.match_tolerance,
        }),
    };

    let grace = chrono::Duration::from_std(config.grace_period).context("grace_period_minutes out of range")?;
    let interval =
        chrono::Duration::from_std(config.check_interval).context("check_interval_seconds out of range")?;

    let mut detection_loop = DetectionLoop::new(
        Reconciler::new(api, cache),
        GalleryRecognizer::new(gallery, matcher),
        GraceScheduler::new(grace),
        DetectionThrottle::new(interval),
        SystemClock,
    );
    let mut feed = JsonLinesSource::open(&config.feed)?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("installing signal handler")?;

    tracing::info!("facesyncd ready");
    let stats = detection_loop.run(&mut feed, &stop)?;
    tracing::info!(
        frames = stats.frames,
        detections = stats.detections,
        closed_out = stats.closed_out,
        "facesyncd shutting down"
    );

    Ok(())
}
