use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};

use facewatch_core::capture::infrastructure::image_dir_frame_source::ImageDirFrameSource;
use facewatch_core::enrollment::domain::enrollment_store::EnrollmentStore;
use facewatch_core::enrollment::enroll_person_use_case::EnrollPersonUseCase;
use facewatch_core::enrollment::infrastructure::file_blob_store::FileBlobStore;
use facewatch_core::recognition::domain::descriptor_source::DescriptorSource;
use facewatch_core::recognition::domain::matcher::Matcher;
use facewatch_core::recognition::infrastructure::onnx_descriptor_source::OnnxDescriptorSource;
use facewatch_core::scanning::scan_controller::{ScanConfig, ScanController, ScanSources};
use facewatch_core::scanning::scan_event::ScanEvent;
use facewatch_core::scanning::scan_observer::ScanObserver;
use facewatch_core::shared::constants::{
    DEFAULT_MATCH_THRESHOLD, DEFAULT_SAMPLE_DELAY_MS, DEFAULT_SCAN_PERIOD_MS,
    DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL,
};
use facewatch_core::shared::model_resolver;

/// Face enrollment and recognition over image frames.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    /// Directory holding the enrollment store (defaults to the platform
    /// data directory).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture descriptor samples from frames and enroll a person.
    Enroll {
        /// Person name to enroll under. Repeating a name adds samples.
        #[arg(long)]
        name: String,

        /// Image file or directory of frames to sample from.
        frames: PathBuf,

        /// Descriptor samples to collect (clamped to 3-15).
        #[arg(long, default_value = "5")]
        samples: usize,

        /// Pause between capture attempts in milliseconds.
        #[arg(long, default_value_t = DEFAULT_SAMPLE_DELAY_MS)]
        sample_delay_ms: u64,

        /// Face detection confidence threshold (0.0-1.0).
        #[arg(long, default_value = "0.5")]
        confidence: f64,
    },

    /// Periodically scan frames and report recognized faces.
    Scan {
        /// Image file or directory of frames to scan.
        frames: PathBuf,

        /// Nearest-neighbor match threshold (inclusive).
        #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
        threshold: f64,

        /// Margin below the threshold for high-confidence alerts.
        #[arg(long, default_value = "0.03")]
        alert_margin: f64,

        /// Time between scan ticks in milliseconds.
        #[arg(long, default_value_t = DEFAULT_SCAN_PERIOD_MS)]
        period_ms: u64,

        /// Face detection confidence threshold (0.0-1.0).
        #[arg(long, default_value = "0.5")]
        confidence: f64,
    },

    /// List enrolled people and their sample counts.
    List,

    /// Delete all enrollments.
    Clear {
        /// Confirm deletion.
        #[arg(long)]
        yes: bool,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut blob_store = open_blob_store(cli.data_dir)?;

    match cli.command {
        Command::Enroll {
            name,
            frames,
            samples,
            sample_delay_ms,
            confidence,
        } => run_enroll(
            &mut blob_store,
            &name,
            &frames,
            samples,
            sample_delay_ms,
            confidence,
        ),
        Command::Scan {
            frames,
            threshold,
            alert_margin,
            period_ms,
            confidence,
        } => run_scan(
            &mut blob_store,
            &frames,
            threshold,
            alert_margin,
            period_ms,
            confidence,
        ),
        Command::List => run_list(&blob_store),
        Command::Clear { yes } => run_clear(&mut blob_store, yes),
    }
}

fn run_enroll(
    blob_store: &mut FileBlobStore,
    name: &str,
    frames: &std::path::Path,
    samples: usize,
    sample_delay_ms: u64,
    confidence: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_confidence(confidence)?;

    let mut frame_source = ImageDirFrameSource::open(frames)?;
    let mut descriptor_source = build_descriptor_source(confidence)?;
    let mut store = EnrollmentStore::load(blob_store);

    let progress: Box<dyn Fn(usize, usize) + Send> = Box::new(|collected, target| {
        eprint!("\rCapturing sample {collected}/{target}");
    });

    let outcome = EnrollPersonUseCase::new(Duration::from_millis(sample_delay_ms))
        .with_progress(progress)
        .execute(
            &mut frame_source,
            descriptor_source.as_mut(),
            &mut store,
            blob_store,
            name,
            samples,
        )?;
    eprintln!();

    log::info!(
        "Enrolled {name}: {} new sample(s), {} total",
        outcome.appended,
        outcome.total_samples
    );
    Ok(())
}

fn run_scan(
    blob_store: &mut FileBlobStore,
    frames: &std::path::Path,
    threshold: f64,
    alert_margin: f64,
    period_ms: u64,
    confidence: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_confidence(confidence)?;
    if threshold <= 0.0 {
        return Err(format!("Threshold must be positive, got {threshold}").into());
    }
    if alert_margin < 0.0 || alert_margin >= threshold {
        return Err(format!(
            "Alert margin must be in [0, threshold), got {alert_margin}"
        )
        .into());
    }

    let store = EnrollmentStore::load(blob_store);
    if store.is_empty() {
        return Err("No enrollments yet; run `facewatch enroll` first".into());
    }
    let matcher = Matcher::new(store.snapshot(), threshold);

    let frame_source = ImageDirFrameSource::open(frames)?;
    let descriptor_source = build_descriptor_source(confidence)?;

    let mut controller = ScanController::new();
    controller.start(
        ScanSources {
            frame_source: Box::new(frame_source),
            descriptor_source,
        },
        matcher,
        Box::new(ConsoleScanObserver::new()),
        ScanConfig {
            period: Duration::from_millis(period_ms),
            alert_margin,
        },
    )?;

    // The loop ends on its own once the frames run out
    while controller.is_active() {
        std::thread::sleep(Duration::from_millis(50));
    }
    controller.stop()?;
    Ok(())
}

fn run_list(blob_store: &FileBlobStore) -> Result<(), Box<dyn std::error::Error>> {
    let store = EnrollmentStore::load(blob_store);
    if store.is_empty() {
        println!("No enrollments.");
        return Ok(());
    }

    for enrollment in store.iter() {
        println!("{}: {} sample(s)", enrollment.name, enrollment.sample_count());
    }
    Ok(())
}

fn run_clear(blob_store: &mut FileBlobStore, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !yes {
        return Err("Refusing to delete enrollments without --yes".into());
    }

    let mut store = EnrollmentStore::load(blob_store);
    let count = store.len();
    store.clear();
    store.save(blob_store)?;
    log::info!("Removed {count} enrollment(s)");
    Ok(())
}

fn open_blob_store(data_dir: Option<PathBuf>) -> Result<FileBlobStore, Box<dyn std::error::Error>> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileBlobStore::default_dir().ok_or("Could not determine data directory")?,
    };
    Ok(FileBlobStore::new(dir))
}

fn build_descriptor_source(
    confidence: f64,
) -> Result<Box<dyn DescriptorSource>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {DETECTOR_MODEL_NAME}");
    let detector_path = model_resolver::resolve(
        DETECTOR_MODEL_NAME,
        DETECTOR_MODEL_URL,
        None,
        Some(Box::new(|d, t| download_progress("face detection", d, t))),
    )?;
    log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
    let embedding_path = model_resolver::resolve(
        EMBEDDING_MODEL_NAME,
        EMBEDDING_MODEL_URL,
        None,
        Some(Box::new(|d, t| download_progress("face embedding", d, t))),
    )?;
    eprintln!();

    Ok(Box::new(OnnxDescriptorSource::new(
        &detector_path,
        &embedding_path,
        confidence,
    )?))
}

fn validate_confidence(confidence: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!("Confidence must be between 0.0 and 1.0, got {confidence}").into());
    }
    Ok(())
}

fn download_progress(what: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {what} model... {pct}%");
    } else {
        eprint!("\rDownloading {what} model... {downloaded} bytes");
    }
    let _ = std::io::stderr().flush();
}

/// Prints recognized faces as they are seen and a summary at the end.
struct ConsoleScanObserver {
    ticks: usize,
    matches: usize,
}

impl ConsoleScanObserver {
    fn new() -> Self {
        Self {
            ticks: 0,
            matches: 0,
        }
    }
}

impl ScanObserver for ConsoleScanObserver {
    fn tick(&mut self, faces: usize) {
        self.ticks += 1;
        eprint!("\rTick {}: {faces} face(s) in frame", self.ticks);
        let _ = std::io::stderr().flush();
    }

    fn matched(&mut self, event: &ScanEvent) {
        self.matches += 1;
        eprintln!();
        if event.high_confidence {
            println!("ALERT: {} (distance {:.3})", event.label, event.distance);
        } else {
            println!("match: {} (distance {:.3})", event.label, event.distance);
        }
    }

    fn tick_error(&mut self, message: &str) {
        eprintln!();
        log::warn!("Scan tick failed: {message}");
    }

    fn status(&mut self, message: &str) {
        eprintln!();
        log::info!("{message}");
    }

    fn summary(&self) {
        eprintln!();
        println!("{} tick(s), {} match(es)", self.ticks, self.matches);
    }
}
