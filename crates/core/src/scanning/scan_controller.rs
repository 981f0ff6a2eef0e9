use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::capture::domain::frame_source::FrameSource;
use crate::recognition::domain::descriptor_source::DescriptorSource;
use crate::recognition::domain::matcher::Matcher;
use crate::scanning::scan_event::ScanEvent;
use crate::scanning::scan_observer::ScanObserver;
use crate::shared::constants::{DEFAULT_ALERT_MARGIN, DEFAULT_SCAN_PERIOD_MS};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("No enrollments to match against")]
    NoEnrollments,

    #[error("A scan is already running")]
    AlreadyScanning,

    #[error("No scan is running")]
    NotScanning,

    #[error("Scan worker panicked")]
    WorkerPanicked,
}

/// Tuning for the scan loop.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// Target time between tick starts. A tick that overruns the period
    /// starts the next one immediately; ticks never overlap.
    pub period: Duration,
    /// Margin below the match threshold for flagging high confidence.
    pub alert_margin: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(DEFAULT_SCAN_PERIOD_MS),
            alert_margin: DEFAULT_ALERT_MARGIN,
        }
    }
}

/// The capture and inference handles the scan loop borrows for its
/// lifetime. `stop` returns them so the caller can reuse the sessions.
pub struct ScanSources {
    pub frame_source: Box<dyn FrameSource>,
    pub descriptor_source: Box<dyn DescriptorSource>,
}

struct Worker {
    cancelled: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    cancel_tx: crossbeam_channel::Sender<()>,
    handle: std::thread::JoinHandle<ScanSources>,
}

/// Owns the periodic scan loop: a single worker thread that grabs a
/// frame, detects and classifies every face, and reports to an
/// observer.
///
/// Ticks are serialized on the worker thread. Stopping bumps a
/// generation counter first, so a tick already in flight is discarded
/// instead of reported after the stop.
pub struct ScanController {
    generation: Arc<AtomicU64>,
    worker: Option<Worker>,
}

impl ScanController {
    pub fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    /// Whether a scan has been started and not yet stopped.
    pub fn is_scanning(&self) -> bool {
        self.worker.is_some()
    }

    /// Whether the worker thread is still ticking. Goes false on its
    /// own when the frame source is exhausted.
    pub fn is_active(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| worker.active.load(Ordering::Relaxed))
    }

    /// Start the scan loop on a worker thread.
    ///
    /// Refuses to start while a scan is running, and refuses an empty
    /// matcher since every face would be unknown.
    pub fn start(
        &mut self,
        sources: ScanSources,
        matcher: Matcher,
        observer: Box<dyn ScanObserver>,
        config: ScanConfig,
    ) -> Result<(), ScanError> {
        if self.worker.is_some() {
            return Err(ScanError::AlreadyScanning);
        }
        if matcher.is_empty() {
            return Err(ScanError::NoEnrollments);
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicBool::new(true));
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(1);

        let handle = spawn_worker(
            sources,
            matcher,
            observer,
            config,
            cancelled.clone(),
            active.clone(),
            self.generation.clone(),
            cancel_rx,
        );

        self.worker = Some(Worker {
            cancelled,
            active,
            cancel_tx,
            handle,
        });
        Ok(())
    }

    /// Stop the loop and return the sources for reuse.
    ///
    /// The generation bump happens before signalling the worker, so a
    /// tick racing the stop can never be reported afterwards.
    pub fn stop(&mut self) -> Result<ScanSources, ScanError> {
        let worker = self.worker.take().ok_or(ScanError::NotScanning)?;

        self.generation.fetch_add(1, Ordering::SeqCst);
        worker.cancelled.store(true, Ordering::SeqCst);
        let _ = worker.cancel_tx.try_send(());

        worker.handle.join().map_err(|_| ScanError::WorkerPanicked)
    }
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_worker(
    mut sources: ScanSources,
    matcher: Matcher,
    mut observer: Box<dyn ScanObserver>,
    config: ScanConfig,
    cancelled: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    cancel_rx: crossbeam_channel::Receiver<()>,
) -> std::thread::JoinHandle<ScanSources> {
    std::thread::spawn(move || {
        run_scan_loop(
            &mut sources,
            &matcher,
            observer.as_mut(),
            &config,
            &cancelled,
            &generation,
            &cancel_rx,
        );
        observer.summary();
        active.store(false, Ordering::Relaxed);
        sources
    })
}

fn run_scan_loop(
    sources: &mut ScanSources,
    matcher: &Matcher,
    observer: &mut dyn ScanObserver,
    config: &ScanConfig,
    cancelled: &AtomicBool,
    generation: &AtomicU64,
    cancel_rx: &crossbeam_channel::Receiver<()>,
) {
    loop {
        let tick_started = Instant::now();
        let tick_generation = generation.load(Ordering::SeqCst);

        let tick = run_tick(
            sources.frame_source.as_mut(),
            sources.descriptor_source.as_mut(),
            matcher,
            config.alert_margin,
        );

        // A stop may have landed while the tick ran; its results are
        // stale and must not reach the observer.
        if cancelled.load(Ordering::SeqCst)
            || generation.load(Ordering::SeqCst) != tick_generation
        {
            break;
        }

        match tick {
            Ok(Some(report)) => {
                observer.tick(report.faces);
                for event in &report.events {
                    observer.matched(event);
                }
            }
            Ok(None) => {
                observer.status("Frame source exhausted, scan finished");
                break;
            }
            Err(error) => observer.tick_error(&error.to_string()),
        }

        let wait = config.period.saturating_sub(tick_started.elapsed());
        match cancel_rx.recv_timeout(wait) {
            Ok(()) => break,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
        }
    }
}

struct TickReport {
    faces: usize,
    events: Vec<ScanEvent>,
}

/// One scan tick: capture, detect, classify. `Ok(None)` means the frame
/// source is exhausted.
fn run_tick(
    frame_source: &mut dyn FrameSource,
    descriptor_source: &mut dyn DescriptorSource,
    matcher: &Matcher,
    alert_margin: f64,
) -> Result<Option<TickReport>, Box<dyn std::error::Error>> {
    let Some(frame) = frame_source.next_frame()? else {
        return Ok(None);
    };

    let detections = descriptor_source.detect_all(&frame)?;
    let faces = detections.len();
    let mut events = Vec::new();

    for detection in detections {
        let result = matcher.classify(&detection.descriptor);
        if let Some(label) = result.label {
            events.push(ScanEvent {
                label,
                distance: result.distance,
                face: detection.face,
                timestamp: SystemTime::now(),
                high_confidence: matcher.is_high_confidence(result.distance, alert_margin),
            });
        }
    }

    Ok(Some(TickReport { faces, events }))
}
