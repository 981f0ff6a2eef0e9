use std::collections::HashMap;
use std::time::Instant;

use crate::scanning::scan_event::ScanEvent;

/// Cross-cutting observer for scan loop events.
///
/// Decouples the scan controller from specific output mechanisms
/// (stdout, log crate, a GUI later) so callers can watch the loop
/// without changing the orchestration code.
pub trait ScanObserver: Send {
    /// Called once per completed tick with the number of faces seen.
    fn tick(&mut self, faces: usize);

    /// Called for each recognized face in a tick.
    fn matched(&mut self, event: &ScanEvent);

    /// Called when a tick fails; the loop keeps running.
    fn tick_error(&mut self, message: &str);

    /// Human-readable loop status, e.g. why the loop ended.
    fn status(&mut self, message: &str);

    /// Emit an end-of-scan summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent observer that discards all events. For tests and callers
/// with their own reporting.
pub struct NullScanObserver;

impl ScanObserver for NullScanObserver {
    fn tick(&mut self, _faces: usize) {}
    fn matched(&mut self, _event: &ScanEvent) {}
    fn tick_error(&mut self, _message: &str) {}
    fn status(&mut self, _message: &str) {}
}

/// Observer that reports through the `log` crate and keeps per-label
/// match counts for a completion summary.
pub struct LogScanObserver {
    started: Instant,
    ticks: usize,
    match_counts: HashMap<String, usize>,
}

impl LogScanObserver {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            ticks: 0,
            match_counts: HashMap::new(),
        }
    }

    /// Formatted summary, or `None` when no ticks ran.
    pub fn summary_string(&self) -> Option<String> {
        if self.ticks == 0 {
            return None;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!("Scan summary ({} ticks, {elapsed:.1}s):", self.ticks)];

        let mut labels: Vec<_> = self.match_counts.keys().collect();
        labels.sort();
        for label in labels {
            lines.push(format!("  {label}: {} matches", self.match_counts[label]));
        }
        if self.match_counts.is_empty() {
            lines.push("  no matches".to_string());
        }
        Some(lines.join("\n"))
    }
}

impl Default for LogScanObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanObserver for LogScanObserver {
    fn tick(&mut self, faces: usize) {
        self.ticks += 1;
        log::debug!("Scan tick {}: {faces} face(s)", self.ticks);
    }

    fn matched(&mut self, event: &ScanEvent) {
        *self.match_counts.entry(event.label.clone()).or_default() += 1;
        if event.high_confidence {
            log::info!(
                "Recognized {} (distance {:.3}, high confidence)",
                event.label,
                event.distance
            );
        } else {
            log::info!("Recognized {} (distance {:.3})", event.label, event.distance);
        }
    }

    fn tick_error(&mut self, message: &str) {
        log::warn!("Scan tick failed: {message}");
    }

    fn status(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
