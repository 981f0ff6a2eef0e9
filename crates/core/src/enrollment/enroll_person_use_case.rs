use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::enrollment::domain::blob_store::BlobStore;
use crate::enrollment::domain::enrollment_store::EnrollmentStore;
use crate::recognition::domain::descriptor_source::DescriptorSource;
use crate::shared::constants::{ENROLL_ATTEMPTS_PER_SAMPLE, MAX_SAMPLE_COUNT, MIN_SAMPLE_COUNT};
use crate::shared::descriptor::Descriptor;

/// Enrollment failures a caller can act on.
#[derive(Debug, thiserror::Error)]
pub enum EnrollError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Detection too unreliable: collected {collected} of {required} required samples")]
    DetectionUnreliable { collected: usize, required: usize },

    #[error("Failed to persist enrollment: {0}")]
    Persist(String),
}

/// What an enrollment run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrollmentOutcome {
    /// Samples appended in this run.
    pub appended: usize,
    /// Total samples on record for the person afterwards.
    pub total_samples: usize,
}

/// Collects descriptor samples for one person and commits them to the
/// store.
///
/// Frames are sampled with a fixed attempt budget so an empty or
/// faceless source terminates instead of spinning. The run succeeds when
/// at least 60 percent of the requested samples were collected; below
/// that nothing is persisted, so a failed run never pollutes the store.
pub struct EnrollPersonUseCase {
    sample_delay: Duration,
    on_progress: Option<Box<dyn Fn(usize, usize) + Send>>,
}

impl EnrollPersonUseCase {
    pub fn new(sample_delay: Duration) -> Self {
        Self {
            sample_delay,
            on_progress: None,
        }
    }

    /// Register a `(collected, target)` callback fired after each
    /// captured sample.
    pub fn with_progress(mut self, on_progress: Box<dyn Fn(usize, usize) + Send>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn execute(
        &self,
        frame_source: &mut dyn FrameSource,
        descriptor_source: &mut dyn DescriptorSource,
        store: &mut EnrollmentStore,
        blob_store: &mut dyn BlobStore,
        name: &str,
        target_samples: usize,
    ) -> Result<EnrollmentOutcome, EnrollError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EnrollError::EmptyName);
        }

        let target = target_samples.clamp(MIN_SAMPLE_COUNT, MAX_SAMPLE_COUNT);
        let budget = target * ENROLL_ATTEMPTS_PER_SAMPLE;

        let mut collected: Vec<Descriptor> = Vec::with_capacity(target);
        for attempt in 0..budget {
            if collected.len() >= target {
                break;
            }
            if attempt > 0 && !self.sample_delay.is_zero() {
                std::thread::sleep(self.sample_delay);
            }

            let frame = match frame_source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(error) => {
                    log::debug!("Frame capture failed during enrollment: {error}");
                    continue;
                }
            };

            match descriptor_source.detect_single_best(&frame) {
                Ok(Some(descriptor)) => {
                    collected.push(descriptor);
                    if let Some(on_progress) = &self.on_progress {
                        on_progress(collected.len(), target);
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    log::debug!("Detection failed during enrollment: {error}");
                }
            }
        }

        let required = required_samples(target);
        if collected.len() < required {
            return Err(EnrollError::DetectionUnreliable {
                collected: collected.len(),
                required,
            });
        }

        let appended = collected.len();
        store.append(name, collected);
        store
            .save(blob_store)
            .map_err(|error| EnrollError::Persist(error.to_string()))?;

        let total_samples = store
            .get(name)
            .map(|enrollment| enrollment.sample_count())
            .unwrap_or(appended);
        Ok(EnrollmentOutcome {
            appended,
            total_samples,
        })
    }
}

/// Minimum captured samples for a run to count: 60 percent of the
/// target, rounded up.
fn required_samples(target: usize) -> usize {
    (target * 3).div_ceil(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::infrastructure::memory_blob_store::MemoryBlobStore;
    use crate::recognition::domain::descriptor_source::Detection;
    use crate::shared::constants::ENROLLMENT_STORAGE_KEY;
    use crate::shared::frame::Frame;

    // --- Stubs ---

    /// Endless supply of identical frames.
    struct EndlessFrames;

    impl FrameSource for EndlessFrames {
        fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            Ok(Some(Frame::new(vec![0u8; 4 * 4 * 3], 4, 4)))
        }
    }

    /// Finite supply of frames, then exhaustion.
    struct FiniteFrames {
        remaining: usize,
    }

    impl FrameSource for FiniteFrames {
        fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(Frame::new(vec![0u8; 4 * 4 * 3], 4, 4)))
        }
    }

    /// Detects a face on every n-th call, misses otherwise.
    struct ScheduledDetector {
        calls: usize,
        hit_every: usize,
    }

    impl ScheduledDetector {
        fn new(hit_every: usize) -> Self {
            Self {
                calls: 0,
                hit_every,
            }
        }
    }

    impl DescriptorSource for ScheduledDetector {
        fn detect_single_best(
            &mut self,
            _frame: &Frame,
        ) -> Result<Option<Descriptor>, Box<dyn std::error::Error>> {
            self.calls += 1;
            if self.calls % self.hit_every == 0 {
                Ok(Some(Descriptor::new(vec![self.calls as f32, 0.0])))
            } else {
                Ok(None)
            }
        }

        fn detect_all(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            unimplemented!("not used by enrollment")
        }
    }

    struct NeverDetects;

    impl DescriptorSource for NeverDetects {
        fn detect_single_best(
            &mut self,
            _frame: &Frame,
        ) -> Result<Option<Descriptor>, Box<dyn std::error::Error>> {
            Ok(None)
        }

        fn detect_all(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Ok(Vec::new())
        }
    }

    fn use_case() -> EnrollPersonUseCase {
        EnrollPersonUseCase::new(Duration::ZERO)
    }

    // --- Tests ---

    #[test]
    fn test_collects_target_samples_and_persists() {
        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();

        let outcome = use_case()
            .execute(
                &mut EndlessFrames,
                &mut ScheduledDetector::new(1),
                &mut store,
                &mut blob_store,
                "Alice",
                5,
            )
            .unwrap();

        assert_eq!(outcome.appended, 5);
        assert_eq!(outcome.total_samples, 5);
        assert_eq!(store.get("Alice").unwrap().sample_count(), 5);

        let persisted = EnrollmentStore::load(&blob_store);
        assert_eq!(persisted.get("Alice").unwrap().sample_count(), 5);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();

        let result = use_case().execute(
            &mut EndlessFrames,
            &mut ScheduledDetector::new(1),
            &mut store,
            &mut blob_store,
            "   ",
            5,
        );
        assert!(matches!(result, Err(EnrollError::EmptyName)));
    }

    #[test]
    fn test_name_is_trimmed_before_storing() {
        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();

        use_case()
            .execute(
                &mut EndlessFrames,
                &mut ScheduledDetector::new(1),
                &mut store,
                &mut blob_store,
                "  Alice  ",
                5,
            )
            .unwrap();
        assert!(store.get("Alice").is_some());
    }

    #[test]
    fn test_sample_count_is_clamped_to_range() {
        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();

        // Asking for 1 is clamped up to the minimum of 3
        let low = use_case()
            .execute(
                &mut EndlessFrames,
                &mut ScheduledDetector::new(1),
                &mut store,
                &mut blob_store,
                "Low",
                1,
            )
            .unwrap();
        assert_eq!(low.appended, 3);

        // Asking for 100 is clamped down to the maximum of 15
        let high = use_case()
            .execute(
                &mut EndlessFrames,
                &mut ScheduledDetector::new(1),
                &mut store,
                &mut blob_store,
                "High",
                100,
            )
            .unwrap();
        assert_eq!(high.appended, 15);
    }

    #[test]
    fn test_misses_within_budget_still_succeed() {
        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();

        // Hit every 2nd attempt: 5 samples need 10 attempts, budget is 30
        let outcome = use_case()
            .execute(
                &mut EndlessFrames,
                &mut ScheduledDetector::new(2),
                &mut store,
                &mut blob_store,
                "Alice",
                5,
            )
            .unwrap();
        assert_eq!(outcome.appended, 5);
    }

    #[test]
    fn test_unreliable_detection_fails_without_mutating_store() {
        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();
        let before = blob_store.get(ENROLLMENT_STORAGE_KEY).unwrap();

        let result = use_case().execute(
            &mut EndlessFrames,
            &mut NeverDetects,
            &mut store,
            &mut blob_store,
            "Alice",
            5,
        );

        match result {
            Err(EnrollError::DetectionUnreliable {
                collected,
                required,
            }) => {
                assert_eq!(collected, 0);
                assert_eq!(required, 3);
            }
            other => panic!("Expected DetectionUnreliable, got {other:?}"),
        }
        assert!(store.is_empty());
        assert_eq!(blob_store.get(ENROLLMENT_STORAGE_KEY).unwrap(), before);
    }

    #[test]
    fn test_partial_success_above_floor_commits() {
        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();

        // Hit every 9th attempt: with a budget of 30 for target 5, only
        // 3 samples land. That meets the 60 percent floor of 3.
        let outcome = use_case()
            .execute(
                &mut EndlessFrames,
                &mut ScheduledDetector::new(9),
                &mut store,
                &mut blob_store,
                "Alice",
                5,
            )
            .unwrap();
        assert_eq!(outcome.appended, 3);
        assert_eq!(store.get("Alice").unwrap().sample_count(), 3);
    }

    #[test]
    fn test_exhausted_frame_source_fails_below_floor() {
        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();

        // Only two frames available, all detecting; target 5 needs 3
        let result = use_case().execute(
            &mut FiniteFrames { remaining: 2 },
            &mut ScheduledDetector::new(1),
            &mut store,
            &mut blob_store,
            "Alice",
            5,
        );
        assert!(matches!(
            result,
            Err(EnrollError::DetectionUnreliable {
                collected: 2,
                required: 3
            })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_repeat_enrollment_appends_to_same_name() {
        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();

        let first = use_case()
            .execute(
                &mut EndlessFrames,
                &mut ScheduledDetector::new(1),
                &mut store,
                &mut blob_store,
                "Alice",
                3,
            )
            .unwrap();
        assert_eq!(first.total_samples, 3);

        let second = use_case()
            .execute(
                &mut EndlessFrames,
                &mut ScheduledDetector::new(1),
                &mut store,
                &mut blob_store,
                "Alice",
                4,
            )
            .unwrap();
        assert_eq!(second.appended, 4);
        assert_eq!(second.total_samples, 7);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_progress_callback_reports_each_sample() {
        use std::sync::{Arc, Mutex};

        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();

        EnrollPersonUseCase::new(Duration::ZERO)
            .with_progress(Box::new(move |collected, target| {
                calls_clone.lock().unwrap().push((collected, target));
            }))
            .execute(
                &mut EndlessFrames,
                &mut ScheduledDetector::new(1),
                &mut store,
                &mut blob_store,
                "Alice",
                3,
            )
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_frame_errors_consume_budget_but_do_not_abort() {
        struct FlakyFrames {
            calls: usize,
        }

        impl FrameSource for FlakyFrames {
            fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
                self.calls += 1;
                if self.calls % 2 == 0 {
                    Err("camera glitch".into())
                } else {
                    Ok(Some(Frame::new(vec![0u8; 4 * 4 * 3], 4, 4)))
                }
            }
        }

        let mut store = EnrollmentStore::new();
        let mut blob_store = MemoryBlobStore::new();

        let outcome = use_case()
            .execute(
                &mut FlakyFrames { calls: 0 },
                &mut ScheduledDetector::new(1),
                &mut store,
                &mut blob_store,
                "Alice",
                5,
            )
            .unwrap();
        assert_eq!(outcome.appended, 5);
    }
}
