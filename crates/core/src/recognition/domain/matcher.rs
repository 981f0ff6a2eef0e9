use crate::shared::descriptor::Descriptor;

/// Result of classifying one descriptor.
///
/// `label` is `None` ("unknown") when the nearest enrolled descriptor is
/// farther than the threshold; `distance` is always the true nearest
/// distance found, never clamped.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceMatch {
    pub label: Option<String>,
    pub distance: f64,
}

impl FaceMatch {
    pub fn is_known(&self) -> bool {
        self.label.is_some()
    }
}

/// Immutable nearest-neighbor classifier built from an enrollment snapshot
/// and a distance threshold.
///
/// Rebuilt wholesale whenever enrollments or the threshold change; there
/// is no incremental update. Classification is deterministic for a given
/// snapshot, threshold, and query.
#[derive(Clone, Debug)]
pub struct Matcher {
    entries: Vec<(String, Descriptor)>,
    threshold: f64,
}

impl Matcher {
    pub fn new(entries: Vec<(String, Descriptor)>, threshold: f64) -> Self {
        Self { entries, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest-neighbor classification with an inclusive threshold.
    ///
    /// The first-encountered minimum wins ties. An empty snapshot yields
    /// unknown at infinite distance.
    pub fn classify(&self, query: &Descriptor) -> FaceMatch {
        let mut best: Option<&str> = None;
        let mut best_distance = f64::INFINITY;

        for (name, descriptor) in &self.entries {
            let distance = query.distance(descriptor);
            if distance < best_distance {
                best_distance = distance;
                best = Some(name);
            }
        }

        let label = if best_distance <= self.threshold {
            best.map(str::to_owned)
        } else {
            None
        };
        FaceMatch {
            label,
            distance: best_distance,
        }
    }

    /// Whether a matched distance clears the stricter alert margin.
    ///
    /// Matches closer than `threshold - alert_margin` are worth surfacing
    /// as events; borderline matches stay in the status line only.
    pub fn is_high_confidence(&self, distance: f64, alert_margin: f64) -> bool {
        distance < self.threshold - alert_margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn descriptor(values: &[f32]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    fn single_entry_matcher(threshold: f64) -> Matcher {
        // d1 at the origin; queries along the x axis have distance |x|
        Matcher::new(
            vec![("Alice".to_string(), descriptor(&[0.0, 0.0]))],
            threshold,
        )
    }

    // ── Classification ──────────────────────────────────────────────

    #[test]
    fn test_within_threshold_returns_nearest_name() {
        let matcher = single_entry_matcher(0.45);
        let result = matcher.classify(&descriptor(&[0.30, 0.0]));
        assert_eq!(result.label.as_deref(), Some("Alice"));
        assert_relative_eq!(result.distance, 0.30, epsilon = 1e-6);
    }

    #[test]
    fn test_beyond_threshold_is_unknown_with_true_distance() {
        let matcher = single_entry_matcher(0.20);
        let result = matcher.classify(&descriptor(&[0.30, 0.0]));
        assert_eq!(result.label, None);
        assert_relative_eq!(result.distance, 0.30, epsilon = 1e-6);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // 0.5 is exact in both f32 and f64, so the boundary comparison
        // is not at the mercy of rounding
        let matcher = single_entry_matcher(0.5);
        let at_boundary = matcher.classify(&descriptor(&[0.5, 0.0]));
        assert_eq!(at_boundary.label.as_deref(), Some("Alice"));

        let just_beyond = matcher.classify(&descriptor(&[0.501, 0.0]));
        assert_eq!(just_beyond.label, None);
    }

    #[test]
    fn test_nearest_of_several_entries_wins() {
        let matcher = Matcher::new(
            vec![
                ("Alice".to_string(), descriptor(&[0.0, 0.0])),
                ("Bob".to_string(), descriptor(&[1.0, 0.0])),
                ("Carol".to_string(), descriptor(&[2.0, 0.0])),
            ],
            10.0,
        );
        let result = matcher.classify(&descriptor(&[0.9, 0.0]));
        assert_eq!(result.label.as_deref(), Some("Bob"));
        assert_relative_eq!(result.distance, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_nearest_name_wins_even_with_many_samples_per_person() {
        // Bob has more samples, but Alice has the single closest one
        let matcher = Matcher::new(
            vec![
                ("Bob".to_string(), descriptor(&[3.0, 0.0])),
                ("Bob".to_string(), descriptor(&[4.0, 0.0])),
                ("Bob".to_string(), descriptor(&[5.0, 0.0])),
                ("Alice".to_string(), descriptor(&[1.0, 0.0])),
            ],
            10.0,
        );
        let result = matcher.classify(&descriptor(&[0.0, 0.0]));
        assert_eq!(result.label.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_tie_first_encountered_wins() {
        let matcher = Matcher::new(
            vec![
                ("First".to_string(), descriptor(&[1.0, 0.0])),
                ("Second".to_string(), descriptor(&[-1.0, 0.0])),
            ],
            2.0,
        );
        let result = matcher.classify(&descriptor(&[0.0, 0.0]));
        assert_eq!(result.label.as_deref(), Some("First"));
    }

    #[test]
    fn test_deterministic_across_repeated_calls() {
        let matcher = Matcher::new(
            vec![
                ("Alice".to_string(), descriptor(&[0.1, 0.2, 0.3])),
                ("Bob".to_string(), descriptor(&[-0.5, 0.4, 0.0])),
            ],
            0.45,
        );
        let query = descriptor(&[0.11, 0.19, 0.31]);
        let first = matcher.classify(&query);
        for _ in 0..10 {
            assert_eq!(matcher.classify(&query), first);
        }
    }

    #[test]
    fn test_empty_snapshot_is_unknown_at_infinite_distance() {
        let matcher = Matcher::new(Vec::new(), 0.45);
        assert!(matcher.is_empty());
        let result = matcher.classify(&descriptor(&[1.0, 2.0]));
        assert_eq!(result.label, None);
        assert!(result.distance.is_infinite());
    }

    // One enrolled descriptor, query at distance 0.30: the threshold
    // alone decides known vs unknown.
    #[rstest]
    #[case::matches_at_default(0.45, Some("Alice"))]
    #[case::unknown_when_strict(0.20, None)]
    fn test_distance_030_scenario(#[case] threshold: f64, #[case] expected: Option<&str>) {
        let matcher = single_entry_matcher(threshold);
        let result = matcher.classify(&descriptor(&[0.30, 0.0]));
        assert_eq!(result.label.as_deref(), expected);
        assert_relative_eq!(result.distance, 0.30, epsilon = 1e-6);
    }

    // ── High-confidence margin ──────────────────────────────────────

    // Threshold and margin chosen exactly representable in binary so the
    // boundary case is not at the mercy of rounding.
    #[rstest]
    #[case::well_inside(0.30, true)]
    #[case::just_inside_margin(0.374, true)]
    #[case::at_margin_boundary(0.375, false)]
    #[case::borderline_match(0.45, false)]
    fn test_high_confidence_margin(#[case] distance: f64, #[case] expected: bool) {
        let matcher = single_entry_matcher(0.5);
        assert_eq!(matcher.is_high_confidence(distance, 0.125), expected);
    }

    #[test]
    fn test_zero_margin_promotes_everything_below_threshold() {
        let matcher = single_entry_matcher(0.45);
        assert!(matcher.is_high_confidence(0.449, 0.0));
        assert!(!matcher.is_high_confidence(0.45, 0.0));
    }
}
