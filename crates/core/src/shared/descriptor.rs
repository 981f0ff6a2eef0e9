use serde::{Deserialize, Serialize};

/// Fixed-length embedding vector produced by a face recognition model.
///
/// The dimension is fixed by the model that produced the vector, not by
/// this type; two descriptors are only comparable when they share a
/// dimension. Serializes as a bare float array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(Vec<f32>);

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean distance to another descriptor, accumulated in `f64`.
    pub fn distance(&self, other: &Descriptor) -> f64 {
        debug_assert_eq!(
            self.0.len(),
            other.0.len(),
            "descriptor dimensions must match"
        );
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| {
                let d = f64::from(*a) - f64::from(*b);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}
