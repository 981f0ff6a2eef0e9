use std::collections::BTreeMap;

use crate::enrollment::domain::blob_store::BlobStore;
use crate::enrollment::domain::enrollment::Enrollment;
use crate::shared::constants::ENROLLMENT_STORAGE_KEY;
use crate::shared::descriptor::Descriptor;

/// In-memory registry of enrollments, keyed by person name, persisted as
/// a single JSON document through a [`BlobStore`].
///
/// Loading fails open: a missing, unreadable, or malformed document
/// yields an empty registry rather than an error, so a corrupt store
/// never blocks startup. Saving propagates write errors because losing
/// freshly collected samples is worth surfacing.
///
/// Names are case-sensitive and compared exactly; `BTreeMap` keeps
/// listing order deterministic.
#[derive(Debug, Default)]
pub struct EnrollmentStore {
    enrollments: BTreeMap<String, Enrollment>,
}

impl EnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the blob store, failing open to an empty registry.
    pub fn load(blob_store: &dyn BlobStore) -> Self {
        let document = match blob_store.get(ENROLLMENT_STORAGE_KEY) {
            Ok(Some(document)) => document,
            Ok(None) => return Self::default(),
            Err(error) => {
                log::warn!("Failed to read enrollment store, starting empty: {error}");
                return Self::default();
            }
        };

        match parse_document(&document) {
            Some(enrollments) => Self { enrollments },
            None => {
                log::warn!("Enrollment store is malformed, starting empty");
                Self::default()
            }
        }
    }

    /// Serialize and write the full registry.
    pub fn save(&self, blob_store: &mut dyn BlobStore) -> Result<(), Box<dyn std::error::Error>> {
        let document = serde_json::to_string(&self.enrollments)?;
        blob_store.set(ENROLLMENT_STORAGE_KEY, &document)
    }

    /// Append descriptor samples to a person, creating the record if the
    /// name is new. Appending an empty batch is a no-op.
    pub fn append(&mut self, name: &str, descriptors: Vec<Descriptor>) {
        if descriptors.is_empty() {
            return;
        }
        self.enrollments
            .entry(name.to_string())
            .or_insert_with(|| Enrollment::new(name, Vec::new()))
            .descriptors
            .extend(descriptors);
    }

    pub fn get(&self, name: &str) -> Option<&Enrollment> {
        self.enrollments.get(name)
    }

    /// Enrollments in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Enrollment> {
        self.enrollments.values()
    }

    pub fn len(&self) -> usize {
        self.enrollments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enrollments.is_empty()
    }

    pub fn clear(&mut self) {
        self.enrollments.clear();
    }

    /// Flatten to `(name, descriptor)` pairs for building a matcher.
    /// Each sample appears as its own entry.
    pub fn snapshot(&self) -> Vec<(String, Descriptor)> {
        self.enrollments
            .values()
            .flat_map(|enrollment| {
                enrollment
                    .descriptors
                    .iter()
                    .map(|descriptor| (enrollment.name.clone(), descriptor.clone()))
            })
            .collect()
    }
}

/// Parse the persisted JSON document, dropping entries with no usable
/// descriptors. Returns `None` when the document as a whole is invalid.
fn parse_document(document: &str) -> Option<BTreeMap<String, Enrollment>> {
    let parsed: BTreeMap<String, Enrollment> = serde_json::from_str(document).ok()?;
    Some(
        parsed
            .into_iter()
            .filter(|(_, enrollment)| {
                enrollment
                    .descriptors
                    .iter()
                    .any(|descriptor| !descriptor.is_empty())
            })
            .collect(),
    )
}
