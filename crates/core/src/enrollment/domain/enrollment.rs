use serde::{Deserialize, Serialize};

use crate::shared::descriptor::Descriptor;

/// One person's enrollment record: a display name and the descriptor
/// samples collected for them.
///
/// The name is stored redundantly inside the record as well as in the
/// store's key so a record remains self-describing on its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub name: String,
    pub descriptors: Vec<Descriptor>,
}

impl Enrollment {
    pub fn new(name: impl Into<String>, descriptors: Vec<Descriptor>) -> Self {
        Self {
            name: name.into(),
            descriptors,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.descriptors.len()
    }
}
