/// Domain interface for keyed string-blob persistence.
///
/// The enrollment store serializes to JSON and hands the document to a
/// blob store; whether that lands in a file, memory, or somewhere else
/// is an infrastructure concern.
pub trait BlobStore: Send {
    /// Fetch a blob. `Ok(None)` means the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn std::error::Error>>;

    /// Write a blob, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>>;

    /// Remove a blob. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), Box<dyn std::error::Error>>;
}
