pub mod file_blob_store;
pub mod memory_blob_store;
