pub mod blob_store;
pub mod enrollment;
pub mod enrollment_store;
