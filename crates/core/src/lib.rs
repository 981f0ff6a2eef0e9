//! Face enrollment and recognition: descriptor storage, nearest-neighbor
//! matching, and a cancellable periodic scan loop.
//!
//! Detection and embedding are delegated to pretrained ONNX models behind
//! the `DescriptorSource` domain trait; persistence goes through the
//! `BlobStore` seam as a single JSON document.

pub mod capture;
pub mod enrollment;
pub mod recognition;
pub mod scanning;
pub mod shared;
