pub mod onnx_descriptor_source;
