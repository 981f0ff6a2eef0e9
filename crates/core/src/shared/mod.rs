pub mod constants;
pub mod descriptor;
pub mod face_box;
pub mod frame;
pub mod model_resolver;
