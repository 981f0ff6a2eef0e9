pub mod descriptor_source;
pub mod matcher;
