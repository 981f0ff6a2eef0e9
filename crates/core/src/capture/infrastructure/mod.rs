pub mod image_dir_frame_source;
