pub mod log_comment;
pub mod process;
pub mod render;
