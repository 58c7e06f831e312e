pub mod build_state;
pub mod pipeline_action;
