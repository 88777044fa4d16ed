pub mod command_router;
pub mod pipeline_state;
pub mod stored_settings;
