pub mod discovery_observer;
pub mod lifecycle_tracker;
pub mod scheduler;
pub mod suppression_controller;
