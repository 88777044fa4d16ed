pub mod command;
pub mod content;
pub mod detection;
pub mod matching;
pub mod pipeline;
pub mod shared;
