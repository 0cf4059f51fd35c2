pub mod checks;
pub mod cli;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod sources;
