pub mod commands;
pub mod flags;
pub mod logging;
