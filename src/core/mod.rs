//! Core types, canonicalization and the execution engine.

pub mod canonical;
pub mod engine;
pub mod error;
pub mod hash;
pub mod output;
pub mod signal;
pub mod time;
pub mod types;
