//! Iriswear - a message-bus-driven notification dispatcher
//!
//! This library receives structured events over a publish/subscribe bus,
//! normalizes them into canonical notification records, and fans them out to
//! independently-failing handlers (text-to-speech, re-announcing, logging).

pub mod app;
pub mod bus;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod handlers;
pub mod normalize;
pub mod queue;
pub mod speech;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
