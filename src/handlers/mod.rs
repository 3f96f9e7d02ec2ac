//! Concrete notification handlers.
//!
//! Each handler is an independently-failing action taken per notification;
//! the registry in [`crate::dispatch`] guarantees a failure in one never
//! blocks delivery to the others.

pub mod logging;
pub mod reannounce;
pub mod speech;

pub use logging::LogHandler;
pub use reannounce::ReannounceHandler;
pub use speech::SpeechHandler;
