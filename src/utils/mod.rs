//! Utility functions and types for the analytics toolbox.

pub mod cache;
pub mod error;
mod logging;
pub mod retry;

pub use error::{Error, Result};
pub use logging::init_logging;
