//! Timed desktop wallpaper rotation that never repeats an image before a
//! full pass and resumes where it left off after a restart.

pub mod config;
pub mod error;
pub mod error_log;
pub mod permutation;
pub mod presenter;
pub mod reconcile;
pub mod rotation;
pub mod scan;
pub mod state;

pub use error::Error;
