//! Observers that run beside playback.

pub mod reporter;
