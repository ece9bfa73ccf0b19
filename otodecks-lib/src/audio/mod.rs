//! File decoding and duration probing.

mod error;
mod source;

pub use error::SourceError;
pub use source::{AudioSource, SourceInfo};
