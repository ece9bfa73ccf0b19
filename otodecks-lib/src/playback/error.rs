use std::fmt::{Display, Formatter};

use crate::audio::SourceError;

/// Error type for deck control calls.
///
/// Every rejected call leaves the deck exactly as it was.
#[derive(Debug)]
pub enum DeckError {
    OutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    NotFinite {
        parameter: &'static str,
    },
    NoSourceLoaded,
    Load(SourceError),
    QueueFull,
}

impl Display for DeckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange {
                parameter,
                value,
                min,
                max,
            } => write!(
                f,
                "{} value {} outside accepted range [{}, {}]",
                parameter, value, min, max
            ),
            Self::NotFinite { parameter } => write!(f, "{} value is not finite", parameter),
            Self::NoSourceLoaded => write!(f, "no source loaded"),
            Self::Load(err) => write!(f, "load failed: {}", err),
            Self::QueueFull => write!(f, "audio thread has not consumed previous loads"),
        }
    }
}

impl std::error::Error for DeckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SourceError> for DeckError {
    fn from(value: SourceError) -> Self {
        Self::Load(value)
    }
}
