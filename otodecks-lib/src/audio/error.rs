use std::fmt::{Display, Formatter};

use symphonia::core::errors::Error as SymphoniaError;

/// Error type for opening, probing and decoding audio files.
#[derive(Debug)]
pub enum SourceError {
    Io(std::io::Error),
    Unsupported(String),
    Decode(String),
    Empty,
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Unsupported(err) => write!(f, "unsupported audio: {}", err),
            Self::Decode(err) => write!(f, "decode error: {}", err),
            Self::Empty => write!(f, "file contains no audio frames"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SymphoniaError> for SourceError {
    fn from(value: SymphoniaError) -> Self {
        match value {
            SymphoniaError::IoError(err) => Self::Io(err),
            SymphoniaError::Unsupported(what) => Self::Unsupported(what.to_string()),
            SymphoniaError::DecodeError(what) => Self::Decode(what.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}
