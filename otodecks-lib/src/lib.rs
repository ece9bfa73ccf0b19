//! # Otodecks Audio Library
//!
//! Two-deck DJ engine: decoding, per-deck transport with speed, tone filter
//! and three-band EQ, and a mixer that sums both decks for a real-time
//! audio callback.

pub mod audio;
pub mod constants;
pub mod diagnostics;
pub mod dsp;
pub mod peaks;
pub mod playback;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use audio::{AudioSource, SourceError, SourceInfo};
pub use playback::{
    deck_pair, AudioParameterSink, Deck, DeckChain, DeckError, Mixer, MixerSource,
    TransportControl,
};
