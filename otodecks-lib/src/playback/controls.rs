//! Capability traits used by the settings layer and front ends.

use std::path::Path;

use crate::audio::SourceInfo;
use crate::dsp::{EqBand, ToneFilter};

use super::DeckError;

/// Load, play, seek and loop a deck.
pub trait TransportControl {
    /// Decode `path` and queue it for the audio thread.
    ///
    /// On failure nothing about the deck changes.
    fn load(&mut self, path: &Path) -> Result<SourceInfo, DeckError>;
    fn start(&self);
    fn stop(&self);
    /// Absolute seek in seconds. The audio side clamps to the track length.
    fn set_position(&self, seconds: f64) -> Result<(), DeckError>;
    /// Seek to `fraction` of the track, `fraction` in `[0, 1]`.
    fn set_position_relative(&self, fraction: f64) -> Result<(), DeckError>;
    /// Flip looping and return the new state. Always false with no source.
    fn toggle_looping(&self) -> bool;

    fn is_playing(&self) -> bool;
    fn is_looping(&self) -> bool;
    fn length_in_seconds(&self) -> f64;
    fn current_position(&self) -> f64;

    /// Playhead as a fraction of the track, `None` with no source.
    fn position_relative(&self) -> Option<f64> {
        let length = self.length_in_seconds();
        if length <= 0.0 {
            return None;
        }
        Some((self.current_position() / length).clamp(0.0, 1.0))
    }
}

/// Gain, speed, tone filter and EQ.
pub trait AudioParameterSink {
    fn set_gain(&self, gain: f64) -> Result<(), DeckError>;
    fn set_speed(&self, ratio: f64) -> Result<(), DeckError>;
    fn set_tone_filter(&self, filter: ToneFilter) -> Result<(), DeckError>;
    fn set_band_gain(&self, band: EqBand, gain: f64) -> Result<(), DeckError>;

    /// Signed tone knob: negative low-pass, positive high-pass, zero bypass.
    fn set_frequency(&self, signed_hz: f64) -> Result<(), DeckError>;

    fn set_low_shelf(&self, gain: f64) -> Result<(), DeckError> {
        self.set_band_gain(EqBand::Low, gain)
    }

    fn set_peak_filter(&self, gain: f64) -> Result<(), DeckError> {
        self.set_band_gain(EqBand::Mid, gain)
    }

    fn set_high_shelf(&self, gain: f64) -> Result<(), DeckError> {
        self.set_band_gain(EqBand::High, gain)
    }
}
