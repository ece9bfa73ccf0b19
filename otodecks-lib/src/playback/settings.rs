//! JSON session settings applied through the deck control traits.
//!
//! ```json
//! {
//!   "deck_a": { "file": "intro.wav", "gain": 0.8, "frequency": -1200 },
//!   "deck_b": { "speed": 1.05, "bass": 0.5, "looping": true }
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::dsp::{EqBand, ToneFilter};

use super::controls::{AudioParameterSink, TransportControl};
use super::DeckError;

/// Error type for reading a settings file.
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Parse(err) => write!(f, "invalid settings: {}", err),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<std::io::Error> for SettingsError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Initial state of one deck. Missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckSettings {
    pub file: Option<PathBuf>,
    pub gain: f64,
    pub speed: f64,
    /// Signed tone knob, takes precedence over `tone`.
    pub frequency: Option<f64>,
    pub tone: ToneFilter,
    pub bass: f64,
    pub mid: f64,
    pub treble: f64,
    pub looping: bool,
    pub position: Option<f64>,
    pub autoplay: bool,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            file: None,
            gain: 1.0,
            speed: 1.0,
            frequency: None,
            tone: ToneFilter::Bypass,
            bass: 1.0,
            mid: 1.0,
            treble: 1.0,
            looping: false,
            position: None,
            autoplay: true,
        }
    }
}

impl DeckSettings {
    /// Push these settings into a deck, loading `file` first when set.
    ///
    /// Stops at the first rejected value.
    pub fn apply<D>(&self, deck: &mut D) -> Result<(), DeckError>
    where
        D: TransportControl + AudioParameterSink,
    {
        if let Some(file) = &self.file {
            deck.load(file)?;
        }

        deck.set_gain(self.gain)?;
        deck.set_speed(self.speed)?;
        match self.frequency {
            Some(signed_hz) => deck.set_frequency(signed_hz)?,
            None => deck.set_tone_filter(self.tone)?,
        }
        deck.set_band_gain(EqBand::Low, self.bass)?;
        deck.set_band_gain(EqBand::Mid, self.mid)?;
        deck.set_band_gain(EqBand::High, self.treble)?;

        if self.looping != deck.is_looping() {
            deck.toggle_looping();
        }
        if let Some(position) = self.position {
            deck.set_position(position)?;
        }
        Ok(())
    }
}

/// Settings for both decks plus optional engine overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub deck_a: DeckSettings,
    pub deck_b: DeckSettings,
    pub block_size: Option<usize>,
    pub sample_rate: Option<u32>,
}

impl SessionSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a settings file. Relative `file` entries resolve against the
    /// settings file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let mut settings = Self::from_json(&std::fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            for deck in [&mut settings.deck_a, &mut settings.deck_b] {
                if let Some(file) = deck.file.as_mut().filter(|file| file.is_relative()) {
                    *file = base.join(&*file);
                }
            }
        }
        info!("loaded settings from {}", path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{deck_pair, TransportControl};
    use crate::test_support::write_sine_wav;

    #[test]
    fn missing_fields_use_defaults() {
        let settings =
            SessionSettings::from_json(r#"{ "deck_b": { "gain": 0.5, "looping": true } }"#)
                .expect("parse");
        assert_eq!(settings.deck_a, DeckSettings::default());
        assert_eq!(settings.deck_b.gain, 0.5);
        assert!(settings.deck_b.looping);
        assert_eq!(settings.block_size, None);
    }

    #[test]
    fn tone_filter_is_tagged() {
        let settings = SessionSettings::from_json(
            r#"{ "deck_a": { "tone": { "type": "low_pass", "cutoff_hz": 800.0 } } }"#,
        )
        .expect("parse");
        assert_eq!(settings.deck_a.tone, ToneFilter::LowPass { cutoff_hz: 800.0 });
        assert!(SessionSettings::from_json("{ not json").is_err());
    }

    #[test]
    fn apply_loads_and_sets_every_parameter() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_sine_wav(dir.path(), "deck.wav", 4.0, 8_000, 1, 440.0);
        let settings_path = dir.path().join("session.json");
        std::fs::write(
            &settings_path,
            r#"{ "deck_a": { "file": "deck.wav", "gain": 0.7, "speed": 1.5,
                 "frequency": 500, "bass": 0.2, "treble": 1.8,
                 "looping": true, "position": 1.0 } }"#,
        )
        .expect("write settings");

        let settings = SessionSettings::from_file(&settings_path).expect("settings");
        let (mut deck, _chain) = deck_pair("A");
        settings.deck_a.apply(&mut deck).expect("apply");

        let params = deck.parameters();
        assert_eq!(params.gain, 0.7);
        assert_eq!(params.speed, 1.5);
        assert_eq!(params.tone, ToneFilter::HighPass { cutoff_hz: 500.0 });
        assert_eq!(params.bass, 0.2);
        assert_eq!(params.mid, 1.0);
        assert_eq!(params.treble, 1.8);
        assert!(deck.is_looping());
        assert!((deck.current_position() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn apply_stops_on_rejected_value() {
        let settings = DeckSettings {
            gain: 3.0,
            ..DeckSettings::default()
        };
        let (mut deck, _chain) = deck_pair("A");
        assert!(matches!(
            settings.apply(&mut deck),
            Err(DeckError::OutOfRange { parameter: "gain", .. })
        ));
    }
}
