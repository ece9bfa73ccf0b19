//! Deck control, per-deck audio chains and the two-deck mixer.

mod controls;
mod deck;
mod error;
mod mixer;
mod output;
pub mod params;
pub mod settings;
mod transport;

pub use controls::{AudioParameterSink, TransportControl};
pub use deck::{deck_pair, ChainParameters, Deck, DeckChain, DeckMonitor};
pub use error::DeckError;
pub use mixer::{Mixer, MixerState};
pub use output::MixerSource;
pub use settings::{DeckSettings, SessionSettings, SettingsError};
pub use transport::Transport;
