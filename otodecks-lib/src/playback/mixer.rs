//! Two-deck summing mixer driven by the audio callback.

use log::{debug, warn};

use crate::constants::CHANNELS;

use super::DeckChain;

/// Lifecycle of a [`Mixer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerState {
    Unprepared,
    Prepared,
    Released,
}

/// Sums two deck chains into one interleaved stereo block.
pub struct Mixer {
    decks: [DeckChain; 2],
    scratch: Vec<f32>,
    state: MixerState,
    block_size: usize,
    sample_rate: u32,
    misuse_logged: bool,
}

impl Mixer {
    pub fn new(deck_a: DeckChain, deck_b: DeckChain) -> Self {
        Self {
            decks: [deck_a, deck_b],
            scratch: Vec::new(),
            state: MixerState::Unprepared,
            block_size: 0,
            sample_rate: 0,
            misuse_logged: false,
        }
    }

    pub fn state(&self) -> MixerState {
        self.state
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Prepare both chains. Can be called again after a release.
    pub fn prepare_to_play(&mut self, block_size: usize, sample_rate: u32) {
        let block_size = block_size.max(1);
        self.block_size = block_size;
        self.sample_rate = sample_rate;
        self.scratch = vec![0.0; block_size * CHANNELS];
        for deck in &mut self.decks {
            deck.prepare_to_play(block_size, sample_rate);
        }
        self.state = MixerState::Prepared;
        self.misuse_logged = false;
        debug!("mixer prepared: {} frames @ {} Hz", block_size, sample_rate);
    }

    /// Fill `out` with the sum of both decks.
    ///
    /// Any length is accepted; larger requests are rendered in prepared-size
    /// pieces. Outside the prepared state the output is silent.
    pub fn next_block(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if self.state != MixerState::Prepared {
            if !self.misuse_logged {
                warn!("mixer asked for audio while {:?}; emitting silence", self.state);
                self.misuse_logged = true;
            }
            return;
        }

        let piece = self.scratch.len();
        for slice in out.chunks_mut(piece) {
            for deck in &mut self.decks {
                let scratch = &mut self.scratch[..slice.len()];
                deck.next_block(scratch);
                for (sum, sample) in slice.iter_mut().zip(scratch.iter()) {
                    *sum += *sample;
                }
            }
        }
    }

    pub fn release_resources(&mut self) {
        for deck in &mut self.decks {
            deck.release_resources();
        }
        self.state = MixerState::Released;
        debug!("mixer released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{deck_pair, Deck, TransportControl};
    use crate::test_support::write_sine_wav;

    const RATE: u32 = 8_000;

    fn two_loaded_decks(dir: &std::path::Path) -> (Deck, Deck, Mixer) {
        let path_a = write_sine_wav(dir, "a.wav", 2.0, RATE, 1, 220.0);
        let path_b = write_sine_wav(dir, "b.wav", 2.0, RATE, 2, 330.0);
        let (mut deck_a, chain_a) = deck_pair("A");
        let (mut deck_b, chain_b) = deck_pair("B");
        deck_a.load(&path_a).expect("load a");
        deck_b.load(&path_b).expect("load b");
        (deck_a, deck_b, Mixer::new(chain_a, chain_b))
    }

    #[test]
    fn unprepared_mixer_is_silent() {
        let (deck_a, chain_a) = deck_pair("A");
        let (_deck_b, chain_b) = deck_pair("B");
        deck_a.start();
        let mut mixer = Mixer::new(chain_a, chain_b);

        let mut out = vec![1.0_f32; 128];
        mixer.next_block(&mut out);
        assert!(out.iter().all(|sample| *sample == 0.0));
        assert_eq!(mixer.state(), MixerState::Unprepared);
    }

    #[test]
    fn playing_decks_are_never_silent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (deck_a, deck_b, mut mixer) = two_loaded_decks(dir.path());
        mixer.prepare_to_play(256, RATE);
        deck_a.start();
        deck_b.start();

        for request in [256, 100, 700, 2] {
            let mut out = vec![0.0_f32; request * CHANNELS];
            mixer.next_block(&mut out);
            assert_eq!(out.len(), request * CHANNELS);
        }
        for _ in 0..10 {
            let mut out = vec![0.0_f32; 256 * CHANNELS];
            mixer.next_block(&mut out);
            assert!(out.iter().any(|sample| *sample != 0.0));
        }
    }

    #[test]
    fn stopped_decks_sum_to_silence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_deck_a, _deck_b, mut mixer) = two_loaded_decks(dir.path());
        mixer.prepare_to_play(128, RATE);
        let mut out = vec![1.0_f32; 128 * CHANNELS];
        mixer.next_block(&mut out);
        assert!(out.iter().all(|sample| *sample == 0.0));
    }

    #[test]
    fn released_mixer_goes_silent_until_prepared_again() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (deck_a, _deck_b, mut mixer) = two_loaded_decks(dir.path());
        mixer.prepare_to_play(128, RATE);
        deck_a.start();
        mixer.release_resources();
        assert_eq!(mixer.state(), MixerState::Released);

        let mut out = vec![0.0_f32; 128 * CHANNELS];
        mixer.next_block(&mut out);
        assert!(out.iter().all(|sample| *sample == 0.0));

        mixer.prepare_to_play(128, RATE);
        for _ in 0..4 {
            mixer.next_block(&mut out);
        }
        assert!(out.iter().any(|sample| *sample != 0.0));
    }
}
