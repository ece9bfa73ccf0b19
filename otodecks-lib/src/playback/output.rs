//! `rodio` adapter for a prepared [`Mixer`].

use std::time::Duration;

use rodio::Source;

use crate::constants::CHANNELS;

use super::Mixer;

/// Endless stereo stream that pulls one mixer block at a time.
pub struct MixerSource {
    mixer: Mixer,
    block: Vec<f32>,
    cursor: usize,
}

impl MixerSource {
    pub fn new(mixer: Mixer) -> Self {
        let frames = mixer.block_size().max(1);
        let block = vec![0.0; frames * CHANNELS];
        Self {
            mixer,
            cursor: block.len(),
            block,
        }
    }
}

impl Iterator for MixerSource {
    type Item = rodio::Sample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.block.len() {
            self.mixer.next_block(&mut self.block);
            self.cursor = 0;
        }
        let sample = self.block[self.cursor];
        self.cursor += 1;
        Some(sample)
    }
}

impl Source for MixerSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> rodio::ChannelCount {
        CHANNELS as rodio::ChannelCount
    }

    fn sample_rate(&self) -> rodio::SampleRate {
        self.mixer.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
