//! Linear-interpolation resampler used for speed changes and rate correction.
//!
//! The ratio is the number of input frames consumed per output frame, so a
//! ratio of `2.0` plays twice as fast (and an octave higher). Input is pulled
//! from the upstream stage through a fixed internal chunk, which keeps
//! rendering allocation-free once [`Resampler::prepare`] has run.

use crate::constants::CHANNELS;

use super::biquad::{Biquad, BiquadCoefficients, BUTTERWORTH_Q};

const DEFAULT_CHUNK_FRAMES: usize = 256;
const UNITY_TOLERANCE: f64 = 1.0e-9;
// Anti-alias cutoff relative to the output Nyquist.
const ANTI_ALIAS_HEADROOM: f32 = 0.9;

#[derive(Debug, Clone)]
pub struct Resampler {
    ratio: f64,
    phase: f64,
    prev: [f32; CHANNELS],
    next: [f32; CHANNELS],
    input: Vec<f32>,
    input_pos: usize,
    input_frames: usize,
    anti_alias: Option<Biquad>,
}

impl Default for Resampler {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            phase: 1.0,
            prev: [0.0; CHANNELS],
            next: [0.0; CHANNELS],
            input: Vec::new(),
            input_pos: 0,
            input_frames: 0,
            anti_alias: None,
        }
    }
}

impl Resampler {
    /// Allocate the input chunk. Call before the first [`Resampler::render`].
    pub fn prepare(&mut self, chunk_frames: usize) {
        let chunk_frames = chunk_frames.clamp(1, DEFAULT_CHUNK_FRAMES);
        self.input = vec![0.0; chunk_frames * CHANNELS];
        self.reset();
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Change the ratio. Takes effect from the next rendered frame.
    pub fn set_ratio(&mut self, ratio: f64) {
        if !ratio.is_finite() || ratio <= 0.0 || ratio == self.ratio {
            return;
        }
        self.ratio = ratio;

        if ratio > 1.0 + UNITY_TOLERANCE {
            // Normalized design: sample rate 2.0 puts Nyquist at 1.0.
            let cutoff = (ANTI_ALIAS_HEADROOM / ratio as f32).min(0.98);
            let coeffs = BiquadCoefficients::low_pass(2.0, cutoff, BUTTERWORTH_Q);
            match self.anti_alias.as_mut() {
                Some(filter) => filter.set_coefficients(coeffs),
                None => self.anti_alias = Some(Biquad::new(coeffs)),
            }
        } else {
            self.anti_alias = None;
        }
    }

    /// Drop buffered input and interpolation history.
    pub fn reset(&mut self) {
        self.phase = 1.0;
        self.prev = [0.0; CHANNELS];
        self.next = [0.0; CHANNELS];
        self.input_pos = 0;
        self.input_frames = 0;
        if let Some(filter) = self.anti_alias.as_mut() {
            filter.reset();
        }
    }

    /// Fill `out` by pulling input chunks from `pull`.
    ///
    /// # Arguments
    ///
    /// * `out` - Interleaved stereo block to overwrite.
    /// * `pull` - Upstream stage. Receives an interleaved chunk and must fill
    ///   all of it, with silence if it has nothing left.
    ///
    /// Outputs silence without pulling when [`Resampler::prepare`] has not run.
    pub fn render<F>(&mut self, out: &mut [f32], mut pull: F)
    where
        F: FnMut(&mut [f32]),
    {
        if self.input.is_empty() {
            out.fill(0.0);
            return;
        }

        for frame in out.chunks_exact_mut(CHANNELS) {
            while self.phase >= 1.0 {
                self.advance(&mut pull);
                self.phase -= 1.0;
            }

            let t = self.phase as f32;
            for (channel, sample) in frame.iter_mut().enumerate() {
                let prev = self.prev[channel];
                *sample = prev + (self.next[channel] - prev) * t;
            }

            self.phase += self.ratio;
        }
    }

    fn advance<F>(&mut self, pull: &mut F)
    where
        F: FnMut(&mut [f32]),
    {
        if self.input_pos >= self.input_frames {
            pull(self.input.as_mut_slice());
            if let Some(filter) = self.anti_alias.as_mut() {
                filter.process_interleaved(&mut self.input);
            }
            self.input_pos = 0;
            self.input_frames = self.input.len() / CHANNELS;
        }

        let offset = self.input_pos * CHANNELS;
        self.prev = self.next;
        self.next.copy_from_slice(&self.input[offset..offset + CHANNELS]);
        self.input_pos += 1;
    }
}
