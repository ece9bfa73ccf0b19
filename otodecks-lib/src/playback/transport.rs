//! First stage of a deck chain: source playback, gain and rate correction.

use crate::audio::AudioSource;
use crate::constants::CHANNELS;
use crate::dsp::Resampler;

/// Plays the attached source at the device rate.
///
/// The source is read through a resampler running at
/// `native_rate / device_rate`, so files at any rate play at their true speed.
#[derive(Debug, Default)]
pub struct Transport {
    source: Option<AudioSource>,
    playing: bool,
    finished: bool,
    gain: f32,
    last_gain: f32,
    device_rate: u32,
    rate: Resampler,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            gain: 1.0,
            last_gain: 1.0,
            ..Default::default()
        }
    }

    pub fn prepare(&mut self, block_size: usize, device_rate: u32) {
        self.device_rate = device_rate;
        self.rate.prepare(block_size);
        self.update_rate();
    }

    pub fn release(&mut self) {
        self.rate.reset();
        self.playing = false;
    }

    /// Replace the source and rewind to frame 0.
    ///
    /// Returns the previous source so the caller can dispose of it elsewhere.
    pub fn attach(&mut self, mut source: AudioSource) -> Option<AudioSource> {
        source.seek_frame(0);
        let previous = self.source.replace(source);
        self.playing = false;
        self.finished = false;
        self.rate.reset();
        self.update_rate();
        previous
    }

    /// Begin playback at the current gain, without ramping from a stale value.
    pub fn start(&mut self) {
        if self.source.is_some() && !self.playing {
            self.playing = true;
            self.last_gain = self.gain;
        }
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True once after the source ran out and playback stopped itself.
    pub fn take_finished(&mut self) -> bool {
        std::mem::take(&mut self.finished)
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn set_looping(&mut self, looping: bool) {
        if let Some(source) = self.source.as_mut() {
            source.set_looping(looping);
        }
    }

    pub fn length_seconds(&self) -> f64 {
        self.source.as_ref().map_or(0.0, AudioSource::length_seconds)
    }

    pub fn position_seconds(&self) -> f64 {
        self.source.as_ref().map_or(0.0, AudioSource::position_seconds)
    }

    /// Move the playhead, clamped to `[0, length]`.
    pub fn seek_seconds(&mut self, seconds: f64) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        let seconds = seconds.clamp(0.0, source.length_seconds());
        let frame = (seconds * source.native_sample_rate() as f64).round() as u64;
        source.seek_frame(frame);
        self.rate.reset();
    }

    /// Render one interleaved block, silence when stopped.
    pub fn render(&mut self, out: &mut [f32]) {
        let source = match self.source.as_mut() {
            Some(source) if self.playing => source,
            _ => {
                out.fill(0.0);
                self.last_gain = self.gain;
                return;
            }
        };

        self.rate.render(out, |chunk: &mut [f32]| {
            let frames = chunk.len() / CHANNELS;
            source.read_block(chunk, frames);
        });

        let frames = out.len() / CHANNELS;
        if frames > 0 {
            let step = (self.gain - self.last_gain) / frames as f32;
            for (index, frame) in out.chunks_exact_mut(CHANNELS).enumerate() {
                let gain = self.last_gain + step * (index + 1) as f32;
                for sample in frame {
                    *sample *= gain;
                }
            }
        }
        self.last_gain = self.gain;

        if source.is_exhausted() {
            self.playing = false;
            self.finished = true;
        }
    }

    fn update_rate(&mut self) {
        let native = self.source.as_ref().map(AudioSource::native_sample_rate);
        if let Some(native) = native.filter(|rate| *rate > 0) {
            if self.device_rate > 0 {
                self.rate.set_ratio(native as f64 / self.device_rate as f64);
            }
        }
    }
}
