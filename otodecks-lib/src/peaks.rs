//! Min/max peak windows for waveform display.

use std::path::Path;

use serde::Serialize;

use crate::audio::{AudioSource, SourceError};
use crate::constants::CHANNELS;

/// Default resolution used by the waveform display.
pub const DEFAULT_WINDOWS_PER_SECOND: u32 = 100;

/// A single peak window with maximum and minimum sample amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakWindow {
    pub max: f32,
    pub min: f32,
}

/// Peak data for both channels at a fixed window size.
#[derive(Debug, Clone, Serialize)]
pub struct PeaksData {
    pub sample_rate: u32,
    pub window_size: u32,
    pub channels: Vec<Vec<PeakWindow>>,
}

#[derive(Debug)]
struct ChannelAccumulator {
    current_max: f32,
    current_min: f32,
    count: usize,
    peaks: Vec<PeakWindow>,
}

impl ChannelAccumulator {
    fn new(capacity: usize) -> Self {
        Self {
            current_max: f32::MIN,
            current_min: f32::MAX,
            count: 0,
            peaks: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, sample: f32, window_size: usize) {
        self.current_max = self.current_max.max(sample);
        self.current_min = self.current_min.min(sample);
        self.count += 1;

        if self.count == window_size {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.count > 0 {
            self.peaks.push(PeakWindow {
                max: self.current_max,
                min: self.current_min,
            });
            self.current_max = f32::MIN;
            self.current_min = f32::MAX;
            self.count = 0;
        }
    }
}

/// Compute peaks from an already decoded source.
///
/// The last window may be shorter than `window_size`.
pub fn extract_peaks(source: &AudioSource, windows_per_second: u32) -> PeaksData {
    let sample_rate = source.native_sample_rate();
    let window_size = (sample_rate / windows_per_second.max(1)).max(1) as usize;
    let capacity = source.total_frames() as usize / window_size + 1;

    let mut accumulators: Vec<ChannelAccumulator> = (0..CHANNELS)
        .map(|_| ChannelAccumulator::new(capacity))
        .collect();
    for frame in source.samples().chunks_exact(CHANNELS) {
        for (accumulator, sample) in accumulators.iter_mut().zip(frame) {
            accumulator.push(*sample, window_size);
        }
    }

    PeaksData {
        sample_rate,
        window_size: window_size as u32,
        channels: accumulators
            .into_iter()
            .map(|mut accumulator| {
                accumulator.flush();
                accumulator.peaks
            })
            .collect(),
    }
}

/// Decode a file and compute its peaks.
///
/// # Errors
/// Returns an error if the file cannot be decoded.
pub fn extract_peaks_from_file(
    path: impl AsRef<Path>,
    windows_per_second: u32,
) -> Result<PeaksData, SourceError> {
    let source = AudioSource::open(path)?;
    Ok(extract_peaks(&source, windows_per_second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_track_min_and_max() {
        let samples = vec![0.1, -0.2, 0.5, 0.4, -0.9, 0.0, 0.3, 0.3, 0.2, -0.1];
        let source = AudioSource::from_interleaved("mem", samples, 4);
        let peaks = extract_peaks(&source, 2);

        assert_eq!(peaks.window_size, 2);
        assert_eq!(peaks.channels.len(), 2);
        assert_eq!(
            peaks.channels[0],
            vec![
                PeakWindow { max: 0.5, min: 0.1 },
                PeakWindow { max: 0.3, min: -0.9 },
                PeakWindow { max: 0.2, min: 0.2 },
            ]
        );
        assert_eq!(peaks.channels[1][1], PeakWindow { max: 0.3, min: 0.0 });
    }

    #[test]
    fn window_size_never_drops_to_zero() {
        let source = AudioSource::from_interleaved("mem", vec![0.0; 8], 10);
        let peaks = extract_peaks(&source, 1_000);
        assert_eq!(peaks.window_size, 1);
        assert_eq!(peaks.channels[0].len(), 4);
    }
}
