//! WAV fixtures for unit tests.

use std::path::{Path, PathBuf};

/// Write a 16-bit sine WAV and return its path.
pub(crate) fn write_sine_wav(
    dir: &Path,
    name: &str,
    seconds: f64,
    sample_rate: u32,
    channels: u16,
    freq_hz: f32,
) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    let frames = (seconds * sample_rate as f64).round() as usize;
    for frame in 0..frames {
        let t = frame as f32 / sample_rate as f32;
        let value = (t * freq_hz * std::f32::consts::TAU).sin() * 0.5;
        let sample = (value * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
    path
}

/// Write bytes that no decoder accepts.
pub(crate) fn write_garbage(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"definitely not audio data, just text").expect("write garbage");
    path
}
