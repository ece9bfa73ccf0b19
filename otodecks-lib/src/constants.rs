//! Shared constants for the deck chains and their control ranges.

/// Interleaved channel count used by every stage after decoding.
///
/// Mono sources are duplicated to both channels when they are decoded.
pub const CHANNELS: usize = 2;

/// Fallback device sample rate (Hz) for offline rendering.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Fallback callback block size in frames.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Accepted transport gain range (linear).
pub const MIN_GAIN: f64 = 0.0;
pub const MAX_GAIN: f64 = 2.0;

/// Speed ratio upper bound. The lower bound is exclusive zero.
pub const MAX_SPEED: f64 = 100.0;

/// Tone filter cutoff ceiling (Hz) and the legacy signed-knob floor.
pub const MAX_TONE_CUTOFF_HZ: f64 = 5_000.0;
pub const MIN_SIGNED_FREQUENCY_HZ: f64 = -4_999.9;

/// Accepted band gain factor range for the three-band EQ.
pub const MIN_BAND_GAIN: f64 = 0.01;
pub const MAX_BAND_GAIN: f64 = 2.0;

/// Centre frequencies (Hz) of the three EQ bands.
pub const LOW_SHELF_HZ: f32 = 300.0;
pub const PEAK_HZ: f32 = 3_000.0;
pub const HIGH_SHELF_HZ: f32 = 4_500.0;
