//! Low-pass / high-pass "tone" knob placed right after the speed stage.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_TONE_CUTOFF_HZ, MIN_SIGNED_FREQUENCY_HZ};

use super::biquad::{Biquad, BiquadCoefficients, BUTTERWORTH_Q};

const TAG_BYPASS: u64 = 0;
const TAG_LOW_PASS: u64 = 1;
const TAG_HIGH_PASS: u64 = 2;

/// Mode of the tone filter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToneFilter {
    #[default]
    Bypass,
    LowPass { cutoff_hz: f32 },
    HighPass { cutoff_hz: f32 },
}

/// Reason a tone filter value was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneFilterRejection {
    NotFinite,
    OutOfRange { min: f64, max: f64 },
}

impl ToneFilter {
    /// Decode the legacy signed knob value.
    ///
    /// Negative values select a low-pass at `|value|`, positive values a
    /// high-pass at `value`, and exactly zero bypasses the stage.
    pub fn from_signed_hz(value: f64) -> Result<Self, ToneFilterRejection> {
        if !value.is_finite() {
            return Err(ToneFilterRejection::NotFinite);
        }
        if !(MIN_SIGNED_FREQUENCY_HZ..=MAX_TONE_CUTOFF_HZ).contains(&value) {
            return Err(ToneFilterRejection::OutOfRange {
                min: MIN_SIGNED_FREQUENCY_HZ,
                max: MAX_TONE_CUTOFF_HZ,
            });
        }

        let filter = if value < 0.0 {
            Self::LowPass {
                cutoff_hz: (-value) as f32,
            }
        } else if value > 0.0 {
            Self::HighPass {
                cutoff_hz: value as f32,
            }
        } else {
            Self::Bypass
        };
        Ok(filter)
    }

    /// Encode back to the legacy signed knob value.
    pub fn to_signed_hz(self) -> f64 {
        match self {
            Self::Bypass => 0.0,
            Self::LowPass { cutoff_hz } => -(cutoff_hz as f64),
            Self::HighPass { cutoff_hz } => cutoff_hz as f64,
        }
    }

    /// Check the cutoff of a low/high-pass variant.
    pub fn validate(self) -> Result<Self, ToneFilterRejection> {
        let cutoff = match self {
            Self::Bypass => return Ok(self),
            Self::LowPass { cutoff_hz } | Self::HighPass { cutoff_hz } => cutoff_hz as f64,
        };
        if !cutoff.is_finite() {
            return Err(ToneFilterRejection::NotFinite);
        }
        if cutoff <= 0.0 || cutoff > MAX_TONE_CUTOFF_HZ {
            return Err(ToneFilterRejection::OutOfRange {
                min: 0.0,
                max: MAX_TONE_CUTOFF_HZ,
            });
        }
        Ok(self)
    }

    /// Closed-form coefficients for this mode at `sample_rate`.
    pub fn coefficients(self, sample_rate: u32) -> BiquadCoefficients {
        let sample_rate = sample_rate as f32;
        match self {
            Self::Bypass => BiquadCoefficients::IDENTITY,
            Self::LowPass { cutoff_hz } => {
                BiquadCoefficients::low_pass(sample_rate, cutoff_hz, BUTTERWORTH_Q)
            }
            Self::HighPass { cutoff_hz } => {
                BiquadCoefficients::high_pass(sample_rate, cutoff_hz, BUTTERWORTH_Q)
            }
        }
    }

    /// Pack tag and cutoff into one word so the value can live in a single atomic.
    pub(crate) fn pack(self) -> u64 {
        let (tag, cutoff) = match self {
            Self::Bypass => (TAG_BYPASS, 0.0_f32),
            Self::LowPass { cutoff_hz } => (TAG_LOW_PASS, cutoff_hz),
            Self::HighPass { cutoff_hz } => (TAG_HIGH_PASS, cutoff_hz),
        };
        (tag << 32) | cutoff.to_bits() as u64
    }

    pub(crate) fn unpack(bits: u64) -> Self {
        let cutoff_hz = f32::from_bits(bits as u32);
        match bits >> 32 {
            TAG_LOW_PASS => Self::LowPass { cutoff_hz },
            TAG_HIGH_PASS => Self::HighPass { cutoff_hz },
            _ => Self::Bypass,
        }
    }
}

/// Runtime tone filter stage.
#[derive(Debug, Clone, Default)]
pub struct ToneStage {
    mode: ToneFilter,
    sample_rate: u32,
    filter: Biquad,
}

impl ToneStage {
    pub fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.filter = Biquad::new(self.mode.coefficients(sample_rate));
    }

    pub fn mode(&self) -> ToneFilter {
        self.mode
    }

    /// Recompute coefficients if `mode` differs from the active one.
    ///
    /// Must only be called between blocks.
    pub fn update(&mut self, mode: ToneFilter) {
        if mode == self.mode {
            return;
        }
        let was_bypassed = self.mode == ToneFilter::Bypass;
        self.mode = mode;
        if self.sample_rate == 0 {
            return;
        }
        if was_bypassed {
            self.filter.reset();
        }
        self.filter.set_coefficients(mode.coefficients(self.sample_rate));
    }

    pub fn coefficients(&self) -> BiquadCoefficients {
        self.filter.coefficients()
    }

    pub fn process(&mut self, block: &mut [f32]) {
        if self.mode == ToneFilter::Bypass {
            return;
        }
        self.filter.process_interleaved(block);
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }
}
