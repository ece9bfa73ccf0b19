//! Closed-form biquad designs and a stereo direct-form-I filter.
//!
//! Designs follow the RBJ audio EQ cookbook. Shelf and peak designs take a
//! linear gain *factor* and use `A = sqrt(factor)`, so a factor of `2.0`
//! boosts the band by roughly +6 dB and `1.0` yields unity coefficients.

use std::f32::consts::{FRAC_1_SQRT_2, PI};

use crate::constants::CHANNELS;

/// Maximally flat (Butterworth) quality factor.
pub const BUTTERWORTH_Q: f32 = FRAC_1_SQRT_2;

const MIN_GAIN_FACTOR: f32 = 1.0e-4;

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoefficients {
    /// Pass-through coefficients.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Second-order low-pass.
    pub fn low_pass(sample_rate: f32, freq_hz: f32, q: f32) -> Self {
        let (cos_w0, alpha) = angular(sample_rate, freq_hz, q);

        let b1 = 1.0 - cos_w0;
        let b0 = b1 / 2.0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        normalized(b0, b1, b2, a0, a1, a2)
    }

    /// Second-order high-pass.
    pub fn high_pass(sample_rate: f32, freq_hz: f32, q: f32) -> Self {
        let (cos_w0, alpha) = angular(sample_rate, freq_hz, q);

        let b0 = (1.0 + cos_w0) / 2.0;
        let b1 = -1.0 - cos_w0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        normalized(b0, b1, b2, a0, a1, a2)
    }

    /// Low shelf boosting or cutting below `freq_hz` by `gain_factor`.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Rate the filter runs at, in Hz.
    /// * `freq_hz` - Shelf corner frequency, clamped below Nyquist.
    /// * `q` - Shelf slope as a quality factor.
    /// * `gain_factor` - Linear gain applied below the corner.
    ///
    /// # Returns
    ///
    /// Normalized coefficients, or [`BiquadCoefficients::IDENTITY`] for a
    /// factor of exactly `1.0`.
    pub fn low_shelf(sample_rate: f32, freq_hz: f32, q: f32, gain_factor: f32) -> Self {
        if gain_factor == 1.0 {
            return Self::IDENTITY;
        }
        let (cos_w0, alpha) = angular(sample_rate, freq_hz, q);
        let amplitude = amplitude(gain_factor);
        let sqrt_amplitude = amplitude.sqrt();

        let b0 = amplitude
            * ((amplitude + 1.0) - (amplitude - 1.0) * cos_w0 + 2.0 * sqrt_amplitude * alpha);
        let b1 = 2.0 * amplitude * ((amplitude - 1.0) - (amplitude + 1.0) * cos_w0);
        let b2 = amplitude
            * ((amplitude + 1.0) - (amplitude - 1.0) * cos_w0 - 2.0 * sqrt_amplitude * alpha);
        let a0 = (amplitude + 1.0) + (amplitude - 1.0) * cos_w0 + 2.0 * sqrt_amplitude * alpha;
        let a1 = -2.0 * ((amplitude - 1.0) + (amplitude + 1.0) * cos_w0);
        let a2 = (amplitude + 1.0) + (amplitude - 1.0) * cos_w0 - 2.0 * sqrt_amplitude * alpha;

        normalized(b0, b1, b2, a0, a1, a2)
    }

    /// Peaking filter boosting or cutting around `freq_hz` by `gain_factor`.
    ///
    /// A factor of exactly `1.0` returns [`BiquadCoefficients::IDENTITY`].
    pub fn peak(sample_rate: f32, freq_hz: f32, q: f32, gain_factor: f32) -> Self {
        if gain_factor == 1.0 {
            return Self::IDENTITY;
        }
        let (cos_w0, alpha) = angular(sample_rate, freq_hz, q);
        let amplitude = amplitude(gain_factor);

        let b0 = 1.0 + alpha * amplitude;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * amplitude;
        let a0 = 1.0 + alpha / amplitude;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / amplitude;

        normalized(b0, b1, b2, a0, a1, a2)
    }

    /// High shelf boosting or cutting above `freq_hz` by `gain_factor`.
    ///
    /// Mirror of [`BiquadCoefficients::low_shelf`].
    pub fn high_shelf(sample_rate: f32, freq_hz: f32, q: f32, gain_factor: f32) -> Self {
        if gain_factor == 1.0 {
            return Self::IDENTITY;
        }
        let (cos_w0, alpha) = angular(sample_rate, freq_hz, q);
        let amplitude = amplitude(gain_factor);
        let sqrt_amplitude = amplitude.sqrt();

        let b0 = amplitude
            * ((amplitude + 1.0) + (amplitude - 1.0) * cos_w0 + 2.0 * sqrt_amplitude * alpha);
        let b1 = -2.0 * amplitude * ((amplitude - 1.0) + (amplitude + 1.0) * cos_w0);
        let b2 = amplitude
            * ((amplitude + 1.0) + (amplitude - 1.0) * cos_w0 - 2.0 * sqrt_amplitude * alpha);
        let a0 = (amplitude + 1.0) - (amplitude - 1.0) * cos_w0 + 2.0 * sqrt_amplitude * alpha;
        let a1 = 2.0 * ((amplitude - 1.0) - (amplitude + 1.0) * cos_w0);
        let a2 = (amplitude + 1.0) - (amplitude - 1.0) * cos_w0 - 2.0 * sqrt_amplitude * alpha;

        normalized(b0, b1, b2, a0, a1, a2)
    }

    /// Linear magnitude of the transfer function at `freq_hz`.
    pub fn magnitude_at(&self, sample_rate: f32, freq_hz: f32) -> f32 {
        let w = 2.0 * std::f64::consts::PI * freq_hz as f64 / sample_rate as f64;
        let (cos1, sin1) = (w.cos(), w.sin());
        let (cos2, sin2) = ((2.0 * w).cos(), (2.0 * w).sin());
        let (b0, b1, b2) = (self.b0 as f64, self.b1 as f64, self.b2 as f64);
        let (a1, a2) = (self.a1 as f64, self.a2 as f64);

        let num_re = b0 + b1 * cos1 + b2 * cos2;
        let num_im = -(b1 * sin1 + b2 * sin2);
        let den_re = 1.0 + a1 * cos1 + a2 * cos2;
        let den_im = -(a1 * sin1 + a2 * sin2);

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        if den <= f64::EPSILON {
            return f32::INFINITY;
        }
        (num / den) as f32
    }

    /// True when the coefficients leave the signal untouched.
    pub fn is_identity(&self) -> bool {
        const TOLERANCE: f32 = 1.0e-6;
        (self.b0 - 1.0).abs() < TOLERANCE
            && self.b1.abs() < TOLERANCE
            && self.b2.abs() < TOLERANCE
            && self.a1.abs() < TOLERANCE
            && self.a2.abs() < TOLERANCE
    }
}

/// Stereo biquad with per-channel history.
///
/// History is kept in fixed arrays so processing never allocates.
#[derive(Clone, Debug, Default)]
pub struct Biquad {
    coeffs: BiquadCoefficients,
    x_n1: [f32; CHANNELS],
    x_n2: [f32; CHANNELS],
    y_n1: [f32; CHANNELS],
    y_n2: [f32; CHANNELS],
}

impl Biquad {
    pub fn new(coeffs: BiquadCoefficients) -> Self {
        Self {
            coeffs,
            ..Self::default()
        }
    }

    pub fn coefficients(&self) -> BiquadCoefficients {
        self.coeffs
    }

    /// Swap in new coefficients while keeping the filter history.
    pub fn set_coefficients(&mut self, coeffs: BiquadCoefficients) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn process_sample(&mut self, channel: usize, sample: f32) -> f32 {
        let c = &self.coeffs;
        let y = c.b0 * sample + c.b1 * self.x_n1[channel] + c.b2 * self.x_n2[channel]
            - c.a1 * self.y_n1[channel]
            - c.a2 * self.y_n2[channel];

        self.x_n2[channel] = self.x_n1[channel];
        self.x_n1[channel] = sample;
        self.y_n2[channel] = self.y_n1[channel];
        self.y_n1[channel] = flush_denormal(y);

        y
    }

    /// Filter an interleaved stereo block in place.
    pub fn process_interleaved(&mut self, block: &mut [f32]) {
        for frame in block.chunks_exact_mut(CHANNELS) {
            for (channel, sample) in frame.iter_mut().enumerate() {
                *sample = self.process_sample(channel, *sample);
            }
        }
    }

    pub fn reset(&mut self) {
        self.x_n1 = [0.0; CHANNELS];
        self.x_n2 = [0.0; CHANNELS];
        self.y_n1 = [0.0; CHANNELS];
        self.y_n2 = [0.0; CHANNELS];
    }
}

fn angular(sample_rate: f32, freq_hz: f32, q: f32) -> (f32, f32) {
    let freq_hz = sanitize_freq(freq_hz, sample_rate);
    let q = sanitize_q(q);
    let w0 = 2.0 * PI * freq_hz / sample_rate;
    (w0.cos(), w0.sin() / (2.0 * q))
}

fn amplitude(gain_factor: f32) -> f32 {
    if !gain_factor.is_finite() {
        return 1.0;
    }
    gain_factor.max(MIN_GAIN_FACTOR).sqrt()
}

fn sanitize_freq(freq_hz: f32, sample_rate: f32) -> f32 {
    let nyquist = sample_rate * 0.5;
    if !freq_hz.is_finite() {
        return nyquist * 0.5;
    }
    freq_hz.clamp(nyquist * 1.0e-5, nyquist * 0.995)
}

fn sanitize_q(q: f32) -> f32 {
    if !q.is_finite() {
        return BUTTERWORTH_Q;
    }
    q.clamp(0.1, 10.0)
}

fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> BiquadCoefficients {
    BiquadCoefficients {
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
        a1: a1 / a0,
        a2: a2 / a0,
    }
}

#[inline]
fn flush_denormal(value: f32) -> f32 {
    if value.abs() < 1.0e-20 {
        0.0
    } else {
        value
    }
}
