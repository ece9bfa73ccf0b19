//! Fixed three-band EQ: low shelf, mid peak and high shelf in series.

use serde::{Deserialize, Serialize};

use crate::constants::{HIGH_SHELF_HZ, LOW_SHELF_HZ, PEAK_HZ};

use super::biquad::{Biquad, BiquadCoefficients, BUTTERWORTH_Q};

/// One of the three EQ bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqBand {
    Low,
    Mid,
    High,
}

impl EqBand {
    pub const ALL: [EqBand; 3] = [EqBand::Low, EqBand::Mid, EqBand::High];

    /// Centre or corner frequency of the band in Hz.
    pub fn frequency_hz(self) -> f32 {
        match self {
            EqBand::Low => LOW_SHELF_HZ,
            EqBand::Mid => PEAK_HZ,
            EqBand::High => HIGH_SHELF_HZ,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EqBand::Low => "low shelf",
            EqBand::Mid => "peak filter",
            EqBand::High => "high shelf",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            EqBand::Low => 0,
            EqBand::Mid => 1,
            EqBand::High => 2,
        }
    }

    /// Closed-form coefficients for this band at `gain_factor`.
    pub fn coefficients(self, sample_rate: u32, gain_factor: f32) -> BiquadCoefficients {
        let sample_rate = sample_rate as f32;
        let freq_hz = self.frequency_hz();
        match self {
            EqBand::Low => {
                BiquadCoefficients::low_shelf(sample_rate, freq_hz, BUTTERWORTH_Q, gain_factor)
            }
            EqBand::Mid => BiquadCoefficients::peak(sample_rate, freq_hz, BUTTERWORTH_Q, gain_factor),
            EqBand::High => {
                BiquadCoefficients::high_shelf(sample_rate, freq_hz, BUTTERWORTH_Q, gain_factor)
            }
        }
    }
}

/// Runtime state for the three-band cascade.
#[derive(Debug, Clone)]
pub struct ThreeBandEq {
    sample_rate: u32,
    gains: [f32; 3],
    filters: [Biquad; 3],
}

impl Default for ThreeBandEq {
    fn default() -> Self {
        Self {
            sample_rate: 0,
            gains: [1.0; 3],
            filters: Default::default(),
        }
    }
}

impl ThreeBandEq {
    pub fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        for band in EqBand::ALL {
            let idx = band.index();
            self.filters[idx] = Biquad::new(band.coefficients(sample_rate, self.gains[idx]));
        }
    }

    pub fn gain(&self, band: EqBand) -> f32 {
        self.gains[band.index()]
    }

    /// Recompute a band's coefficients when its gain changed.
    ///
    /// Must only be called between blocks.
    pub fn update(&mut self, band: EqBand, gain_factor: f32) {
        let idx = band.index();
        if self.gains[idx] == gain_factor {
            return;
        }
        self.gains[idx] = gain_factor;
        if self.sample_rate == 0 {
            return;
        }
        self.filters[idx].set_coefficients(band.coefficients(self.sample_rate, gain_factor));
    }

    pub fn coefficients(&self, band: EqBand) -> BiquadCoefficients {
        self.filters[band.index()].coefficients()
    }

    /// Run the block through low shelf, peak and high shelf in that order.
    pub fn process(&mut self, block: &mut [f32]) {
        for filter in &mut self.filters {
            if filter.coefficients().is_identity() {
                continue;
            }
            filter.process_interleaved(block);
        }
    }

    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_eq_is_transparent() {
        let mut eq = ThreeBandEq::default();
        eq.prepare(44_100);
        let mut block = vec![0.3_f32, -0.3, 0.1, -0.1, 0.7, -0.7];
        let expected = block.clone();
        eq.process(&mut block);
        assert_eq!(block, expected);
    }

    #[test]
    fn band_update_only_touches_that_band() {
        let mut eq = ThreeBandEq::default();
        eq.prepare(44_100);
        eq.update(EqBand::Mid, 2.0);

        assert!(eq.coefficients(EqBand::Low).is_identity());
        assert!(eq.coefficients(EqBand::High).is_identity());
        let mid = eq.coefficients(EqBand::Mid);
        assert!((mid.magnitude_at(44_100.0, 3_000.0) - 2.0).abs() < 0.01);
    }

    #[test]
    fn bass_cut_reduces_low_frequencies() {
        let mut eq = ThreeBandEq::default();
        eq.prepare(44_100);
        eq.update(EqBand::Low, 0.01);
        let low = eq.coefficients(EqBand::Low);
        assert!(low.magnitude_at(44_100.0, 30.0) < 0.05);
        assert!((low.magnitude_at(44_100.0, 10_000.0) - 1.0).abs() < 0.02);
    }

    #[test]
    fn band_back_at_unity_stops_filtering() {
        let mut eq = ThreeBandEq::default();
        eq.prepare(44_100);
        eq.update(EqBand::Low, 2.0);
        let mut block = vec![0.5_f32; 64];
        eq.process(&mut block);

        eq.update(EqBand::Low, 1.0);
        assert!(eq.coefficients(EqBand::Low).is_identity());
        let mut block = vec![0.25_f32, -0.25, 0.5, -0.5];
        let expected = block.clone();
        eq.process(&mut block);
        assert_eq!(block, expected);
    }

    #[test]
    fn gains_set_before_prepare_are_applied() {
        let mut eq = ThreeBandEq::default();
        eq.update(EqBand::High, 0.5);
        eq.prepare(48_000);
        assert!(!eq.coefficients(EqBand::High).is_identity());
        assert_eq!(eq.gain(EqBand::High), 0.5);
    }
}
