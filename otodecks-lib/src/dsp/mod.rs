//! DSP stages of a deck chain: biquad designs, tone filter, three-band EQ
//! and the resampler.

pub mod biquad;
pub mod eq;
pub mod resampler;
pub mod tone;

pub use biquad::{Biquad, BiquadCoefficients, BUTTERWORTH_Q};
pub use eq::{EqBand, ThreeBandEq};
pub use resampler::Resampler;
pub use tone::{ToneFilter, ToneFilterRejection, ToneStage};
