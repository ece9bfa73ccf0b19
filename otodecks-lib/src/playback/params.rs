//! Lock-free parameter cells shared between a [`Deck`](super::Deck) and its chain.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dsp::ToneFilter;

/// A value that round-trips through a single `u64`.
pub trait PackedParam: Copy {
    fn pack(self) -> u64;
    fn unpack(bits: u64) -> Self;
}

impl PackedParam for f64 {
    fn pack(self) -> u64 {
        self.to_bits()
    }

    fn unpack(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

impl PackedParam for u64 {
    fn pack(self) -> u64 {
        self
    }

    fn unpack(bits: u64) -> Self {
        bits
    }
}

impl PackedParam for bool {
    fn pack(self) -> u64 {
        self as u64
    }

    fn unpack(bits: u64) -> Self {
        bits != 0
    }
}

impl PackedParam for ToneFilter {
    fn pack(self) -> u64 {
        ToneFilter::pack(self)
    }

    fn unpack(bits: u64) -> Self {
        ToneFilter::unpack(bits)
    }
}

/// Single-word atomic cell. Readers always see a whole value.
#[derive(Debug)]
pub struct ParamCell<T: PackedParam> {
    bits: AtomicU64,
    _marker: PhantomData<T>,
}

impl<T: PackedParam> ParamCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            bits: AtomicU64::new(value.pack()),
            _marker: PhantomData,
        }
    }

    pub fn load(&self) -> T {
        T::unpack(self.bits.load(Ordering::Acquire))
    }

    pub fn store(&self, value: T) {
        self.bits.store(value.pack(), Ordering::Release);
    }
}

const EMPTY_SEEK: u64 = 0x7ff8_0000_0000_0000;

/// Single-slot seek request. A later request overwrites an unconsumed one.
#[derive(Debug)]
pub struct SeekMailbox {
    bits: AtomicU64,
}

impl Default for SeekMailbox {
    fn default() -> Self {
        Self {
            bits: AtomicU64::new(EMPTY_SEEK),
        }
    }
}

impl SeekMailbox {
    pub fn post(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::Release);
    }

    /// Pending request without consuming it.
    pub fn peek(&self) -> Option<f64> {
        let seconds = f64::from_bits(self.bits.load(Ordering::Acquire));
        (!seconds.is_nan()).then_some(seconds)
    }

    /// Consume the pending request, if any.
    pub fn take(&self) -> Option<f64> {
        let seconds = f64::from_bits(self.bits.swap(EMPTY_SEEK, Ordering::AcqRel));
        (!seconds.is_nan()).then_some(seconds)
    }

    pub fn clear(&self) {
        self.bits.store(EMPTY_SEEK, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_returns_last_store() {
        let cell = ParamCell::new(0.5_f64);
        assert_eq!(cell.load(), 0.5);
        cell.store(1.75);
        assert_eq!(cell.load(), 1.75);

        let flag = ParamCell::new(false);
        flag.store(true);
        assert!(flag.load());
    }

    #[test]
    fn tone_cell_never_mixes_tag_and_cutoff() {
        let cell = ParamCell::new(ToneFilter::Bypass);
        cell.store(ToneFilter::HighPass { cutoff_hz: 500.0 });
        assert_eq!(cell.load(), ToneFilter::HighPass { cutoff_hz: 500.0 });
    }

    #[test]
    fn mailbox_is_consumed_once() {
        let mailbox = SeekMailbox::default();
        assert_eq!(mailbox.take(), None);

        mailbox.post(3.0);
        mailbox.post(4.5);
        assert_eq!(mailbox.peek(), Some(4.5));
        assert_eq!(mailbox.take(), Some(4.5));
        assert_eq!(mailbox.take(), None);

        mailbox.post(1.0);
        mailbox.clear();
        assert_eq!(mailbox.peek(), None);
    }
}
