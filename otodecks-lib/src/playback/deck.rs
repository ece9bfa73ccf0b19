//! A deck is split in two halves created together by [`deck_pair`]:
//!
//! - [`Deck`] lives on the control thread. It validates every request and
//!   publishes accepted values into lock-free cells.
//! - [`DeckChain`] is moved into the [`Mixer`](super::Mixer) and runs on the
//!   audio thread. It picks up new values once per block, so every stage sees
//!   either the old or the new value for a whole block.
//!
//! Newly loaded sources cross to the audio thread over an SPSC ring, and the
//! sources they replace travel back over a second ring so they are freed on
//! the control thread.
//!
//! Every shared cell has exactly one writer. The control side owns the play
//! request and the load count; the audio side owns the published position,
//! the attach count and the request under which the source last ran out.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use rtrb::{Consumer, Producer, RingBuffer};
use serde::Serialize;

use crate::audio::{AudioSource, SourceInfo};
use crate::constants::{MAX_BAND_GAIN, MAX_GAIN, MAX_SPEED, MIN_BAND_GAIN, MIN_GAIN};
use crate::dsp::{EqBand, Resampler, ThreeBandEq, ToneFilter, ToneFilterRejection, ToneStage};

use super::controls::{AudioParameterSink, TransportControl};
use super::params::{PackedParam, ParamCell, SeekMailbox};
use super::transport::Transport;
use super::DeckError;

const LOAD_QUEUE_CAPACITY: usize = 4;

/// Start or stop request stamped with a generation.
///
/// Each request gets a new generation, so the audio side can report that the
/// source ran out under one request without overwriting a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlayRequest {
    generation: u64,
    playing: bool,
}

impl PackedParam for PlayRequest {
    fn pack(self) -> u64 {
        (self.generation << 1) | self.playing as u64
    }

    fn unpack(bits: u64) -> Self {
        Self {
            generation: bits >> 1,
            playing: bits & 1 == 1,
        }
    }
}

#[derive(Debug)]
pub(crate) struct DeckShared {
    gain: ParamCell<f64>,
    speed: ParamCell<f64>,
    tone: ParamCell<ToneFilter>,
    bands: [ParamCell<f64>; 3],
    looping: ParamCell<bool>,
    length: ParamCell<f64>,
    play: ParamCell<PlayRequest>,
    loads_sent: ParamCell<u64>,
    seek: SeekMailbox,
    // Written by the audio thread only.
    position: ParamCell<f64>,
    loads_attached: ParamCell<u64>,
    finished: ParamCell<PlayRequest>,
}

impl DeckShared {
    fn new() -> Self {
        Self {
            gain: ParamCell::new(1.0),
            speed: ParamCell::new(1.0),
            tone: ParamCell::new(ToneFilter::Bypass),
            bands: [
                ParamCell::new(1.0),
                ParamCell::new(1.0),
                ParamCell::new(1.0),
            ],
            looping: ParamCell::new(false),
            length: ParamCell::new(0.0),
            play: ParamCell::new(PlayRequest {
                generation: 0,
                playing: false,
            }),
            loads_sent: ParamCell::new(0),
            seek: SeekMailbox::default(),
            position: ParamCell::new(0.0),
            loads_attached: ParamCell::new(0),
            finished: ParamCell::new(PlayRequest {
                generation: u64::MAX >> 1,
                playing: false,
            }),
        }
    }

    /// Control side only.
    fn request_playing(&self, playing: bool) {
        let generation = self.play.load().generation.wrapping_add(1) & (u64::MAX >> 1);
        self.play.store(PlayRequest {
            generation,
            playing,
        });
    }

    /// Playing was requested and the source has not run out since.
    fn is_playing(&self) -> bool {
        let request = self.play.load();
        request.playing && self.finished.load() != request
    }

    fn current_position(&self) -> f64 {
        if let Some(pending) = self.seek.peek() {
            return pending.clamp(0.0, self.length.load());
        }
        // A load the audio thread has not attached yet starts at zero.
        if self.loads_attached.load() != self.loads_sent.load() {
            return 0.0;
        }
        self.position.load()
    }
}

/// Snapshot of every control value of a deck.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChainParameters {
    pub gain: f64,
    pub speed: f64,
    pub tone: ToneFilter,
    pub bass: f64,
    pub mid: f64,
    pub treble: f64,
    pub looping: bool,
    pub position_seconds: f64,
}

/// Create the control and audio halves of one deck.
pub fn deck_pair(name: impl Into<String>) -> (Deck, DeckChain) {
    let name = name.into();
    let shared = Arc::new(DeckShared::new());
    let (loads_tx, loads_rx) = RingBuffer::new(LOAD_QUEUE_CAPACITY);
    let (retired_tx, retired_rx) = RingBuffer::new(LOAD_QUEUE_CAPACITY + 1);

    let deck = Deck {
        name: name.clone(),
        shared: shared.clone(),
        loads: loads_tx,
        retired: retired_rx,
        info: None,
    };
    let chain = DeckChain {
        name,
        shared,
        loads: loads_rx,
        retired: retired_tx,
        transport: Transport::new(),
        speed: Resampler::default(),
        tone: ToneStage::default(),
        eq: ThreeBandEq::default(),
        request: PlayRequest {
            generation: 0,
            playing: false,
        },
        attached: 0,
        prepared: false,
    };
    (deck, chain)
}

/// Control half of a deck.
pub struct Deck {
    name: String,
    shared: Arc<DeckShared>,
    loads: Producer<AudioSource>,
    retired: Consumer<AudioSource>,
    info: Option<SourceInfo>,
}

impl Deck {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.info.as_ref()
    }

    pub fn parameters(&self) -> ChainParameters {
        let shared = &self.shared;
        ChainParameters {
            gain: shared.gain.load(),
            speed: shared.speed.load(),
            tone: shared.tone.load(),
            bass: shared.bands[EqBand::Low.index()].load(),
            mid: shared.bands[EqBand::Mid.index()].load(),
            treble: shared.bands[EqBand::High.index()].load(),
            looping: shared.looping.load(),
            position_seconds: shared.current_position(),
        }
    }

    pub fn band_gain(&self, band: EqBand) -> f64 {
        self.shared.bands[band.index()].load()
    }

    /// Read-only view for observers on other threads.
    pub fn monitor(&self) -> DeckMonitor {
        DeckMonitor {
            shared: self.shared.clone(),
        }
    }

    /// Free sources the audio thread has replaced. Returns how many.
    pub fn release_retired(&mut self) -> usize {
        let mut released = 0;
        while let Ok(source) = self.retired.pop() {
            debug!("deck {}: released {}", self.name, source.info().path.display());
            released += 1;
        }
        released
    }

    fn reject(&self, err: DeckError) -> DeckError {
        warn!("deck {}: rejected: {}", self.name, err);
        err
    }

    fn check_range(
        &self,
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<f64, DeckError> {
        if !value.is_finite() {
            return Err(self.reject(DeckError::NotFinite { parameter }));
        }
        if value < min || value > max {
            return Err(self.reject(DeckError::OutOfRange {
                parameter,
                value,
                min,
                max,
            }));
        }
        Ok(value)
    }

    fn tone_rejection(
        &self,
        parameter: &'static str,
        value: f64,
        rejection: ToneFilterRejection,
    ) -> DeckError {
        let err = match rejection {
            ToneFilterRejection::NotFinite => DeckError::NotFinite { parameter },
            ToneFilterRejection::OutOfRange { min, max } => DeckError::OutOfRange {
                parameter,
                value,
                min,
                max,
            },
        };
        self.reject(err)
    }
}

impl TransportControl for Deck {
    fn load(&mut self, path: &Path) -> Result<SourceInfo, DeckError> {
        self.release_retired();
        if self.loads.slots() == 0 {
            return Err(self.reject(DeckError::QueueFull));
        }

        let source = AudioSource::open(path).map_err(|err| self.reject(DeckError::Load(err)))?;
        let info = source.info().clone();

        let shared = &self.shared;
        shared.request_playing(false);
        shared.looping.store(false);
        shared.length.store(info.length_seconds());
        shared.seek.clear();
        if self.loads.push(source).is_err() {
            return Err(self.reject(DeckError::QueueFull));
        }
        shared
            .loads_sent
            .store(shared.loads_sent.load().wrapping_add(1));

        info!(
            "deck {}: loaded {} ({:.2}s @ {} Hz)",
            self.name,
            info.path.display(),
            info.length_seconds(),
            info.native_sample_rate
        );
        self.info = Some(info.clone());
        Ok(info)
    }

    fn start(&self) {
        if self.info.is_none() {
            debug!("deck {}: start ignored, nothing loaded", self.name);
            return;
        }
        self.shared.request_playing(true);
    }

    fn stop(&self) {
        self.shared.request_playing(false);
    }

    fn set_position(&self, seconds: f64) -> Result<(), DeckError> {
        if !seconds.is_finite() {
            return Err(self.reject(DeckError::NotFinite {
                parameter: "position",
            }));
        }
        if self.info.is_none() {
            debug!("deck {}: seek ignored, nothing loaded", self.name);
            return Ok(());
        }
        self.shared.seek.post(seconds);
        debug!("deck {}: seek to {:.3}s", self.name, seconds);
        Ok(())
    }

    fn set_position_relative(&self, fraction: f64) -> Result<(), DeckError> {
        let fraction = self.check_range("relative position", fraction, 0.0, 1.0)?;
        if self.info.is_none() {
            return Err(self.reject(DeckError::NoSourceLoaded));
        }
        self.set_position(fraction * self.length_in_seconds())
    }

    fn toggle_looping(&self) -> bool {
        if self.info.is_none() {
            debug!("deck {}: loop toggle ignored, nothing loaded", self.name);
            return false;
        }
        let looping = !self.shared.looping.load();
        self.shared.looping.store(looping);
        debug!("deck {}: looping {}", self.name, looping);
        looping
    }

    fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    fn is_looping(&self) -> bool {
        self.shared.looping.load()
    }

    fn length_in_seconds(&self) -> f64 {
        self.shared.length.load()
    }

    fn current_position(&self) -> f64 {
        self.shared.current_position()
    }
}

impl AudioParameterSink for Deck {
    fn set_gain(&self, gain: f64) -> Result<(), DeckError> {
        let gain = self.check_range("gain", gain, MIN_GAIN, MAX_GAIN)?;
        self.shared.gain.store(gain);
        debug!("deck {}: gain {}", self.name, gain);
        Ok(())
    }

    fn set_speed(&self, ratio: f64) -> Result<(), DeckError> {
        let ratio = self.check_range("speed", ratio, 0.0, MAX_SPEED)?;
        if ratio == 0.0 {
            return Err(self.reject(DeckError::OutOfRange {
                parameter: "speed",
                value: ratio,
                min: 0.0,
                max: MAX_SPEED,
            }));
        }
        self.shared.speed.store(ratio);
        debug!("deck {}: speed {}", self.name, ratio);
        Ok(())
    }

    fn set_tone_filter(&self, filter: ToneFilter) -> Result<(), DeckError> {
        let cutoff = filter.to_signed_hz().abs();
        let filter = filter
            .validate()
            .map_err(|rejection| self.tone_rejection("tone cutoff", cutoff, rejection))?;
        self.shared.tone.store(filter);
        debug!("deck {}: tone {:?}", self.name, filter);
        Ok(())
    }

    fn set_band_gain(&self, band: EqBand, gain: f64) -> Result<(), DeckError> {
        let gain = self.check_range(band.name(), gain, MIN_BAND_GAIN, MAX_BAND_GAIN)?;
        self.shared.bands[band.index()].store(gain);
        debug!("deck {}: {} {}", self.name, band.name(), gain);
        Ok(())
    }

    fn set_frequency(&self, signed_hz: f64) -> Result<(), DeckError> {
        let filter = ToneFilter::from_signed_hz(signed_hz)
            .map_err(|rejection| self.tone_rejection("frequency", signed_hz, rejection))?;
        self.set_tone_filter(filter)
    }
}

/// Cloneable read-only view of a deck's published state.
#[derive(Debug, Clone)]
pub struct DeckMonitor {
    shared: Arc<DeckShared>,
}

impl DeckMonitor {
    pub fn position(&self) -> f64 {
        self.shared.current_position()
    }

    pub fn length(&self) -> f64 {
        self.shared.length.load()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    pub fn is_looping(&self) -> bool {
        self.shared.looping.load()
    }
}

/// Audio half of a deck: transport, speed, tone filter and EQ in series.
pub struct DeckChain {
    name: String,
    shared: Arc<DeckShared>,
    loads: Consumer<AudioSource>,
    retired: Producer<AudioSource>,
    transport: Transport,
    speed: Resampler,
    tone: ToneStage,
    eq: ThreeBandEq,
    request: PlayRequest,
    attached: u64,
    prepared: bool,
}

impl DeckChain {
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Allocate every buffer the chain needs for `block_size` frames.
    pub fn prepare_to_play(&mut self, block_size: usize, sample_rate: u32) {
        let block_size = block_size.max(1);
        self.transport.prepare(block_size, sample_rate);
        self.speed.prepare(block_size);
        self.tone.prepare(sample_rate);
        self.eq.prepare(sample_rate);
        self.prepared = true;
        debug!(
            "deck chain {}: prepared ({} frames @ {} Hz)",
            self.name, block_size, sample_rate
        );
    }

    /// Render one interleaved stereo block. Silent until prepared.
    pub fn next_block(&mut self, out: &mut [f32]) {
        if !self.prepared {
            out.fill(0.0);
            return;
        }

        self.sync();

        let transport = &mut self.transport;
        self.speed.render(out, |chunk: &mut [f32]| transport.render(chunk));
        self.tone.process(out);
        self.eq.process(out);

        self.shared.position.store(self.transport.position_seconds());
        self.shared.loads_attached.store(self.attached);
        if self.transport.take_finished() {
            self.shared.finished.store(self.request);
        }
    }

    pub fn release_resources(&mut self) {
        self.prepared = false;
        self.transport.release();
        self.speed.reset();
        self.tone.reset();
        self.eq.reset();
    }

    /// Pick up control-side changes: sources, then seek, then parameters.
    fn sync(&mut self) {
        // Read before draining loads so a start is never seen ahead of the
        // source it was issued for.
        self.request = self.shared.play.load();

        let mut attached = false;
        while let Ok(source) = self.loads.pop() {
            if let Some(previous) = self.transport.attach(source) {
                // Dropped here only if the control side stopped draining.
                let _ = self.retired.push(previous);
            }
            self.attached = self.attached.wrapping_add(1);
            attached = true;
        }
        if attached {
            self.speed.reset();
            self.tone.reset();
            self.eq.reset();
        }

        if let Some(seconds) = self.shared.seek.take() {
            self.transport.seek_seconds(seconds);
            self.speed.reset();
        }

        let shared = &self.shared;
        self.transport.set_gain(shared.gain.load() as f32);
        self.speed.set_ratio(shared.speed.load());
        self.tone.update(shared.tone.load());
        for band in EqBand::ALL {
            self.eq.update(band, shared.bands[band.index()].load() as f32);
        }
        self.transport.set_looping(shared.looping.load());
        if self.request.playing && shared.finished.load() != self.request {
            self.transport.start();
        } else if self.transport.is_playing() {
            self.transport.stop();
            // Drop transport output buffered before the stop.
            self.speed.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    use crate::constants::CHANNELS;
    use crate::test_support::{write_garbage, write_sine_wav};

    const RATE: u32 = 8_000;
    const BLOCK: usize = 500;

    fn render_blocks(chain: &mut DeckChain, blocks: usize) -> Vec<f32> {
        let mut out = vec![0.0_f32; BLOCK * CHANNELS];
        for _ in 0..blocks {
            chain.next_block(&mut out);
        }
        out
    }

    fn loaded_pair(dir: &Path, seconds: f64) -> (Deck, DeckChain) {
        let path = write_sine_wav(dir, "track.wav", seconds, RATE, 1, 220.0);
        let (mut deck, mut chain) = deck_pair("A");
        chain.prepare_to_play(BLOCK, RATE);
        deck.load(&path).expect("load track");
        (deck, chain)
    }

    #[test]
    fn gain_accepts_only_zero_to_two() {
        let (deck, _chain) = deck_pair("A");
        assert!(deck.set_gain(0.0).is_ok());
        assert!(deck.set_gain(2.0).is_ok());
        assert!(deck.set_gain(1.5).is_ok());

        assert!(matches!(deck.set_gain(-0.1), Err(DeckError::OutOfRange { .. })));
        assert!(deck.set_gain(2.01).is_err());
        assert!(matches!(deck.set_gain(f64::NAN), Err(DeckError::NotFinite { .. })));
        assert_eq!(deck.parameters().gain, 1.5);
    }

    #[test]
    fn speed_must_be_positive_and_at_most_one_hundred() {
        let (deck, _chain) = deck_pair("A");
        assert!(deck.set_speed(100.0).is_ok());
        assert!(deck.set_speed(0.1).is_ok());
        assert!(deck.set_speed(0.0).is_err());
        assert!(deck.set_speed(-1.0).is_err());
        assert!(deck.set_speed(100.5).is_err());
        assert_eq!(deck.parameters().speed, 0.1);
    }

    #[test]
    fn band_gains_are_range_checked() {
        let (deck, _chain) = deck_pair("A");
        assert!(deck.set_low_shelf(0.01).is_ok());
        assert!(deck.set_peak_filter(2.0).is_ok());
        assert!(deck.set_high_shelf(0.0).is_err());
        assert!(deck.set_high_shelf(2.5).is_err());

        let params = deck.parameters();
        assert_eq!(params.bass, 0.01);
        assert_eq!(params.mid, 2.0);
        assert_eq!(params.treble, 1.0);
    }

    #[test]
    fn relative_position_needs_a_source_and_unit_range() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (deck, _chain) = deck_pair("A");
        assert!(matches!(
            deck.set_position_relative(0.5),
            Err(DeckError::NoSourceLoaded)
        ));
        assert_eq!(deck.position_relative(), None);

        let (deck, _chain) = loaded_pair(dir.path(), 10.0);
        deck.set_position_relative(0.25).expect("relative seek");
        assert!((deck.current_position() - 2.5).abs() < 1e-9);

        assert!(deck.set_position_relative(1.5).is_err());
        assert!(deck.set_position_relative(-0.1).is_err());
        assert!((deck.current_position() - 2.5).abs() < 1e-9);
        assert_eq!(deck.position_relative(), Some(0.25));
    }

    #[test]
    fn failed_load_leaves_deck_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut deck, mut chain) = loaded_pair(dir.path(), 10.0);
        deck.start();
        deck.set_position(3.0).expect("seek");

        let garbage = write_garbage(dir.path(), "broken.wav");
        assert!(matches!(deck.load(&garbage), Err(DeckError::Load(_))));
        assert!(deck.is_playing());
        assert!((deck.current_position() - 3.0).abs() < 1e-9);
        assert!((deck.length_in_seconds() - 10.0).abs() < 1e-6);
        let path = &deck.source_info().expect("still loaded").path;
        assert!(path.ends_with("track.wav"));

        render_blocks(&mut chain, 1);
        assert!(deck.is_playing());
    }

    #[test]
    fn loop_toggle_without_source_is_false_and_never_plays() {
        let (deck, _chain) = deck_pair("A");
        assert!(!deck.toggle_looping());
        assert!(!deck.toggle_looping());
        assert!(!deck.is_looping());
        assert!(!deck.is_playing());

        deck.start();
        assert!(!deck.is_playing());
    }

    #[test]
    fn frequency_knob_swaps_filter_at_block_boundaries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (deck, mut chain) = loaded_pair(dir.path(), 1.0);

        deck.set_frequency(-1_000.0).expect("low-pass");
        render_blocks(&mut chain, 1);
        assert_eq!(chain.tone.mode(), ToneFilter::LowPass { cutoff_hz: 1_000.0 });

        deck.set_frequency(0.0).expect("bypass");
        assert_eq!(chain.tone.mode(), ToneFilter::LowPass { cutoff_hz: 1_000.0 });
        render_blocks(&mut chain, 1);
        assert_eq!(chain.tone.mode(), ToneFilter::Bypass);

        deck.set_frequency(500.0).expect("high-pass");
        render_blocks(&mut chain, 1);
        assert_eq!(chain.tone.mode(), ToneFilter::HighPass { cutoff_hz: 500.0 });

        assert!(deck.set_frequency(-6_000.0).is_err());
        assert!(deck.set_tone_filter(ToneFilter::LowPass { cutoff_hz: 0.0 }).is_err());
        assert_eq!(deck.parameters().tone, ToneFilter::HighPass { cutoff_hz: 500.0 });
    }

    #[test]
    fn double_speed_covers_two_seconds_per_second() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (deck, mut chain) = loaded_pair(dir.path(), 10.0);
        deck.set_speed(2.0).expect("speed");
        deck.start();
        assert!(deck.is_playing());

        // One second of output at the device rate.
        let out = render_blocks(&mut chain, RATE as usize / BLOCK);
        assert!(deck.is_playing());
        assert!(out.iter().any(|sample| *sample != 0.0));
        let position = deck.current_position();
        assert!((position - 2.0).abs() < 0.1, "{}", position);
    }

    #[test]
    fn seek_past_end_clamps_and_stops() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (deck, mut chain) = loaded_pair(dir.path(), 1.0);
        deck.start();
        render_blocks(&mut chain, 1);

        deck.set_position(50.0).expect("seek");
        assert!((deck.current_position() - 1.0).abs() < 1e-9);
        render_blocks(&mut chain, 1);
        assert!(!deck.is_playing());
        assert!((deck.current_position() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn looping_deck_keeps_playing_past_the_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (deck, mut chain) = loaded_pair(dir.path(), 1.0);
        assert!(deck.toggle_looping());
        deck.start();

        render_blocks(&mut chain, 3 * RATE as usize / BLOCK);
        assert!(deck.is_playing());
        assert!(deck.current_position() < 1.0);
    }

    #[test]
    fn replaced_sources_are_released_on_the_control_side() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut deck, mut chain) = loaded_pair(dir.path(), 1.0);
        render_blocks(&mut chain, 1);

        let second = write_sine_wav(dir.path(), "second.wav", 2.0, RATE, 2, 330.0);
        let info = deck.load(&second).expect("second load");
        assert_eq!(info.source_channels, 2);
        assert!((deck.length_in_seconds() - 2.0).abs() < 1e-6);

        render_blocks(&mut chain, 1);
        assert_eq!(deck.release_retired(), 1);
        assert_eq!(deck.release_retired(), 0);
    }

    #[test]
    fn probing_does_not_move_the_playhead() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (deck, mut chain) = loaded_pair(dir.path(), 10.0);
        deck.set_position(4.0).expect("seek");
        render_blocks(&mut chain, 1);
        let before = deck.current_position();

        let path = &deck.source_info().expect("loaded").path;
        let first = AudioSource::probe(path).expect("probe").length_seconds();
        let second = AudioSource::probe(path).expect("probe").length_seconds();
        assert_eq!(first, second);
        assert_eq!(deck.current_position(), before);
    }

    #[test]
    fn stopped_deck_is_silent_from_the_next_block() {
        let dir = tempfile::tempdir().expect("tempdir");
        for speed in [1.0, 4.0] {
            let (deck, mut chain) = loaded_pair(dir.path(), 10.0);
            deck.set_speed(speed).expect("speed");
            deck.start();
            let out = render_blocks(&mut chain, 2);
            assert!(out.iter().any(|sample| *sample != 0.0));

            deck.stop();
            let out = render_blocks(&mut chain, 1);
            let audible = out.iter().filter(|sample| **sample != 0.0).count();
            assert_eq!(audible, 0, "speed {}", speed);
        }
    }

    #[test]
    fn play_request_packs_generation_and_flag() {
        let request = PlayRequest {
            generation: 41,
            playing: true,
        };
        assert_eq!(PlayRequest::unpack(request.pack()), request);
        assert_ne!(
            request.pack(),
            PlayRequest {
                generation: 41,
                playing: false
            }
            .pack()
        );
    }

    #[test]
    fn start_after_reload_is_kept_while_the_chain_runs_elsewhere() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_sine_wav(dir.path(), "blip.wav", 0.02, RATE, 1, 440.0);
        let (mut deck, mut chain) = deck_pair("A");
        chain.prepare_to_play(64, RATE);

        let running = Arc::new(AtomicBool::new(true));
        let audio = {
            let running = running.clone();
            std::thread::spawn(move || {
                let mut out = vec![0.0_f32; 64 * CHANNELS];
                while running.load(Ordering::Relaxed) {
                    chain.next_block(&mut out);
                    std::thread::yield_now();
                }
            })
        };

        for round in 0..100 {
            deck.load(&path).expect("load");
            deck.start();
            let deadline = Instant::now() + Duration::from_secs(5);
            while deck.is_playing() {
                assert!(Instant::now() < deadline, "round {} never finished", round);
                std::thread::yield_now();
            }
            let position = deck.current_position();
            assert!(
                (position - deck.length_in_seconds()).abs() < 1e-6,
                "round {}: stopped at {}",
                round,
                position
            );
        }

        running.store(false, Ordering::Relaxed);
        audio.join().expect("audio thread");
    }

    #[test]
    fn pending_load_reports_position_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut deck, mut chain) = loaded_pair(dir.path(), 10.0);
        deck.start();
        render_blocks(&mut chain, 4);
        assert!(deck.current_position() > 0.0);

        let second = write_sine_wav(dir.path(), "second.wav", 3.0, RATE, 1, 330.0);
        deck.load(&second).expect("second load");
        assert_eq!(deck.current_position(), 0.0);
        assert!(!deck.is_playing());

        render_blocks(&mut chain, 1);
        assert_eq!(deck.current_position(), 0.0);
        assert!(!deck.is_playing());
    }

    #[test]
    fn unprepared_chain_is_silent() {
        let (_deck, mut chain) = deck_pair("A");
        let mut out = vec![1.0_f32; 64];
        chain.next_block(&mut out);
        assert!(out.iter().all(|sample| *sample == 0.0));
        assert!(!chain.is_prepared());
    }
}
