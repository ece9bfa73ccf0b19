//! Decoded PCM source for a single loaded file.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::constants::CHANNELS;

use super::SourceError;

/// File metadata known once a source has been probed or decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub native_sample_rate: u32,
    pub total_frames: u64,
    pub source_channels: usize,
}

impl SourceInfo {
    /// `total_frames / native_sample_rate`.
    pub fn length_seconds(&self) -> f64 {
        if self.native_sample_rate == 0 {
            return 0.0;
        }
        self.total_frames as f64 / self.native_sample_rate as f64
    }
}

/// Fully decoded, interleaved stereo audio with its own read cursor.
///
/// Decoding happens in [`AudioSource::open`] so the real-time thread only
/// ever copies frames out of memory.
#[derive(Debug, Clone)]
pub struct AudioSource {
    info: SourceInfo,
    samples: Vec<f32>,
    position: usize,
    looping: bool,
}

impl AudioSource {
    /// Decode an entire file.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, its format or codec is
    /// not supported, or it decodes to zero frames.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let mut format = open_format(path)?;
        let (track_id, params) = first_audio_track(format.as_ref())?;

        let mut samples = Vec::new();
        let mut native_sample_rate = params.sample_rate.unwrap_or(0);
        let mut source_channels = params.channels.map(|c| c.count()).unwrap_or(0);
        decode_packets(format.as_mut(), track_id, &params, path, |block, channels, rate| {
            if native_sample_rate == 0 {
                native_sample_rate = rate;
            }
            source_channels = channels;
            push_as_stereo(&mut samples, block, channels);
        })?;

        if samples.is_empty() || native_sample_rate == 0 {
            return Err(SourceError::Empty);
        }

        let info = SourceInfo {
            path: path.to_path_buf(),
            native_sample_rate,
            total_frames: (samples.len() / CHANNELS) as u64,
            source_channels,
        };
        debug!(
            "decoded {}: {} frames @ {} Hz",
            path.display(),
            info.total_frames,
            info.native_sample_rate
        );

        Ok(Self::from_parts(info, samples))
    }

    /// Read length and format details without decoding audio data.
    ///
    /// Falls back to counting decoded frames when the container does not
    /// declare a frame count.
    pub fn probe(path: impl AsRef<Path>) -> Result<SourceInfo, SourceError> {
        let path = path.as_ref();
        let mut format = open_format(path)?;
        let (track_id, params) = first_audio_track(format.as_ref())?;

        let native_sample_rate = params
            .sample_rate
            .ok_or_else(|| SourceError::Unsupported("missing sample rate".to_string()))?;
        let source_channels = params.channels.map(|c| c.count()).unwrap_or(1);

        let total_frames = match params.n_frames {
            Some(frames) => frames,
            None => {
                let mut counted = 0u64;
                decode_packets(format.as_mut(), track_id, &params, path, |block, channels, _| {
                    counted += (block.len() / channels.max(1)) as u64;
                })?;
                counted
            }
        };

        Ok(SourceInfo {
            path: path.to_path_buf(),
            native_sample_rate,
            total_frames,
            source_channels,
        })
    }

    /// Wrap already decoded interleaved stereo samples.
    pub fn from_interleaved(path: impl Into<PathBuf>, samples: Vec<f32>, sample_rate: u32) -> Self {
        let info = SourceInfo {
            path: path.into(),
            native_sample_rate: sample_rate,
            total_frames: (samples.len() / CHANNELS) as u64,
            source_channels: CHANNELS,
        };
        Self::from_parts(info, samples)
    }

    fn from_parts(info: SourceInfo, samples: Vec<f32>) -> Self {
        Self {
            info,
            samples,
            position: 0,
            looping: false,
        }
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    pub fn native_sample_rate(&self) -> u32 {
        self.info.native_sample_rate
    }

    pub fn total_frames(&self) -> u64 {
        self.info.total_frames
    }

    pub fn length_seconds(&self) -> f64 {
        self.info.length_seconds()
    }

    /// Interleaved stereo samples of the whole file.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn position_frames(&self) -> u64 {
        self.position as u64
    }

    pub fn position_seconds(&self) -> f64 {
        if self.info.native_sample_rate == 0 {
            return 0.0;
        }
        self.position as f64 / self.info.native_sample_rate as f64
    }

    /// Move the read cursor, clamped to `[0, total_frames]`.
    pub fn seek_frame(&mut self, frame: u64) {
        self.position = frame.min(self.info.total_frames) as usize;
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// True once a non-looping source has handed out its last frame.
    pub fn is_exhausted(&self) -> bool {
        !self.looping && self.position as u64 >= self.info.total_frames
    }

    /// Copy up to `frames` interleaved frames into `buffer`.
    ///
    /// Frames past the end of a non-looping source are zero-filled. A looping
    /// source wraps to frame 0 instead.
    ///
    /// # Returns
    /// The number of frames actually read from the file.
    pub fn read_block(&mut self, buffer: &mut [f32], frames: usize) -> usize {
        let frames = frames.min(buffer.len() / CHANNELS);
        let total = self.info.total_frames as usize;
        let mut written = 0;

        while written < frames {
            if self.position >= total {
                if self.looping && total > 0 {
                    self.position = 0;
                } else {
                    break;
                }
            }

            let count = (frames - written).min(total - self.position);
            let src = &self.samples[self.position * CHANNELS..(self.position + count) * CHANNELS];
            buffer[written * CHANNELS..(written + count) * CHANNELS].copy_from_slice(src);
            written += count;
            self.position += count;
        }

        buffer[written * CHANNELS..frames * CHANNELS].fill(0.0);
        written
    }
}

fn open_format(path: &Path) -> Result<Box<dyn FormatReader>, SourceError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(&extension.to_lowercase());
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;

    Ok(probed.format)
}

fn first_audio_track(format: &dyn FormatReader) -> Result<(u32, CodecParameters), SourceError> {
    format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .map(|track| (track.id, track.codec_params.clone()))
        .ok_or_else(|| SourceError::Unsupported("no decodable audio track".to_string()))
}

/// Decode every packet of `track_id`, handing interleaved `f32` blocks to `sink`.
fn decode_packets<F>(
    format: &mut dyn FormatReader,
    track_id: u32,
    params: &CodecParameters,
    path: &Path,
    mut sink: F,
) -> Result<(), SourceError>
where
    F: FnMut(&[f32], usize, u32),
{
    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs().make(params, &dec_opts)?;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(Error::ResetRequired) => break,
            Err(err) => return Err(err.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if decoded.frames() == 0 {
                    continue;
                }
                let spec = *decoded.spec();
                let channels = spec.channels.count().max(1);
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                sink(buffer.samples(), channels, spec.rate);
            }
            Err(Error::DecodeError(err)) => {
                warn!("decode error in {}: {}", path.display(), err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn push_as_stereo(out: &mut Vec<f32>, block: &[f32], channels: usize) {
    out.reserve(block.len() / channels * CHANNELS);
    for frame in block.chunks_exact(channels) {
        let left = frame[0];
        let right = if channels > 1 { frame[1] } else { left };
        out.push(left);
        out.push(right);
    }
}
