//! Turns queued block files into sample runs.
//!
//! Every failure to read a block degrades to silence of the requested
//! length with a warning. The decode paths other than [`DecodePath::Float`]
//! are shortcuts that produce the same samples with less conversion.

use std::path::Path;

use aup_ir::{SampleBuffer, SampleFormat, SampleRun};

use crate::descriptor::BlockFileDescriptor;
use crate::diagnostics::Diagnostics;
use crate::source::{
    float_to_i16, float_to_i24, AudioSource, DecodeError, DecodeService, SourceEncoding,
    SourceInfo,
};

/// How a block is read from its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodePath {
    /// Mono integer source of at most 16 bits into an int16 clip
    MonoInt16,
    /// Mono integer source of at most 24 bits into an int24 clip
    MonoInt24,
    /// Integer source of at most 16 bits into an int16 clip, one channel picked out
    Int16Deinterleave,
    /// Normalized float read, converted to the target format
    Float,
}

impl DecodePath {
    fn applies_to(self, info: &SourceInfo, target: SampleFormat) -> bool {
        let bits = match info.encoding {
            SourceEncoding::Int { bits } => Some(bits),
            SourceEncoding::Float => None,
        };
        match self {
            DecodePath::MonoInt16 => {
                info.channels == 1 && bits.is_some_and(|b| b <= 16) && target == SampleFormat::Int16
            }
            DecodePath::MonoInt24 => {
                info.channels == 1 && bits.is_some_and(|b| b <= 24) && target == SampleFormat::Int24
            }
            DecodePath::Int16Deinterleave => {
                bits.is_some_and(|b| b <= 16) && target == SampleFormat::Int16
            }
            DecodePath::Float => true,
        }
    }
}

/// Pick the cheapest path able to read `info` into `target`.
pub fn select_path(info: &SourceInfo, target: SampleFormat) -> DecodePath {
    [
        DecodePath::MonoInt16,
        DecodePath::MonoInt24,
        DecodePath::Int16Deinterleave,
    ]
    .into_iter()
    .find(|path| path.applies_to(info, target))
    .unwrap_or(DecodePath::Float)
}

/// Read `len` frames of `channel` starting at `origin`.
///
/// Fails unless exactly `len` frames could be read.
pub fn decode_with(
    path: DecodePath,
    source: &mut dyn AudioSource,
    len: u64,
    origin: u64,
    channel: u16,
    target: SampleFormat,
) -> Result<SampleBuffer, DecodeError> {
    let info = source.info();
    if channel >= info.channels {
        return Err(DecodeError::ChannelOutOfRange {
            channel,
            channels: info.channels,
        });
    }
    if !path.applies_to(&info, target) {
        return Err(DecodeError::PathMismatch);
    }
    let frames = usize::try_from(len).map_err(|_| DecodeError::TooWide(len))?;
    if origin > 0 {
        source.seek(origin)?;
    }

    let channels = usize::from(info.channels);
    let channel = usize::from(channel);
    Ok(match path {
        DecodePath::MonoInt16 => {
            let samples = source.read_i16(frames)?;
            check_len(samples.len(), frames)?;
            SampleBuffer::Int16(samples)
        }
        DecodePath::MonoInt24 => {
            let samples = source.read_i32(frames)?;
            check_len(samples.len(), frames)?;
            SampleBuffer::Int24(samples.into_iter().map(|s| s >> 8).collect())
        }
        DecodePath::Int16Deinterleave => {
            let interleaved = source.read_i16(frames)?;
            check_len(interleaved.len() / channels, frames)?;
            SampleBuffer::Int16(pick_channel(interleaved, channels, channel, frames))
        }
        DecodePath::Float => {
            let interleaved = source.read_f32(frames)?;
            check_len(interleaved.len() / channels, frames)?;
            let samples = pick_channel(interleaved, channels, channel, frames);
            match target {
                SampleFormat::Int16 => {
                    SampleBuffer::Int16(samples.into_iter().map(float_to_i16).collect())
                }
                SampleFormat::Int24 => {
                    SampleBuffer::Int24(samples.into_iter().map(float_to_i24).collect())
                }
                SampleFormat::Float32 => SampleBuffer::Float32(samples),
            }
        }
    })
}

fn check_len(got: usize, wanted: usize) -> Result<(), DecodeError> {
    if got < wanted {
        Err(DecodeError::ShortRead {
            wanted: wanted as u64,
            got: got as u64,
        })
    } else {
        Ok(())
    }
}

fn pick_channel<T: Copy>(interleaved: Vec<T>, channels: usize, channel: usize, frames: usize) -> Vec<T> {
    if channels == 1 {
        let mut samples = interleaved;
        samples.truncate(frames);
        return samples;
    }
    interleaved
        .into_iter()
        .skip(channel)
        .step_by(channels)
        .take(frames)
        .collect()
}

/// Resolves descriptors through a decode service.
pub struct BlockResolver<'a, D: DecodeService + ?Sized> {
    decoder: &'a D,
}

impl<'a, D: DecodeService + ?Sized> BlockResolver<'a, D> {
    pub fn new(decoder: &'a D) -> Self {
        Self { decoder }
    }

    /// Decode one block, or silence of its length if that fails.
    pub fn resolve(&self, desc: &BlockFileDescriptor, diagnostics: &mut Diagnostics) -> SampleRun {
        let Some(path) = desc.path.as_deref() else {
            return SampleRun::Silence(desc.len);
        };
        match self.decode(path, desc) {
            Ok(buffer) => SampleRun::Samples(buffer),
            Err(e) => {
                diagnostics.warn(format!(
                    "Error while processing {} ({e})\n\nInserting silence.",
                    path.display()
                ));
                SampleRun::Silence(desc.len)
            }
        }
    }

    fn decode(&self, path: &Path, desc: &BlockFileDescriptor) -> Result<SampleBuffer, DecodeError> {
        let mut source = self.decoder.open(path)?;
        let decode_path = select_path(&source.info(), desc.format);
        log::debug!(
            "decoding {} frames of {} via {:?}",
            desc.len,
            path.display(),
            decode_path
        );
        decode_with(
            decode_path,
            source.as_mut(),
            desc.len,
            desc.origin,
            desc.channel,
            desc.format,
        )
    }
}
