//! WAV block and alias files.

use std::io::{Read, Seek};

use hound::{SampleFormat as WavFormat, WavReader};

use crate::source::{check_bits, AudioSource, DecodeError, RawFrames, SourceEncoding, SourceInfo};

/// A WAV file opened for reading.
pub struct WavSource<R: Read + Seek> {
    reader: WavReader<R>,
    info: SourceInfo,
}

impl<R: Read + Seek> WavSource<R> {
    pub fn new(inner: R) -> Result<Self, DecodeError> {
        let reader = WavReader::new(inner)?;
        let spec = reader.spec();

        let encoding = match spec.sample_format {
            WavFormat::Int => {
                check_bits(spec.bits_per_sample)?;
                SourceEncoding::Int {
                    bits: spec.bits_per_sample,
                }
            }
            WavFormat::Float if spec.bits_per_sample == 32 => SourceEncoding::Float,
            WavFormat::Float => {
                return Err(DecodeError::UnsupportedEncoding(format!(
                    "{}-bit float",
                    spec.bits_per_sample
                )))
            }
        };
        if spec.channels == 0 {
            return Err(DecodeError::InvalidHeader("zero channels"));
        }

        let info = SourceInfo {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            frames: u64::from(reader.duration()),
            encoding,
        };
        Ok(Self { reader, info })
    }
}

impl<R: Read + Seek> AudioSource for WavSource<R> {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn seek(&mut self, frame: u64) -> Result<(), DecodeError> {
        let out_of_range = DecodeError::SeekOutOfRange {
            frame,
            frames: self.info.frames,
        };
        if frame > self.info.frames {
            return Err(out_of_range);
        }
        let frame = u32::try_from(frame).map_err(|_| out_of_range)?;
        self.reader.seek(frame)?;
        Ok(())
    }

    fn read_raw(&mut self, frames: usize) -> Result<RawFrames, DecodeError> {
        let wanted = frames.saturating_mul(usize::from(self.info.channels));
        Ok(match self.info.encoding {
            SourceEncoding::Int { .. } => RawFrames::Int(
                self.reader
                    .samples::<i32>()
                    .take(wanted)
                    .collect::<Result<_, _>>()?,
            ),
            SourceEncoding::Float => RawFrames::Float(
                self.reader
                    .samples::<f32>()
                    .take(wanted)
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}
