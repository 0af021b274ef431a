//! Audio decode service used to read block files.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::au_format::AuSource;
use crate::wav_format::WavSource;

/// Sample encoding of a source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceEncoding {
    /// Signed integer PCM of the given width
    Int { bits: u16 },
    /// 32-bit float PCM
    Float,
}

/// Layout of a source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceInfo {
    pub channels: u16,
    pub sample_rate: u32,
    /// Length in frames
    pub frames: u64,
    pub encoding: SourceEncoding,
}

/// Interleaved samples in the source's native representation.
///
/// Integers hold the raw value in the low `bits` bits, sign-extended.
#[derive(Clone, Debug, PartialEq)]
pub enum RawFrames {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl RawFrames {
    /// Number of samples (not frames).
    pub fn len(&self) -> usize {
        match self {
            RawFrames::Int(v) => v.len(),
            RawFrames::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("WAV: {0}")]
    Wav(#[from] hound::Error),
    #[error("AU header: {0}")]
    AuHeader(#[from] binrw::Error),
    #[error("unrecognized audio file format")]
    UnrecognizedFormat,
    #[error("unsupported sample encoding {0}")]
    UnsupportedEncoding(String),
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),
    #[error("seek to frame {frame} past end ({frames} frames)")]
    SeekOutOfRange { frame: u64, frames: u64 },
    #[error("read {got} of {wanted} frames")]
    ShortRead { wanted: u64, got: u64 },
    #[error("channel {channel} requested from a {channels}-channel file")]
    ChannelOutOfRange { channel: u16, channels: u16 },
    #[error("block of {0} samples is too large")]
    TooWide(u64),
    #[error("decode path does not apply to this source")]
    PathMismatch,
}

/// An open audio file.
///
/// The file handle is released when the source is dropped.
pub trait AudioSource {
    fn info(&self) -> SourceInfo;

    /// Move to an absolute frame position.
    fn seek(&mut self, frame: u64) -> Result<(), DecodeError>;

    /// Read up to `frames` interleaved frames from the current position.
    fn read_raw(&mut self, frames: usize) -> Result<RawFrames, DecodeError>;

    /// Read frames as 16-bit integers.
    fn read_i16(&mut self, frames: usize) -> Result<Vec<i16>, DecodeError> {
        let encoding = self.info().encoding;
        Ok(match (encoding, self.read_raw(frames)?) {
            (SourceEncoding::Int { bits }, RawFrames::Int(v)) if bits <= 16 => {
                v.into_iter().map(|s| (s << (16 - bits)) as i16).collect()
            }
            (SourceEncoding::Int { bits }, RawFrames::Int(v)) => {
                v.into_iter().map(|s| (s >> (bits - 16)) as i16).collect()
            }
            (_, RawFrames::Int(v)) => v.into_iter().map(|s| s as i16).collect(),
            (_, RawFrames::Float(v)) => v.into_iter().map(float_to_i16).collect(),
        })
    }

    /// Read frames as 32-bit integers, left-aligned.
    fn read_i32(&mut self, frames: usize) -> Result<Vec<i32>, DecodeError> {
        let encoding = self.info().encoding;
        Ok(match (encoding, self.read_raw(frames)?) {
            (SourceEncoding::Int { bits }, RawFrames::Int(v)) => {
                let shift = 32u16.saturating_sub(bits);
                v.into_iter().map(|s| s << shift).collect()
            }
            (_, RawFrames::Int(v)) => v,
            (_, RawFrames::Float(v)) => v
                .into_iter()
                .map(|s| {
                    (f64::from(s) * 2_147_483_648.0)
                        .round()
                        .clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
                })
                .collect(),
        })
    }

    /// Read frames as floats normalized to -1.0..1.0.
    fn read_f32(&mut self, frames: usize) -> Result<Vec<f32>, DecodeError> {
        let encoding = self.info().encoding;
        Ok(match (encoding, self.read_raw(frames)?) {
            (SourceEncoding::Int { bits }, RawFrames::Int(v)) => {
                let scale = (1u64 << (bits - 1)) as f64;
                v.into_iter().map(|s| (f64::from(s) / scale) as f32).collect()
            }
            (_, RawFrames::Int(v)) => v.into_iter().map(|s| s as f32 / 32768.0).collect(),
            (_, RawFrames::Float(v)) => v,
        })
    }
}

/// Round and clamp a normalized float to 16 bits.
pub(crate) fn float_to_i16(s: f32) -> i16 {
    (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

/// Round and clamp a normalized float to 24 bits.
pub(crate) fn float_to_i24(s: f32) -> i32 {
    (f64::from(s) * 8_388_608.0).round().clamp(-8_388_608.0, 8_388_607.0) as i32
}

/// Opens block files for reading.
pub trait DecodeService {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioSource>, DecodeError>;
}

/// Decodes WAV and Sun/NeXT AU files from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileDecoder;

impl DecodeService for FileDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioSource>, DecodeError> {
        let mut file = File::open(path)?;
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        file.seek(SeekFrom::Start(0))?;

        let reader = BufReader::new(file);
        match &magic {
            b"RIFF" => Ok(Box::new(WavSource::new(reader)?)),
            b".snd" | b"dns." => Ok(Box::new(AuSource::new(reader)?)),
            _ => Err(DecodeError::UnrecognizedFormat),
        }
    }
}

pub(crate) fn check_bits(bits: u16) -> Result<(), DecodeError> {
    if (1..=32).contains(&bits) {
        Ok(())
    } else {
        Err(DecodeError::UnsupportedEncoding(format!("{bits}-bit integer")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        info: SourceInfo,
        data: RawFrames,
    }

    impl AudioSource for Fixed {
        fn info(&self) -> SourceInfo {
            self.info
        }

        fn seek(&mut self, _frame: u64) -> Result<(), DecodeError> {
            Ok(())
        }

        fn read_raw(&mut self, _frames: usize) -> Result<RawFrames, DecodeError> {
            Ok(self.data.clone())
        }
    }

    fn int_source(bits: u16, data: Vec<i32>) -> Fixed {
        Fixed {
            info: SourceInfo {
                channels: 1,
                sample_rate: 44100,
                frames: data.len() as u64,
                encoding: SourceEncoding::Int { bits },
            },
            data: RawFrames::Int(data),
        }
    }

    #[test]
    fn eight_bit_widens() {
        let mut src = int_source(8, vec![-128, 64, 127]);
        assert_eq!(src.read_i16(3).unwrap(), vec![-32768, 16384, 32512]);
        assert_eq!(src.read_f32(3).unwrap(), vec![-1.0, 0.5, 127.0 / 128.0]);
    }

    #[test]
    fn twenty_four_bit_narrows_and_aligns() {
        let mut src = int_source(24, vec![0x7f_ffff, -0x80_0000]);
        assert_eq!(src.read_i16(2).unwrap(), vec![32767, -32768]);
        assert_eq!(src.read_i32(2).unwrap(), vec![0x7fff_ff00, i32::MIN]);
    }

    #[test]
    fn float_to_int_rounds_and_clamps() {
        assert_eq!(float_to_i16(0.5), 16384);
        assert_eq!(float_to_i16(1.5), 32767);
        assert_eq!(float_to_i16(-1.0), -32768);
        assert_eq!(float_to_i24(0.5), 4_194_304);
        assert_eq!(float_to_i24(-2.0), -8_388_608);
    }

    #[test]
    fn missing_file_fails_to_open() {
        assert!(FileDecoder.open(Path::new("/nonexistent/block.au")).is_err());
    }

    #[test]
    fn unknown_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.bin");
        std::fs::write(&path, b"OggS\0\0\0\0").unwrap();
        assert!(matches!(
            FileDecoder.open(&path),
            Err(DecodeError::UnrecognizedFormat)
        ));
    }
}
