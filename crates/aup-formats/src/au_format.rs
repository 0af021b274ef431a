//! Sun/NeXT AU block files.
//!
//! Block files written by legacy projects are AU files in the writer's
//! native byte order, so both `.snd` (big-endian) and `dns.` (little-endian)
//! magics are accepted. The data offset skips any annotation or summary
//! data stored after the header.

use std::io::{Read, Seek, SeekFrom};

use binrw::{BinRead, Endian};

use crate::source::{AudioSource, DecodeError, RawFrames, SourceEncoding, SourceInfo};

/// Data size value meaning "until end of file".
const UNKNOWN_SIZE: u32 = 0xffff_ffff;

/// Fixed AU header following the magic.
#[derive(BinRead, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuHeader {
    pub data_offset: u32,
    pub data_size: u32,
    pub encoding: u32,
    pub sample_rate: u32,
    pub channels: u32,
}

impl AuHeader {
    /// Read magic and header, returning the byte order in use.
    pub fn read_header<R: Read + Seek>(reader: &mut R) -> Result<(Self, Endian), DecodeError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        let endian = match &magic {
            b".snd" => Endian::Big,
            b"dns." => Endian::Little,
            _ => return Err(DecodeError::UnrecognizedFormat),
        };
        let header = AuHeader::read_options(reader, endian, ())?;
        Ok((header, endian))
    }

    /// Bytes per sample and source encoding.
    fn layout(&self) -> Result<(usize, SourceEncoding), DecodeError> {
        Ok(match self.encoding {
            2 => (1, SourceEncoding::Int { bits: 8 }),
            3 => (2, SourceEncoding::Int { bits: 16 }),
            4 => (3, SourceEncoding::Int { bits: 24 }),
            5 => (4, SourceEncoding::Int { bits: 32 }),
            6 => (4, SourceEncoding::Float),
            other => {
                return Err(DecodeError::UnsupportedEncoding(format!("AU encoding {other}")))
            }
        })
    }
}

/// An AU file opened for reading.
pub struct AuSource<R: Read + Seek> {
    reader: R,
    endian: Endian,
    info: SourceInfo,
    sample_bytes: usize,
    data_start: u64,
    position: u64,
}

impl<R: Read + Seek> AuSource<R> {
    pub fn new(mut reader: R) -> Result<Self, DecodeError> {
        let (header, endian) = AuHeader::read_header(&mut reader)?;
        let (sample_bytes, encoding) = header.layout()?;

        let channels = u16::try_from(header.channels)
            .ok()
            .filter(|&c| c > 0)
            .ok_or(DecodeError::InvalidHeader("channel count"))?;

        let data_start = u64::from(header.data_offset);
        let data_size = if header.data_size == UNKNOWN_SIZE {
            let end = reader.seek(SeekFrom::End(0))?;
            end.saturating_sub(data_start)
        } else {
            u64::from(header.data_size)
        };
        let frame_bytes = (sample_bytes * usize::from(channels)) as u64;

        reader.seek(SeekFrom::Start(data_start))?;
        Ok(Self {
            reader,
            endian,
            info: SourceInfo {
                channels,
                sample_rate: header.sample_rate,
                frames: data_size / frame_bytes,
                encoding,
            },
            sample_bytes,
            data_start,
            position: 0,
        })
    }

    fn frame_bytes(&self) -> u64 {
        (self.sample_bytes * usize::from(self.info.channels)) as u64
    }

    fn decode_int(&self, b: &[u8]) -> i32 {
        let big = matches!(self.endian, Endian::Big);
        match (b.len(), big) {
            (1, _) => i32::from(b[0] as i8),
            (2, true) => i32::from(i16::from_be_bytes([b[0], b[1]])),
            (2, false) => i32::from(i16::from_le_bytes([b[0], b[1]])),
            (3, true) => i32::from_be_bytes([b[0], b[1], b[2], 0]) >> 8,
            (3, false) => i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8,
            (_, true) => i32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            (_, false) => i32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        }
    }

    fn decode_float(&self, b: &[u8]) -> f32 {
        let bytes = [b[0], b[1], b[2], b[3]];
        match self.endian {
            Endian::Big => f32::from_be_bytes(bytes),
            Endian::Little => f32::from_le_bytes(bytes),
        }
    }
}

impl<R: Read + Seek> AudioSource for AuSource<R> {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn seek(&mut self, frame: u64) -> Result<(), DecodeError> {
        if frame > self.info.frames {
            return Err(DecodeError::SeekOutOfRange {
                frame,
                frames: self.info.frames,
            });
        }
        self.reader
            .seek(SeekFrom::Start(self.data_start + frame * self.frame_bytes()))?;
        self.position = frame;
        Ok(())
    }

    fn read_raw(&mut self, frames: usize) -> Result<RawFrames, DecodeError> {
        let available = self.info.frames - self.position;
        let count = (frames as u64).min(available);
        let byte_len = usize::try_from(count * self.frame_bytes())
            .map_err(|_| DecodeError::TooWide(count))?;

        let mut bytes = vec![0u8; byte_len];
        self.reader.read_exact(&mut bytes)?;
        self.position += count;

        let chunks = bytes.chunks_exact(self.sample_bytes);
        Ok(match self.info.encoding {
            SourceEncoding::Int { .. } => RawFrames::Int(chunks.map(|b| self.decode_int(b)).collect()),
            SourceEncoding::Float => RawFrames::Float(chunks.map(|b| self.decode_float(b)).collect()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build an AU file with 16-bit samples and `pad` bytes of annotation.
    fn make_au(big: bool, channels: u32, samples: &[i16], pad: usize) -> Vec<u8> {
        let word = |v: u32| if big { v.to_be_bytes() } else { v.to_le_bytes() };
        let mut buf = Vec::new();
        buf.extend(if big { b".snd" } else { b"dns." });
        buf.extend(word(24 + pad as u32));
        buf.extend(word(samples.len() as u32 * 2));
        buf.extend(word(3));
        buf.extend(word(44100));
        buf.extend(word(channels));
        buf.extend(std::iter::repeat(0u8).take(pad));
        for &s in samples {
            buf.extend(if big { s.to_be_bytes() } else { s.to_le_bytes() });
        }
        buf
    }

    #[test]
    fn big_endian_header() {
        let au = make_au(true, 1, &[1, -2, 300], 8);
        let (header, endian) = AuHeader::read_header(&mut Cursor::new(&au)).unwrap();
        assert!(matches!(endian, Endian::Big));
        assert_eq!(header.data_offset, 32);
        assert_eq!(header.encoding, 3);
    }

    #[test]
    fn little_endian_samples() {
        let au = make_au(false, 1, &[1, -2, 300], 0);
        let mut src = AuSource::new(Cursor::new(au)).unwrap();
        assert_eq!(src.info().frames, 3);
        assert_eq!(src.read_raw(10).unwrap(), RawFrames::Int(vec![1, -2, 300]));
    }

    #[test]
    fn stereo_seek() {
        let au = make_au(true, 2, &[1, 2, 3, 4, 5, 6], 4);
        let mut src = AuSource::new(Cursor::new(au)).unwrap();
        assert_eq!(src.info().frames, 3);
        src.seek(1).unwrap();
        assert_eq!(src.read_raw(1).unwrap(), RawFrames::Int(vec![3, 4]));
        assert!(src.seek(4).is_err());
    }

    #[test]
    fn unknown_size_reads_to_end() {
        let mut au = make_au(true, 1, &[7, 8], 0);
        au[8..12].copy_from_slice(&UNKNOWN_SIZE.to_be_bytes());
        let src = AuSource::new(Cursor::new(au)).unwrap();
        assert_eq!(src.info().frames, 2);
    }

    #[test]
    fn mu_law_is_unsupported() {
        let mut au = make_au(true, 1, &[0], 0);
        au[12..16].copy_from_slice(&1u32.to_be_bytes());
        assert!(matches!(
            AuSource::new(Cursor::new(au)),
            Err(DecodeError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn twenty_four_bit_sign_extends() {
        let src = AuSource {
            reader: Cursor::new(Vec::new()),
            endian: Endian::Little,
            info: SourceInfo {
                channels: 1,
                sample_rate: 44100,
                frames: 0,
                encoding: SourceEncoding::Int { bits: 24 },
            },
            sample_bytes: 3,
            data_start: 0,
            position: 0,
        };
        assert_eq!(src.decode_int(&[0xff, 0xff, 0xff]), -1);
        assert_eq!(src.decode_int(&[0x00, 0x00, 0x80]), -8_388_608);
        assert_eq!(src.decode_int(&[0x01, 0x00, 0x00]), 1);
    }
}
