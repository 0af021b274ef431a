//! Sample formats and sample runs.

use std::fmt;

/// Storage format of a clip's samples.
///
/// The numeric codes are the ones legacy projects write into the
/// `sampleformat` attribute of a `<sequence>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// 16-bit signed integer
    Int16,
    /// 24-bit signed integer, stored in the low three bytes of an i32
    Int24,
    /// 32-bit float, nominal range -1.0..1.0
    #[default]
    Float32,
}

impl SampleFormat {
    /// Legacy numeric code of the format.
    pub const fn code(self) -> u32 {
        match self {
            SampleFormat::Int16 => 0x0002_0001,
            SampleFormat::Int24 => 0x0004_0001,
            SampleFormat::Float32 => 0x0004_000F,
        }
    }

    /// Look up a format by its legacy numeric code.
    pub fn from_code(code: u32) -> Option<Self> {
        [SampleFormat::Int16, SampleFormat::Int24, SampleFormat::Float32]
            .into_iter()
            .find(|f| f.code() == code)
    }

    /// Short name of the format (`int16`, `int24`, `float`).
    pub const fn name(self) -> &'static str {
        match self {
            SampleFormat::Int16 => "int16",
            SampleFormat::Int24 => "int24",
            SampleFormat::Float32 => "float",
        }
    }

    /// Look up a format by its short name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int16" => Some(SampleFormat::Int16),
            "int24" => Some(SampleFormat::Int24),
            "float" => Some(SampleFormat::Float32),
            _ => None,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded samples in a clip's storage format.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleBuffer {
    Int16(Vec<i16>),
    Int24(Vec<i32>),
    Float32(Vec<f32>),
}

impl SampleBuffer {
    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::Int16(v) => v.len(),
            SampleBuffer::Int24(v) => v.len(),
            SampleBuffer::Float32(v) => v.len(),
        }
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage format of the buffer.
    pub fn format(&self) -> SampleFormat {
        match self {
            SampleBuffer::Int16(_) => SampleFormat::Int16,
            SampleBuffer::Int24(_) => SampleFormat::Int24,
            SampleBuffer::Float32(_) => SampleFormat::Float32,
        }
    }
}

/// A contiguous run of samples appended to a clip.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleRun {
    /// Silence of the given length, not materialized
    Silence(u64),
    /// Decoded audio
    Samples(SampleBuffer),
}

impl SampleRun {
    /// Length of the run in samples.
    pub fn len(&self) -> u64 {
        match self {
            SampleRun::Silence(len) => *len,
            SampleRun::Samples(buf) => buf.len() as u64,
        }
    }

    /// Returns true if the run has no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
