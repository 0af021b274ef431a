//! Attribute validation.
//!
//! Every parser here works on a single attribute value. Callers attach the
//! tag and attribute name with [`AttrContext::at`].

use aup_ir::SampleFormat;

use crate::tag::TagKind;

/// Longest string accepted in an attribute value.
pub const MAX_STRING_LEN: usize = 4096;

/// Longest file or path string accepted.
pub const MAX_PATH_LEN: usize = 260;

/// Smallest and largest `maxsamples` of a sequence.
pub const MAX_SAMPLES_RANGE: std::ops::RangeInclusive<u64> = 1024..=64 * 1024 * 1024;

/// Why an attribute value was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AttrErrorKind {
    #[error("not a valid number")]
    Malformed,
    #[error("must not be negative")]
    Negative,
    #[error("must be greater than zero")]
    NotPositive,
    #[error("out of range")]
    OutOfRange,
    #[error("unknown sample format")]
    UnknownSampleFormat,
    #[error("contains invalid characters or is too long")]
    BadString,
    #[error("is missing")]
    Missing,
}

/// A rejected attribute of a tag.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {tag} '{attr}' attribute: {kind}")]
pub struct AttrError {
    pub tag: TagKind,
    pub attr: String,
    pub kind: AttrErrorKind,
}

impl AttrError {
    pub fn new(tag: TagKind, attr: &str, kind: AttrErrorKind) -> Self {
        Self {
            tag,
            attr: attr.to_string(),
            kind,
        }
    }
}

/// Attach tag and attribute names to a parse result.
pub trait AttrContext<T> {
    fn at(self, tag: TagKind, attr: &str) -> Result<T, AttrError>;
}

impl<T> AttrContext<T> for Result<T, AttrErrorKind> {
    fn at(self, tag: TagKind, attr: &str) -> Result<T, AttrError> {
        self.map_err(|kind| AttrError::new(tag, attr, kind))
    }
}

/// Case-insensitive attribute name match.
pub fn name_is(attr: &str, expected: &str) -> bool {
    attr.eq_ignore_ascii_case(expected)
}

fn parse_i64(value: &str) -> Result<i64, AttrErrorKind> {
    value.parse::<i64>().map_err(|_| AttrErrorKind::Malformed)
}

/// Non-negative 64-bit count.
pub fn parse_count(value: &str) -> Result<u64, AttrErrorKind> {
    let n = parse_i64(value)?;
    if n < 0 {
        return Err(AttrErrorKind::Negative);
    }
    Ok(n as u64)
}

/// Strictly positive 64-bit length.
pub fn parse_len(value: &str) -> Result<u64, AttrErrorKind> {
    let n = parse_i64(value)?;
    if n <= 0 {
        return Err(AttrErrorKind::NotPositive);
    }
    Ok(n as u64)
}

/// Sequence `maxsamples`.
pub fn parse_max_samples(value: &str) -> Result<u64, AttrErrorKind> {
    let n = parse_count(value)?;
    if !MAX_SAMPLES_RANGE.contains(&n) {
        return Err(AttrErrorKind::OutOfRange);
    }
    Ok(n)
}

/// Signed 32-bit integer.
pub fn parse_int(value: &str) -> Result<i32, AttrErrorKind> {
    let n = parse_i64(value)?;
    i32::try_from(n).map_err(|_| AttrErrorKind::OutOfRange)
}

/// Non-negative 32-bit integer.
pub fn parse_non_negative_int(value: &str) -> Result<i32, AttrErrorKind> {
    let n = parse_int(value)?;
    if n < 0 {
        return Err(AttrErrorKind::Negative);
    }
    Ok(n)
}

/// Finite real. A comma is accepted as the decimal separator.
pub fn parse_real(value: &str) -> Result<f64, AttrErrorKind> {
    let parsed = if value.contains(',') && !value.contains('.') {
        value.replacen(',', ".", 1).parse::<f64>()
    } else {
        value.parse::<f64>()
    };
    match parsed {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AttrErrorKind::Malformed),
    }
}

/// Finite, non-negative real.
pub fn parse_non_negative_real(value: &str) -> Result<f64, AttrErrorKind> {
    let v = parse_real(value)?;
    if v < 0.0 {
        return Err(AttrErrorKind::Negative);
    }
    Ok(v)
}

/// Integer flag, any non-zero value is true.
pub fn parse_flag(value: &str) -> Result<bool, AttrErrorKind> {
    Ok(parse_i64(value)? != 0)
}

/// Root `snapto`: only `on` enables snapping.
pub fn parse_snap_to(value: &str) -> bool {
    value == "on"
}

/// Sequence `sampleformat`, by legacy code or by name.
pub fn parse_sample_format(value: &str) -> Result<SampleFormat, AttrErrorKind> {
    if let Some(format) = SampleFormat::from_name(value) {
        return Ok(format);
    }
    let code = parse_i64(value)?;
    if code < 0 {
        return Err(AttrErrorKind::Negative);
    }
    u32::try_from(code)
        .ok()
        .and_then(SampleFormat::from_code)
        .ok_or(AttrErrorKind::UnknownSampleFormat)
}

/// No control characters other than tab, CR and LF, and not too long.
pub fn is_good_string(value: &str) -> bool {
    value.chars().count() <= MAX_STRING_LEN
        && !value
            .chars()
            .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
}

/// Check a free string attribute.
pub fn check_string(value: &str) -> Result<&str, AttrErrorKind> {
    if is_good_string(value) {
        Ok(value)
    } else {
        Err(AttrErrorKind::BadString)
    }
}

/// A bare file name: good string, non-empty, no path separators.
pub fn is_good_file_string(value: &str) -> bool {
    is_good_path_string(value) && !value.contains(['/', '\\'])
}

/// A path: good string, non-empty, within the platform path limit.
pub fn is_good_path_string(value: &str) -> bool {
    !value.is_empty() && value.chars().count() <= MAX_PATH_LEN && is_good_string(value)
}
