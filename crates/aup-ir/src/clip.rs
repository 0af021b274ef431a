//! Wave clips and their cut lines.

use crate::envelope::Envelope;
use crate::sample::{SampleFormat, SampleRun};

/// A clip of a wave track.
///
/// Audio is an ordered list of runs. Nested clips are cut lines: audio that
/// was removed from this clip but kept for restoring.
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    /// Clip name (may be empty)
    pub name: String,
    /// Start time on the track, in seconds
    pub offset: f64,
    /// Storage format of decoded runs
    pub format: SampleFormat,
    /// Gain envelope
    pub envelope: Envelope,
    /// Audio runs in append order
    pub runs: Vec<SampleRun>,
    /// Cut lines, in document order
    pub cut_lines: Vec<Clip>,
}

impl Clip {
    /// Create an empty clip.
    pub fn new(format: SampleFormat) -> Self {
        Self {
            name: String::new(),
            offset: 0.0,
            format,
            envelope: Envelope::new(1.0),
            runs: Vec::new(),
            cut_lines: Vec::new(),
        }
    }

    /// Total number of samples in this clip (cut lines excluded).
    pub fn num_samples(&self) -> u64 {
        self.runs
            .iter()
            .fold(0u64, |total, run| total.saturating_add(run.len()))
    }

    /// Append a run at the end of the clip.
    pub fn append(&mut self, run: SampleRun) {
        self.runs.push(run);
    }

    /// Settle clip-level state once the clip's tag has been closed.
    pub fn finish(&mut self) {
        self.envelope.offset = self.offset;
    }

    /// Deepest cut-line nesting below this clip (0 = no cut lines).
    pub fn cut_line_depth(&self) -> usize {
        self.cut_lines
            .iter()
            .map(|c| c.cut_line_depth() + 1)
            .max()
            .unwrap_or(0)
    }
}
