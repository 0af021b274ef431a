//! Track types.

use crate::clip::Clip;
use crate::envelope::Envelope;
use crate::label::Label;

/// A track of an imported project.
#[derive(Clone, Debug, PartialEq)]
pub enum Track {
    Wave(WaveTrack),
    Label(LabelTrack),
    Note(NoteTrack),
    Time(TimeTrack),
}

/// Discriminant of [`Track`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Wave,
    Label,
    Note,
    Time,
}

impl Track {
    pub fn kind(&self) -> TrackKind {
        match self {
            Track::Wave(_) => TrackKind::Wave,
            Track::Label(_) => TrackKind::Label,
            Track::Note(_) => TrackKind::Note,
            Track::Time(_) => TrackKind::Time,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Track::Wave(t) => &t.name,
            Track::Label(t) => &t.name,
            Track::Note(t) => &t.name,
            Track::Time(t) => &t.name,
        }
    }

    pub fn as_wave(&self) -> Option<&WaveTrack> {
        match self {
            Track::Wave(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&LabelTrack> {
        match self {
            Track::Label(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_label_mut(&mut self) -> Option<&mut LabelTrack> {
        match self {
            Track::Label(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&TimeTrack> {
        match self {
            Track::Time(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_time_mut(&mut self) -> Option<&mut TimeTrack> {
        match self {
            Track::Time(t) => Some(t),
            _ => None,
        }
    }
}

/// Which output channel a wave track feeds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelPlacement {
    Left,
    Right,
    #[default]
    Mono,
}

impl ChannelPlacement {
    /// Map the legacy `channel` attribute value.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(ChannelPlacement::Left),
            1 => Some(ChannelPlacement::Right),
            2 => Some(ChannelPlacement::Mono),
            _ => None,
        }
    }
}

/// An audio track.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveTrack {
    pub name: String,
    pub channel: ChannelPlacement,
    /// Linked to the following track (stereo pair)
    pub linked: bool,
    /// Start offset in seconds
    pub offset: f64,
    /// Sample rate in Hz
    pub rate: u32,
    pub gain: f64,
    pub pan: f64,
    pub mute: bool,
    pub solo: bool,
    /// Clips, in document order
    pub clips: Vec<Clip>,
}

impl Default for WaveTrack {
    fn default() -> Self {
        Self {
            name: String::new(),
            channel: ChannelPlacement::Mono,
            linked: false,
            offset: 0.0,
            rate: 44100,
            gain: 1.0,
            pan: 0.0,
            mute: false,
            solo: false,
            clips: Vec::new(),
        }
    }
}

impl WaveTrack {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Total samples across all clips (cut lines excluded).
    pub fn num_samples(&self) -> u64 {
        self.clips
            .iter()
            .fold(0u64, |total, clip| total.saturating_add(clip.num_samples()))
    }
}

/// Index of the greatest offset; ties go to the later element.
pub fn rightmost_index(offsets: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, offset) in offsets.enumerate() {
        match best {
            Some((_, b)) if offset < b => {}
            _ => best = Some((i, offset)),
        }
    }
    best.map(|(i, _)| i)
}

/// A track of text labels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelTrack {
    pub name: String,
    pub labels: Vec<Label>,
    /// Label count announced by the document, if any
    pub declared_labels: Option<u64>,
}

/// A note (MIDI) track. Note data is kept in its serialized form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoteTrack {
    pub name: String,
    pub offset: f64,
    pub data: String,
}

/// The project's time-warp track.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeTrack {
    pub name: String,
    pub range_lower: f64,
    pub range_upper: f64,
    pub display_log: bool,
    pub interpolate_log: bool,
    /// Speed envelope
    pub envelope: Envelope,
}

impl Default for TimeTrack {
    fn default() -> Self {
        Self {
            name: String::from("Time Track"),
            range_lower: 0.9,
            range_upper: 1.1,
            display_log: false,
            interpolate_log: false,
            envelope: Envelope::new(1.0),
        }
    }
}
