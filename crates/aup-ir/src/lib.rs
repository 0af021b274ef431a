//! Entity model for imported legacy Audacity projects.
//!
//! The importer in `aup-formats` builds these types from a project
//! document, and a host project takes ownership of them in one commit.

mod clip;
mod envelope;
mod label;
mod project;
mod sample;
pub mod track;

pub use clip::Clip;
pub use envelope::{ControlPoint, Envelope};
pub use label::Label;
pub use project::{ProjectAttributes, Tags, ViewSetting};
pub use sample::{SampleBuffer, SampleFormat, SampleRun};
pub use track::{
    ChannelPlacement, LabelTrack, NoteTrack, TimeTrack, Track, TrackKind, WaveTrack,
};
