//! Reader for legacy Audacity `.aup` projects.
//!
//! A project document is tokenized into tag events, dispatched through a
//! stack of frames into an entity graph, and the queued block files are
//! decoded afterwards. Nothing reaches the host until the whole import
//! succeeds.

mod attrs;
mod au_format;
mod builder;
mod descriptor;
mod diagnostics;
mod dispatcher;
mod driver;
mod file_index;
mod resolver;
mod source;
mod tag;
mod tokenizer;
mod wav_format;

pub use attrs::{AttrError, AttrErrorKind};
pub use builder::{BuilderParts, ClipKey, EntityBuilder, EnvelopeOwner, ImportGraph, TrackId};
pub use descriptor::{BlockFileDescriptor, DescriptorQueue};
pub use diagnostics::{Diagnostics, Severity};
pub use dispatcher::TagDispatcher;
pub use driver::{
    AupImporter, ImportOptions, ImportSummary, NoProgress, Progress, ProgressResult, ProjectHost,
};
pub use file_index::{locate_data_dir, FileNameIndex};
pub use resolver::{decode_with, select_path, BlockResolver, DecodePath};
pub use source::{
    AudioSource, DecodeError, DecodeService, FileDecoder, RawFrames, SourceEncoding, SourceInfo,
};
pub use tag::TagKind;
pub use tokenizer::{detect, DocumentKind, TagEvent, TokenizeError, Tokenizer};

/// Error type for a failed import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The file is not a project document
    #[error("not an Audacity project file")]
    NotAProject,
    /// Pre-1.0 binary project
    #[error("this project was saved by a very old version and cannot be imported")]
    UnsupportedOldProject,
    #[error("could not read project: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Attr(#[from] AttrError),
    /// Tag name outside the legacy vocabulary
    #[error("unknown tag <{0}>")]
    UnknownTag(String),
    /// First tag of the document is not the project root
    #[error("expected <project> as the document root, found <{0}>")]
    BadRoot(String),
    /// A tag appeared under a parent it cannot belong to
    #[error("<{tag}> is not allowed inside <{parent}>")]
    BadContext { tag: &'static str, parent: &'static str },
    /// Close tag does not match the open one
    #[error("mismatched close tag </{found}>, expected </{expected}>")]
    MismatchedClose { expected: String, found: String },
    /// Required root attribute missing
    #[error("project is missing the required \"{0}\" attribute")]
    MissingAttribute(&'static str),
    #[error("Couldn't find the project data folder: \"{0}\"")]
    DataDirNotFound(String),
    #[error("could not list project data folder: {0}")]
    DataDirListing(#[from] walkdir::Error),
    /// Block file outside of any wave track
    #[error("<{0}> appears outside of a wave track")]
    NoActiveTrack(&'static str),
    #[error("project contains no data")]
    Empty,
    /// Block lengths add up past what a sample count can hold
    #[error("total length of the project's audio blocks is too large")]
    LengthOverflow,
    /// Progress reporting failed mid-import
    #[error("import aborted")]
    Aborted,
}
