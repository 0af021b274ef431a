//! The fixed tag vocabulary of legacy project documents.

use std::fmt;

/// Every tag a legacy project document may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagKind {
    Project,
    LabelTrack,
    NoteTrack,
    TimeTrack,
    WaveTrack,
    Tags,
    Tag,
    Label,
    WaveClip,
    Sequence,
    WaveBlock,
    Envelope,
    ControlPoint,
    SimpleBlockFile,
    SilentBlockFile,
    PcmAliasBlockFile,
}

impl TagKind {
    /// Look up a tag by its name in the document.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "project" | "audacityproject" => TagKind::Project,
            "labeltrack" => TagKind::LabelTrack,
            "notetrack" => TagKind::NoteTrack,
            "timetrack" => TagKind::TimeTrack,
            "wavetrack" => TagKind::WaveTrack,
            "tags" => TagKind::Tags,
            "tag" => TagKind::Tag,
            "label" => TagKind::Label,
            "waveclip" => TagKind::WaveClip,
            "sequence" => TagKind::Sequence,
            "waveblock" => TagKind::WaveBlock,
            "envelope" => TagKind::Envelope,
            "controlpoint" => TagKind::ControlPoint,
            "simpleblockfile" => TagKind::SimpleBlockFile,
            "silentblockfile" => TagKind::SilentBlockFile,
            "pcmaliasblockfile" => TagKind::PcmAliasBlockFile,
            _ => return None,
        })
    }

    /// Canonical name in the document.
    pub const fn as_str(self) -> &'static str {
        match self {
            TagKind::Project => "project",
            TagKind::LabelTrack => "labeltrack",
            TagKind::NoteTrack => "notetrack",
            TagKind::TimeTrack => "timetrack",
            TagKind::WaveTrack => "wavetrack",
            TagKind::Tags => "tags",
            TagKind::Tag => "tag",
            TagKind::Label => "label",
            TagKind::WaveClip => "waveclip",
            TagKind::Sequence => "sequence",
            TagKind::WaveBlock => "waveblock",
            TagKind::Envelope => "envelope",
            TagKind::ControlPoint => "controlpoint",
            TagKind::SimpleBlockFile => "simpleblockfile",
            TagKind::SilentBlockFile => "silentblockfile",
            TagKind::PcmAliasBlockFile => "pcmaliasblockfile",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        let all = [
            TagKind::Project,
            TagKind::LabelTrack,
            TagKind::NoteTrack,
            TagKind::TimeTrack,
            TagKind::WaveTrack,
            TagKind::Tags,
            TagKind::Tag,
            TagKind::Label,
            TagKind::WaveClip,
            TagKind::Sequence,
            TagKind::WaveBlock,
            TagKind::Envelope,
            TagKind::ControlPoint,
            TagKind::SimpleBlockFile,
            TagKind::SilentBlockFile,
            TagKind::PcmAliasBlockFile,
        ];
        for kind in all {
            assert_eq!(TagKind::from_name(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn legacy_root_alias() {
        assert_eq!(TagKind::from_name("audacityproject"), Some(TagKind::Project));
    }

    #[test]
    fn unknown_and_case_sensitive() {
        assert_eq!(TagKind::from_name("WaveTrack"), None);
        assert_eq!(TagKind::from_name("importedtrack"), None);
    }
}
