//! Entity construction from validated tag attributes.
//!
//! Tracks live in a vector and clips in a slot map, so the dispatcher can
//! refer to owners by index while the document is still open. The final
//! track list is assembled only once everything has been resolved.

use std::path::{Path, PathBuf};

use aup_ir::{
    ChannelPlacement, Clip, Envelope, Label, LabelTrack, NoteTrack, ProjectAttributes,
    SampleFormat, SampleRun, Tags, TimeTrack, Track, WaveTrack,
};
use slotmap::{SecondaryMap, SlotMap};

use crate::attrs::{self, AttrContext, AttrError, AttrErrorKind};
use crate::descriptor::{BlockFileDescriptor, DescriptorQueue};
use crate::diagnostics::Diagnostics;
use crate::file_index::{locate_data_dir, FileNameIndex};
use crate::tag::TagKind;
use crate::ImportError;

slotmap::new_key_type! {
    /// Handle to a clip of the import graph.
    pub struct ClipKey;
}

/// Index of a track in the import graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub usize);

/// Owner of an envelope being filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeOwner {
    Track(TrackId),
    Clip(ClipKey),
}

type Attrs = [(String, String)];

struct TrackNode {
    track: Track,
    clips: Vec<ClipKey>,
}

struct ClipNode {
    clip: Clip,
    track: TrackId,
    cut_lines: Vec<ClipKey>,
}

/// Tracks and clips created so far.
#[derive(Default)]
pub struct ImportGraph {
    tracks: Vec<TrackNode>,
    clips: SlotMap<ClipKey, ClipNode>,
    clip_order: Vec<ClipKey>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_track(&mut self, track: Track) -> TrackId {
        self.tracks.push(TrackNode {
            track,
            clips: Vec::new(),
        });
        TrackId(self.tracks.len() - 1)
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.0).map(|n| &n.track)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(id.0).map(|n| &mut n.track)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn has_time_track(&self) -> bool {
        self.tracks.iter().any(|n| matches!(n.track, Track::Time(_)))
    }

    /// Add a clip to a wave track, or a cut line to `parent`.
    ///
    /// Returns `None` if `track` is not a wave track or `parent` is unknown.
    pub fn add_clip(
        &mut self,
        track: TrackId,
        parent: Option<ClipKey>,
        clip: Clip,
    ) -> Option<ClipKey> {
        if !matches!(self.track(track), Some(Track::Wave(_))) {
            return None;
        }
        if let Some(p) = parent {
            if !self.clips.contains_key(p) {
                return None;
            }
        }

        let key = self.clips.insert(ClipNode {
            clip,
            track,
            cut_lines: Vec::new(),
        });
        match parent {
            Some(p) => self.clips[p].cut_lines.push(key),
            None => self.tracks[track.0].clips.push(key),
        }
        self.clip_order.push(key);
        Some(key)
    }

    pub fn clip(&self, key: ClipKey) -> Option<&Clip> {
        self.clips.get(key).map(|n| &n.clip)
    }

    pub fn clip_mut(&mut self, key: ClipKey) -> Option<&mut Clip> {
        self.clips.get_mut(key).map(|n| &mut n.clip)
    }

    /// Track owning a clip or cut line.
    pub fn clip_track(&self, key: ClipKey) -> Option<TrackId> {
        self.clips.get(key).map(|n| n.track)
    }

    /// Cut lines directly under a clip.
    pub fn cut_lines(&self, key: ClipKey) -> &[ClipKey] {
        self.clips.get(key).map(|n| n.cut_lines.as_slice()).unwrap_or(&[])
    }

    /// Top-level clips of a track, in document order.
    pub fn track_clips(&self, id: TrackId) -> &[ClipKey] {
        self.tracks.get(id.0).map(|n| n.clips.as_slice()).unwrap_or(&[])
    }

    /// Top-level clip of a wave track with the latest start.
    pub fn rightmost_clip(&self, id: TrackId) -> Option<ClipKey> {
        let keys = self.track_clips(id);
        let offsets = keys
            .iter()
            .map(|k| self.clips.get(*k).map_or(0.0, |n| n.clip.offset));
        aup_ir::track::rightmost_index(offsets).map(|i| keys[i])
    }

    /// Rightmost clip of a wave track, created if the track has none.
    pub fn rightmost_or_new_clip(&mut self, id: TrackId, format: SampleFormat) -> Option<ClipKey> {
        match self.rightmost_clip(id) {
            Some(key) => Some(key),
            None => self.add_clip(id, None, Clip::new(format)),
        }
    }

    /// Append a decoded run to a clip, or to the track's rightmost clip.
    ///
    /// Returns false if neither target exists.
    pub fn append_run(
        &mut self,
        track: TrackId,
        clip: Option<ClipKey>,
        run: SampleRun,
        format: SampleFormat,
    ) -> bool {
        let target = match clip {
            Some(key) if self.clips.contains_key(key) => Some(key),
            _ => self.rightmost_or_new_clip(track, format),
        };
        match target.and_then(|key| self.clip_mut(key)) {
            Some(c) => {
                c.append(run);
                true
            }
            None => false,
        }
    }

    /// Assemble the final track list.
    pub fn into_tracks(self) -> Vec<Track> {
        let ImportGraph {
            tracks,
            mut clips,
            clip_order,
        } = self;

        // Cut lines are always created after their parent, so walking the
        // creation order backwards finishes children first.
        let mut finished: SecondaryMap<ClipKey, Clip> = SecondaryMap::new();
        for key in clip_order.into_iter().rev() {
            let Some(node) = clips.remove(key) else {
                continue;
            };
            let mut clip = node.clip;
            clip.cut_lines = node
                .cut_lines
                .iter()
                .filter_map(|k| finished.remove(*k))
                .collect();
            finished.insert(key, clip);
        }

        tracks
            .into_iter()
            .map(|node| {
                let mut track = node.track;
                if let Track::Wave(wave) = &mut track {
                    wave.clips = node
                        .clips
                        .iter()
                        .filter_map(|k| finished.remove(*k))
                        .collect();
                }
                track
            })
            .collect()
    }
}

/// Applies the per-tag semantics of a project document.
pub struct EntityBuilder {
    graph: ImportGraph,
    queue: DescriptorQueue,
    attributes: ProjectAttributes,
    tags: Tags,
    diagnostics: Diagnostics,
    project_file: PathBuf,
    file_index: Option<FileNameIndex>,
    active_track: Option<TrackId>,
    active_clip: Option<ClipKey>,
    format: SampleFormat,
    host_has_time_track: bool,
}

/// Everything a finished parse produced.
pub struct BuilderParts {
    pub graph: ImportGraph,
    pub queue: DescriptorQueue,
    pub attributes: ProjectAttributes,
    pub tags: Tags,
    pub diagnostics: Diagnostics,
}

impl EntityBuilder {
    pub fn new(project_file: &Path, default_format: SampleFormat, host_has_time_track: bool) -> Self {
        Self {
            graph: ImportGraph::new(),
            queue: DescriptorQueue::new(),
            attributes: ProjectAttributes::default(),
            tags: Tags::new(),
            diagnostics: Diagnostics::new(),
            project_file: project_file.to_path_buf(),
            file_index: None,
            active_track: None,
            active_clip: None,
            format: default_format,
            host_has_time_track,
        }
    }

    pub fn graph(&self) -> &ImportGraph {
        &self.graph
    }

    pub fn queue(&self) -> &DescriptorQueue {
        &self.queue
    }

    /// Metadata collected so far from `<tags>` and `<tag>`.
    pub fn collected_tags(&self) -> &Tags {
        &self.tags
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_parts(self) -> BuilderParts {
        BuilderParts {
            graph: self.graph,
            queue: self.queue,
            attributes: self.attributes,
            tags: self.tags,
            diagnostics: self.diagnostics,
        }
    }

    // --- Root ---

    pub fn project(&mut self, attrs: &Attrs) -> Result<(), ImportError> {
        const TAG: TagKind = TagKind::Project;
        let mut version = false;
        let mut audacity_version = false;
        let mut projname = false;

        for (name, value) in attrs {
            attrs::check_string(value).at(TAG, name)?;
            let a = &mut self.attributes;
            match name.as_str() {
                "vpos" => a.vpos = Some(attrs::parse_non_negative_int(value).at(TAG, name)?),
                "h" => a.h = Some(attrs::parse_non_negative_real(value).at(TAG, name)?),
                "zoom" => a.zoom = Some(attrs::parse_non_negative_real(value).at(TAG, name)?),
                "sel0" => a.sel0 = Some(attrs::parse_non_negative_real(value).at(TAG, name)?),
                "sel1" => a.sel1 = Some(attrs::parse_non_negative_real(value).at(TAG, name)?),
                "selLow" => a.sel_low = Some(attrs::parse_non_negative_real(value).at(TAG, name)?),
                "selHigh" => {
                    a.sel_high = Some(attrs::parse_non_negative_real(value).at(TAG, name)?)
                }
                "rate" => a.rate = Some(attrs::parse_non_negative_real(value).at(TAG, name)?),
                "snapto" => a.snap_to = Some(attrs::parse_snap_to(value)),
                "selectionformat" => a.selection_format = Some(value.clone()),
                "audiotimeformat" => a.audio_time_format = Some(value.clone()),
                "frequencyformat" => a.frequency_format = Some(value.clone()),
                "bandwidthformat" => a.bandwidth_format = Some(value.clone()),
                "version" => version = true,
                "audacityversion" => audacity_version = true,
                "projname" => {
                    projname = true;
                    self.open_data_dir(value)?;
                }
                _ => {}
            }
        }

        let missing = [
            ("version", version),
            ("audacityversion", audacity_version),
            ("projname", projname),
        ]
        .into_iter()
        .find(|(_, seen)| !seen);
        if let Some((name, _)) = missing {
            return Err(ImportError::MissingAttribute(name));
        }
        Ok(())
    }

    fn open_data_dir(&mut self, projname: &str) -> Result<(), ImportError> {
        let dir = locate_data_dir(&self.project_file, projname).ok_or_else(|| {
            ImportError::DataDirNotFound(projname.to_string())
        })?;
        let index = FileNameIndex::build(&dir)?;
        self.file_index = Some(index);
        Ok(())
    }

    // --- Tracks ---

    pub fn label_track(&mut self, attrs: &Attrs) -> Result<TrackId, ImportError> {
        const TAG: TagKind = TagKind::LabelTrack;
        let mut track = LabelTrack::default();
        for (name, value) in attrs {
            match name.as_str() {
                "name" => track.name = self.content_string(TAG, name, value),
                "numlabels" => track.declared_labels = Some(attrs::parse_count(value).at(TAG, name)?),
                _ => {}
            }
        }
        Ok(self.graph.add_track(Track::Label(track)))
    }

    pub fn note_track(&mut self, attrs: &Attrs) -> Result<TrackId, ImportError> {
        const TAG: TagKind = TagKind::NoteTrack;
        let mut track = NoteTrack::default();
        for (name, value) in attrs {
            match name.as_str() {
                "name" => track.name = self.content_string(TAG, name, value),
                "offset" => track.offset = attrs::parse_real(value).at(TAG, name)?,
                "data" => track.data = value.clone(),
                _ => {}
            }
        }
        Ok(self.graph.add_track(Track::Note(track)))
    }

    /// Returns `None` when the time track is bypassed as a duplicate.
    pub fn time_track(&mut self, attrs: &Attrs) -> Result<Option<TrackId>, ImportError> {
        const TAG: TagKind = TagKind::TimeTrack;
        if self.host_has_time_track || self.graph.has_time_track() {
            self.diagnostics.warn(
                "The active project already has a time track and one was encountered in the \
                 project being imported, bypassing imported time track.",
            );
            return Ok(None);
        }

        let mut track = TimeTrack::default();
        for (name, value) in attrs {
            match name.as_str() {
                "name" => track.name = self.content_string(TAG, name, value),
                "rangelower" => track.range_lower = attrs::parse_real(value).at(TAG, name)?,
                "rangeupper" => track.range_upper = attrs::parse_real(value).at(TAG, name)?,
                "displaylog" => track.display_log = attrs::parse_flag(value).at(TAG, name)?,
                "interpolatelog" => {
                    track.interpolate_log = attrs::parse_flag(value).at(TAG, name)?
                }
                _ => {}
            }
        }
        Ok(Some(self.graph.add_track(Track::Time(track))))
    }

    pub fn wave_track(&mut self, attrs: &Attrs) -> Result<TrackId, ImportError> {
        const TAG: TagKind = TagKind::WaveTrack;
        let mut track = WaveTrack::default();
        for (name, value) in attrs {
            match name.as_str() {
                "name" => track.name = self.content_string(TAG, name, value),
                "channel" => {
                    let index = attrs::parse_int(value).at(TAG, name)?;
                    track.channel = ChannelPlacement::from_index(index.into())
                        .ok_or(AttrErrorKind::OutOfRange)
                        .at(TAG, name)?;
                }
                "linked" => track.linked = attrs::parse_flag(value).at(TAG, name)?,
                "offset" => track.offset = attrs::parse_real(value).at(TAG, name)?,
                "rate" => {
                    let rate = attrs::parse_real(value).at(TAG, name)?;
                    if !(1.0..=1_000_000.0).contains(&rate) {
                        return Err(AttrError::new(TAG, name, AttrErrorKind::OutOfRange).into());
                    }
                    track.rate = rate.round() as u32;
                }
                "gain" => track.gain = attrs::parse_real(value).at(TAG, name)?,
                "pan" => track.pan = attrs::parse_real(value).at(TAG, name)?,
                "mute" => track.mute = attrs::parse_flag(value).at(TAG, name)?,
                "solo" => track.solo = attrs::parse_flag(value).at(TAG, name)?,
                _ => {}
            }
        }
        let id = self.graph.add_track(Track::Wave(track));
        self.active_track = Some(id);
        self.active_clip = None;
        Ok(id)
    }

    // --- Metadata ---

    /// Legacy `<tags>` form with one attribute per tag.
    pub fn tags(&mut self, attrs: &Attrs) {
        for (name, value) in attrs {
            if value.is_empty() {
                continue;
            }
            if !attrs::is_good_string(name) || !attrs::is_good_string(value) {
                self.diagnostics
                    .warn(format!("Ignoring invalid metadata attribute '{name}'"));
                continue;
            }
            match name.as_str() {
                "id3v2" => {}
                "track" => self.tags.set("TRACKNUMBER", value),
                _ => self.tags.set(name, value),
            }
        }
    }

    /// `<tag name=".." value=".."/>` under `<tags>`.
    pub fn tag(&mut self, attrs: &Attrs) {
        let mut tag_name = "";
        let mut tag_value = "";
        for (name, value) in attrs {
            if !attrs::is_good_string(name) || !attrs::is_good_string(value) {
                self.diagnostics
                    .warn(format!("Ignoring invalid metadata attribute '{name}'"));
                return;
            }
            match name.as_str() {
                "name" => tag_name = value.as_str(),
                "value" => tag_value = value.as_str(),
                _ => {}
            }
        }
        if tag_name != "id3v2" {
            self.tags.set(tag_name, tag_value);
        }
    }

    // --- Labels ---

    pub fn label(&mut self, track: TrackId, attrs: &Attrs) -> Result<(), ImportError> {
        const TAG: TagKind = TagKind::Label;
        let mut start = None;
        let mut end = None;
        let mut title = String::new();
        for (name, value) in attrs {
            match name.as_str() {
                "t" => start = Some(attrs::parse_real(value).at(TAG, name)?),
                "t1" => end = Some(attrs::parse_real(value).at(TAG, name)?),
                "title" => title = self.content_string(TAG, name, value),
                _ => {}
            }
        }
        let start = start.ok_or(AttrErrorKind::Missing).at(TAG, "t")?;
        let label = Label {
            start,
            end: end.unwrap_or(start),
            title,
        };

        match self.graph.track_mut(track).and_then(Track::as_label_mut) {
            Some(t) => {
                t.labels.push(label);
                Ok(())
            }
            None => Err(ImportError::BadContext {
                tag: TAG.as_str(),
                parent: TagKind::LabelTrack.as_str(),
            }),
        }
    }

    // --- Clips ---

    /// Open a clip on `track`, or a cut line inside `parent`.
    pub fn wave_clip(
        &mut self,
        track: TrackId,
        parent: Option<ClipKey>,
        attrs: &Attrs,
    ) -> Result<ClipKey, ImportError> {
        const TAG: TagKind = TagKind::WaveClip;
        let mut clip = Clip::new(self.format);
        for (name, value) in attrs {
            match name.as_str() {
                "offset" => clip.offset = attrs::parse_real(value).at(TAG, name)?,
                "name" => clip.name = self.content_string(TAG, name, value),
                _ => {}
            }
        }

        let parent_tag = if parent.is_some() { TAG } else { TagKind::WaveTrack };
        let key = self
            .graph
            .add_clip(track, parent, clip)
            .ok_or(ImportError::BadContext {
                tag: TAG.as_str(),
                parent: parent_tag.as_str(),
            })?;
        self.active_clip = Some(key);
        Ok(key)
    }

    /// Close a clip. The active clip becomes `enclosing` if there is one,
    /// otherwise stays on the closed clip.
    pub fn finish_clip(&mut self, key: ClipKey, enclosing: Option<ClipKey>) {
        if let Some(clip) = self.graph.clip_mut(key) {
            clip.finish();
        }
        self.active_clip = enclosing.or(Some(key));
    }

    /// Rightmost clip of a wave track, for track-level envelopes.
    pub fn rightmost_or_new_clip(&mut self, track: TrackId) -> Result<ClipKey, ImportError> {
        self.graph
            .rightmost_or_new_clip(track, self.format)
            .ok_or(ImportError::BadContext {
                tag: TagKind::Envelope.as_str(),
                parent: TagKind::WaveTrack.as_str(),
            })
    }

    pub fn sequence(&mut self, attrs: &Attrs) -> Result<(), ImportError> {
        const TAG: TagKind = TagKind::Sequence;
        for (name, value) in attrs {
            match name.as_str() {
                "maxsamples" => {
                    attrs::parse_max_samples(value).at(TAG, name)?;
                }
                "sampleformat" => {
                    self.format = attrs::parse_sample_format(value).at(TAG, name)?;
                    let format = self.format;
                    if let Some(clip) = self.active_clip.and_then(|k| self.graph.clip_mut(k)) {
                        clip.format = format;
                    }
                }
                "numsamples" => {
                    attrs::parse_count(value).at(TAG, name)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn wave_block(&mut self, attrs: &Attrs) -> Result<(), ImportError> {
        for (name, value) in attrs {
            if name == "start" {
                attrs::parse_count(value).at(TagKind::WaveBlock, name)?;
            }
        }
        Ok(())
    }

    // --- Envelopes ---

    fn envelope_mut(&mut self, owner: EnvelopeOwner) -> Option<&mut Envelope> {
        match owner {
            EnvelopeOwner::Track(id) => self
                .graph
                .track_mut(id)
                .and_then(Track::as_time_mut)
                .map(|t| &mut t.envelope),
            EnvelopeOwner::Clip(key) => self.graph.clip_mut(key).map(|c| &mut c.envelope),
        }
    }

    pub fn envelope(&mut self, owner: EnvelopeOwner, attrs: &Attrs) -> Result<(), ImportError> {
        const TAG: TagKind = TagKind::Envelope;
        let mut declared = None;
        for (name, value) in attrs {
            if name == "numpoints" {
                declared = Some(attrs::parse_count(value).at(TAG, name)?);
            }
        }
        if let (Some(n), Some(env)) = (declared, self.envelope_mut(owner)) {
            env.clear();
            env.declared_points = Some(n);
        }
        Ok(())
    }

    pub fn control_point(&mut self, owner: EnvelopeOwner, attrs: &Attrs) -> Result<(), ImportError> {
        const TAG: TagKind = TagKind::ControlPoint;
        let mut t = None;
        let mut val = None;
        for (name, value) in attrs {
            match name.as_str() {
                "t" => t = Some(attrs::parse_real(value).at(TAG, name)?),
                "val" => val = Some(attrs::parse_real(value).at(TAG, name)?),
                _ => {}
            }
        }
        let t = t.ok_or(AttrErrorKind::Missing).at(TAG, "t")?;
        let val = val.ok_or(AttrErrorKind::Missing).at(TAG, "val")?;
        if let Some(env) = self.envelope_mut(owner) {
            env.add_point(t, val);
        }
        Ok(())
    }

    // --- Block files ---

    pub fn simple_block_file(&mut self, attrs: &Attrs) -> Result<(), ImportError> {
        const TAG: TagKind = TagKind::SimpleBlockFile;
        let track = self.require_track(TAG)?;
        let mut path = None;
        let mut len = None;
        for (name, value) in attrs {
            if attrs::name_is(name, "filename") {
                path = self.lookup_block_file(value);
            } else if name == "len" {
                len = Some(attrs::parse_len(value).at(TAG, name)?);
            }
        }
        let len = len.ok_or(AttrErrorKind::Missing).at(TAG, "len")?;
        self.queue_block(track, path, len, 0, 0)
    }

    pub fn silent_block_file(&mut self, attrs: &Attrs) -> Result<(), ImportError> {
        const TAG: TagKind = TagKind::SilentBlockFile;
        let track = self.require_track(TAG)?;
        let mut len = None;
        for (name, value) in attrs {
            if name == "len" {
                len = Some(attrs::parse_len(value).at(TAG, name)?);
            }
        }
        let len = len.ok_or(AttrErrorKind::Missing).at(TAG, "len")?;
        self.queue_block(track, None, len, 0, 0)
    }

    pub fn pcm_alias_block_file(&mut self, attrs: &Attrs) -> Result<(), ImportError> {
        const TAG: TagKind = TagKind::PcmAliasBlockFile;
        let track = self.require_track(TAG)?;
        let mut path = None;
        let mut start = 0;
        let mut len = None;
        let mut channel = 0;
        for (name, value) in attrs {
            if attrs::name_is(name, "aliasfile") {
                path = self.locate_alias_file(value);
            } else if attrs::name_is(name, "aliasstart") {
                start = attrs::parse_count(value).at(TAG, name)?;
            } else if attrs::name_is(name, "aliaslen") {
                len = Some(attrs::parse_len(value).at(TAG, name)?);
            } else if attrs::name_is(name, "aliaschannel") {
                let ch = attrs::parse_non_negative_int(value).at(TAG, name)?;
                channel = u16::try_from(ch)
                    .map_err(|_| AttrErrorKind::OutOfRange)
                    .at(TAG, name)?;
            }
        }
        let len = len.ok_or(AttrErrorKind::Missing).at(TAG, "aliaslen")?;
        self.queue_block(track, path, len, start, channel)
    }

    fn require_track(&self, tag: TagKind) -> Result<TrackId, ImportError> {
        self.active_track
            .ok_or(ImportError::NoActiveTrack(tag.as_str()))
    }

    fn queue_block(
        &mut self,
        track: TrackId,
        path: Option<PathBuf>,
        len: u64,
        origin: u64,
        channel: u16,
    ) -> Result<(), ImportError> {
        self.queue.push(BlockFileDescriptor {
            track,
            clip: self.active_clip,
            path,
            len,
            origin,
            channel,
            format: self.format,
        })
    }

    fn lookup_block_file(&mut self, name: &str) -> Option<PathBuf> {
        if !attrs::is_good_file_string(name) {
            self.diagnostics
                .warn(format!("Invalid block file name {name}\n\nInserting silence instead."));
            return None;
        }
        let found = self
            .file_index
            .as_ref()
            .and_then(|index| index.lookup(name))
            .map(Path::to_path_buf);
        if found.is_none() {
            self.diagnostics
                .warn(format!("Missing project file {name}\n\nInserting silence instead."));
        }
        found
    }

    fn locate_alias_file(&mut self, value: &str) -> Option<PathBuf> {
        if attrs::is_good_path_string(value) {
            let path = Path::new(value);
            let candidate = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.project_dir().join(path)
            };
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if attrs::is_good_file_string(value) {
            if let Some(index) = &self.file_index {
                let candidate = index.root().join(value);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        self.diagnostics
            .warn(format!("Missing alias file {value}\n\nInserting silence instead."));
        None
    }

    fn project_dir(&self) -> &Path {
        self.project_file.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Free-text attribute; a bad string is dropped with a warning.
    fn content_string(&mut self, tag: TagKind, name: &str, value: &str) -> String {
        match attrs::check_string(value) {
            Ok(v) => v.to_string(),
            Err(kind) => {
                self.diagnostics
                    .warn(AttrError::new(tag, name, kind).to_string());
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aup_ir::SampleBuffer;

    fn attrs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn builder() -> EntityBuilder {
        EntityBuilder::new(Path::new("/nonexistent/song.aup"), SampleFormat::Float32, false)
    }

    #[test]
    fn into_tracks_nests_cut_lines() {
        let mut graph = ImportGraph::new();
        let track = graph.add_track(Track::Wave(WaveTrack::new("w")));
        let clip = graph.add_clip(track, None, Clip::new(SampleFormat::Int16)).unwrap();
        let cut = graph.add_clip(track, Some(clip), Clip::new(SampleFormat::Int16)).unwrap();
        graph.add_clip(track, Some(cut), Clip::new(SampleFormat::Int16)).unwrap();
        graph.append_run(track, Some(cut), SampleRun::Silence(5), SampleFormat::Int16);

        let tracks = graph.into_tracks();
        let wave = tracks[0].as_wave().unwrap();
        assert_eq!(wave.clips.len(), 1);
        assert_eq!(wave.clips[0].cut_line_depth(), 2);
        assert_eq!(wave.clips[0].cut_lines[0].num_samples(), 5);
    }

    #[test]
    fn add_clip_rejects_non_wave_tracks() {
        let mut graph = ImportGraph::new();
        let track = graph.add_track(Track::Label(LabelTrack::default()));
        assert!(graph.add_clip(track, None, Clip::new(SampleFormat::Float32)).is_none());
    }

    #[test]
    fn append_run_without_clip_uses_rightmost() {
        let mut graph = ImportGraph::new();
        let track = graph.add_track(Track::Wave(WaveTrack::new("w")));
        assert!(graph.append_run(
            track,
            None,
            SampleRun::Samples(SampleBuffer::Float32(vec![0.25; 3])),
            SampleFormat::Float32,
        ));
        assert!(graph.append_run(track, None, SampleRun::Silence(2), SampleFormat::Float32));
        assert_eq!(graph.clips.len(), 1);

        let tracks = graph.into_tracks();
        assert_eq!(tracks[0].as_wave().unwrap().num_samples(), 5);
    }

    #[test]
    fn wave_track_resets_active_clip() {
        let mut b = builder();
        let t = b.wave_track(&attrs(&[("name", "A"), ("rate", "48000")])).unwrap();
        b.wave_clip(t, None, &[]).unwrap();
        assert!(b.active_clip.is_some());
        b.wave_track(&[]).unwrap();
        assert!(b.active_clip.is_none());
        assert_eq!(b.graph().track(t).unwrap().as_wave().unwrap().rate, 48000);
    }

    #[test]
    fn wave_track_rejects_bad_channel() {
        let mut b = builder();
        assert!(b.wave_track(&attrs(&[("channel", "7")])).is_err());
    }

    #[test]
    fn sequence_sets_format_on_active_clip() {
        let mut b = builder();
        let t = b.wave_track(&[]).unwrap();
        let c = b.wave_clip(t, None, &[]).unwrap();
        b.sequence(&attrs(&[("maxsamples", "262144"), ("sampleformat", "131073")]))
            .unwrap();
        assert_eq!(b.format, SampleFormat::Int16);
        assert_eq!(b.graph().clip(c).unwrap().format, SampleFormat::Int16);
    }

    #[test]
    fn legacy_tags_form() {
        let mut b = builder();
        b.tags(&attrs(&[
            ("title", "Song"),
            ("track", "3"),
            ("id3v2", "1"),
            ("comments", ""),
        ]));
        assert_eq!(b.collected_tags().get("TITLE"), Some("Song"));
        assert_eq!(b.collected_tags().get("TRACKNUMBER"), Some("3"));
        assert_eq!(b.collected_tags().get("ID3V2"), None);
        assert_eq!(b.collected_tags().len(), 2);
    }

    #[test]
    fn tag_element_form() {
        let mut b = builder();
        b.tag(&attrs(&[("name", "ARTIST"), ("value", "Someone")]));
        b.tag(&attrs(&[("name", "id3v2"), ("value", "1")]));
        assert_eq!(b.collected_tags().get("ARTIST"), Some("Someone"));
        assert_eq!(b.collected_tags().len(), 1);
    }

    #[test]
    fn bad_metadata_string_warns() {
        let mut b = builder();
        b.tag(&attrs(&[("name", "TITLE"), ("value", "bad\u{1}")]));
        assert_eq!(b.diagnostics().warning_count(), 1);
    }

    #[test]
    fn bad_tag_keeps_earlier_value() {
        let mut b = builder();
        b.tag(&attrs(&[("name", "artist"), ("value", "A")]));
        b.tag(&attrs(&[("name", "artist"), ("value", "B\u{2}")]));
        b.tag(&attrs(&[("name", "bad\u{3}"), ("value", "C")]));
        assert_eq!(b.collected_tags().get("ARTIST"), Some("A"));
        assert_eq!(b.collected_tags().len(), 1);
        assert_eq!(b.diagnostics().warning_count(), 2);
    }

    #[test]
    fn second_time_track_is_bypassed() {
        let mut b = builder();
        assert!(b.time_track(&[]).unwrap().is_some());
        assert!(b.time_track(&[]).unwrap().is_none());
        assert_eq!(b.graph().track_count(), 1);
        assert!(b
            .diagnostics()
            .first_warning()
            .unwrap()
            .contains("bypassing imported time track"));
    }

    #[test]
    fn host_time_track_bypasses_first() {
        let mut b = EntityBuilder::new(Path::new("x.aup"), SampleFormat::Float32, true);
        assert!(b.time_track(&[]).unwrap().is_none());
        assert_eq!(b.graph().track_count(), 0);
    }

    #[test]
    fn labels_default_end_to_start() {
        let mut b = builder();
        let t = b.label_track(&attrs(&[("name", "Marks"), ("numlabels", "1")])).unwrap();
        b.label(t, &attrs(&[("t", "1.5"), ("title", "here")])).unwrap();
        let track = b.graph().track(t).unwrap().as_label().unwrap();
        assert_eq!(track.labels, vec![Label::new(1.5, 1.5, "here")]);
        assert_eq!(track.declared_labels, Some(1));
    }

    #[test]
    fn control_points_need_both_fields() {
        let mut b = builder();
        let t = b.time_track(&[]).unwrap().unwrap();
        let owner = EnvelopeOwner::Track(t);
        b.envelope(owner, &attrs(&[("numpoints", "1")])).unwrap();
        b.control_point(owner, &attrs(&[("t", "0.5"), ("val", "1.1")])).unwrap();
        assert!(b.control_point(owner, &attrs(&[("t", "0.5")])).is_err());
        let env = &b.graph().track(t).unwrap().as_time().unwrap().envelope;
        assert_eq!(env.points.len(), 1);
        assert_eq!(env.declared_points, Some(1));
    }

    #[test]
    fn block_file_without_track_is_fatal() {
        let mut b = builder();
        let err = b.silent_block_file(&attrs(&[("len", "10")])).unwrap_err();
        assert!(matches!(err, ImportError::NoActiveTrack("silentblockfile")));
    }

    #[test]
    fn block_file_len_must_be_positive() {
        let mut b = builder();
        b.wave_track(&[]).unwrap();
        assert!(b.silent_block_file(&attrs(&[("len", "0")])).is_err());
        assert!(b.silent_block_file(&[]).is_err());
        b.silent_block_file(&attrs(&[("len", "10")])).unwrap();
        assert_eq!(b.queue().total_samples(), 10);
    }

    #[test]
    fn missing_simple_block_file_warns() {
        let mut b = builder();
        b.wave_track(&[]).unwrap();
        b.simple_block_file(&attrs(&[("FileName", "e0001.au"), ("len", "256")]))
            .unwrap();
        let desc = b.queue().iter().next().unwrap();
        assert_eq!(desc.path, None);
        assert_eq!(desc.len, 256);
        assert_eq!(
            b.diagnostics().first_warning(),
            Some("Missing project file e0001.au\n\nInserting silence instead.")
        );
    }

    #[test]
    fn alias_attributes_ignore_case() {
        let mut b = builder();
        b.wave_track(&[]).unwrap();
        b.pcm_alias_block_file(&attrs(&[
            ("AliasFile", "/nonexistent/take.wav"),
            ("AliasStart", "100"),
            ("AliasLen", "50"),
            ("AliasChannel", "1"),
        ]))
        .unwrap();
        let desc = b.queue().iter().next().unwrap();
        assert_eq!((desc.origin, desc.len, desc.channel), (100, 50, 1));
        assert_eq!(desc.path, None);
        assert_eq!(
            b.diagnostics().first_warning(),
            Some("Missing alias file /nonexistent/take.wav\n\nInserting silence instead.")
        );
    }

    #[test]
    fn root_requires_three_attributes() {
        let mut b = builder();
        let err = b
            .project(&attrs(&[("version", "1.3.0"), ("audacityversion", "2.4.2")]))
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingAttribute("projname")));
    }

    #[test]
    fn root_rejects_negative_real() {
        let mut b = builder();
        let err = b.project(&attrs(&[("sel0", "-1")])).unwrap_err();
        assert!(matches!(err, ImportError::Attr(_)));
    }
}
