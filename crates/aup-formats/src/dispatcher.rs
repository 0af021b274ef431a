//! Stack-based tag dispatch.
//!
//! Each open tag pushes a frame recording its parent, its kind and what it
//! owns. Rules are selected by `(parent kind, tag kind)`. A bypassed frame
//! suppresses its whole subtree: descendants must still be known tags but
//! none of their rules run.

use crate::builder::{ClipKey, EntityBuilder, EnvelopeOwner, TrackId};
use crate::tag::TagKind;
use crate::tokenizer::TagEvent;
use crate::ImportError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Owner {
    Track(TrackId),
    Clip(ClipKey),
    Envelope(EnvelopeOwner),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Owned(Owner),
    /// Handled in place, nothing to own
    Passive,
    /// Subtree is skipped
    Bypassed,
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    parent: Option<TagKind>,
    tag: TagKind,
    scope: Scope,
}

/// Feeds tag events into an [`EntityBuilder`].
pub struct TagDispatcher {
    builder: EntityBuilder,
    stack: Vec<Frame>,
    seen_root: bool,
    tags_seen: usize,
}

impl TagDispatcher {
    pub fn new(builder: EntityBuilder) -> Self {
        Self {
            builder,
            stack: Vec::new(),
            seen_root: false,
            tags_seen: 0,
        }
    }

    pub fn builder(&self) -> &EntityBuilder {
        &self.builder
    }

    pub fn handle(&mut self, event: &TagEvent) -> Result<(), ImportError> {
        let result = match event {
            TagEvent::Open { name, attrs } => self.open(name, attrs),
            TagEvent::Close { name } => self.close(name),
        };
        if let Err(e) = &result {
            log::error!("{e}");
        }
        result
    }

    pub fn open(&mut self, name: &str, attrs: &[(String, String)]) -> Result<(), ImportError> {
        let kind = TagKind::from_name(name).ok_or_else(|| ImportError::UnknownTag(name.to_string()))?;
        self.tags_seen += 1;

        let top = self.stack.last().copied();
        let scope = match top {
            None => {
                if kind != TagKind::Project || self.seen_root {
                    return Err(ImportError::BadRoot(name.to_string()));
                }
                self.seen_root = true;
                self.builder.project(attrs)?;
                Scope::Passive
            }
            Some(Frame {
                scope: Scope::Bypassed,
                ..
            }) => Scope::Bypassed,
            Some(frame) => self.dispatch(frame, kind, attrs)?,
        };

        self.stack.push(Frame {
            parent: top.map(|f| f.tag),
            tag: kind,
            scope,
        });
        Ok(())
    }

    fn dispatch(
        &mut self,
        frame: Frame,
        kind: TagKind,
        attrs: &[(String, String)],
    ) -> Result<Scope, ImportError> {
        let b = &mut self.builder;
        let scope = match (frame.tag, kind) {
            (TagKind::Project, TagKind::LabelTrack) => Scope::Owned(Owner::Track(b.label_track(attrs)?)),
            (TagKind::Project, TagKind::NoteTrack) => Scope::Owned(Owner::Track(b.note_track(attrs)?)),
            (TagKind::Project, TagKind::TimeTrack) => match b.time_track(attrs)? {
                Some(id) => Scope::Owned(Owner::Track(id)),
                None => Scope::Bypassed,
            },
            (TagKind::Project, TagKind::WaveTrack) => Scope::Owned(Owner::Track(b.wave_track(attrs)?)),
            (TagKind::Project, TagKind::Tags) => {
                b.tags(attrs);
                Scope::Passive
            }
            (TagKind::Tags, TagKind::Tag) => {
                b.tag(attrs);
                Scope::Passive
            }
            (TagKind::LabelTrack, TagKind::Label) => {
                let track = owned_track(frame, kind)?;
                b.label(track, attrs)?;
                Scope::Passive
            }
            (TagKind::WaveTrack, TagKind::WaveClip) => {
                let track = owned_track(frame, kind)?;
                Scope::Owned(Owner::Clip(b.wave_clip(track, None, attrs)?))
            }
            (TagKind::WaveClip, TagKind::WaveClip) => {
                let parent = owned_clip(frame, kind)?;
                let track = b
                    .graph()
                    .clip_track(parent)
                    .ok_or_else(|| bad_context(kind, frame.tag))?;
                Scope::Owned(Owner::Clip(b.wave_clip(track, Some(parent), attrs)?))
            }
            (TagKind::TimeTrack, TagKind::Envelope) => {
                let owner = EnvelopeOwner::Track(owned_track(frame, kind)?);
                b.envelope(owner, attrs)?;
                Scope::Owned(Owner::Envelope(owner))
            }
            (TagKind::WaveTrack, TagKind::Envelope) => {
                let track = owned_track(frame, kind)?;
                let owner = EnvelopeOwner::Clip(b.rightmost_or_new_clip(track)?);
                b.envelope(owner, attrs)?;
                Scope::Owned(Owner::Envelope(owner))
            }
            (TagKind::WaveClip, TagKind::Envelope) => {
                let owner = EnvelopeOwner::Clip(owned_clip(frame, kind)?);
                b.envelope(owner, attrs)?;
                Scope::Owned(Owner::Envelope(owner))
            }
            (_, TagKind::Envelope) => Scope::Passive,
            (TagKind::Envelope, TagKind::ControlPoint) => {
                if let Scope::Owned(Owner::Envelope(owner)) = frame.scope {
                    b.control_point(owner, attrs)?;
                }
                Scope::Passive
            }
            (_, TagKind::ControlPoint) => Scope::Passive,
            (_, TagKind::Sequence) => {
                b.sequence(attrs)?;
                Scope::Passive
            }
            (_, TagKind::WaveBlock) => {
                b.wave_block(attrs)?;
                Scope::Passive
            }
            (_, TagKind::SimpleBlockFile) => {
                b.simple_block_file(attrs)?;
                Scope::Passive
            }
            (_, TagKind::SilentBlockFile) => {
                b.silent_block_file(attrs)?;
                Scope::Passive
            }
            (_, TagKind::PcmAliasBlockFile) => {
                b.pcm_alias_block_file(attrs)?;
                Scope::Passive
            }
            (parent, _) => return Err(bad_context(kind, parent)),
        };
        Ok(scope)
    }

    pub fn close(&mut self, name: &str) -> Result<(), ImportError> {
        let frame = self.stack.pop().ok_or_else(|| ImportError::MismatchedClose {
            expected: String::new(),
            found: name.to_string(),
        })?;
        if TagKind::from_name(name) != Some(frame.tag) {
            return Err(ImportError::MismatchedClose {
                expected: frame.tag.as_str().to_string(),
                found: name.to_string(),
            });
        }

        if let Scope::Owned(Owner::Clip(key)) = frame.scope {
            let enclosing = match self.stack.last() {
                Some(Frame {
                    scope: Scope::Owned(Owner::Clip(parent)),
                    ..
                }) => Some(*parent),
                _ => None,
            };
            self.builder.finish_clip(key, enclosing);
        }
        Ok(())
    }

    /// End of document. Fails if no root was seen or tags are still open.
    pub fn finish(self) -> Result<EntityBuilder, ImportError> {
        if let Some(frame) = self.stack.last() {
            return Err(ImportError::MismatchedClose {
                expected: frame.tag.as_str().to_string(),
                found: String::new(),
            });
        }
        if !self.seen_root {
            return Err(ImportError::Empty);
        }
        log::debug!(
            "dispatched {} tags into {} tracks, {} block files",
            self.tags_seen,
            self.builder.graph().track_count(),
            self.builder.queue().len()
        );
        Ok(self.builder)
    }
}

fn bad_context(tag: TagKind, parent: TagKind) -> ImportError {
    ImportError::BadContext {
        tag: tag.as_str(),
        parent: parent.as_str(),
    }
}

fn owned_track(frame: Frame, kind: TagKind) -> Result<TrackId, ImportError> {
    match frame.scope {
        Scope::Owned(Owner::Track(id)) => Ok(id),
        _ => Err(bad_context(kind, frame.tag)),
    }
}

fn owned_clip(frame: Frame, kind: TagKind) -> Result<ClipKey, ImportError> {
    match frame.scope {
        Scope::Owned(Owner::Clip(key)) => Ok(key),
        _ => Err(bad_context(kind, frame.tag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aup_ir::SampleFormat;
    use std::path::Path;

    fn dispatcher() -> TagDispatcher {
        TagDispatcher::new(EntityBuilder::new(
            Path::new("/nonexistent/song.aup"),
            SampleFormat::Float32,
            false,
        ))
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let mut d = dispatcher();
        let err = d.open("importedtrack", &[]).unwrap_err();
        assert!(matches!(err, ImportError::UnknownTag(ref n) if n == "importedtrack"));
    }

    #[test]
    fn root_must_be_project() {
        let mut d = dispatcher();
        assert!(matches!(d.open("wavetrack", &[]), Err(ImportError::BadRoot(_))));
    }

    #[test]
    fn frames_track_parent_and_current() {
        let mut d = dispatcher();
        d.seen_root = true;
        d.stack.push(Frame {
            parent: None,
            tag: TagKind::Project,
            scope: Scope::Passive,
        });
        let top = |d: &TagDispatcher| d.stack.last().map(|f| (f.tag, f.parent));
        d.open("labeltrack", &[]).unwrap();
        assert_eq!(top(&d), Some((TagKind::LabelTrack, Some(TagKind::Project))));
        assert_eq!(d.stack.len(), 2);
        d.close("labeltrack").unwrap();
        assert_eq!(top(&d), Some((TagKind::Project, None)));
    }

    #[test]
    fn mismatched_close_is_fatal() {
        let mut d = dispatcher();
        d.seen_root = true;
        d.stack.push(Frame {
            parent: None,
            tag: TagKind::Project,
            scope: Scope::Passive,
        });
        assert!(matches!(
            d.close("wavetrack"),
            Err(ImportError::MismatchedClose { .. })
        ));
    }

    #[test]
    fn handle_leaves_stack_on_error() {
        let mut d = dispatcher();
        let err = d.handle(&TagEvent::open("bogus", &[])).unwrap_err();
        assert_eq!(err.to_string(), "unknown tag <bogus>");
        assert!(d.stack.is_empty());
        assert_eq!(d.builder().diagnostics().warning_count(), 0);
    }
}
