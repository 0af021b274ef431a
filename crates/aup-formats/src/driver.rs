//! Import driver: parse, resolve, then commit to the host in one step.

use std::path::{Path, PathBuf};

use aup_ir::{SampleFormat, SampleRun, Tags, Track, ViewSetting};

use crate::builder::{BuilderParts, EntityBuilder};
use crate::descriptor::DescriptorQueue;
use crate::diagnostics::{Diagnostics, Severity};
use crate::dispatcher::TagDispatcher;
use crate::resolver::BlockResolver;
use crate::source::{DecodeService, FileDecoder};
use crate::tokenizer::{detect, DocumentKind, Tokenizer};
use crate::ImportError;

/// The project receiving imported tracks.
pub trait ProjectHost {
    /// True if the project was modified since it was last saved.
    fn is_dirty(&self) -> bool;

    fn has_time_track(&self) -> bool;

    /// Link finished tracks into the project. Called at most once per import.
    fn add_tracks(&mut self, tracks: Vec<Track>);

    fn apply_view_setting(&mut self, setting: &ViewSetting);

    /// Show a message to the user.
    fn report(&mut self, severity: Severity, message: &str);
}

/// Answer of a progress update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressResult {
    Continue,
    /// User stopped the import
    Cancel,
    /// Progress reporting failed; abort
    Fail,
}

pub trait Progress {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn update(&mut self, done: u64, total: u64) -> ProgressResult;
}

/// Progress sink that never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&mut self, _done: u64, _total: u64) -> ProgressResult {
        ProgressResult::Continue
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    /// Sample format of blocks seen before any `sequence` tag
    pub default_format: SampleFormat,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            default_format: SampleFormat::Float32,
        }
    }
}

/// Outcome of a finished or cancelled import.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub cancelled: bool,
    pub tracks: usize,
    pub blocks: usize,
    pub total_samples: u64,
    pub warnings: usize,
    pub first_warning: Option<String>,
}

impl ImportSummary {
    fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }
}

/// Handle on one `.aup` file.
pub struct AupImporter<D: DecodeService = FileDecoder> {
    path: PathBuf,
    data: Vec<u8>,
    decoder: D,
    options: ImportOptions,
}

impl AupImporter<FileDecoder> {
    /// Read a project file and check that it is one.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        Self::from_bytes(path, data)
    }

    /// Check an in-memory document. `path` locates the data directory.
    pub fn from_bytes(path: impl AsRef<Path>, data: Vec<u8>) -> Result<Self, ImportError> {
        match detect(&data) {
            DocumentKind::Project => {}
            DocumentKind::LegacyBinary => return Err(ImportError::UnsupportedOldProject),
            DocumentKind::Unknown => return Err(ImportError::NotAProject),
        }
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            data,
            decoder: FileDecoder,
            options: ImportOptions::default(),
        })
    }
}

impl<D: DecodeService> AupImporter<D> {
    pub fn with_decoder<E: DecodeService>(self, decoder: E) -> AupImporter<E> {
        AupImporter {
            path: self.path,
            data: self.data,
            decoder,
            options: self.options,
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_description(&self) -> &'static str {
        "AUP project files (*.aup)"
    }

    pub fn extension(&self) -> &'static str {
        "aup"
    }

    /// Legacy projects are not compressed.
    pub fn uncompressed_bytes(&self) -> u64 {
        0
    }

    pub fn stream_count(&self) -> usize {
        1
    }

    pub fn stream_info(&self) -> &[String] {
        &[]
    }

    pub fn set_stream_usage(&mut self, _stream: usize, _used: bool) {}

    /// Run the document through the dispatcher without touching any host.
    pub fn parse(&self, host_has_time_track: bool) -> Result<BuilderParts, ImportError> {
        let builder = EntityBuilder::new(&self.path, self.options.default_format, host_has_time_track);
        let mut dispatcher = TagDispatcher::new(builder);
        for event in Tokenizer::new(&self.data) {
            dispatcher.handle(&event?)?;
        }
        Ok(dispatcher.finish()?.into_parts())
    }

    /// Decode every queued block in order.
    pub fn resolve_queue(&self, queue: &DescriptorQueue, diagnostics: &mut Diagnostics) -> Vec<SampleRun> {
        let resolver = BlockResolver::new(&self.decoder);
        queue
            .iter()
            .map(|desc| resolver.resolve(desc, diagnostics))
            .collect()
    }

    /// Import into `host`, merging project metadata into `tags`.
    ///
    /// On failure or cancellation the host is left untouched.
    pub fn import(
        &self,
        host: &mut impl ProjectHost,
        progress: &mut impl Progress,
        tags: &mut Tags,
    ) -> Result<ImportSummary, ImportError> {
        let was_dirty = host.is_dirty();
        let parts = match self.parse(host.has_time_track()) {
            Ok(parts) => parts,
            Err(e) => {
                host.report(Severity::Error, &format!("Couldn't import the project:\n\n{e}"));
                return Err(e);
            }
        };
        let BuilderParts {
            mut graph,
            queue,
            attributes,
            tags: project_tags,
            mut diagnostics,
        } = parts;

        let total = queue.total_samples();
        let resolver = BlockResolver::new(&self.decoder);
        let mut done = 0;
        for desc in &queue {
            if progress.is_cancelled() {
                log::debug!("import of {} cancelled", self.path.display());
                return Ok(ImportSummary::cancelled());
            }
            match progress.update(done, total) {
                ProgressResult::Continue => {}
                ProgressResult::Cancel => {
                    log::debug!("import of {} cancelled", self.path.display());
                    return Ok(ImportSummary::cancelled());
                }
                ProgressResult::Fail => return Err(ImportError::Aborted),
            }

            let run = resolver.resolve(desc, &mut diagnostics);
            if !graph.append_run(desc.track, desc.clip, run, desc.format) {
                log::warn!("dropping block for track {} with no clip", desc.track.0);
            }
            done = done.saturating_add(desc.len);
        }

        let tracks = graph.into_tracks();
        let summary = ImportSummary {
            cancelled: false,
            tracks: tracks.len(),
            blocks: queue.len(),
            total_samples: total,
            warnings: diagnostics.warning_count(),
            first_warning: diagnostics.first_warning().map(str::to_string),
        };

        host.add_tracks(tracks);
        tags.merge(&project_tags);
        if !was_dirty {
            for setting in attributes.settings() {
                host.apply_view_setting(&setting);
            }
        }
        if let Some(warning) = &summary.first_warning {
            host.report(Severity::Warning, warning);
        }
        log::debug!(
            "imported {} tracks, {} blocks, {} samples from {}",
            summary.tracks,
            summary.blocks,
            summary.total_samples,
            self.path.display()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[derive(Default)]
    struct RecordingHost {
        dirty: bool,
        tracks: Vec<Track>,
        settings: Vec<ViewSetting>,
        reports: Vec<(Severity, String)>,
        commits: usize,
    }

    impl ProjectHost for RecordingHost {
        fn is_dirty(&self) -> bool {
            self.dirty
        }

        fn has_time_track(&self) -> bool {
            false
        }

        fn add_tracks(&mut self, tracks: Vec<Track>) {
            self.commits += 1;
            self.tracks.extend(tracks);
        }

        fn apply_view_setting(&mut self, setting: &ViewSetting) {
            self.settings.push(setting.clone());
        }

        fn report(&mut self, severity: Severity, message: &str) {
            self.reports.push((severity, message.to_string()));
        }
    }

    /// Answers each update from a script, then continues.
    struct Scripted(Vec<ProgressResult>);

    impl Progress for Scripted {
        fn update(&mut self, _done: u64, _total: u64) -> ProgressResult {
            if self.0.is_empty() {
                ProgressResult::Continue
            } else {
                self.0.remove(0)
            }
        }
    }

    const DOC: &str = r#"<?xml version="1.0"?>
<project projname="song_data" version="1.3.0" audacityversion="2.4.2" rate="48000" zoom="86.1" sel0="1.5">
  <tags><tag name="artist" value="Someone"/></tags>
  <wavetrack name="Audio">
    <waveclip offset="0">
      <sequence maxsamples="262144" sampleformat="262159" numsamples="300">
        <waveblock start="0"><silentblockfile len="100"/></waveblock>
        <waveblock start="100"><simpleblockfile filename="e0000001.au" len="200"/></waveblock>
      </sequence>
    </waveclip>
  </wavetrack>
</project>
"#;

    fn project(doc: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("song_data")).unwrap();
        let path = dir.path().join("song.aup");
        fs::write(&path, doc).unwrap();
        (dir, path)
    }

    #[test]
    fn from_bytes_rejects_other_files() {
        assert!(matches!(
            AupImporter::from_bytes("x.aup", b"AudacityProject\0\0".to_vec()),
            Err(ImportError::UnsupportedOldProject)
        ));
        assert!(matches!(
            AupImporter::from_bytes("x.aup", b"RIFF....WAVE".to_vec()),
            Err(ImportError::NotAProject)
        ));
    }

    #[test]
    fn fixed_stream_answers() {
        let (_dir, path) = project(DOC);
        let importer = AupImporter::open(&path).unwrap();
        assert_eq!(importer.file_description(), "AUP project files (*.aup)");
        assert_eq!(importer.extension(), "aup");
        assert_eq!(importer.uncompressed_bytes(), 0);
        assert_eq!(importer.stream_count(), 1);
        assert!(importer.stream_info().is_empty());
    }

    #[test]
    fn import_commits_tracks_tags_and_view() {
        let (_dir, path) = project(DOC);
        let importer = AupImporter::open(&path).unwrap();
        let mut host = RecordingHost::default();
        let mut tags = Tags::new();

        let summary = importer.import(&mut host, &mut NoProgress, &mut tags).unwrap();

        assert!(!summary.cancelled);
        assert_eq!(summary.tracks, 1);
        assert_eq!(summary.blocks, 2);
        assert_eq!(summary.total_samples, 300);
        assert_eq!(host.commits, 1);
        let wave = host.tracks[0].as_wave().unwrap();
        assert_eq!(wave.num_samples(), 300);
        assert_eq!(tags.get("artist"), Some("Someone"));
        assert_eq!(
            host.settings,
            vec![
                ViewSetting::Rate(48000.0),
                ViewSetting::Zoom(86.1),
                ViewSetting::SelectionStart(1.5),
            ]
        );
        // e0000001.au is not in the data directory
        assert_eq!(summary.warnings, 1);
        assert_eq!(host.reports.len(), 1);
        assert_eq!(host.reports[0].0, Severity::Warning);
        assert!(host.reports[0].1.starts_with("Missing project file e0000001.au"));
    }

    #[test]
    fn dirty_host_keeps_its_view() {
        let (_dir, path) = project(DOC);
        let importer = AupImporter::open(&path).unwrap();
        let mut host = RecordingHost {
            dirty: true,
            ..RecordingHost::default()
        };
        importer
            .import(&mut host, &mut NoProgress, &mut Tags::new())
            .unwrap();
        assert_eq!(host.tracks.len(), 1);
        assert!(host.settings.is_empty());
    }

    #[test]
    fn cancel_leaves_host_untouched() {
        let (_dir, path) = project(DOC);
        let importer = AupImporter::open(&path).unwrap();
        let mut host = RecordingHost::default();
        let mut tags = Tags::new();
        let mut progress = Scripted(vec![ProgressResult::Continue, ProgressResult::Cancel]);

        let summary = importer.import(&mut host, &mut progress, &mut tags).unwrap();

        assert!(summary.cancelled);
        assert_eq!(host.commits, 0);
        assert!(host.settings.is_empty());
        assert!(host.reports.is_empty());
        assert!(tags.is_empty());
    }

    #[test]
    fn progress_failure_aborts() {
        let (_dir, path) = project(DOC);
        let importer = AupImporter::open(&path).unwrap();
        let mut host = RecordingHost::default();
        let mut progress = Scripted(vec![ProgressResult::Fail]);
        assert!(matches!(
            importer.import(&mut host, &mut progress, &mut Tags::new()),
            Err(ImportError::Aborted)
        ));
        assert_eq!(host.commits, 0);
    }

    #[test]
    fn parse_failure_is_reported() {
        let doc = DOC.replace("<tags>", "<bogus/><tags>");
        let (_dir, path) = project(&doc);
        let importer = AupImporter::open(&path).unwrap();
        let mut host = RecordingHost::default();
        assert!(importer
            .import(&mut host, &mut NoProgress, &mut Tags::new())
            .is_err());
        assert_eq!(host.commits, 0);
        assert_eq!(host.reports.len(), 1);
        assert_eq!(host.reports[0].0, Severity::Error);
        assert!(host.reports[0].1.contains("unknown tag <bogus>"));
    }

    #[test]
    fn resolving_the_queue_twice_matches() {
        let (_dir, path) = project(DOC);
        let importer = AupImporter::open(&path).unwrap();
        let parts = importer.parse(false).unwrap();
        let mut diags = Diagnostics::new();
        let first = importer.resolve_queue(&parts.queue, &mut diags);
        let second = importer.resolve_queue(&parts.queue, &mut diags);
        assert_eq!(first, second);
        assert_eq!(first, vec![SampleRun::Silence(100), SampleRun::Silence(200)]);
    }
}
