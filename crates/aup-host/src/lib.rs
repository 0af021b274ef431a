//! Headless host project for legacy `.aup` imports.
//!
//! Owns the committed tracks, metadata and view state that an import
//! writes into, so the CLI and tests can share one host.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use aup_formats::{AupImporter, Progress, ProgressResult, ProjectHost, Severity};
use aup_ir::{Tags, Track, TrackKind, ViewSetting};

// Re-export common types so callers don't need aup-formats/aup-ir directly.
pub use aup_formats::{ImportError, ImportSummary};
pub use aup_ir::{SampleRun, WaveTrack};

/// View state a host keeps per project.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub rate: f64,
    pub snap_to: bool,
    pub selection_format: String,
    pub audio_time_format: String,
    pub frequency_format: String,
    pub bandwidth_format: String,
    pub vpos: i32,
    pub h: f64,
    pub zoom: f64,
    pub sel0: f64,
    pub sel1: f64,
    pub sel_low: Option<f64>,
    pub sel_high: Option<f64>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            rate: 44100.0,
            snap_to: false,
            selection_format: String::from("hh:mm:ss + milliseconds"),
            audio_time_format: String::from("hh:mm:ss + milliseconds"),
            frequency_format: String::from("Hz"),
            bandwidth_format: String::from("octaves"),
            vpos: 0,
            h: 0.0,
            zoom: 86.132_812_5,
            sel0: 0.0,
            sel1: 0.0,
            sel_low: None,
            sel_high: None,
        }
    }
}

impl ViewState {
    fn apply(&mut self, setting: &ViewSetting) {
        match setting {
            ViewSetting::Rate(v) => self.rate = *v,
            ViewSetting::SnapTo(v) => self.snap_to = *v,
            ViewSetting::SelectionFormat(v) => self.selection_format = v.clone(),
            ViewSetting::AudioTimeFormat(v) => self.audio_time_format = v.clone(),
            ViewSetting::FrequencyFormat(v) => self.frequency_format = v.clone(),
            ViewSetting::BandwidthFormat(v) => self.bandwidth_format = v.clone(),
            ViewSetting::VerticalScroll(v) => self.vpos = *v,
            ViewSetting::HorizontalScroll(v) => self.h = *v,
            ViewSetting::Zoom(v) => self.zoom = *v,
            ViewSetting::SelectionStart(v) => self.sel0 = *v,
            ViewSetting::SelectionEnd(v) => self.sel1 = *v,
            ViewSetting::SpectralLow(v) => self.sel_low = Some(*v),
            ViewSetting::SpectralHigh(v) => self.sel_high = Some(*v),
        }
    }
}

/// Headless project: tracks, tags, view state and the messages shown to
/// the user.
#[derive(Debug, Default)]
pub struct HostProject {
    tracks: Vec<Track>,
    tags: Tags,
    view: ViewState,
    applied: Vec<ViewSetting>,
    reports: Vec<(Severity, String)>,
    dirty: bool,
}

impl HostProject {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Project state ---

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Settings applied by imports, in application order.
    pub fn applied_settings(&self) -> &[ViewSetting] {
        &self.applied
    }

    pub fn reports(&self) -> &[(Severity, String)] {
        &self.reports
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn track_count(&self, kind: TrackKind) -> usize {
        self.tracks.iter().filter(|t| t.kind() == kind).count()
    }

    // --- Import ---

    pub fn import_file(&mut self, path: &Path) -> Result<ImportSummary, ImportError> {
        self.import_file_with(path, &mut ImportProgress::new())
    }

    /// Import with a caller-supplied progress handle.
    ///
    /// The project is marked dirty when tracks were committed.
    pub fn import_file_with(
        &mut self,
        path: &Path,
        progress: &mut ImportProgress,
    ) -> Result<ImportSummary, ImportError> {
        let importer = AupImporter::open(path)?;
        let mut tags = std::mem::take(&mut self.tags);
        let result = importer.import(self, progress, &mut tags);
        self.tags = tags;
        let summary = result?;
        if !summary.cancelled {
            self.dirty = true;
        }
        Ok(summary)
    }
}

impl ProjectHost for HostProject {
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn has_time_track(&self) -> bool {
        self.track_count(TrackKind::Time) > 0
    }

    fn add_tracks(&mut self, tracks: Vec<Track>) {
        log::debug!("committing {} tracks", tracks.len());
        self.tracks.extend(tracks);
    }

    fn apply_view_setting(&mut self, setting: &ViewSetting) {
        self.view.apply(setting);
        self.applied.push(setting.clone());
    }

    fn report(&mut self, severity: Severity, message: &str) {
        self.reports.push((severity, message.to_string()));
    }
}

/// Progress handle whose cancel flag can be set from another thread.
#[derive(Debug, Default)]
pub struct ImportProgress {
    cancel: Arc<AtomicBool>,
    done: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
}

impl ImportProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared flag; storing `true` cancels the import at the next block.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Last reported `(done, total)` sample counts.
    pub fn position(&self) -> (u64, u64) {
        (
            self.done.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }
}

impl Progress for ImportProgress {
    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn update(&mut self, done: u64, total: u64) -> ProgressResult {
        self.done.store(done, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
        if self.is_cancelled() {
            ProgressResult::Cancel
        } else {
            ProgressResult::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    const DOC: &str = r#"<?xml version="1.0"?>
<project projname="song_data" version="1.3.0" audacityversion="2.4.2" rate="22050" snapto="on" selectionformat="seconds" sel0="0.5" sel1="1.5">
  <tags><tag name="album" value="Demos"/></tags>
  <timetrack name="Speed"><envelope numpoints="0"/></timetrack>
  <wavetrack name="Voice">
    <waveclip offset="0">
      <sequence maxsamples="262144" sampleformat="131073" numsamples="64">
        <waveblock start="0"><silentblockfile len="64"/></waveblock>
      </sequence>
    </waveclip>
  </wavetrack>
</project>
"#;

    fn write_project(dir: &Path) -> PathBuf {
        fs::create_dir(dir.join("song_data")).unwrap();
        let path = dir.join("song.aup");
        fs::write(&path, DOC).unwrap();
        path
    }

    #[test]
    fn import_fills_clean_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(dir.path());
        let mut host = HostProject::new();

        let summary = host.import_file(&path).unwrap();

        assert_eq!(summary.tracks, 2);
        assert_eq!(host.track_count(TrackKind::Wave), 1);
        assert_eq!(host.track_count(TrackKind::Time), 1);
        assert_eq!(host.tags().get("ALBUM"), Some("Demos"));
        assert_eq!(host.view().rate, 22050.0);
        assert!(host.view().snap_to);
        assert_eq!(host.view().selection_format, "seconds");
        assert_eq!((host.view().sel0, host.view().sel1), (0.5, 1.5));
        assert_eq!(
            host.applied_settings(),
            &[
                ViewSetting::Rate(22050.0),
                ViewSetting::SnapTo(true),
                ViewSetting::SelectionFormat("seconds".into()),
                ViewSetting::SelectionStart(0.5),
                ViewSetting::SelectionEnd(1.5),
            ]
        );
        assert!(host.reports().is_empty());
        assert!(host.is_dirty());
    }

    #[test]
    fn second_import_keeps_view_and_bypasses_time_track() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(dir.path());
        let mut host = HostProject::new();
        host.import_file(&path).unwrap();
        let applied = host.applied_settings().len();

        host.import_file(&path).unwrap();

        assert_eq!(host.applied_settings().len(), applied);
        assert_eq!(host.track_count(TrackKind::Wave), 2);
        assert_eq!(host.track_count(TrackKind::Time), 1);
        assert_eq!(host.reports().len(), 1);
        assert_eq!(host.reports()[0].0, Severity::Warning);
    }

    #[test]
    fn cancelled_import_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(dir.path());
        let mut host = HostProject::new();
        let mut progress = ImportProgress::new();
        progress.cancel_flag().store(true, Ordering::Relaxed);

        let summary = host.import_file_with(&path, &mut progress).unwrap();

        assert!(summary.cancelled);
        assert!(host.tracks().is_empty());
        assert!(host.tags().is_empty());
        assert!(host.applied_settings().is_empty());
        assert_eq!(host.view(), &ViewState::default());
        assert!(!host.is_dirty());
    }

    #[test]
    fn failed_import_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.aup");
        fs::write(&path, DOC).unwrap();
        let mut host = HostProject::new();

        assert!(matches!(
            host.import_file(&path),
            Err(ImportError::DataDirNotFound(_))
        ));
        assert!(host.tracks().is_empty());
        assert_eq!(host.reports().len(), 1);
        assert_eq!(host.reports()[0].0, Severity::Error);
    }

    #[test]
    fn progress_tracks_position() {
        let mut progress = ImportProgress::new();
        assert_eq!(progress.update(10, 64), ProgressResult::Continue);
        assert_eq!(progress.position(), (10, 64));
        progress.cancel();
        assert_eq!(progress.update(20, 64), ProgressResult::Cancel);
    }
}
