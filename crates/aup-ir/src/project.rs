//! Project-level attributes and metadata tags.

use std::collections::BTreeMap;

/// View state carried by the root tag of a legacy project.
///
/// Every field is optional; absent fields leave the host's value alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectAttributes {
    pub vpos: Option<i32>,
    pub h: Option<f64>,
    pub zoom: Option<f64>,
    pub sel0: Option<f64>,
    pub sel1: Option<f64>,
    pub sel_low: Option<f64>,
    pub sel_high: Option<f64>,
    pub rate: Option<f64>,
    pub snap_to: Option<bool>,
    pub selection_format: Option<String>,
    pub audio_time_format: Option<String>,
    pub frequency_format: Option<String>,
    pub bandwidth_format: Option<String>,
}

/// A single view setting to apply to the host.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewSetting {
    Rate(f64),
    SnapTo(bool),
    SelectionFormat(String),
    AudioTimeFormat(String),
    FrequencyFormat(String),
    BandwidthFormat(String),
    VerticalScroll(i32),
    HorizontalScroll(f64),
    Zoom(f64),
    SelectionStart(f64),
    SelectionEnd(f64),
    SpectralLow(f64),
    SpectralHigh(f64),
}

impl ProjectAttributes {
    /// Present settings, in the order the host must apply them.
    pub fn settings(&self) -> Vec<ViewSetting> {
        let mut out = Vec::new();
        if let Some(rate) = self.rate {
            out.push(ViewSetting::Rate(rate));
        }
        if let Some(snap) = self.snap_to {
            out.push(ViewSetting::SnapTo(snap));
        }
        if let Some(f) = &self.selection_format {
            out.push(ViewSetting::SelectionFormat(f.clone()));
        }
        if let Some(f) = &self.audio_time_format {
            out.push(ViewSetting::AudioTimeFormat(f.clone()));
        }
        if let Some(f) = &self.frequency_format {
            out.push(ViewSetting::FrequencyFormat(f.clone()));
        }
        if let Some(f) = &self.bandwidth_format {
            out.push(ViewSetting::BandwidthFormat(f.clone()));
        }
        if let Some(v) = self.vpos {
            out.push(ViewSetting::VerticalScroll(v));
        }
        if let Some(h) = self.h {
            out.push(ViewSetting::HorizontalScroll(h));
        }
        if let Some(z) = self.zoom {
            out.push(ViewSetting::Zoom(z));
        }
        if let Some(s) = self.sel0 {
            out.push(ViewSetting::SelectionStart(s));
        }
        if let Some(s) = self.sel1 {
            out.push(ViewSetting::SelectionEnd(s));
        }
        if let Some(s) = self.sel_low {
            out.push(ViewSetting::SpectralLow(s));
        }
        if let Some(s) = self.sel_high {
            out.push(ViewSetting::SpectralHigh(s));
        }
        out
    }

    /// Returns true if no attribute was set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Metadata tags (artist, title, track number...).
///
/// Keys are stored upper-cased.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags {
    map: BTreeMap<String, String>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag. An empty value removes it; an empty name is ignored.
    pub fn set(&mut self, name: &str, value: &str) {
        if name.is_empty() {
            return;
        }
        let key = name.to_uppercase();
        if value.is_empty() {
            self.map.remove(&key);
        } else {
            self.map.insert(key, value.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_uppercase()).map(String::as_str)
    }

    /// Copy every tag of `other` into `self`, overwriting existing keys.
    pub fn merge(&mut self, other: &Tags) {
        for (k, v) in &other.map {
            self.map.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
