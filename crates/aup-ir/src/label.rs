//! Labels of a label track.

/// A label spanning `start..end` seconds (a point label has `start == end`).
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub start: f64,
    pub end: f64,
    pub title: String,
}

impl Label {
    pub fn new(start: f64, end: f64, title: &str) -> Self {
        Self {
            start,
            end,
            title: title.to_string(),
        }
    }

    /// Returns true if the label marks a single point in time.
    pub fn is_point(&self) -> bool {
        self.start == self.end
    }
}
