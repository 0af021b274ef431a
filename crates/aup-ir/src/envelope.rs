//! Gain and speed envelopes.

/// A piecewise-linear envelope over time in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Control points in document order
    pub points: Vec<ControlPoint>,
    /// Value before the first and after the last point when there are none
    pub default_value: f64,
    /// Time offset of the envelope's owner, in seconds
    pub offset: f64,
    /// Point count announced by the document, if any
    pub declared_points: Option<u64>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Envelope {
    /// Create an empty envelope.
    pub fn new(default_value: f64) -> Self {
        Self {
            points: Vec::new(),
            default_value,
            offset: 0.0,
            declared_points: None,
        }
    }

    /// Drop all points.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Add a point to the envelope.
    pub fn add_point(&mut self, t: f64, value: f64) {
        self.points.push(ControlPoint { t, value });
    }

    /// Get the interpolated value at time `t` (relative to the owner).
    pub fn value_at(&self, t: f64) -> f64 {
        let Some(first) = self.points.first() else {
            return self.default_value;
        };
        if t <= first.t {
            return first.value;
        }

        let mut prev = first;
        for point in &self.points[1..] {
            if point.t > t {
                let span = point.t - prev.t;
                if span <= 0.0 {
                    return point.value;
                }
                return prev.value + (point.value - prev.value) * (t - prev.t) / span;
            }
            prev = point;
        }

        prev.value
    }
}

/// A point in an envelope.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlPoint {
    /// Time in seconds
    pub t: f64,
    /// Value at `t`
    pub value: f64,
}
