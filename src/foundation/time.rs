use crate::foundation::error::{ComposeError, ComposeResult};

/// Half-open time interval `[start, end)` in seconds of timeline space.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Interval {
    /// Inclusive start, seconds.
    pub start: f64,
    /// Exclusive end, seconds.
    pub end: f64,
}

impl Interval {
    /// Create a validated interval with `0 <= start < end`, both finite.
    pub fn new(start: f64, end: f64) -> ComposeResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(ComposeError::validation(format!(
                "interval bounds must be finite, got ({start}, {end})"
            )));
        }
        if start < 0.0 {
            return Err(ComposeError::validation(format!(
                "interval start must be >= 0, got {start}"
            )));
        }
        if end <= start {
            return Err(ComposeError::validation(format!(
                "interval end must be > start, got ({start}, {end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Length in seconds.
    pub fn duration(self) -> f64 {
        self.end - self.start
    }

    /// Return `true` when `t` is inside `[start, end)`.
    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Return `true` when the two intervals share any time span.
    pub fn overlaps(self, other: Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_degenerate_bounds() {
        assert!(Interval::new(5.0, 5.0).is_err());
        assert!(Interval::new(8.0, 3.0).is_err());
        assert!(Interval::new(-1.0, 3.0).is_err());
        assert!(Interval::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn contains_is_half_open() {
        let iv = Interval::new(5.0, 12.0).unwrap();
        assert!(iv.contains(5.0));
        assert!(iv.contains(11.999));
        assert!(!iv.contains(12.0));
        assert!(!iv.contains(4.9));
    }

    #[test]
    fn overlaps_excludes_touching_intervals() {
        let a = Interval::new(0.0, 5.0).unwrap();
        let b = Interval::new(5.0, 9.0).unwrap();
        let c = Interval::new(4.0, 6.0).unwrap();
        assert!(!a.overlaps(b));
        assert!(a.overlaps(c));
        assert!(c.overlaps(b));
    }
}
