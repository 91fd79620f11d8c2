//! Video trim windows.
//!
//! Negative offsets count back from the end of the source, so `end = -2`
//! on a ten second clip means "stop at 8s".

use mc_core::{Error, Result};

/// Absolute, non-negative trim window in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the window spans the whole source.
    pub fn is_full(&self, source_duration: f64) -> bool {
        self.start <= 0.0 && self.end >= source_duration
    }
}

fn absolute(offset: f64, duration: f64) -> f64 {
    let t = if offset < 0.0 { duration + offset } else { offset };
    t.clamp(0.0, duration)
}

/// Resolve optional relative offsets against `duration`.
pub fn normalize_trim(start: Option<f64>, end: Option<f64>, duration: f64) -> Result<TrimWindow> {
    let duration = duration.max(0.0);
    let window = TrimWindow {
        start: start.map_or(0.0, |s| absolute(s, duration)),
        end: end.map_or(duration, |e| absolute(e, duration)),
    };
    if window.end <= window.start {
        return Err(Error::Validation(format!(
            "trim window {:.3}s..{:.3}s is empty for a {duration:.3}s source",
            window.start, window.end
        )));
    }
    Ok(window)
}
