//! Magnitude styling.
//!
//! Maps a magnitude to the marker color class and the marker pixel size.

use serde::Serialize;

/// Below this magnitude a marker is green.
const GREEN_BELOW: f64 = 3.0;

/// Below this magnitude (and at or above [`GREEN_BELOW`]) a marker is orange.
const ORANGE_BELOW: f64 = 5.0;

/// Pixels of marker diameter per unit of magnitude.
const PX_PER_MAGNITUDE: f64 = 5.0;

/// Smallest marker diameter in pixels.
pub const MIN_MARKER_PX: f64 = 8.0;

/// Display color for a magnitude class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MagnitudeColor {
    Green,
    Orange,
    Red,
}

impl MagnitudeColor {
    /// CSS hex value for this color.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Green => "#48BB78",
            Self::Orange => "#ED8936",
            Self::Red => "#E53E3E",
        }
    }

    /// ANSI escape for terminal output.
    #[must_use]
    pub const fn ansi(self) -> &'static str {
        match self {
            Self::Green => "\x1b[92m",
            Self::Orange => "\x1b[38;5;208m",
            Self::Red => "\x1b[91m",
        }
    }
}

/// Color for a magnitude.
///
/// NaN compares false against both thresholds and lands on red.
/// A missing magnitude is styled as magnitude zero.
#[must_use]
pub fn color_for(magnitude: Option<f64>) -> MagnitudeColor {
    let m = magnitude.unwrap_or(0.0);
    if m < GREEN_BELOW {
        MagnitudeColor::Green
    } else if m < ORANGE_BELOW {
        MagnitudeColor::Orange
    } else {
        MagnitudeColor::Red
    }
}

/// Marker diameter in pixels: `max(m * 5, 8)`.
///
/// `f64::max` ignores NaN, so the floor also holds for NaN input.
#[must_use]
pub fn size_for(magnitude: Option<f64>) -> f64 {
    (magnitude.unwrap_or(0.0) * PX_PER_MAGNITUDE).max(MIN_MARKER_PX)
}
