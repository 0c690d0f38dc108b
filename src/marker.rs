//! Marker icon factory.
//!
//! Derives the circular marker drawn for an event from its magnitude.
//! The descriptor is serialized into the map model and handed to Leaflet's
//! `divIcon` by the page script.

use serde::Serialize;

use crate::styling::{self, MagnitudeColor};

/// Marker fill opacity, so overlapping circles stay readable.
pub const MARKER_OPACITY: f64 = 0.8;

/// Border drawn around every circle.
const MARKER_BORDER: &str = "1px solid white";

/// A renderable circular marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerIcon {
    /// Diameter in pixels
    pub size: f64,
    /// Magnitude class
    pub color: MagnitudeColor,
    /// Fill opacity
    pub opacity: f64,
    /// Pixel offset of the geographic point inside the icon: its center
    pub anchor: [f64; 2],
    /// Inline HTML for the icon body
    pub html: String,
}

impl MarkerIcon {
    /// Build the marker for a magnitude.
    #[must_use]
    pub fn for_magnitude(magnitude: Option<f64>) -> Self {
        let size = styling::size_for(magnitude);
        let color = styling::color_for(magnitude);
        let html = format!(
            "<div style=\"background-color: {hex}; width: {size}px; height: {size}px; \
             border-radius: 50%; border: {MARKER_BORDER}; opacity: {MARKER_OPACITY};\"></div>",
            hex = color.hex(),
        );

        Self {
            size,
            color,
            opacity: MARKER_OPACITY,
            anchor: [size / 2.0, size / 2.0],
            html,
        }
    }
}
