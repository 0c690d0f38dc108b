//! Data models for the USGS GeoJSON feed.
//!
//! The wire structures are deliberately lenient: every field the view does
//! not need is ignored and every field it does need may be missing.
//! [`parse_events`] is the validation boundary that turns wire features into
//! [`EarthquakeEvent`] records.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::QuakeviewError;
use crate::picker::LatLng;

/// Top-level GeoJSON response.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    /// "FeatureCollection" when present
    #[serde(rename = "type", default)]
    pub type_: Option<String>,

    /// Raw features, decoded one by one in [`parse_events`] so a single
    /// malformed entry cannot sink its siblings. Absent or null means none.
    #[serde(default)]
    pub features: Option<Vec<serde_json::Value>>,
}

impl FeatureCollection {
    /// Validate the response structure.
    ///
    /// # Errors
    ///
    /// Returns an error if the document declares a type other than
    /// `FeatureCollection`.
    pub fn validate(&self) -> Result<(), QuakeviewError> {
        match self.type_.as_deref() {
            None | Some("FeatureCollection") => Ok(()),
            Some(other) => Err(QuakeviewError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{other}'"
            ))),
        }
    }
}

/// A single wire feature.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub geometry: Option<Geometry>,

    #[serde(default)]
    pub properties: Properties,
}

/// Feature geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// Coordinates: [longitude, latitude, depth_km]
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

/// The subset of event properties the map uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Properties {
    pub mag: Option<f64>,
    pub place: Option<String>,
    /// Event time (ms since epoch)
    pub time: Option<i64>,
    /// Event page URL
    pub url: Option<String>,
}

/// One validated earthquake occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthquakeEvent {
    pub id: String,
    pub longitude: f64,
    pub latitude: f64,
    pub magnitude: Option<f64>,
    pub place: String,
    /// Epoch milliseconds, when the feed supplied one
    pub time: Option<i64>,
    pub url: Option<String>,
}

impl EarthquakeEvent {
    /// Map position of the epicenter.
    #[must_use]
    pub const fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Event time as UTC.
    #[must_use]
    pub fn time_utc(&self) -> Option<DateTime<Utc>> {
        self.time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

impl TryFrom<Feature> for EarthquakeEvent {
    type Error = String;

    fn try_from(feature: Feature) -> Result<Self, Self::Error> {
        let id = feature
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "empty event ID".to_string())?;

        let coords = feature
            .geometry
            .map(|g| g.coordinates)
            .unwrap_or_default();
        let (longitude, latitude) = match coords.as_slice() {
            [lng, lat, ..] if lng.is_finite() && lat.is_finite() => (*lng, *lat),
            [_, _, ..] => return Err(format!("{id}: non-finite coordinates")),
            _ => {
                return Err(format!(
                    "{id}: expected at least 2 coordinates, got {}",
                    coords.len()
                ));
            }
        };

        let props = feature.properties;
        Ok(Self {
            id,
            longitude,
            latitude,
            magnitude: props.mag,
            place: props
                .place
                .unwrap_or_else(|| "Unknown location".to_string()),
            time: props.time,
            url: props.url,
        })
    }
}

/// Parse a feed body into event records.
///
/// Malformed features and repeated IDs are dropped with a warning rather
/// than failing the whole fetch.
///
/// # Errors
///
/// Returns an error if the body is not JSON of the expected shape.
pub fn parse_events(body: &str) -> Result<Vec<EarthquakeEvent>, QuakeviewError> {
    let feed: FeatureCollection = serde_json::from_str(body)?;
    feed.validate()?;

    let features = feed.features.unwrap_or_default();
    let mut seen = HashSet::new();
    let mut events = Vec::with_capacity(features.len());

    for raw in features {
        let feature = match Feature::deserialize(raw) {
            Ok(feature) => feature,
            Err(e) => {
                warn!("dropping undecodable feature: {e}");
                continue;
            }
        };
        match EarthquakeEvent::try_from(feature) {
            Ok(event) => {
                if seen.insert(event.id.clone()) {
                    events.push(event);
                } else {
                    warn!(id = %event.id, "dropping duplicate event");
                }
            }
            Err(reason) => warn!("dropping malformed feature: {reason}"),
        }
    }

    Ok(events)
}
