//! View composition.
//!
//! Turns fetcher and picker state into what the browser draws: the dashboard
//! HTML fragment swapped in by HTMX, and the [`MapView`] model the page
//! script hands to Leaflet. Nothing here touches the network or the clock.

use std::fmt::{Display, Write};

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::fetcher::FeedSnapshot;
use crate::marker::MarkerIcon;
use crate::models::EarthquakeEvent;
use crate::picker::{self, LatLng};

/// Initial map center (India), as `[lat, lng]`.
pub const DEFAULT_CENTER: [f64; 2] = [20.5937, 78.9629];

/// Initial zoom level.
pub const DEFAULT_ZOOM: u8 = 3;

/// OpenStreetMap raster tiles.
pub const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Attribution required by the tile provider.
pub const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

const USGS_HOME: &str = "https://earthquake.usgs.gov";
const OSM_COPYRIGHT: &str = "https://www.openstreetmap.org/copyright";

/// Escape text for HTML element content and quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format epoch milliseconds like a browser's `toLocaleString()` in en-US.
/// A missing or out-of-range time renders as `Invalid Date`.
#[must_use]
pub fn format_timestamp<Tz>(millis: Option<i64>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    millis
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map_or_else(
            || "Invalid Date".to_string(),
            |t| {
                t.with_timezone(tz)
                    .format("%-m/%-d/%Y, %-I:%M:%S %p")
                    .to_string()
            },
        )
}

/// Base tile layer.
#[derive(Debug, Clone, Serialize)]
pub struct TileLayer {
    pub url: &'static str,
    pub attribution: &'static str,
}

/// One event circle on the map.
#[derive(Debug, Clone, Serialize)]
pub struct EventMarker {
    /// Event identifier, the marker key
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub icon: MarkerIcon,
    /// Popup body HTML
    pub popup: String,
}

/// The pin dropped by the location picker.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionMarker {
    pub lat: f64,
    pub lng: f64,
    pub popup: String,
}

impl SelectionMarker {
    #[must_use]
    pub fn at(point: LatLng) -> Self {
        let [title, lat, lng] = picker::popup_lines(point);
        Self {
            lat: point.lat,
            lng: point.lng,
            popup: format!("<div><p><strong>{title}</strong></p><p>{lat}</p><p>{lng}</p></div>"),
        }
    }
}

/// Everything Leaflet needs to draw the map.
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: TileLayer,
    pub markers: Vec<EventMarker>,
    pub selection: Option<SelectionMarker>,
}

impl MapView {
    /// Compose the map from the current events and picker selection.
    #[must_use]
    pub fn compose<Tz>(events: &[EarthquakeEvent], selection: Option<LatLng>, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            tiles: TileLayer {
                url: TILE_URL,
                attribution: TILE_ATTRIBUTION,
            },
            markers: events.iter().map(|e| event_marker(e, tz)).collect(),
            selection: selection.map(SelectionMarker::at),
        }
    }

    /// JSON safe to embed inside a `<script>` element.
    #[must_use]
    pub fn to_embedded_json(&self) -> String {
        match serde_json::to_string(self) {
            // `<` only occurs inside JSON strings, where the escape is equivalent
            Ok(json) => json.replace('<', "\\u003c"),
            Err(e) => {
                tracing::error!("failed to serialize map view: {e}");
                "null".to_string()
            }
        }
    }
}

fn event_marker<Tz>(event: &EarthquakeEvent, tz: &Tz) -> EventMarker
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let at = event.position();
    EventMarker {
        id: event.id.clone(),
        lat: at.lat,
        lng: at.lng,
        icon: MarkerIcon::for_magnitude(event.magnitude),
        popup: event_popup(event, tz),
    }
}

/// Popup body for an event: magnitude, place, local time, detail link.
#[must_use]
pub fn event_popup<Tz>(event: &EarthquakeEvent, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mag = event
        .magnitude
        .map_or_else(|| "?".to_string(), |m| m.to_string());

    let mut html = format!(
        "<div class=\"quake-popup\"><h3>M {mag} Earthquake</h3><p>{place}</p>\
         <p class=\"quake-time\">{time}</p>",
        place = escape_html(&event.place),
        time = format_timestamp(event.time, tz),
    );
    if let Some(url) = &event.url {
        let _ = write!(
            html,
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">More Info on USGS</a>",
            escape_html(url)
        );
    }
    html.push_str("</div>");
    html
}

/// Render the dashboard fragment: heading, description, refresh control,
/// error banner, and either the spinner or the map.
#[must_use]
pub fn render_dashboard<Tz>(snapshot: &FeedSnapshot, selection: Option<LatLng>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let loading = snapshot.status.is_loading();
    let mut html = String::new();

    // While a fetch is in flight the fragment polls itself until it settles
    if loading {
        html.push_str(
            r#"<div id="dashboard" class="dashboard" hx-get="/dashboard" hx-trigger="load delay:500ms" hx-swap="outerHTML">"#,
        );
    } else {
        html.push_str(r#"<div id="dashboard" class="dashboard">"#);
    }

    let _ = write!(
        html,
        r#"
  <h1 class="section-title">🌍 Earthquake Visualizer</h1>
  <p class="section-subtitle">Live earthquake data from the <a href="{USGS_HOME}" target="_blank" rel="noopener noreferrer">USGS</a>, mapped on <a href="{OSM_COPYRIGHT}" target="_blank" rel="noopener noreferrer">OpenStreetMap</a>. Click on a circle for details or anywhere on the map to get coordinates.</p>
"#
    );

    if loading {
        html.push_str(
            r#"  <button class="btn btn-primary" disabled aria-busy="true">Refreshing...</button>
"#,
        );
    } else {
        html.push_str(
            r##"  <button class="btn btn-primary" hx-post="/refresh" hx-target="#dashboard" hx-swap="outerHTML">Refresh Data</button>
"##,
        );
    }

    if let Some(message) = snapshot.status.error() {
        let _ = writeln!(
            html,
            r#"  <div class="alert alert-error" role="alert"><span class="alert-icon">⚠</span> {}</div>"#,
            escape_html(message)
        );
    }

    if snapshot.shows_spinner() {
        html.push_str(
            r#"  <div class="spinner" role="status" aria-label="Loading earthquakes"></div>
"#,
        );
    } else {
        let map = MapView::compose(&snapshot.events, selection, tz);
        let _ = write!(
            html,
            r#"  <div id="quake-map" class="map" hx-preserve="true"></div>
  <script type="application/json" id="map-data">{}</script>
"#,
            map.to_embedded_json()
        );
    }

    html.push_str("</div>\n");
    html
}
