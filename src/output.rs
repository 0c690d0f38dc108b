//! Snapshot output formatters.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats. Colors
//! follow the same magnitude classes as the map markers.

use std::io::{self, Write};

use serde::Serialize;

use crate::models::EarthquakeEvent;
use crate::styling::{self, MagnitudeColor};

// ANSI codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Event as emitted in JSON/NDJSON output, with its marker styling.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEvent<'a> {
    pub id: &'a str,
    pub time: String,
    pub magnitude: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
    pub place: &'a str,
    pub url: Option<&'a str>,
    pub color: MagnitudeColor,
    pub marker_size: f64,
}

impl<'a> From<&'a EarthquakeEvent> for OutputEvent<'a> {
    fn from(e: &'a EarthquakeEvent) -> Self {
        Self {
            id: &e.id,
            time: e
                .time_utc()
                .map_or_else(|| "unknown".into(), |t| t.to_rfc3339()),
            magnitude: e.magnitude,
            latitude: e.latitude,
            longitude: e.longitude,
            place: &e.place,
            url: e.url.as_deref(),
            color: styling::color_for(e.magnitude),
            marker_size: styling::size_for(e.magnitude),
        }
    }
}

/// Write events in human-readable format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, events: &[EarthquakeEvent]) -> io::Result<()> {
    for event in events {
        let time = event
            .time_utc()
            .map_or_else(|| "unknown".into(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());

        let mag_str = event
            .magnitude
            .map_or_else(|| "?".into(), |m| format!("{m:.1}"));

        let color = styling::color_for(event.magnitude).ansi();

        writeln!(
            writer,
            "● {color}{BOLD}M{mag_str:<4}{RESET} │ \
             {DIM}{lat:>8.4}, {lng:>9.4}{RESET} │ \
             {time} UTC │ \
             {place}",
            lat = event.latitude,
            lng = event.longitude,
            place = event.place,
        )?;
    }
    Ok(())
}

/// Write events as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, events: &[EarthquakeEvent]) -> io::Result<()> {
    let output: Vec<OutputEvent<'_>> = events.iter().map(OutputEvent::from).collect();
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, events: &[EarthquakeEvent]) -> io::Result<()> {
    for event in events {
        let json = serde_json::to_string(&OutputEvent::from(event))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_events<W: Write>(
    writer: &mut W,
    events: &[EarthquakeEvent],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, events),
        Format::Json => write_json(writer, events),
        Format::Ndjson => write_ndjson(writer, events),
    }
}
