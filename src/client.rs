//! USGS earthquake feed client.
//!
//! One async GET per call; no retries, no caching.
//! Uses reqwest with rustls for TLS.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::errors::QuakeviewError;
use crate::models::{self, EarthquakeEvent};

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakeview/", env!("CARGO_PKG_VERSION"));

/// USGS base URL for earthquake feeds.
pub const USGS_BASE_URL: &str = "https://earthquake.usgs.gov";

/// Minimum magnitude bucket of a summary feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMagnitude {
    All,
    Mag1,
    Mag25,
    Mag45,
    Significant,
}

impl FeedMagnitude {
    const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Mag1 => "1.0",
            Self::Mag25 => "2.5",
            Self::Mag45 => "4.5",
            Self::Significant => "significant",
        }
    }
}

/// Time window of a summary feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPeriod {
    Hour,
    Day,
    Week,
    Month,
}

impl FeedPeriod {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// A USGS summary feed, e.g. `all_day` or `2.5_week`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feed {
    pub magnitude: FeedMagnitude,
    pub period: FeedPeriod,
}

impl Default for Feed {
    fn default() -> Self {
        Self {
            magnitude: FeedMagnitude::All,
            period: FeedPeriod::Day,
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.magnitude.as_str(), self.period.as_str())
    }
}

impl std::str::FromStr for Feed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let (mag, period) = lower
            .rsplit_once('_')
            .ok_or_else(|| format!("unknown feed: {s} (expected e.g. all_day, 2.5_week)"))?;

        let magnitude = match mag {
            "all" => FeedMagnitude::All,
            "1.0" => FeedMagnitude::Mag1,
            "2.5" => FeedMagnitude::Mag25,
            "4.5" => FeedMagnitude::Mag45,
            "significant" => FeedMagnitude::Significant,
            _ => return Err(format!("unknown feed magnitude: {mag}")),
        };
        let period = match period {
            "hour" => FeedPeriod::Hour,
            "day" => FeedPeriod::Day,
            "week" => FeedPeriod::Week,
            "month" => FeedPeriod::Month,
            _ => return Err(format!("unknown feed period: {period}")),
        };

        Ok(Self { magnitude, period })
    }
}

/// Client for one USGS summary feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    url: String,
}

impl FeedClient {
    /// Create a client for `feed` on the public USGS host.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(feed: Feed) -> Result<Self, QuakeviewError> {
        Self::with_base_url(USGS_BASE_URL, feed)
    }

    /// Create a client for `feed` on another host.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_base_url(base_url: &str, feed: Feed) -> Result<Self, QuakeviewError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{}/earthquakes/feed/v1.0/summary/{feed}.geojson",
                base_url.trim_end_matches('/')
            ),
        })
    }

    /// The feed URL this client requests.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and parse the feed.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// body that is not a feature collection.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_events(&self) -> Result<Vec<EarthquakeEvent>, QuakeviewError> {
        debug!("fetching feed");

        let response = self.client.get(&self.url).send().await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            return Err(QuakeviewError::Api {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let events = models::parse_events(&body)?;

        debug!("fetched {} events", events.len());
        Ok(events)
    }
}
