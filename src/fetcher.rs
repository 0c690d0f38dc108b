//! Earthquake data fetcher.
//!
//! Owns the current event list and a single tagged fetch status. The list is
//! only ever replaced wholesale by a successful fetch; a failed fetch leaves
//! it as it was and records the banner message instead.
//!
//! Overlapping refreshes are not guarded: each one writes its own result when
//! it completes, so the last response to arrive wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::client::FeedClient;
use crate::errors::QuakeviewError;
use crate::models::EarthquakeEvent;

/// Where the fetch routine currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    /// Not fetching; the event list is whatever the last success delivered
    #[default]
    Idle,
    /// A request is in flight
    Loading,
    /// The last request failed with this user-facing message
    Failed(String),
}

impl FetchStatus {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Banner message, if the last fetch failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// A consistent copy of the fetcher state for rendering.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub events: Arc<[EarthquakeEvent]>,
    pub status: FetchStatus,
}

impl FeedSnapshot {
    /// Show the spinner instead of the map: loading with nothing to draw.
    /// An earlier success that returned no events counts as nothing.
    #[must_use]
    pub fn shows_spinner(&self) -> bool {
        self.status.is_loading() && self.events.is_empty()
    }
}

/// Shared handle to the fetch state machine.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: FeedClient,
    state: Arc<Mutex<FeedSnapshot>>,
}

impl Fetcher {
    #[must_use]
    pub fn new(client: FeedClient) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(FeedSnapshot::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedSnapshot> {
        // State is plain data, a panic mid-write cannot leave it half-updated
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.lock().clone()
    }

    /// Enter the loading state, clearing any previous error.
    pub fn begin(&self) {
        self.lock().status = FetchStatus::Loading;
    }

    /// Record the outcome of one request.
    pub fn complete(&self, result: Result<Vec<EarthquakeEvent>, QuakeviewError>) {
        let mut state = self.lock();
        match result {
            Ok(events) => {
                info!("loaded {} earthquakes", events.len());
                state.events = events.into();
                state.status = FetchStatus::Idle;
            }
            Err(e) => {
                warn!("error fetching earthquake data: {e}");
                state.status = FetchStatus::Failed(e.user_message().to_string());
            }
        }
    }

    /// Issue the request for a refresh already marked with [`Fetcher::begin`].
    pub async fn fetch_and_complete(&self) {
        let result = self.client.fetch_events().await;
        self.complete(result);
    }

    /// Full refresh: loading, one GET, then data or error.
    pub async fn refresh(&self) {
        self.begin();
        self.fetch_and_complete().await;
    }

    /// Start a refresh on the runtime and return once the state is loading.
    pub fn spawn_refresh(&self) {
        self.begin();
        let fetcher = self.clone();
        tokio::spawn(async move {
            fetcher.fetch_and_complete().await;
        });
    }
}
