//! Web server for the quakeview map.
//!
//! Serves the earthquake map using:
//! - Axum for HTTP server
//! - HTMX for the dashboard fragment (refresh, banner, spinner)
//! - Leaflet for the map, drawn from the server-composed map model

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Local;
use serde::Serialize;

use crate::client::{Feed, FeedClient, USGS_BASE_URL};
use crate::fetcher::Fetcher;
use crate::picker::{LatLng, PageId, PageSessions, Recenter};
use crate::view::{self, MapView, SelectionMarker};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub feed: Feed,
    /// Feed host, overridable for testing against a local stub
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            feed: Feed::default(),
            base_url: USGS_BASE_URL.to_string(),
        }
    }
}

/// Header the page script sends to identify its own load of the shell.
const PAGE_ID_HEADER: &str = "x-page-id";

/// Placeholder in [`INDEX_HTML`] replaced with the page id.
const PAGE_ID_SLOT: &str = "__PAGE_ID__";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Event list and fetch status
    fetcher: Fetcher,
    /// Last manual map click, per page load
    pages: Arc<Mutex<PageSessions>>,
}

impl AppState {
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            pages: Arc::new(Mutex::new(PageSessions::new())),
        }
    }

    fn pages(&self) -> MutexGuard<'_, PageSessions> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Selection of the requesting page. Requests without a page id have none.
    fn selection(&self, headers: &HeaderMap) -> Option<LatLng> {
        page_id(headers).and_then(|page| self.pages().selected(page))
    }
}

fn page_id(headers: &HeaderMap) -> Option<PageId> {
    headers
        .get(PAGE_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/refresh", post(refresh_handler))
        .route("/map", get(map_handler))
        .route("/pick", post(pick_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the feed client cannot be built or the listener
/// cannot bind.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let client = FeedClient::with_base_url(&config.base_url, config.feed)?;
    tracing::debug!("feed url: {}", client.url());
    let fetcher = Fetcher::new(client);

    // First load happens once at startup; after that only on request
    fetcher.spawn_refresh();

    let app = create_router(AppState::new(fetcher));

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("🌍 quakeview starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the HTML shell for a new page load.
async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    let page = state.pages().open();
    tracing::debug!(page, "page opened");
    (
        // A reload must come back here for a fresh page id
        [(header::CACHE_CONTROL, "no-store")],
        Html(INDEX_HTML.replace(PAGE_ID_SLOT, &page.to_string())),
    )
}

/// Dashboard fragment for the current state.
async fn dashboard_handler(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let snapshot = state.fetcher.snapshot();
    Html(view::render_dashboard(
        &snapshot,
        state.selection(&headers),
        &Local,
    ))
}

/// Start a refresh and answer with the loading dashboard.
async fn refresh_handler(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    tracing::info!("refresh requested via UI");
    state.fetcher.spawn_refresh();
    dashboard_handler(State(state), headers).await
}

/// Map model as JSON.
async fn map_handler(State(state): State<AppState>, headers: HeaderMap) -> Json<MapView> {
    let snapshot = state.fetcher.snapshot();
    Json(MapView::compose(
        &snapshot.events,
        state.selection(&headers),
        &Local,
    ))
}

/// Reply to a map click.
#[derive(Debug, Serialize)]
struct PickResponse {
    marker: SelectionMarker,
    recenter: Recenter,
}

/// Map click handler: replace the page's selection and tell the map where
/// to fly.
async fn pick_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(at): Json<LatLng>,
) -> Response {
    if !at.is_finite() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "coordinates must be finite").into_response();
    }
    let Some(page) = page_id(&headers) else {
        return (StatusCode::BAD_REQUEST, "missing or invalid x-page-id header").into_response();
    };

    let recenter = state.pages().click(page, at);
    Json(PickResponse {
        marker: SelectionMarker::at(at),
        recenter,
    })
    .into_response()
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en" data-theme="dark">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>quakeview — Earthquake Visualizer</title>

    <link rel="preconnect" href="https://fonts.googleapis.com">
    <link rel="preconnect" href="https://fonts.gstatic.com" crossorigin>
    <link href="https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700&display=swap" rel="stylesheet">

    <!-- HTMX -->
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>

    <!-- Leaflet -->
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>

    <style>
        :root {
            --font: 'Inter', -apple-system, BlinkMacSystemFont, sans-serif;

            --bg-primary: #ffffff;
            --bg-tertiary: #f1f5f9;
            --text-primary: #0f172a;
            --text-secondary: #475569;
            --border: #e2e8f0;
            --accent: #319795;
            --accent-hover: #2c7a7b;
            --link: #3182CE;
            --danger: #E53E3E;
            --danger-soft: rgba(229, 62, 62, 0.12);

            --shadow-xl: 0 20px 25px -5px rgba(0,0,0,0.1), 0 10px 10px -5px rgba(0,0,0,0.04);
            --radius-md: 10px;
        }

        [data-theme="dark"] {
            --bg-primary: #09090b;
            --bg-tertiary: #18181b;
            --text-primary: #fafafa;
            --text-secondary: #a1a1aa;
            --border: #27272a;
            --link: #63b3ed;
            --shadow-xl: 0 20px 25px -5px rgba(0,0,0,0.5);
        }

        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: var(--font);
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
            min-height: 100vh;
            -webkit-font-smoothing: antialiased;
        }

        .main {
            max-width: 1400px;
            margin: 0 auto;
            padding: 1.5rem;
        }

        .section-title {
            font-size: 1.875rem;
            font-weight: 700;
            letter-spacing: -0.02em;
            margin-bottom: 1rem;
        }

        .section-subtitle {
            color: var(--text-secondary);
            margin-bottom: 1rem;
        }

        .section-subtitle a {
            color: var(--link);
            text-decoration: underline;
        }

        .btn {
            display: inline-flex;
            align-items: center;
            padding: 0.5rem 1rem;
            margin-bottom: 1rem;
            border-radius: var(--radius-md);
            font-size: 0.875rem;
            font-weight: 600;
            border: none;
            cursor: pointer;
            font-family: var(--font);
        }

        .btn-primary { background: var(--accent); color: white; }
        .btn-primary:hover { background: var(--accent-hover); }
        .btn[disabled] { opacity: 0.6; cursor: progress; }

        .alert {
            display: flex;
            align-items: center;
            gap: 0.5rem;
            padding: 0.75rem 1rem;
            margin-bottom: 1rem;
            border-radius: var(--radius-md);
        }

        .alert-error {
            background: var(--danger-soft);
            border: 1px solid var(--danger);
        }

        .alert-icon { color: var(--danger); font-weight: 700; }

        .spinner {
            width: 64px;
            height: 64px;
            border: 4px solid var(--border);
            border-top-color: var(--accent);
            border-radius: 50%;
            animation: spin 0.8s linear infinite;
        }

        @keyframes spin { to { transform: rotate(360deg); } }

        .map {
            width: 100%;
            height: 600px;
            border-radius: var(--radius-md);
            box-shadow: var(--shadow-xl);
        }

        .quake-popup h3 { font-size: 0.95rem; margin-bottom: 0.25rem; }
        .quake-popup .quake-time { font-size: 0.75rem; color: #718096; margin-top: 0.25rem; }
        .quake-popup a { color: #3182CE; text-decoration: underline; }

        @media (max-width: 768px) {
            .main { padding: 0.5rem; }
        }
    </style>
</head>
<body>
    <main class="main">
        <div id="dashboard" hx-get="/dashboard" hx-trigger="load" hx-swap="outerHTML">
            <div class="spinner" role="status" aria-label="Loading earthquakes"></div>
        </div>
    </main>

    <script>
        const savedTheme = localStorage.getItem('theme') || 'dark';
        document.documentElement.setAttribute('data-theme', savedTheme);

        // Selections belong to this load of the page
        const PAGE_ID = '__PAGE_ID__';
        document.body.addEventListener('htmx:configRequest', function(evt) {
            evt.detail.headers['X-Page-Id'] = PAGE_ID;
        });

        let map = null;
        let mapEl = null;
        let quakeLayer = null;
        let pickMarker = null;

        function showPick(marker) {
            if (pickMarker) {
                pickMarker.setLatLng([marker.lat, marker.lng]).setPopupContent(marker.popup);
            } else {
                pickMarker = L.marker([marker.lat, marker.lng]).bindPopup(marker.popup).addTo(map);
            }
        }

        function createMap(el, data) {
            map = L.map(el).setView(data.center, data.zoom);
            mapEl = el;
            L.tileLayer(data.tiles.url, { attribution: data.tiles.attribution }).addTo(map);
            quakeLayer = L.layerGroup().addTo(map);
            pickMarker = null;

            map.on('click', function(e) {
                fetch('/pick', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json', 'X-Page-Id': PAGE_ID },
                    body: JSON.stringify({ lat: e.latlng.lat, lng: e.latlng.lng })
                })
                    .then(r => r.ok ? r.json() : Promise.reject(r.status))
                    .then(reply => {
                        showPick(reply.marker);
                        const t = reply.recenter.target;
                        map.flyTo([t.lat, t.lng], map.getZoom());
                    })
                    .catch(err => console.error('pick failed:', err));
            });
        }

        function syncMap() {
            const el = document.getElementById('quake-map');
            const dataEl = document.getElementById('map-data');
            if (!el || !dataEl) return;
            const data = JSON.parse(dataEl.textContent);
            if (!data) return;

            if (map === null || mapEl !== el) {
                createMap(el, data);
            }

            quakeLayer.clearLayers();
            data.markers.forEach(m => {
                const icon = L.divIcon({
                    html: m.icon.html,
                    className: '',
                    iconSize: [m.icon.size, m.icon.size],
                    iconAnchor: m.icon.anchor
                });
                L.marker([m.lat, m.lng], { icon: icon }).bindPopup(m.popup).addTo(quakeLayer);
            });

            if (data.selection) showPick(data.selection);
        }

        document.body.addEventListener('htmx:afterSettle', syncMap);
    </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::errors::FETCH_FAILED_MESSAGE;

    /// Serve the router on an ephemeral port and return its base URL.
    async fn spawn_app(feed: &MockServer) -> (String, Fetcher) {
        let client = FeedClient::with_base_url(&feed.uri(), Feed::default()).expect("client");
        let fetcher = Fetcher::new(client);
        let app = create_router(AppState::new(fetcher.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        (format!("http://{addr}"), fetcher)
    }

    /// Load the page shell and return the page id it was given.
    async fn open_page(base: &str) -> String {
        let html = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();
        let start = html.find("const PAGE_ID = '").expect("page id") + "const PAGE_ID = '".len();
        let len = html[start..].find('\'').expect("page id end");
        html[start..start + len].to_string()
    }

    async fn map_for(http: &reqwest::Client, base: &str, page: Option<&str>) -> serde_json::Value {
        let mut request = http.get(format!("{base}/map"));
        if let Some(page) = page {
            request = request.header(PAGE_ID_HEADER, page);
        }
        request.send().await.unwrap().json().await.unwrap()
    }

    async fn mount_feed(server: &MockServer, status: u16) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_string(include_str!(
                "../tests/fixtures/sample_all_day.json"
            )))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_health_and_index() {
        let feed = MockServer::start().await;
        let (base, _) = spawn_app(&feed).await;

        let health = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(health.text().await.unwrap(), "OK");

        let index = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(
            index.headers().get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
        let index = index.text().await.unwrap();
        assert!(index.contains("leaflet.js"));
        assert!(index.contains("hx-get=\"/dashboard\""));
        assert!(!index.contains(PAGE_ID_SLOT));
    }

    #[tokio::test]
    async fn test_each_page_load_gets_its_own_id() {
        let feed = MockServer::start().await;
        let (base, _) = spawn_app(&feed).await;

        let first = open_page(&base).await;
        let second = open_page(&base).await;

        assert_ne!(first, second);
        assert!(first.parse::<PageId>().is_ok());
    }

    #[tokio::test]
    async fn test_dashboard_before_first_response_shows_spinner() {
        let feed = MockServer::start().await;
        let (base, fetcher) = spawn_app(&feed).await;
        fetcher.begin();

        let html = reqwest::get(format!("{base}/dashboard"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert!(html.contains("class=\"spinner\""));
        assert!(!html.contains("quake-map"));
    }

    #[tokio::test]
    async fn test_map_lists_one_marker_per_event() {
        let feed = MockServer::start().await;
        mount_feed(&feed, 200).await;
        let (base, fetcher) = spawn_app(&feed).await;
        fetcher.refresh().await;

        let map: serde_json::Value = reqwest::get(format!("{base}/map"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let markers = map["markers"].as_array().expect("markers");
        assert_eq!(markers.len(), 4);
        assert_eq!(markers[0]["id"], "ci40959272");
        assert_eq!(markers[2]["icon"]["color"], "red");
        assert!(map["selection"].is_null());
    }

    #[tokio::test]
    async fn test_refresh_failure_shows_banner() {
        let feed = MockServer::start().await;
        mount_feed(&feed, 502).await;
        let (base, _) = spawn_app(&feed).await;
        let http = reqwest::Client::new();

        let first = http
            .post(format!("{base}/refresh"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(first.contains("Refreshing..."));

        let mut html = String::new();
        for _ in 0..50 {
            html = reqwest::get(format!("{base}/dashboard"))
                .await
                .unwrap()
                .text()
                .await
                .unwrap();
            if !html.contains("Refreshing...") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(html.contains(FETCH_FAILED_MESSAGE));
        assert!(html.contains("Refresh Data"));
    }

    #[tokio::test]
    async fn test_pick_replaces_selection() {
        let feed = MockServer::start().await;
        let (base, _) = spawn_app(&feed).await;
        let http = reqwest::Client::new();
        let page = open_page(&base).await;

        http.post(format!("{base}/pick"))
            .header(PAGE_ID_HEADER, &page)
            .json(&serde_json::json!({ "lat": 1.0, "lng": 2.0 }))
            .send()
            .await
            .unwrap();
        let reply: serde_json::Value = http
            .post(format!("{base}/pick"))
            .header(PAGE_ID_HEADER, &page)
            .json(&serde_json::json!({ "lat": 12.3456, "lng": 77.6543 }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(reply["recenter"]["target"]["lat"], 12.3456);
        assert_eq!(reply["recenter"]["target"]["lng"], 77.6543);
        let popup = reply["marker"]["popup"].as_str().unwrap();
        assert!(popup.contains("Lat: 12.3456"));
        assert!(popup.contains("Lng: 77.6543"));

        let map = map_for(&http, &base, Some(&page)).await;
        assert_eq!(map["selection"]["lat"], 12.3456);
        assert_eq!(map["selection"]["lng"], 77.6543);
    }

    #[tokio::test]
    async fn test_selection_does_not_outlive_page_or_leak_across_tabs() {
        let feed = MockServer::start().await;
        mount_feed(&feed, 200).await;
        let (base, fetcher) = spawn_app(&feed).await;
        fetcher.refresh().await;
        let http = reqwest::Client::new();

        let tab = open_page(&base).await;
        let other_tab = open_page(&base).await;
        let status = http
            .post(format!("{base}/pick"))
            .header(PAGE_ID_HEADER, &tab)
            .json(&serde_json::json!({ "lat": -33.8688, "lng": 151.2093 }))
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(map_for(&http, &base, Some(&tab)).await["selection"]["lat"], -33.8688);

        // Another tab, a reload, and a request with no page all start empty
        assert!(map_for(&http, &base, Some(&other_tab)).await["selection"].is_null());
        let reloaded = open_page(&base).await;
        assert!(map_for(&http, &base, Some(&reloaded)).await["selection"].is_null());
        assert!(map_for(&http, &base, None).await["selection"].is_null());

        let dashboard = http
            .get(format!("{base}/dashboard"))
            .header(PAGE_ID_HEADER, &reloaded)
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(dashboard.contains("\"selection\":null"));
        assert!(!dashboard.contains("Custom Selected Location"));
    }

    #[tokio::test]
    async fn test_pick_without_page_id_is_rejected() {
        let feed = MockServer::start().await;
        let (base, _) = spawn_app(&feed).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/pick"))
            .json(&serde_json::json!({ "lat": 1.0, "lng": 2.0 }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pick_rejects_malformed_body() {
        let feed = MockServer::start().await;
        let (base, _) = spawn_app(&feed).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/pick"))
            .json(&serde_json::json!({ "lat": 1.0 }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
