#![allow(dead_code)]

use chrono::Utc;
use discover_core::storage::{KEY_ACCESS_TOKEN, KEY_EXPIRATION_TIME};
use discover_core::{ApiClient, AuthConfig, MemoryStore, Navigator, SessionManager, SessionStore};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::MockServer;

pub const REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    pub fn visited(&self) -> Vec<Url> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) {
        self.visited.lock().unwrap().push(url.clone());
    }
}

pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    /// Points the token endpoint and the API base at `server`.
    pub fn new(server: &MockServer) -> Self {
        let config = AuthConfig::new("test-client", Url::parse(REDIRECT_URI).unwrap())
            .with_token_url(Url::parse(&format!("{}/api/token", server.uri())).unwrap())
            .with_api_base_url(Url::parse(&format!("{}/v1/", server.uri())).unwrap());
        Self::with_config(config)
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let navigator = Arc::new(RecordingNavigator::default());
        let manager = Arc::new(SessionManager::new(
            config,
            store.clone(),
            navigator.clone(),
        ));
        Self {
            manager,
            store,
            navigator,
        }
    }

    /// Stores a session whose expiry is `offset_ms` from now.
    pub fn seed_session(&self, token: &str, offset_ms: i64) {
        let expires_at = Utc::now().timestamp_millis() + offset_ms;
        self.store.set(KEY_ACCESS_TOKEN, token).unwrap();
        self.store
            .set(KEY_EXPIRATION_TIME, &expires_at.to_string())
            .unwrap();
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.manager.clone())
    }
}

pub fn query(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub fn track_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "href": format!("https://api.spotify.com/v1/tracks/{}", id),
        "uri": format!("spotify:track:{}", id),
        "type": "track",
        "duration_ms": 200000,
        "popularity": 50,
        "explicit": false,
        "artists": [{
            "id": "1vCWHaC5f2uS3yhpwWbIA6",
            "name": "Avicii",
            "href": "https://api.spotify.com/v1/artists/1vCWHaC5f2uS3yhpwWbIA6",
            "uri": "spotify:artist:1vCWHaC5f2uS3yhpwWbIA6",
            "type": "artist"
        }],
        "album": {
            "id": "02h6qzs5Ln1QaVpkQPcCVr",
            "name": "True",
            "href": "https://api.spotify.com/v1/albums/02h6qzs5Ln1QaVpkQPcCVr",
            "uri": "spotify:album:02h6qzs5Ln1QaVpkQPcCVr",
            "type": "album",
            "release_date": "2013-09-13",
            "images": []
        }
    })
}

pub fn page_json(items: Vec<Value>, total: u32) -> Value {
    let limit = items.len();
    json!({
        "href": "https://api.spotify.com/v1/page",
        "items": items,
        "limit": limit,
        "offset": 0,
        "total": total,
        "next": null,
        "previous": null
    })
}
