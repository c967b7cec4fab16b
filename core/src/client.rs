/*
    spotify-discover | Rust CLI to explore your Spotify profile, library and recommendations.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::auth::{AuthError, SessionManager};
use crate::models::{Artist, Page, Playlist, PlaylistPage, Profile, Seed, Track};
use crate::normalize::{
    VendorArtist, VendorGenreSeeds, VendorPage, VendorPlaylist, VendorRecommendations,
    VendorSearch, VendorTrack, VendorTrackItem, VendorUser,
};
use log::{debug, error, warn};
use rspotify::{
    model::{ArtistId, PlaylistId, TrackId},
    prelude::Id,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session expired or missing, authorization restarted at {authorize_url}")]
    ReauthRequired { authorize_url: Url },
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Spotify API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid Playlist ID: {0}")]
    InvalidPlaylistId(String),
    #[error("Invalid Track ID: {0}")]
    InvalidTrackId(String),
    #[error("Invalid Artist ID: {0}")]
    InvalidArtistId(String),
}

impl ApiError {
    pub fn needs_reauth(&self) -> bool {
        matches!(self, ApiError::ReauthRequired { .. })
    }
}

/// Performs protected Web API calls on behalf of the session.
///
/// Every call first checks the session. When it is expired the client starts
/// a new login and returns [`ApiError::ReauthRequired`] without touching the
/// network; the caller repeats the request once the login completes.
pub struct ApiClient {
    session: Arc<SessionManager>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(session: Arc<SessionManager>) -> Self {
        let http = session.http().clone();
        Self { session, http }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// The current user's profile.
    pub async fn profile(&self) -> Result<Profile, ApiError> {
        let url = self.endpoint("me", &[])?;
        let user: VendorUser = self.get("profile", url).await?;
        Ok(user.into())
    }

    /// Searches the catalog for tracks. The query is form-encoded.
    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>, ApiError> {
        let limit = limit.to_string();
        let url = self.endpoint(
            "search",
            &[("q", query), ("type", "track"), ("limit", limit.as_str())],
        )?;
        let results: VendorSearch = self.get("search results", url).await?;
        Ok(results
            .tracks
            .map(|page| page.normalize::<Track>().items)
            .unwrap_or_default())
    }

    pub async fn playlists(&self, limit: u32) -> Result<Page<Playlist>, ApiError> {
        let limit = limit.to_string();
        let url = self.endpoint("me/playlists", &[("limit", limit.as_str())])?;
        let page: VendorPage<VendorPlaylist> = self.get("playlists", url).await?;
        Ok(page.normalize())
    }

    /// Tracks of a playlist. Accepts a bare id or a `spotify:playlist:` URI.
    pub async fn playlist_tracks(
        &self,
        playlist_id_str: &str,
        limit: u32,
    ) -> Result<PlaylistPage, ApiError> {
        let playlist_id = PlaylistId::from_id_or_uri(playlist_id_str)
            .map_err(|_| ApiError::InvalidPlaylistId(playlist_id_str.to_string()))?;

        let limit = limit.to_string();
        let url = self.endpoint(
            &format!("playlists/{}/tracks", playlist_id.id()),
            &[("limit", limit.as_str())],
        )?;
        let page: VendorPage<VendorTrackItem> = self.get("playlist tracks", url).await?;
        Ok(page.into_tracks())
    }

    /// `time_range` is passed through as given (`short_term`, `medium_term`, `long_term`).
    pub async fn top_tracks(&self, time_range: &str, limit: u32) -> Result<Vec<Track>, ApiError> {
        let limit = limit.to_string();
        let url = self.endpoint(
            "me/top/tracks",
            &[("time_range", time_range), ("limit", limit.as_str())],
        )?;
        let page: VendorPage<VendorTrack> = self.get("top tracks", url).await?;
        Ok(page.normalize::<Track>().items)
    }

    pub async fn top_artists(
        &self,
        time_range: &str,
        limit: u32,
    ) -> Result<Vec<Artist>, ApiError> {
        let limit = limit.to_string();
        let url = self.endpoint(
            "me/top/artists",
            &[("time_range", time_range), ("limit", limit.as_str())],
        )?;
        let page: VendorPage<VendorArtist> = self.get("top artists", url).await?;
        Ok(page.normalize::<Artist>().items)
    }

    pub async fn genre_seeds(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint("recommendations/available-genre-seeds", &[])?;
        let seeds: VendorGenreSeeds = self.get("genre seeds", url).await?;
        Ok(seeds.genres)
    }

    /// The user's saved ("Liked Songs") tracks.
    pub async fn liked_songs(&self, limit: u32) -> Result<Page<Track>, ApiError> {
        let limit = limit.to_string();
        let url = self.endpoint("me/tracks", &[("limit", limit.as_str())])?;
        let page: VendorPage<VendorTrackItem> = self.get("liked songs", url).await?;
        Ok(page.into_tracks())
    }

    pub async fn recommendations(&self, seed: &Seed, limit: u32) -> Result<Vec<Track>, ApiError> {
        let (key, id) = match seed {
            Seed::Track(id_str) => {
                let id = TrackId::from_id_or_uri(id_str)
                    .map_err(|_| ApiError::InvalidTrackId(id_str.clone()))?;
                ("seed_tracks", id.id().to_string())
            }
            Seed::Artist(id_str) => {
                let id = ArtistId::from_id_or_uri(id_str)
                    .map_err(|_| ApiError::InvalidArtistId(id_str.clone()))?;
                ("seed_artists", id.id().to_string())
            }
        };

        let limit = limit.to_string();
        let url = self.endpoint(
            "recommendations",
            &[(key, id.as_str()), ("limit", limit.as_str())],
        )?;
        let recommendations: VendorRecommendations = self.get("recommendations", url).await?;
        Ok(recommendations
            .tracks
            .into_iter()
            .map(Track::from)
            .collect())
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.session.config().api_base_url.join(path)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Returns the bearer token, or restarts the login when there is no valid session.
    fn authorize(&self) -> Result<String, ApiError> {
        if !self.session.is_expired() {
            if let Some(token) = self.session.current_token() {
                return Ok(token);
            }
        }

        warn!("Token invalid, redirecting to authorization");
        let authorize_url = self.session.begin_login()?;
        Err(ApiError::ReauthRequired { authorize_url })
    }

    async fn get<V: DeserializeOwned>(&self, what: &str, url: Url) -> Result<V, ApiError> {
        let token = self.authorize()?;
        let result = self.send(url, &token).await;
        if let Err(e) = &result {
            error!("Error fetching {}: {}", what, e);
        }
        result
    }

    async fn send<V: DeserializeOwned>(&self, url: Url, token: &str) -> Result<V, ApiError> {
        debug!("GET {}", url);
        let response = self.http.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
