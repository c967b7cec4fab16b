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

use rspotify::scopes;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1/";
pub const DEFAULT_SESSION_PATH: &str = ".spotify_session.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid URL in {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Everything the session manager and API client need to talk to Spotify.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
    pub authorize_url: Url,
    pub token_url: Url,
    pub api_base_url: Url,
    pub session_path: PathBuf,
}

/// Scopes needed by every resource operation of the client.
pub fn default_scopes() -> Vec<String> {
    // - user-read-private / user-read-email: profile.
    // - user-top-read: top tracks and artists.
    // - user-library-read: liked songs.
    // - playlist-read-private / playlist-read-collaborative: playlists.
    let mut scopes: Vec<String> = scopes!(
        "user-read-private",
        "user-read-email",
        "user-top-read",
        "user-library-read",
        "playlist-read-private",
        "playlist-read-collaborative"
    )
    .into_iter()
    .collect();
    // HashSet order is random; keep the authorize URL stable.
    scopes.sort();
    scopes
}

impl AuthConfig {
    pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri,
            scopes: default_scopes(),
            authorize_url: parse_default(DEFAULT_AUTHORIZE_URL),
            token_url: parse_default(DEFAULT_TOKEN_URL),
            api_base_url: parse_default(DEFAULT_API_URL),
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_authorize_url(mut self, url: Url) -> Self {
        self.authorize_url = url;
        self
    }

    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Base for every protected endpoint. A missing trailing `/` is added so
    /// that relative endpoint paths join underneath it.
    pub fn with_api_base_url(mut self, mut url: Url) -> Self {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.api_base_url = url;
        self
    }

    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = path.into();
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// Required: `RSPOTIFY_CLIENT_ID`, `RSPOTIFY_REDIRECT_URI`.
    /// Optional: `SPOTIFY_SCOPES`, `SPOTIFY_AUTH_URL`, `SPOTIFY_TOKEN_URL`,
    /// `SPOTIFY_API_URL`, `SPOTIFY_SESSION_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = var("RSPOTIFY_CLIENT_ID").ok_or(ConfigError::Missing("RSPOTIFY_CLIENT_ID"))?;
        let redirect_uri = var("RSPOTIFY_REDIRECT_URI")
            .ok_or(ConfigError::Missing("RSPOTIFY_REDIRECT_URI"))?;
        let redirect_uri = parse_url("RSPOTIFY_REDIRECT_URI", &redirect_uri)?;

        let mut config = Self::new(client_id, redirect_uri);

        if let Some(scopes) = var("SPOTIFY_SCOPES") {
            config = config.with_scopes(scopes.split_whitespace().map(String::from).collect());
        }
        if let Some(url) = var("SPOTIFY_AUTH_URL") {
            config = config.with_authorize_url(parse_url("SPOTIFY_AUTH_URL", &url)?);
        }
        if let Some(url) = var("SPOTIFY_TOKEN_URL") {
            config = config.with_token_url(parse_url("SPOTIFY_TOKEN_URL", &url)?);
        }
        if let Some(url) = var("SPOTIFY_API_URL") {
            config = config.with_api_base_url(parse_url("SPOTIFY_API_URL", &url)?);
        }
        if let Some(path) = var("SPOTIFY_SESSION_PATH") {
            config = config.with_session_path(path);
        }

        Ok(config)
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl { name, source })
}

fn parse_default(value: &'static str) -> Url {
    Url::parse(value).expect("valid default URL")
}
