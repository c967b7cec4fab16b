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

use crate::config::{AuthConfig, ConfigError};
use crate::navigator::Navigator;
use crate::pkce::{generate_state, PkcePair};
use crate::storage::{
    SessionStore, StoreError, KEY_ACCESS_TOKEN, KEY_EXPIRATION_TIME, KEY_STATE, KEY_VERIFIER,
};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Session storage failed: {0}")]
    Store(#[from] StoreError),
    #[error("Authorization callback did not include a code")]
    MissingCode,
    #[error("Authorization callback state does not match the login attempt")]
    StateMismatch,
    #[error("No code verifier stored for this login attempt")]
    MissingVerifier,
    #[error("Authorization was denied: {0}")]
    Denied(String),
    #[error("Invalid callback URL: {0}")]
    InvalidCallback(#[from] url::ParseError),
    #[error("Token exchange failed with HTTP {status}: {body}")]
    TokenExchange { status: u16, body: String },
    #[error("Unexpected token response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl AuthError {
    /// Errors that abort the handshake before any token request is made.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCode
                | AuthError::StateMismatch
                | AuthError::MissingVerifier
                | AuthError::Denied(_)
                | AuthError::InvalidCallback(_)
        )
    }
}

/// The persisted result of a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is still valid at the exact instant it expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    AwaitingCallback,
    Authenticated,
}

/// Query parameters the identity provider appends to the redirect URI.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    pub fn from_url(redirected: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(redirected.trim())?;
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                _ => {}
            }
        }
        Ok(params)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
}

/// Owns the Authorization Code with PKCE handshake and the resulting session.
///
/// All reads and writes of the session store go through this type.
pub struct SessionManager {
    config: AuthConfig,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    http: reqwest::Client,
}

impl SessionManager {
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            store,
            navigator,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Builds the provider's authorize URL for one login attempt.
    pub fn authorization_url(&self, state: &str, challenge: &str) -> Url {
        let mut url = self.config.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("state", state)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", challenge);
        url
    }

    /// Starts a login attempt: stores a fresh verifier and state, then
    /// navigates to the authorize URL. Any previous attempt is overwritten.
    pub fn begin_login(&self) -> Result<Url, AuthError> {
        let pkce = PkcePair::generate();
        let state = generate_state();

        self.store.set(KEY_VERIFIER, &pkce.verifier)?;
        self.store.set(KEY_STATE, &state)?;

        let url = self.authorization_url(&state, &pkce.challenge);
        info!("Redirecting to Spotify authorization");
        self.navigator.navigate(&url);

        Ok(url)
    }

    /// Exchanges the callback `code` for an access token.
    ///
    /// The exchange is aborted without contacting the token endpoint when the
    /// code is missing or `returned_state` differs from the stored state. On
    /// any failure nothing is written to the store.
    pub async fn complete_login(
        &self,
        code: Option<&str>,
        returned_state: Option<&str>,
    ) -> Result<String, AuthError> {
        let result = self.exchange_code(code, returned_state).await;
        if let Err(e) = &result {
            error!("Error fetching access token: {}", e);
        }
        result
    }

    /// Parses the URL the provider redirected to and completes the login.
    pub async fn complete_from_redirect(&self, redirected: &str) -> Result<String, AuthError> {
        let params = match CallbackParams::from_url(redirected) {
            Ok(params) => params,
            Err(e) => {
                error!("Invalid callback URL: {}", e);
                return Err(e.into());
            }
        };

        if let Some(reason) = params.error {
            error!("Authorization denied by provider: {}", reason);
            return Err(AuthError::Denied(reason));
        }

        self.complete_login(params.code.as_deref(), params.state.as_deref())
            .await
    }

    async fn exchange_code(
        &self,
        code: Option<&str>,
        returned_state: Option<&str>,
    ) -> Result<String, AuthError> {
        let code = code
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let stored_state = self.store.get(KEY_STATE)?;
        match (stored_state.as_deref(), returned_state) {
            (Some(stored), Some(returned)) if stored == returned => {}
            _ => return Err(AuthError::StateMismatch),
        }

        let verifier = self
            .store
            .get(KEY_VERIFIER)?
            .ok_or(AuthError::MissingVerifier)?;

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier.as_str()),
        ];

        debug!("Exchanging authorization code at {}", self.config.token_url);
        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        let expires_at = Utc::now()
            .timestamp_millis()
            .saturating_add(token.expires_in.saturating_mul(1000));

        let expiration = expires_at.to_string();
        self.store.set_all(&[
            (KEY_EXPIRATION_TIME, expiration.as_str()),
            (KEY_ACCESS_TOKEN, token.access_token.as_str()),
        ])?;
        self.store.remove(KEY_STATE)?;
        self.store.remove(KEY_VERIFIER)?;

        if let Some(scope) = &token.scope {
            debug!("Granted scopes: {}", scope);
        }
        info!("Access token stored, valid for {}s", token.expires_in);

        Ok(token.access_token)
    }

    /// The stored session, if both token and expiry are present and readable.
    pub fn session(&self) -> Result<Option<Session>, AuthError> {
        let Some(access_token) = self.store.get(KEY_ACCESS_TOKEN)? else {
            return Ok(None);
        };
        let Some(expiration) = self.store.get(KEY_EXPIRATION_TIME)? else {
            return Ok(None);
        };

        let expires_at = expiration
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        match expires_at {
            Some(expires_at) => Ok(Some(Session {
                access_token,
                expires_at,
            })),
            None => {
                warn!("Ignoring unreadable expiration time {:?}", expiration);
                Ok(None)
            }
        }
    }

    /// True when no token is stored or it has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.session() {
            Ok(Some(session)) => session.is_expired_at(now),
            Ok(None) => true,
            Err(e) => {
                warn!("Could not read session, treating it as expired: {}", e);
                true
            }
        }
    }

    /// The stored access token. Expiry is not checked.
    pub fn current_token(&self) -> Option<String> {
        match self.store.get(KEY_ACCESS_TOKEN) {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not read access token: {}", e);
                None
            }
        }
    }

    pub fn state(&self) -> SessionState {
        if !self.is_expired() {
            return SessionState::Authenticated;
        }
        match self.store.get(KEY_STATE) {
            Ok(Some(_)) => SessionState::AwaitingCallback,
            _ => SessionState::LoggedOut,
        }
    }
}
