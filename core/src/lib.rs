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

pub mod auth;
pub mod client;
pub mod config;
pub mod models;
pub mod navigator;
pub mod normalize;
pub mod pkce;
pub mod storage;

// Re-export key items for convenience
pub use auth::{AuthError, Session, SessionManager, SessionState};
pub use client::{ApiClient, ApiError};
pub use config::AuthConfig;
pub use models::{Album, Artist, Image, Page, Playlist, PlaylistPage, Profile, Seed, Track};
pub use navigator::{BrowserNavigator, Navigator, PrintNavigator};
pub use storage::{FileStore, MemoryStore, SessionStore};
