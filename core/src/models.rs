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

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// The current user's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String, // display name, or the id when the account has none
    pub href: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub email: Option<String>,
    pub country: Option<String>,
    pub product: Option<String>,
    pub followers: u32,
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub href: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub genres: Vec<String>,
    pub popularity: Option<u32>,
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub href: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub album_type: Option<String>,
    pub release_date: Option<String>,
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub href: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
    pub duration_ms: u32,
    pub popularity: Option<u32>,
    pub explicit: bool,
    pub preview_url: Option<String>,
}

impl Track {
    /// Artist names joined for display.
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<&str>>()
            .join(", ")
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.duration_ms / 1000;
        write!(
            f,
            "{} - {} [{}:{:02}]",
            self.name,
            self.artist_names(),
            seconds / 60,
            seconds % 60
        )?;
        if let Some(album) = &self.album {
            write!(f, " (Album: {})", album.name)?;
        }
        Ok(())
    }
}

impl fmt::Display for Artist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.genres.is_empty() {
            write!(f, " ({})", self.genres.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub href: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub owner_name: String,
    pub is_public: Option<bool>,
    pub is_collaborative: bool,
    pub total_tracks: u32,
    pub images: Vec<Image>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

pub type PlaylistPage = Page<Track>;

/// Seed for a recommendations request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    Track(String),
    Artist(String),
}
