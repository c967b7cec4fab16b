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

//! Vendor payload shapes and their mapping onto [`crate::models`].
//!
//! Only the fields the client keeps are declared; everything else in the
//! payload is ignored. Spotify sends `null` for several collections, so
//! those decode as empty.

use crate::models::{Album, Artist, Image, Page, Playlist, Profile, Track};
use serde::{Deserialize, Deserializer};

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A `null` list decodes as empty and `null` entries inside it are skipped.
fn present_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

#[derive(Debug, Deserialize)]
pub struct VendorImage {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VendorFollowers {
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Deserialize)]
pub struct VendorUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub href: String,
    #[serde(default, deserialize_with = "nullable")]
    pub uri: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub followers: VendorFollowers,
    #[serde(default, deserialize_with = "nullable")]
    pub images: Vec<VendorImage>,
}

#[derive(Debug, Deserialize)]
pub struct VendorArtist {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub href: String,
    #[serde(default, deserialize_with = "nullable")]
    pub uri: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable")]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default, deserialize_with = "nullable")]
    pub images: Vec<VendorImage>,
}

#[derive(Debug, Deserialize)]
pub struct VendorAlbum {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub href: String,
    #[serde(default, deserialize_with = "nullable")]
    pub uri: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default)]
    pub album_type: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub images: Vec<VendorImage>,
}

#[derive(Debug, Deserialize)]
pub struct VendorTrack {
    // Local files have no id.
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub href: String,
    #[serde(default, deserialize_with = "nullable")]
    pub uri: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable")]
    pub artists: Vec<VendorArtist>,
    #[serde(default)]
    pub album: Option<VendorAlbum>,
    #[serde(default)]
    pub duration_ms: u32,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VendorPlaylistOwner {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VendorTracksRef {
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Deserialize)]
pub struct VendorPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub href: String,
    #[serde(default, deserialize_with = "nullable")]
    pub uri: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub owner: VendorPlaylistOwner,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub tracks: VendorTracksRef,
    #[serde(default, deserialize_with = "nullable")]
    pub images: Vec<VendorImage>,
}

/// An entry of `playlists/{id}/tracks` or `me/tracks`. The track is `null`
/// when it was removed from the catalog.
#[derive(Debug, Deserialize)]
pub struct VendorTrackItem {
    #[serde(default)]
    pub track: Option<VendorTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct VendorPage<T> {
    #[serde(default, deserialize_with = "present_items")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VendorSearch {
    #[serde(default)]
    pub tracks: Option<VendorPage<VendorTrack>>,
}

#[derive(Debug, Deserialize)]
pub struct VendorGenreSeeds {
    #[serde(default, deserialize_with = "nullable")]
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VendorRecommendations {
    #[serde(default, deserialize_with = "nullable")]
    pub tracks: Vec<VendorTrack>,
}

impl From<VendorImage> for Image {
    fn from(image: VendorImage) -> Self {
        Image {
            url: image.url,
            width: image.width,
            height: image.height,
        }
    }
}

fn images(images: Vec<VendorImage>) -> Vec<Image> {
    images.into_iter().map(Image::from).collect()
}

impl From<VendorUser> for Profile {
    fn from(user: VendorUser) -> Self {
        let name = user
            .display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| user.id.clone());
        Profile {
            id: user.id,
            name,
            href: user.href,
            uri: user.uri,
            kind: user.kind,
            email: user.email,
            country: user.country,
            product: user.product,
            followers: user.followers.total,
            images: images(user.images),
        }
    }
}

impl From<VendorArtist> for Artist {
    fn from(artist: VendorArtist) -> Self {
        Artist {
            id: artist.id,
            name: artist.name,
            href: artist.href,
            uri: artist.uri,
            kind: artist.kind,
            genres: artist.genres,
            popularity: artist.popularity,
            images: images(artist.images),
        }
    }
}

impl From<VendorAlbum> for Album {
    fn from(album: VendorAlbum) -> Self {
        Album {
            id: album.id,
            name: album.name,
            href: album.href,
            uri: album.uri,
            kind: album.kind,
            album_type: album.album_type,
            release_date: album.release_date,
            images: images(album.images),
        }
    }
}

impl From<VendorTrack> for Track {
    fn from(track: VendorTrack) -> Self {
        Track {
            id: track.id,
            name: track.name,
            href: track.href,
            uri: track.uri,
            kind: track.kind,
            artists: track.artists.into_iter().map(Artist::from).collect(),
            album: track.album.map(Album::from),
            duration_ms: track.duration_ms,
            popularity: track.popularity,
            explicit: track.explicit,
            preview_url: track.preview_url,
        }
    }
}

impl From<VendorPlaylist> for Playlist {
    fn from(playlist: VendorPlaylist) -> Self {
        let owner_name = playlist
            .owner
            .display_name
            .filter(|name| !name.is_empty())
            .unwrap_or(playlist.owner.id);
        Playlist {
            id: playlist.id,
            name: playlist.name,
            href: playlist.href,
            uri: playlist.uri,
            kind: playlist.kind,
            description: playlist.description.filter(|d| !d.is_empty()),
            owner_name,
            is_public: playlist.public,
            is_collaborative: playlist.collaborative,
            total_tracks: playlist.tracks.total,
            images: images(playlist.images),
        }
    }
}

impl<V> VendorPage<V> {
    /// Maps each item, dropping the ones `f` rejects. Paging fields are kept.
    pub fn filter_map<T, F>(self, f: F) -> Page<T>
    where
        F: FnMut(V) -> Option<T>,
    {
        Page {
            items: self.items.into_iter().filter_map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
            next: self.next,
        }
    }

    pub fn normalize<T: From<V>>(self) -> Page<T> {
        self.filter_map(|item| Some(T::from(item)))
    }
}

impl VendorPage<VendorTrackItem> {
    pub fn into_tracks(self) -> Page<Track> {
        self.filter_map(|item| item.track.map(Track::from))
    }
}
