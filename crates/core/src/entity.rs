use serde::{Deserialize, Serialize};

use crate::album_id_list;
use crate::clock::wall_now;
use crate::error::CoreError;
use crate::ids::{AlbumId, ArtistId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(rename = "artist_id", default)]
    pub id: ArtistId,
    #[serde(default)]
    pub name: String,
    /// Ids of the albums whose `artist_id` points here, in insertion order.
    #[serde(default, with = "album_id_list::text")]
    pub album_ids: Vec<AlbumId>,
    #[serde(rename = "createdTime", alias = "created_at", default = "wall_now")]
    pub created_at: i64,
    #[serde(rename = "updatedTime", alias = "updated_at", default = "wall_now")]
    pub updated_at: i64,
}

impl Artist {
    pub fn new(name: impl Into<String>) -> Self {
        let now = wall_now();
        Self {
            id: ArtistId::new(),
            name: name.into(),
            album_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends `id` unless already listed. Returns whether the list changed.
    pub fn add_album_id(&mut self, id: &AlbumId) -> bool {
        if self.album_ids.contains(id) {
            return false;
        }
        self.album_ids.push(id.clone());
        true
    }

    /// Removes `id` if listed. Returns whether the list changed.
    pub fn remove_album_id(&mut self, id: &AlbumId) -> bool {
        match self.album_ids.iter().position(|listed| listed == id) {
            Some(index) => {
                self.album_ids.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn lists_album(&self, id: &AlbumId) -> bool {
        self.album_ids.contains(id)
    }

    pub fn encoded_album_ids(&self) -> String {
        album_id_list::encode(&self.album_ids)
    }

    pub fn touch(&mut self, now: i64) {
        self.updated_at = now;
    }

    pub fn from_json(content: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    #[serde(rename = "album_id", default)]
    pub id: AlbumId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist_id: Option<ArtistId>,
    #[serde(rename = "createdTime", alias = "created_at", default = "wall_now")]
    pub created_at: i64,
    #[serde(rename = "updatedTime", alias = "updated_at", default = "wall_now")]
    pub updated_at: i64,
}

impl Album {
    pub fn new(name: impl Into<String>) -> Self {
        let now = wall_now();
        Self {
            id: AlbumId::new(),
            name: name.into(),
            artist_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an album owned by `artist` and lists it on the artist.
    pub fn new_for_artist(name: impl Into<String>, artist: &mut Artist) -> Self {
        let mut album = Self::new(name);
        album.artist_id = Some(artist.id.clone());
        artist.add_album_id(&album.id);
        album
    }

    pub fn touch(&mut self, now: i64) {
        self.updated_at = now;
    }

    pub fn from_json(content: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}
