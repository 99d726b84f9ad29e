//! Text encoding of an artist's album list.
//!
//! The list is persisted (and sent over the wire) as a single comma-joined
//! string. The empty string is the empty list. Ids must not contain the
//! separator.

use serde::{Deserialize, Deserializer, Serializer};

use crate::ids::AlbumId;

pub const SEPARATOR: char = ',';

pub fn encode(ids: &[AlbumId]) -> String {
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(id.as_str());
    }
    out
}

pub fn decode(encoded: &str) -> Vec<AlbumId> {
    encoded
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(AlbumId::from_raw)
        .collect()
}

/// Serde adapter: `#[serde(with = "album_id_list::text")]`.
pub mod text {
    use super::*;

    pub fn serialize<S: Serializer>(ids: &[AlbumId], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(ids))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<AlbumId>, D::Error> {
        let encoded: Option<String> = Deserialize::deserialize(deserializer)?;
        Ok(encoded.as_deref().map(decode).unwrap_or_default())
    }
}
