use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTHORITY: &str = "com.lasley.provider";
const CONTENT_SCHEME: &str = "content://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Query,
    Insert,
    Update,
    Delete,
    BulkInsert,
}

impl Operation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "query" => Some(Self::Query),
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "bulkInsert" => Some(Self::BulkInsert),
            _ => None,
        }
    }
}

/// Resource addressed by a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Albums,
    Album,
    Artists,
    Artist,
    ArtistAlbums,
    Status,
    Bulk,
    Unknown,
}

impl ResourceKind {
    pub fn from_path(path: &str) -> Self {
        match path.trim_matches('/') {
            "albums" => Self::Albums,
            "album" => Self::Album,
            "artists" => Self::Artists,
            "artist" => Self::Artist,
            "artist/albums" => Self::ArtistAlbums,
            "status" => Self::Status,
            "bulk" => Self::Bulk,
            _ => Self::Unknown,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Albums => "albums",
            Self::Album => "album",
            Self::Artists => "artists",
            Self::Artist => "artist",
            Self::ArtistAlbums => "artist/albums",
            Self::Status => "status",
            Self::Bulk => "bulk",
            Self::Unknown => "unknown",
        }
    }
}

/// A request as it arrives at the boundary: the path is already resolved to a
/// [`ResourceKind`], everything else is untrusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub operation: Operation,
    pub kind: ResourceKind,
    pub id: Option<String>,
    pub payload: Option<String>,
}

impl Request {
    pub fn new(operation: Operation, kind: ResourceKind) -> Self {
        Self {
            operation,
            kind,
            id: None,
            payload: None,
        }
    }

    pub fn query(kind: ResourceKind) -> Self {
        Self::new(Operation::Query, kind)
    }

    pub fn insert(kind: ResourceKind) -> Self {
        Self::new(Operation::Insert, kind)
    }

    pub fn update(kind: ResourceKind) -> Self {
        Self::new(Operation::Update, kind)
    }

    pub fn delete(kind: ResourceKind) -> Self {
        Self::new(Operation::Delete, kind)
    }

    pub fn bulk_insert(items: &[BulkItem]) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_string(items)?;
        Ok(Self::new(Operation::BulkInsert, ResourceKind::Bulk).with_payload(payload))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Parses `content://<authority>/<path>?id=<id>`. The scheme and authority
    /// are optional; an unrecognized path yields [`ResourceKind::Unknown`].
    pub fn from_uri(operation: Operation, uri: &str, payload: Option<String>) -> Self {
        let rest = uri.strip_prefix(CONTENT_SCHEME).unwrap_or(uri);
        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };
        let path = if uri.starts_with(CONTENT_SCHEME) {
            location.split_once('/').map(|(_, path)| path).unwrap_or("")
        } else {
            location
        };

        let id = query.and_then(|q| {
            q.split('&')
                .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
                .find(|(key, _)| *key == "id")
                .map(|(_, value)| decode_component(value))
        });

        Self {
            operation,
            kind: ResourceKind::from_path(path),
            id,
            payload,
        }
    }
}

fn decode_component(value: &str) -> String {
    let spaced = value.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// One element of a bulk insert payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl BulkItem {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: Some(content.into()),
        }
    }
}

/// Locator of a created entity, usable in later requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub authority: String,
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceRef {
    /// The request that reads this resource back.
    pub fn to_query(&self) -> Request {
        Request::query(self.kind).with_id(self.id.clone())
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{CONTENT_SCHEME}{}/{}?id={}",
            self.authority,
            self.kind.path(),
            urlencoding::encode(&self.id)
        )
    }
}
