use kts_core::{ActionResult, Album, Artist};
use kts_storage::StoreCounts;

use crate::request::ResourceRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Artist(Artist),
    Album(Album),
}

impl Record {
    pub fn id(&self) -> &str {
        match self {
            Self::Artist(artist) => artist.id.as_str(),
            Self::Album(album) => album.id.as_str(),
        }
    }

    pub fn as_album(&self) -> Option<&Album> {
        match self {
            Self::Album(album) => Some(album),
            Self::Artist(_) => None,
        }
    }

    pub fn as_artist(&self) -> Option<&Artist> {
        match self {
            Self::Artist(artist) => Some(artist),
            Self::Album(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Query results; a single-entity query yields zero or one row.
    Rows(Vec<Record>),
    Created(Option<ResourceRef>),
    /// Rows affected by update/delete, or items applied by a bulk insert.
    Affected(usize),
    Status(StoreCounts),
}

/// What the resolver hands back for every request. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub result: ActionResult,
    pub response: Response,
}

impl Outcome {
    pub fn new(result: ActionResult, response: Response) -> Self {
        Self { result, response }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn rows(&self) -> &[Record] {
        match &self.response {
            Response::Rows(rows) => rows,
            _ => &[],
        }
    }

    pub fn albums(&self) -> Vec<&Album> {
        self.rows().iter().filter_map(Record::as_album).collect()
    }

    pub fn artists(&self) -> Vec<&Artist> {
        self.rows().iter().filter_map(Record::as_artist).collect()
    }

    pub fn created(&self) -> Option<&ResourceRef> {
        match &self.response {
            Response::Created(created) => created.as_ref(),
            _ => None,
        }
    }

    pub fn affected(&self) -> usize {
        match self.response {
            Response::Affected(n) => n,
            _ => 0,
        }
    }

    pub fn status(&self) -> Option<StoreCounts> {
        match self.response {
            Response::Status(counts) => Some(counts),
            _ => None,
        }
    }
}
