use kts_core::{Album, AlbumId, Artist, ArtistId, HistoryStamp};

use crate::error::StorageError;

/// Row counts of the three tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub artists: usize,
    pub albums: usize,
    pub history: usize,
}

/// Single-entity CRUD over artists, albums and the audit table.
///
/// Mutations return the number of affected rows; `0` means nothing matched
/// and is not an error. `Err` is reserved for failures of the store itself.
/// Inserts replace an existing row with the same id.
pub trait Storage {
    fn get_artist(&self, id: &ArtistId) -> Result<Option<Artist>, StorageError>;

    fn get_all_artists(&self) -> Result<Vec<Artist>, StorageError>;

    fn contains_artist(&self, id: &ArtistId) -> Result<bool, StorageError>;

    fn insert_artist(&mut self, artist: &Artist) -> Result<usize, StorageError>;

    fn update_artist(&mut self, artist: &Artist) -> Result<usize, StorageError>;

    fn delete_artist(&mut self, artist: &Artist) -> Result<usize, StorageError>;

    fn get_album(&self, id: &AlbumId) -> Result<Option<Album>, StorageError>;

    fn get_all_albums(&self) -> Result<Vec<Album>, StorageError>;

    /// Albums whose `artist_id` equals `artist_id`.
    fn get_artist_albums(&self, artist_id: &ArtistId) -> Result<Vec<Album>, StorageError>;

    fn contains_album(&self, id: &AlbumId) -> Result<bool, StorageError>;

    fn insert_album(&mut self, album: &Album) -> Result<usize, StorageError>;

    fn update_album(&mut self, album: &Album) -> Result<usize, StorageError>;

    fn delete_album(&mut self, album: &Album) -> Result<usize, StorageError>;

    fn insert_albums(&mut self, albums: &[Album]) -> Result<usize, StorageError> {
        let mut total = 0;
        for album in albums {
            total += self.insert_album(album)?;
        }
        Ok(total)
    }

    fn update_albums(&mut self, albums: &[Album]) -> Result<usize, StorageError> {
        let mut total = 0;
        for album in albums {
            total += self.update_album(album)?;
        }
        Ok(total)
    }

    fn delete_albums(&mut self, albums: &[Album]) -> Result<usize, StorageError> {
        let mut total = 0;
        for album in albums {
            total += self.delete_album(album)?;
        }
        Ok(total)
    }

    fn append_history(&mut self, stamp: &HistoryStamp) -> Result<(), StorageError>;

    /// All audit rows, oldest first.
    fn get_history(&self) -> Result<Vec<HistoryStamp>, StorageError>;

    fn get_history_for_item(&self, item_id: &str) -> Result<Vec<HistoryStamp>, StorageError>;

    fn latest_history_timestamp(&self) -> Result<Option<i64>, StorageError>;

    fn counts(&self) -> Result<StoreCounts, StorageError>;

    /// Empties every table, audit trail included.
    fn clear_all(&mut self) -> Result<(), StorageError>;

    fn begin(&mut self) -> Result<(), StorageError>;

    fn commit(&mut self) -> Result<(), StorageError>;

    fn rollback(&mut self) -> Result<(), StorageError>;
}
