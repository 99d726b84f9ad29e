use std::path::Path;

use rusqlite::{Connection, Row, params};
use tracing::info;

use kts_core::{
    ActionResult, ActionType, Album, AlbumId, Artist, ArtistId, HistoryStamp, album_id_list,
};

use crate::error::StorageError;
use crate::traits::{Storage, StoreCounts};

const ARTIST_COLUMNS: &str = "artist_id, name, album_ids, created_at, updated_at";
const ALBUM_COLUMNS: &str = "album_id, name, artist_id, created_at, updated_at";
const HISTORY_COLUMNS: &str = "timestamp, action_type, action_result, item_id, comments";

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        info!("opened store at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn count(&self, table: &str) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_artists(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Artist>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let artists = stmt
            .query_map(params, read_artist)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    fn query_albums(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Album>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let albums = stmt
            .query_map(params, read_album)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    fn query_history(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<HistoryStamp>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let stamps = stmt
            .query_map(params, |row| {
                read_history(row).map_err(|e| match e {
                    StorageError::Sqlite(sq) => sq,
                    other => rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(OpaqueStorageError(other.to_string())),
                    ),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stamps)
    }
}

fn read_artist(row: &Row) -> rusqlite::Result<Artist> {
    let encoded: String = row.get(2)?;
    Ok(Artist {
        id: ArtistId::from_raw(row.get::<_, String>(0)?),
        name: row.get(1)?,
        album_ids: album_id_list::decode(&encoded),
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn read_album(row: &Row) -> rusqlite::Result<Album> {
    let artist_id: Option<String> = row.get(2)?;
    Ok(Album {
        id: AlbumId::from_raw(row.get::<_, String>(0)?),
        name: row.get(1)?,
        artist_id: artist_id.map(ArtistId::from_raw),
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn read_history(row: &Row) -> Result<HistoryStamp, StorageError> {
    let action_type: String = row.get(1)?;
    let action_result: String = row.get(2)?;
    Ok(HistoryStamp {
        timestamp: row.get(0)?,
        action_type: ActionType::parse(&action_type)?,
        action_result: ActionResult::parse(&action_result)?,
        item_id: row.get(3)?,
        comments: row.get(4)?,
    })
}

impl Storage for SqliteStorage {
    fn get_artist(&self, id: &ArtistId) -> Result<Option<Artist>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ARTIST_COLUMNS} FROM _artist WHERE artist_id = ?1"))?;
        let mut rows = stmt.query_map(params![id.as_str()], read_artist)?;
        match rows.next() {
            Some(Ok(artist)) => Ok(Some(artist)),
            Some(Err(e)) => Err(StorageError::Sqlite(e)),
            None => Ok(None),
        }
    }

    fn get_all_artists(&self) -> Result<Vec<Artist>, StorageError> {
        self.query_artists(&format!("SELECT {ARTIST_COLUMNS} FROM _artist ORDER BY created_at, artist_id"), &[])
    }

    fn contains_artist(&self, id: &ArtistId) -> Result<bool, StorageError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM _artist WHERE artist_id = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn insert_artist(&mut self, artist: &Artist) -> Result<usize, StorageError> {
        let rows = self.conn.execute(
            &format!("INSERT OR REPLACE INTO _artist ({ARTIST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                artist.id.as_str(),
                artist.name,
                artist.encoded_album_ids(),
                artist.created_at,
                artist.updated_at,
            ],
        )?;
        Ok(rows)
    }

    fn update_artist(&mut self, artist: &Artist) -> Result<usize, StorageError> {
        let rows = self.conn.execute(
            "UPDATE _artist SET name = ?2, album_ids = ?3, created_at = ?4, updated_at = ?5 WHERE artist_id = ?1",
            params![
                artist.id.as_str(),
                artist.name,
                artist.encoded_album_ids(),
                artist.created_at,
                artist.updated_at,
            ],
        )?;
        Ok(rows)
    }

    fn delete_artist(&mut self, artist: &Artist) -> Result<usize, StorageError> {
        let rows = self
            .conn
            .execute("DELETE FROM _artist WHERE artist_id = ?1", params![artist.id.as_str()])?;
        Ok(rows)
    }

    fn get_album(&self, id: &AlbumId) -> Result<Option<Album>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ALBUM_COLUMNS} FROM _album WHERE album_id = ?1"))?;
        let mut rows = stmt.query_map(params![id.as_str()], read_album)?;
        match rows.next() {
            Some(Ok(album)) => Ok(Some(album)),
            Some(Err(e)) => Err(StorageError::Sqlite(e)),
            None => Ok(None),
        }
    }

    fn get_all_albums(&self) -> Result<Vec<Album>, StorageError> {
        self.query_albums(&format!("SELECT {ALBUM_COLUMNS} FROM _album ORDER BY created_at, album_id"), &[])
    }

    fn get_artist_albums(&self, artist_id: &ArtistId) -> Result<Vec<Album>, StorageError> {
        self.query_albums(
            &format!("SELECT {ALBUM_COLUMNS} FROM _album WHERE artist_id = ?1 ORDER BY created_at, album_id"),
            &[&artist_id.as_str()],
        )
    }

    fn contains_album(&self, id: &AlbumId) -> Result<bool, StorageError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM _album WHERE album_id = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn insert_album(&mut self, album: &Album) -> Result<usize, StorageError> {
        let rows = self.conn.execute(
            &format!("INSERT OR REPLACE INTO _album ({ALBUM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                album.id.as_str(),
                album.name,
                album.artist_id.as_ref().map(ArtistId::as_str),
                album.created_at,
                album.updated_at,
            ],
        )?;
        Ok(rows)
    }

    fn update_album(&mut self, album: &Album) -> Result<usize, StorageError> {
        let rows = self.conn.execute(
            "UPDATE _album SET name = ?2, artist_id = ?3, created_at = ?4, updated_at = ?5 WHERE album_id = ?1",
            params![
                album.id.as_str(),
                album.name,
                album.artist_id.as_ref().map(ArtistId::as_str),
                album.created_at,
                album.updated_at,
            ],
        )?;
        Ok(rows)
    }

    fn delete_album(&mut self, album: &Album) -> Result<usize, StorageError> {
        let rows = self
            .conn
            .execute("DELETE FROM _album WHERE album_id = ?1", params![album.id.as_str()])?;
        Ok(rows)
    }

    fn append_history(&mut self, stamp: &HistoryStamp) -> Result<(), StorageError> {
        self.conn.execute(
            &format!("INSERT INTO _history_actions ({HISTORY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                stamp.timestamp,
                stamp.action_type.as_str(),
                stamp.action_result.as_str(),
                stamp.item_id,
                stamp.comments,
            ],
        )?;
        Ok(())
    }

    fn get_history(&self) -> Result<Vec<HistoryStamp>, StorageError> {
        self.query_history(
            &format!("SELECT {HISTORY_COLUMNS} FROM _history_actions ORDER BY timestamp"),
            &[],
        )
    }

    fn get_history_for_item(&self, item_id: &str) -> Result<Vec<HistoryStamp>, StorageError> {
        self.query_history(
            &format!("SELECT {HISTORY_COLUMNS} FROM _history_actions WHERE item_id = ?1 ORDER BY timestamp"),
            &[&item_id],
        )
    }

    fn latest_history_timestamp(&self) -> Result<Option<i64>, StorageError> {
        let latest: Option<i64> =
            self.conn
                .query_row("SELECT MAX(timestamp) FROM _history_actions", [], |row| row.get(0))?;
        Ok(latest)
    }

    fn counts(&self) -> Result<StoreCounts, StorageError> {
        Ok(StoreCounts {
            artists: self.count("_artist")?,
            albums: self.count("_album")?,
            history: self.count("_history_actions")?,
        })
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "DELETE FROM _album; DELETE FROM _artist; DELETE FROM _history_actions;",
        )?;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), StorageError> {
        if self.in_transaction() {
            return Err(StorageError::Transaction("transaction already open".into()));
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if !self.in_transaction() {
            return Err(StorageError::Transaction("no open transaction to commit".into()));
        }
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        if !self.in_transaction() {
            return Err(StorageError::Transaction("no open transaction to roll back".into()));
        }
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Wrapper error type used to tunnel StorageError through rusqlite's error system
/// in query_map closures that must return rusqlite::Error.
#[derive(Debug)]
struct OpaqueStorageError(String);

impl std::fmt::Display for OpaqueStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for OpaqueStorageError {}
