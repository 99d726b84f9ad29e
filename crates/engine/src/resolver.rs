//! Maps requests onto storage operations.
//!
//! Every call produces an [`Outcome`] and at least one audit record; storage
//! failures are converted into `Failed` outcomes rather than surfaced as
//! errors. Multi-row mutations (cascading deletes, bulk inserts) run inside a
//! single storage transaction.

use tracing::{debug, warn};

use kts_core::clock::wall_now;
use kts_core::{ActionResult, ActionType, Album, AlbumId, Artist, ArtistId, is_valid_id};
use kts_storage::{Storage, StorageError};

use crate::config::ProviderConfig;
use crate::history::HistoryRecorder;
use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::request::{BulkItem, Operation, Request, ResourceKind, ResourceRef};
use crate::response::{Outcome, Record, Response};

/// Decoded insert/update payload.
enum Entity {
    Album(Album),
    Artist(Artist),
}

pub struct Resolver<S: Storage> {
    storage: S,
    history: HistoryRecorder,
    notifier: ChangeNotifier,
    authority: String,
    artist_albums_strict: bool,
    /// Kinds touched by the request in flight.
    changed: Vec<ResourceKind>,
}

impl<S: Storage> Resolver<S> {
    pub fn new(storage: S, config: &ProviderConfig) -> Self {
        let history = HistoryRecorder::resume(&storage);
        Self {
            storage,
            history,
            notifier: ChangeNotifier::new(config.authority.clone(), config.notify_capacity),
            authority: config.authority.clone(),
            artist_albums_strict: config.artist_albums_strict,
            changed: Vec::new(),
        }
    }

    pub fn with_defaults(storage: S) -> Self {
        Self::new(storage, &ProviderConfig::default())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn resolve(&mut self, request: Request) -> Outcome {
        self.changed.clear();
        let outcome = match request.operation {
            Operation::Query => self.query(&request),
            Operation::Insert => self.insert(&request),
            Operation::Update => self.update(&request),
            Operation::Delete => self.delete(&request),
            Operation::BulkInsert => self.bulk_insert(&request),
        };
        self.history.flush(&mut self.storage);

        debug!(
            "resolved {:?} {} (id={:?}): {}",
            request.operation,
            request.kind.path(),
            request.id,
            outcome.result
        );

        if !self.changed.is_empty() {
            self.notifier.notify(std::mem::take(&mut self.changed));
        }
        outcome
    }

    // ---- query ----

    fn query(&mut self, request: &Request) -> Outcome {
        let action = ActionType::Query;
        match request.kind {
            ResourceKind::Albums => self.guarded(request, |this| {
                let albums = this.storage.get_all_albums()?;
                this.history.record(action, ActionResult::Ok, None, Some("AllAlbums"));
                Ok(rows(albums.into_iter().map(Record::Album)))
            }),
            ResourceKind::Artists => self.guarded(request, |this| {
                let artists = this.storage.get_all_artists()?;
                this.history.record(action, ActionResult::Ok, None, Some("AllArtists"));
                Ok(rows(artists.into_iter().map(Record::Artist)))
            }),
            ResourceKind::Album => {
                let id = match self.require_id(action, request) {
                    Ok(id) => id,
                    Err(result) => return rejected(result, request.operation),
                };
                self.guarded(request, |this| {
                    let album = this.storage.get_album(&AlbumId::from_raw(id))?;
                    this.history.record(action, ActionResult::Ok, Some(id), None);
                    Ok(rows(album.map(Record::Album)))
                })
            }
            ResourceKind::Artist => {
                let id = match self.require_id(action, request) {
                    Ok(id) => id,
                    Err(result) => return rejected(result, request.operation),
                };
                self.guarded(request, |this| {
                    let artist = this.storage.get_artist(&ArtistId::from_raw(id))?;
                    this.history.record(action, ActionResult::Ok, Some(id), None);
                    Ok(rows(artist.map(Record::Artist)))
                })
            }
            ResourceKind::ArtistAlbums => self.query_artist_albums(request),
            ResourceKind::Status => self.guarded(request, |this| {
                let counts = this.storage.counts()?;
                this.history.record(action, ActionResult::Ok, None, Some("status"));
                Ok(Outcome::new(ActionResult::Ok, Response::Status(counts)))
            }),
            ResourceKind::Bulk | ResourceKind::Unknown => self.unknown_uri(request, request.id.as_deref()),
        }
    }

    fn query_artist_albums(&mut self, request: &Request) -> Outcome {
        let action = ActionType::Query;
        let id = if self.artist_albums_strict {
            match self.require_id(action, request) {
                Ok(id) => id,
                Err(result) => return rejected(result, request.operation),
            }
        } else {
            match request.id.as_deref() {
                Some(id) => id,
                None => return rejected(ActionResult::MissingId, request.operation),
            }
        };

        self.guarded(request, |this| {
            let albums = this.storage.get_artist_albums(&ArtistId::from_raw(id))?;
            this.history.record(action, ActionResult::Ok, Some(id), Some("artist/albums"));
            Ok(rows(albums.into_iter().map(Record::Album)))
        })
    }

    // ---- insert / update ----

    fn insert(&mut self, request: &Request) -> Outcome {
        let action = ActionType::Insert;
        let (id, entity) = match self.decode_request(action, request) {
            Ok(decoded) => decoded,
            Err(outcome) => return outcome,
        };

        self.guarded(request, |this| {
            let (kind, entity_id, rows) = match &entity {
                Entity::Album(album) => (ResourceKind::Album, album.id.as_str(), this.storage.insert_album(album)?),
                Entity::Artist(artist) => {
                    (ResourceKind::Artist, artist.id.as_str(), this.storage.insert_artist(artist)?)
                }
            };
            if rows == 0 {
                this.history.record(action, ActionResult::Failed, Some(id), Some("no rows inserted"));
                return Ok(Outcome::new(ActionResult::Failed, Response::Created(None)));
            }

            this.history.record(action, ActionResult::Ok, Some(entity_id), None);
            this.mark_changed(kind);
            let created = ResourceRef {
                authority: this.authority.clone(),
                kind,
                id: entity_id.to_string(),
            };
            Ok(Outcome::new(ActionResult::Ok, Response::Created(Some(created))))
        })
    }

    fn update(&mut self, request: &Request) -> Outcome {
        let action = ActionType::Update;
        let (_, entity) = match self.decode_request(action, request) {
            Ok(decoded) => decoded,
            Err(outcome) => return outcome,
        };

        self.guarded(request, |this| {
            let now = wall_now();
            let (kind, entity_id, rows) = match entity {
                Entity::Album(mut album) => {
                    album.touch(now);
                    let rows = this.storage.update_album(&album)?;
                    (ResourceKind::Album, album.id.to_string(), rows)
                }
                Entity::Artist(mut artist) => {
                    artist.touch(now);
                    let rows = this.storage.update_artist(&artist)?;
                    (ResourceKind::Artist, artist.id.to_string(), rows)
                }
            };
            if rows == 0 {
                this.history.record(action, ActionResult::Failed, Some(&entity_id), Some("no matching row"));
                return Ok(Outcome::new(ActionResult::Failed, Response::Affected(0)));
            }

            this.history.record(action, ActionResult::Ok, Some(&entity_id), None);
            this.mark_changed(kind);
            Ok(Outcome::new(ActionResult::Ok, Response::Affected(rows)))
        })
    }

    /// Runs the id, content and parse checks shared by insert and update.
    fn decode_request<'r>(
        &mut self,
        action: ActionType,
        request: &'r Request,
    ) -> Result<(&'r str, Entity), Outcome> {
        let id = self
            .require_id(action, request)
            .map_err(|result| rejected(result, request.operation))?;

        let Some(content) = request.payload.as_deref() else {
            self.history.record(action, ActionResult::MissingContent, Some(id), None);
            return Err(rejected(ActionResult::MissingContent, request.operation));
        };

        let decoded = match request.kind {
            ResourceKind::Album => Album::from_json(content).map(Entity::Album),
            ResourceKind::Artist => Artist::from_json(content).map(Entity::Artist),
            _ => return Err(self.unknown_uri(request, Some(id))),
        };
        match decoded {
            Ok(entity) => Ok((id, entity)),
            Err(e) => {
                self.history.record(action, ActionResult::ParseFailed, Some(id), Some(&e.to_string()));
                Err(rejected(ActionResult::ParseFailed, request.operation))
            }
        }
    }

    // ---- delete ----

    fn delete(&mut self, request: &Request) -> Outcome {
        let id = match self.require_id(ActionType::Delete, request) {
            Ok(id) => id,
            Err(result) => return rejected(result, request.operation),
        };
        match request.kind {
            ResourceKind::Album => {
                self.atomically(request, |this| this.delete_album_cascade(&AlbumId::from_raw(id)))
            }
            ResourceKind::Artist => {
                self.atomically(request, |this| this.delete_artist_cascade(&ArtistId::from_raw(id)))
            }
            _ => self.unknown_uri(request, Some(id)),
        }
    }

    fn delete_album_cascade(&mut self, id: &AlbumId) -> Result<Outcome, StorageError> {
        let Some(album) = self.storage.get_album(id)? else {
            self.history
                .record(ActionType::Delete, ActionResult::ItemMissing, Some(id.as_str()), None);
            return Ok(Outcome::new(ActionResult::ItemMissing, Response::Affected(0)));
        };

        let rows = self.storage.delete_album(&album)?;
        if rows == 0 {
            self.history
                .record(ActionType::Delete, ActionResult::Failed, Some(id.as_str()), None);
            return Ok(Outcome::new(ActionResult::Failed, Response::Affected(0)));
        }
        self.history
            .record(ActionType::Delete, ActionResult::Ok, Some(id.as_str()), None);
        self.mark_changed(ResourceKind::Album);

        if let Some(artist_id) = &album.artist_id {
            self.unlist_album(artist_id, &album.id)?;
        }
        Ok(Outcome::new(ActionResult::Ok, Response::Affected(rows)))
    }

    /// Drops `album_id` from its owner's list, recording the artist update.
    fn unlist_album(&mut self, artist_id: &ArtistId, album_id: &AlbumId) -> Result<(), StorageError> {
        let action = ActionType::Update;
        let Some(mut artist) = self.storage.get_artist(artist_id)? else {
            let comment = format!("owning artist {artist_id} of album {album_id} not found");
            self.history
                .record(action, ActionResult::Failed, Some(artist_id.as_str()), Some(&comment));
            return Ok(());
        };

        if !artist.remove_album_id(album_id) {
            let comment = format!("album {album_id} not listed by artist");
            self.history
                .record(action, ActionResult::Failed, Some(artist_id.as_str()), Some(&comment));
            return Ok(());
        }

        artist.touch(wall_now());
        let rows = self.storage.update_artist(&artist)?;
        self.record_artist_update(&artist, rows);
        Ok(())
    }

    fn delete_artist_cascade(&mut self, id: &ArtistId) -> Result<Outcome, StorageError> {
        let Some(artist) = self.storage.get_artist(id)? else {
            self.history
                .record(ActionType::Delete, ActionResult::ItemMissing, Some(id.as_str()), None);
            return Ok(Outcome::new(ActionResult::ItemMissing, Response::Affected(0)));
        };

        let mut count = self.storage.delete_artist(&artist)?;
        if count > 0 {
            self.mark_changed(ResourceKind::Artist);
        }

        for album_id in &artist.album_ids {
            let rows = match self.storage.get_album(album_id)? {
                Some(album) => self.storage.delete_album(&album)?,
                None => 0,
            };
            let result = if rows > 0 {
                self.mark_changed(ResourceKind::Album);
                ActionResult::Ok
            } else {
                ActionResult::Failed
            };
            self.history
                .record(ActionType::Delete, result, Some(album_id.as_str()), Some("listed by deleted artist"));
            count += rows;
        }

        let result = if count > 0 { ActionResult::Ok } else { ActionResult::Failed };
        let comment = format!("{count} rows removed");
        self.history
            .record(ActionType::Delete, result, Some(id.as_str()), Some(&comment));
        Ok(Outcome::new(result, Response::Affected(count)))
    }

    // ---- bulk ----

    fn bulk_insert(&mut self, request: &Request) -> Outcome {
        let action = ActionType::Insert;
        if request.kind != ResourceKind::Bulk {
            return self.unknown_uri(request, request.id.as_deref());
        }
        let Some(content) = request.payload.as_deref() else {
            self.history.record(action, ActionResult::MissingContent, None, Some("bulk"));
            return rejected(ActionResult::MissingContent, request.operation);
        };
        let items: Vec<BulkItem> = match serde_json::from_str(content) {
            Ok(items) => items,
            Err(e) => {
                self.history
                    .record(action, ActionResult::ParseFailed, None, Some(&e.to_string()));
                return rejected(ActionResult::ParseFailed, request.operation);
            }
        };

        self.atomically(request, |this| {
            let comment = format!("Bulk insert: {}", items.len());
            this.history.record(action, ActionResult::Ok, None, Some(&comment));

            let mut applied = 0;
            for item in &items {
                if this.apply_bulk_item(item)? {
                    applied += 1;
                }
            }
            Ok(Outcome::new(ActionResult::Ok, Response::Affected(applied)))
        })
    }

    /// Applies one bulk element. Returns whether it was written.
    fn apply_bulk_item(&mut self, item: &BulkItem) -> Result<bool, StorageError> {
        let action = ActionType::Insert;
        let Some(content) = item.content.as_deref() else {
            self.history
                .record(action, ActionResult::MissingContent, None, Some(&item.kind));
            return Ok(false);
        };

        let decoded = match item.kind.as_str() {
            "album" => Album::from_json(content).map(Entity::Album),
            "artist" => Artist::from_json(content).map(Entity::Artist),
            other => {
                self.history
                    .record(action, ActionResult::UnknownType, None, Some(other));
                return Ok(false);
            }
        };
        match decoded {
            Ok(Entity::Album(album)) => self.upsert_bulk_album(album),
            Ok(Entity::Artist(artist)) => self.upsert_bulk_artist(artist),
            Err(e) => {
                let comment = format!("{}: {e}", item.kind);
                self.history
                    .record(action, ActionResult::ParseFailed, None, Some(&comment));
                Ok(false)
            }
        }
    }

    fn upsert_bulk_album(&mut self, album: Album) -> Result<bool, StorageError> {
        let previous = self.storage.get_album(&album.id)?;
        let applied = match &previous {
            Some(_) => {
                let rows = self.storage.update_album(&album)?;
                self.record_bulk_write(ActionType::Update, album.id.as_str(), rows > 0);
                rows > 0
            }
            None => {
                self.storage.insert_album(&album)?;
                let stored = self.storage.contains_album(&album.id)?;
                self.record_bulk_write(ActionType::Insert, album.id.as_str(), stored);
                stored
            }
        };
        if !applied {
            return Ok(false);
        }
        self.mark_changed(ResourceKind::Album);

        let previous_owner = previous
            .and_then(|p| p.artist_id)
            .filter(|old| album.artist_id.as_ref() != Some(old));
        if let Some(old) = previous_owner {
            self.relist_album(&old, &album.id, false)?;
        }
        if let Some(owner) = &album.artist_id {
            self.relist_album(owner, &album.id, true)?;
        }
        Ok(true)
    }

    fn upsert_bulk_artist(&mut self, mut artist: Artist) -> Result<bool, StorageError> {
        let applied = if self.storage.contains_artist(&artist.id)? {
            let rows = self.storage.update_artist(&artist)?;
            self.record_bulk_write(ActionType::Update, artist.id.as_str(), rows > 0);
            rows > 0
        } else {
            self.storage.insert_artist(&artist)?;
            let stored = self.storage.contains_artist(&artist.id)?;
            self.record_bulk_write(ActionType::Insert, artist.id.as_str(), stored);
            stored
        };
        if !applied {
            return Ok(false);
        }
        self.mark_changed(ResourceKind::Artist);

        // Albums stored earlier in the batch (or before it) that name this
        // artist as owner stay listed.
        let mut merged = false;
        for album in self.storage.get_artist_albums(&artist.id)? {
            merged |= artist.add_album_id(&album.id);
        }
        if merged {
            artist.touch(wall_now());
            let rows = self.storage.update_artist(&artist)?;
            self.record_artist_update(&artist, rows);
        }
        Ok(true)
    }

    /// Adds or removes `album_id` on an existing artist's list. An
    /// already-consistent list is left alone; a missing artist is audited.
    fn relist_album(&mut self, artist_id: &ArtistId, album_id: &AlbumId, add: bool) -> Result<(), StorageError> {
        let Some(mut artist) = self.storage.get_artist(artist_id)? else {
            let comment = format!("artist not stored, album {album_id} left unlisted");
            self.history.record(
                ActionType::Update,
                ActionResult::Failed,
                Some(artist_id.as_str()),
                Some(&comment),
            );
            return Ok(());
        };
        let changed = if add {
            artist.add_album_id(album_id)
        } else {
            artist.remove_album_id(album_id)
        };
        if changed {
            artist.touch(wall_now());
            let rows = self.storage.update_artist(&artist)?;
            self.record_artist_update(&artist, rows);
        }
        Ok(())
    }

    fn record_bulk_write(&mut self, action: ActionType, id: &str, applied: bool) {
        let result = if applied { ActionResult::Ok } else { ActionResult::Failed };
        self.history.record(action, result, Some(id), Some("bulk"));
    }

    fn record_artist_update(&mut self, artist: &Artist, rows: usize) {
        if rows > 0 {
            self.history
                .record(ActionType::Update, ActionResult::Ok, Some(artist.id.as_str()), None);
            self.mark_changed(ResourceKind::Artist);
        } else {
            self.history.record(
                ActionType::Update,
                ActionResult::Failed,
                Some(artist.id.as_str()),
                Some("artist row not updated"),
            );
        }
    }

    // ---- shared ----

    /// Missing and malformed ids are recorded and rejected.
    fn require_id<'r>(&mut self, action: ActionType, request: &'r Request) -> Result<&'r str, ActionResult> {
        let subject = request.kind.path();
        match request.id.as_deref() {
            None => {
                self.history.record(action, ActionResult::MissingId, None, Some(subject));
                Err(ActionResult::MissingId)
            }
            Some(id) if !is_valid_id(id) => {
                self.history
                    .record(action, ActionResult::UnknownId, Some(id), Some(subject));
                Err(ActionResult::UnknownId)
            }
            Some(id) => Ok(id),
        }
    }

    fn unknown_uri(&mut self, request: &Request, id: Option<&str>) -> Outcome {
        self.history.record(
            action_type(request.operation),
            ActionResult::UnknownUri,
            id,
            Some(request.kind.path()),
        );
        rejected(ActionResult::UnknownUri, request.operation)
    }

    fn mark_changed(&mut self, kind: ResourceKind) {
        if !self.changed.contains(&kind) {
            self.changed.push(kind);
        }
    }

    /// Runs `op`, turning a storage error into a recorded `Failed` outcome.
    fn guarded<F>(&mut self, request: &Request, op: F) -> Outcome
    where
        F: FnOnce(&mut Self) -> Result<Outcome, StorageError>,
    {
        let mark = self.history.pending().len();
        match op(self) {
            Ok(outcome) => outcome,
            Err(e) => self.fail(request, mark, &e),
        }
    }

    /// Like [`Self::guarded`], but inside a storage transaction. On error every
    /// write of `op` is rolled back and its audit records are replaced by a
    /// single `Failed` record.
    fn atomically<F>(&mut self, request: &Request, op: F) -> Outcome
    where
        F: FnOnce(&mut Self) -> Result<Outcome, StorageError>,
    {
        let mark = self.history.pending().len();
        let result = self.storage.begin().and_then(|()| op(self));
        let result = result.and_then(|outcome| self.storage.commit().map(|()| outcome));

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(rollback_err) = self.storage.rollback() {
                    warn!("rollback failed: {rollback_err}");
                }
                warn!(
                    "rolled back {:?} {}: {e}",
                    request.operation,
                    request.kind.path()
                );
                self.fail(request, mark, &e)
            }
        }
    }

    fn fail(&mut self, request: &Request, mark: usize, error: &StorageError) -> Outcome {
        self.history.rewind(mark);
        self.changed.clear();
        self.history.record(
            action_type(request.operation),
            ActionResult::Failed,
            request.id.as_deref(),
            Some(&error.to_string()),
        );
        rejected(ActionResult::Failed, request.operation)
    }
}

fn action_type(operation: Operation) -> ActionType {
    match operation {
        Operation::Query => ActionType::Query,
        Operation::Insert | Operation::BulkInsert => ActionType::Insert,
        Operation::Update => ActionType::Update,
        Operation::Delete => ActionType::Delete,
    }
}

fn rows(records: impl IntoIterator<Item = Record>) -> Outcome {
    Outcome::new(ActionResult::Ok, Response::Rows(records.into_iter().collect()))
}

/// An outcome carrying the empty response for `operation`.
fn rejected(result: ActionResult, operation: Operation) -> Outcome {
    let response = match operation {
        Operation::Query => Response::Rows(Vec::new()),
        Operation::Insert => Response::Created(None),
        Operation::Update | Operation::Delete | Operation::BulkInsert => Response::Affected(0),
    };
    Outcome::new(result, response)
}
