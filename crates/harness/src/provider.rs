use kts_core::{ActionResult, ActionType, Album, AlbumId, Artist, ArtistId, HistoryStamp};
use kts_engine::{ChangeEvent, EngineError, Outcome, Provider, ProviderConfig, Request, Resolver};
use kts_storage::{SqliteStorage, Storage, StorageError};
use tokio::sync::broadcast;

use crate::observer::drain;

/// A provider over an in-memory store with one observer attached.
pub struct TestProvider {
    pub provider: Provider<SqliteStorage>,
    events: broadcast::Receiver<ChangeEvent>,
}

impl TestProvider {
    pub fn new() -> Result<Self, EngineError> {
        Self::with_config(&ProviderConfig::default())
    }

    pub fn strict() -> Result<Self, EngineError> {
        Self::with_config(&ProviderConfig {
            artist_albums_strict: true,
            ..ProviderConfig::default()
        })
    }

    pub fn with_config(config: &ProviderConfig) -> Result<Self, EngineError> {
        Ok(Self::from_resolver(Resolver::new(config.open_storage()?, config)))
    }

    pub fn from_resolver(resolver: Resolver<SqliteStorage>) -> Self {
        let provider = Provider::new(resolver);
        let events = provider.subscribe();
        Self { provider, events }
    }

    pub fn resolve(&self, request: Request) -> Outcome {
        self.provider.resolve(request)
    }

    pub fn storage<T>(&self, f: impl FnOnce(&mut SqliteStorage) -> T) -> T {
        self.provider.with_resolver(|resolver| f(resolver.storage_mut()))
    }

    /// Writes an artist and its albums directly, linked both ways, without
    /// going through the resolver.
    pub fn seed_artist(&self, name: &str, album_names: &[&str]) -> Result<(Artist, Vec<Album>), StorageError> {
        let mut artist = Artist::new(name);
        let albums: Vec<Album> = album_names
            .iter()
            .map(|album| Album::new_for_artist(*album, &mut artist))
            .collect();
        self.storage(|storage| {
            storage.insert_artist(&artist)?;
            storage.insert_albums(&albums)?;
            Ok::<_, StorageError>(())
        })?;
        Ok((artist, albums))
    }

    pub fn artist(&self, id: &ArtistId) -> Result<Option<Artist>, StorageError> {
        self.storage(|storage| storage.get_artist(id))
    }

    pub fn album(&self, id: &AlbumId) -> Result<Option<Album>, StorageError> {
        self.storage(|storage| storage.get_album(id))
    }

    pub fn history(&self) -> Result<Vec<HistoryStamp>, StorageError> {
        self.storage(|storage| storage.get_history())
    }

    /// `(action, result)` of every audit row, oldest first.
    pub fn history_tags(&self) -> Result<Vec<(ActionType, ActionResult)>, StorageError> {
        Ok(self
            .history()?
            .into_iter()
            .map(|stamp| (stamp.action_type, stamp.action_result))
            .collect())
    }

    pub fn last_history(&self) -> Result<Option<HistoryStamp>, StorageError> {
        Ok(self.history()?.pop())
    }

    pub fn history_len(&self) -> Result<usize, StorageError> {
        Ok(self.storage(|storage| storage.counts())?.history)
    }

    /// Change events received since the last drain.
    pub fn drain_events(&mut self) -> Vec<ChangeEvent> {
        drain(&mut self.events)
    }
}
