//! Synthetic data generator.
//!
//! Writes go straight to storage through the linking constructors, bypassing
//! the resolver and its audit trail. Each tick is one transaction.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use kts_core::clock::wall_now;
use kts_core::{Album, AlbumId, Artist, ArtistId};
use kts_storage::Storage;

use crate::config::GeneratorConfig;
use crate::error::EngineError;
use crate::request::ResourceKind;

/// Upper bound (exclusive) of the numbers in generated names.
const NAME_RANGE: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    pub new_artists: bool,
    pub new_albums: bool,
    pub shuffle_albums: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            new_artists: true,
            new_albums: true,
            shuffle_albums: true,
        }
    }
}

impl From<&GeneratorConfig> for GeneratorOptions {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            new_artists: config.new_artists,
            new_albums: config.new_albums,
            shuffle_albums: config.shuffle_albums,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumMove {
    pub album: AlbumId,
    pub from: ArtistId,
    pub to: ArtistId,
    pub created_album: bool,
    pub created_artist: bool,
}

/// What one tick wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub new_artist: Option<ArtistId>,
    pub new_album: Option<AlbumId>,
    pub moved: Option<AlbumMove>,
}

impl TickReport {
    pub fn changed(&self) -> bool {
        self.new_artist.is_some() || self.new_album.is_some() || self.moved.is_some()
    }

    pub fn kinds(&self) -> Vec<ResourceKind> {
        let mut kinds = Vec::new();
        if self.new_artist.is_some() || self.new_album.is_some() || self.moved.is_some() {
            kinds.push(ResourceKind::Artist);
        }
        if self.new_album.is_some() || self.moved.is_some() {
            kinds.push(ResourceKind::Album);
        }
        kinds
    }
}

/// Empties the store and writes one artist owning three albums.
pub fn seed<S: Storage + ?Sized>(storage: &mut S) -> Result<Artist, EngineError> {
    storage.clear_all()?;

    let mut artist = Artist::new("artist 1");
    let albums: Vec<Album> = ["ab1", "ab2", "ab3"]
        .into_iter()
        .map(|name| Album::new_for_artist(name, &mut artist))
        .collect();

    storage.insert_artist(&artist)?;
    storage.insert_albums(&albums)?;
    info!("seeded artist {} with {} albums", artist.id, albums.len());
    Ok(artist)
}

pub fn tick<S, R>(storage: &mut S, options: GeneratorOptions, rng: &mut R) -> Result<TickReport, EngineError>
where
    S: Storage + ?Sized,
    R: Rng + ?Sized,
{
    storage.begin()?;
    match run_tick(storage, options, rng) {
        Ok(report) => {
            storage.commit()?;
            debug!("generator tick: {report:?}");
            Ok(report)
        }
        Err(e) => {
            let _ = storage.rollback();
            Err(e)
        }
    }
}

fn run_tick<S, R>(storage: &mut S, options: GeneratorOptions, rng: &mut R) -> Result<TickReport, EngineError>
where
    S: Storage + ?Sized,
    R: Rng + ?Sized,
{
    let mut report = TickReport::default();

    if options.new_artists {
        let artist = Artist::new(format!("Artist #{}", rng.gen_range(0..NAME_RANGE)));
        storage.insert_artist(&artist)?;
        report.new_artist = Some(artist.id);
    }

    if options.new_albums {
        let artists = storage.get_all_artists()?;
        if let Some(artist) = artists.choose(rng) {
            let mut artist = artist.clone();
            let album = Album::new_for_artist(format!("Album #{}", rng.gen_range(0..NAME_RANGE)), &mut artist);
            artist.touch(album.updated_at);
            storage.insert_album(&album)?;
            storage.update_artist(&artist)?;
            report.new_album = Some(album.id);
        }
    }

    if options.shuffle_albums {
        report.moved = shuffle(storage, rng)?;
    }

    Ok(report)
}

/// Moves a random album of a random artist to a different artist, creating
/// the album or the receiving artist when there is none to pick.
fn shuffle<S, R>(storage: &mut S, rng: &mut R) -> Result<Option<AlbumMove>, EngineError>
where
    S: Storage + ?Sized,
    R: Rng + ?Sized,
{
    let mut artists = storage.get_all_artists()?;
    if artists.is_empty() {
        return Ok(None);
    }
    let mut from = artists.swap_remove(rng.gen_range(0..artists.len()));

    let chosen = from.album_ids.choose(rng).cloned();
    let stored = match &chosen {
        Some(id) => storage.get_album(id)?,
        None => None,
    };
    let (mut album, created_album) = match stored {
        Some(album) => (album, false),
        None => {
            // Nothing to move, or the listed id dangles; drop it and start fresh.
            if let Some(dangling) = &chosen {
                from.remove_album_id(dangling);
            }
            let album = Album::new_for_artist(format!("Album #{}", rng.gen_range(0..NAME_RANGE)), &mut from);
            (album, true)
        }
    };

    let (mut to, created_artist) = match artists.choose(rng) {
        Some(artist) => (artist.clone(), false),
        None => (Artist::new(format!("Artist #{}", rng.gen_range(0..NAME_RANGE))), true),
    };

    let now = wall_now();
    from.remove_album_id(&album.id);
    album.artist_id = Some(to.id.clone());
    to.add_album_id(&album.id);
    from.touch(now);
    album.touch(now);
    to.touch(now);

    storage.update_artist(&from)?;
    if created_album {
        storage.insert_album(&album)?;
    } else {
        storage.update_album(&album)?;
    }
    if created_artist {
        storage.insert_artist(&to)?;
    } else {
        storage.update_artist(&to)?;
    }

    Ok(Some(AlbumMove {
        album: album.id,
        from: from.id,
        to: to.id,
        created_album,
        created_artist,
    }))
}
