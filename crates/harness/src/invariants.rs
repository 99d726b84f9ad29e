use std::collections::HashSet;
use std::error::Error;

use kts_storage::Storage;

/// Both directions of the artist/album relation agree: every album's owner
/// lists it exactly once, and every listed id names an album owned back.
pub fn assert_linked(storage: &impl Storage) -> Result<(), Box<dyn Error>> {
    let artists = storage.get_all_artists()?;
    let albums = storage.get_all_albums()?;

    for album in &albums {
        let owner = album.artist_id.as_ref().ok_or("album without artist")?;
        let artist = artists
            .iter()
            .find(|a| &a.id == owner)
            .ok_or("album points at missing artist")?;
        assert!(artist.lists_album(&album.id), "{} not listed by {}", album.id, artist.id);
    }
    for artist in &artists {
        let unique: HashSet<_> = artist.album_ids.iter().collect();
        assert_eq!(unique.len(), artist.album_ids.len(), "{} lists an album twice", artist.id);
        for id in &artist.album_ids {
            let album = albums.iter().find(|a| &a.id == id).ok_or("listed album missing")?;
            assert_eq!(album.artist_id.as_ref(), Some(&artist.id));
        }
    }
    Ok(())
}
