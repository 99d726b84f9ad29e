use std::thread;

use kts_core::{ActionResult, Album, Artist, CoreError};
use kts_engine::{BulkItem, Request, ResourceKind};
use kts_harness::{TestProvider, assert_linked};
use kts_storage::Storage;

const ALBUMS_PER_BULK: usize = 5;

type WorkerResult = Result<Vec<(ActionResult, usize)>, CoreError>;

// ============================================================================
// Shared handles across threads
// ============================================================================

#[test]
fn cloned_handles_keep_relation_and_audit_consistent() -> Result<(), Box<dyn std::error::Error>> {
    let mut kts = TestProvider::new()?;

    let mut doomed = Vec::new();
    for n in 0..4 {
        doomed.push(kts.seed_artist(&format!("doomed {n}"), &["x", "y", "z"])?.0);
    }
    let mut keepers = Vec::new();
    for n in 0..4 {
        keepers.push(kts.seed_artist(&format!("keeper {n}"), &[])?.0);
    }

    let mut workers = Vec::new();
    for artist in &doomed {
        let provider = kts.provider.clone();
        let request = Request::delete(ResourceKind::Artist).with_id(artist.id.as_str());
        workers.push(thread::spawn(move || -> WorkerResult {
            let outcome = provider.resolve(request);
            Ok(vec![(outcome.result, outcome.affected())])
        }));
    }
    for artist in &keepers {
        let provider = kts.provider.clone();
        let owner = artist.id.clone();
        workers.push(thread::spawn(move || -> WorkerResult {
            let mut outcomes = Vec::new();
            for n in 0..ALBUMS_PER_BULK {
                let mut album = Album::new(format!("{owner} #{n}"));
                album.artist_id = Some(owner.clone());
                let request = Request::bulk_insert(&[BulkItem::new("album", album.to_json()?)])?;
                let outcome = provider.resolve(request);
                outcomes.push((outcome.result, outcome.affected()));
            }
            Ok(outcomes)
        }));
    }

    for worker in workers {
        let outcomes = worker.join().map_err(|_| "worker panicked")??;
        for (result, affected) in outcomes {
            assert_eq!(result, ActionResult::Ok);
            assert!(affected > 0);
        }
    }

    kts.storage(|s| assert_linked(s))?;
    let counts = kts.storage(|s| s.counts())?;
    assert_eq!(counts.artists, keepers.len());
    assert_eq!(counts.albums, keepers.len() * ALBUMS_PER_BULK);
    for artist in &keepers {
        let stored = kts.artist(&artist.id)?.ok_or("keeper missing")?;
        assert_eq!(stored.album_ids.len(), ALBUMS_PER_BULK);
    }

    // Each cascade writes one record per album plus the aggregate; each bulk
    // writes its summary, the album insert and the owner's list update.
    let history = kts.history()?;
    assert_eq!(history.len(), doomed.len() * 4 + keepers.len() * ALBUMS_PER_BULK * 3);
    assert!(
        history.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
        "history timestamps repeat"
    );

    assert_eq!(kts.drain_events().len(), doomed.len() + keepers.len() * ALBUMS_PER_BULK);
    Ok(())
}

#[test]
fn bulk_artists_from_many_threads_all_land() -> Result<(), Box<dyn std::error::Error>> {
    let kts = TestProvider::new()?;

    let workers: Vec<_> = (0..8)
        .map(|n| {
            let provider = kts.provider.clone();
            thread::spawn(move || -> WorkerResult {
                let mut artist = Artist::new(format!("artist {n}"));
                let album = Album::new_for_artist("only", &mut artist);
                let items = [
                    BulkItem::new("album", album.to_json()?),
                    BulkItem::new("artist", artist.to_json()?),
                ];
                let outcome = provider.resolve(Request::bulk_insert(&items)?);
                Ok(vec![(outcome.result, outcome.affected())])
            })
        })
        .collect();

    for worker in workers {
        for (result, affected) in worker.join().map_err(|_| "worker panicked")?? {
            assert_eq!(result, ActionResult::Ok);
            assert_eq!(affected, 2);
        }
    }

    kts.storage(|s| assert_linked(s))?;
    assert_eq!(kts.storage(|s| s.counts())?.artists, 8);
    Ok(())
}
