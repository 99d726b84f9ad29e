use kts_core::{ActionResult, ActionType, Album, Artist};
use kts_engine::{BulkItem, Operation, Request, ResourceKind};
use kts_harness::{TestProvider, assert_linked};
use kts_storage::Storage;

fn album_item(album: &Album) -> Result<BulkItem, Box<dyn std::error::Error>> {
    Ok(BulkItem::new("album", album.to_json()?))
}

fn artist_item(artist: &Artist) -> Result<BulkItem, Box<dyn std::error::Error>> {
    Ok(BulkItem::new("artist", artist.to_json()?))
}

#[test]
fn bulk_artist_and_album_apply_once() -> Result<(), Box<dyn std::error::Error>> {
    let mut kts = TestProvider::new()?;
    let mut a = Artist::new("A");
    let b = Album::new_for_artist("B", &mut a);

    let outcome = kts.resolve(Request::bulk_insert(&[artist_item(&a)?, album_item(&b)?])?);
    assert!(outcome.is_ok());
    assert_eq!(outcome.affected(), 2);

    let stored_a = kts.artist(&a.id)?.ok_or("artist missing")?;
    assert_eq!(stored_a.album_ids, vec![b.id.clone()]);
    let stored_b = kts.album(&b.id)?.ok_or("album missing")?;
    assert_eq!(stored_b.artist_id, Some(a.id.clone()));

    let history = kts.history()?;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].comments.as_deref(), Some("Bulk insert: 2"));
    assert!(history.iter().all(|s| s.action_type == ActionType::Insert && s.action_result.is_ok()));

    let events = kts.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kinds, vec![ResourceKind::Artist, ResourceKind::Album]);
    Ok(())
}

#[test]
fn bulk_album_is_listed_on_existing_artist() -> Result<(), Box<dyn std::error::Error>> {
    let kts = TestProvider::new()?;
    let a = Artist::new("A");
    let mut b = Album::new("B");
    b.artist_id = Some(a.id.clone());

    let outcome = kts.resolve(Request::bulk_insert(&[artist_item(&a)?, album_item(&b)?])?);
    assert_eq!(outcome.affected(), 2);

    assert_eq!(kts.artist(&a.id)?.ok_or("artist missing")?.album_ids, vec![b.id.clone()]);
    assert_eq!(
        kts.history_tags()?.last(),
        Some(&(ActionType::Update, ActionResult::Ok))
    );
    Ok(())
}

#[test]
fn bulk_artist_after_its_album_lists_it() -> Result<(), Box<dyn std::error::Error>> {
    let mut kts = TestProvider::new()?;
    let a = Artist::new("A");
    let mut b = Album::new("B");
    b.artist_id = Some(a.id.clone());

    let outcome = kts.resolve(Request::bulk_insert(&[album_item(&b)?, artist_item(&a)?])?);
    assert_eq!(outcome.affected(), 2);

    assert_eq!(kts.artist(&a.id)?.ok_or("artist missing")?.album_ids, vec![b.id.clone()]);
    assert_eq!(kts.album(&b.id)?.ok_or("album missing")?.artist_id, Some(a.id.clone()));
    kts.storage(|s| assert_linked(s))?;

    assert_eq!(
        kts.history_tags()?,
        vec![
            (ActionType::Insert, ActionResult::Ok),
            (ActionType::Insert, ActionResult::Ok),
            (ActionType::Update, ActionResult::Failed),
            (ActionType::Insert, ActionResult::Ok),
            (ActionType::Update, ActionResult::Ok),
        ]
    );
    assert_eq!(kts.history()?[2].item_id.as_deref(), Some(a.id.as_str()));
    assert_eq!(kts.drain_events().len(), 1);
    Ok(())
}

#[test]
fn bulk_album_for_unknown_artist_is_stored_unlisted() -> Result<(), Box<dyn std::error::Error>> {
    let kts = TestProvider::new()?;
    let mut absent = Artist::new("never stored");
    let b = Album::new_for_artist("B", &mut absent);

    let outcome = kts.resolve(Request::bulk_insert(&[album_item(&b)?])?);
    assert_eq!(outcome.affected(), 1);
    assert!(kts.album(&b.id)?.is_some());
    assert_eq!(kts.storage(|s| s.counts())?.artists, 0);
    let skipped = kts.last_history()?.ok_or("no audit record")?;
    assert_eq!((skipped.action_type, skipped.action_result), (ActionType::Update, ActionResult::Failed));
    assert_eq!(skipped.item_id.as_deref(), Some(absent.id.as_str()));
    Ok(())
}

#[test]
fn bulk_reports_bad_items_and_applies_the_rest() -> Result<(), Box<dyn std::error::Error>> {
    let kts = TestProvider::new()?;
    let artist = Artist::new("good");
    let items = [
        BulkItem::new("song", "{}"),
        BulkItem::new("album", "{bad"),
        BulkItem {
            kind: "artist".into(),
            content: None,
        },
        artist_item(&artist)?,
    ];

    let outcome = kts.resolve(Request::bulk_insert(&items)?);
    assert!(outcome.is_ok());
    assert_eq!(outcome.affected(), 1);
    assert_eq!(
        kts.history_tags()?,
        vec![
            (ActionType::Insert, ActionResult::Ok),
            (ActionType::Insert, ActionResult::UnknownType),
            (ActionType::Insert, ActionResult::ParseFailed),
            (ActionType::Insert, ActionResult::MissingContent),
            (ActionType::Insert, ActionResult::Ok),
        ]
    );
    assert_eq!(kts.history()?[1].comments.as_deref(), Some("song"));
    assert!(kts.artist(&artist.id)?.is_some());
    Ok(())
}

#[test]
fn bulk_updates_existing_rows() -> Result<(), Box<dyn std::error::Error>> {
    let kts = TestProvider::new()?;
    let (artist, albums) = kts.seed_artist("A", &["x"])?;

    let mut renamed = albums[0].clone();
    renamed.name = "x (remastered)".into();
    let outcome = kts.resolve(Request::bulk_insert(&[album_item(&renamed)?])?);
    assert_eq!(outcome.affected(), 1);

    assert_eq!(kts.album(&renamed.id)?.ok_or("album missing")?.name, "x (remastered)");
    assert_eq!(kts.storage(|s| s.counts())?.albums, 1);
    assert_eq!(kts.artist(&artist.id)?.ok_or("artist missing")?.album_ids, artist.album_ids);
    assert_eq!(
        kts.history_tags()?,
        vec![
            (ActionType::Insert, ActionResult::Ok),
            (ActionType::Update, ActionResult::Ok),
        ]
    );
    Ok(())
}

#[test]
fn bulk_moves_album_between_artists() -> Result<(), Box<dyn std::error::Error>> {
    let kts = TestProvider::new()?;
    let (from, albums) = kts.seed_artist("From", &["x"])?;
    let (to, _) = kts.seed_artist("To", &[])?;

    let mut moved = albums[0].clone();
    moved.artist_id = Some(to.id.clone());
    let outcome = kts.resolve(Request::bulk_insert(&[album_item(&moved)?])?);
    assert_eq!(outcome.affected(), 1);

    assert!(kts.artist(&from.id)?.ok_or("artist missing")?.album_ids.is_empty());
    assert_eq!(kts.artist(&to.id)?.ok_or("artist missing")?.album_ids, vec![moved.id.clone()]);

    let history = kts.history()?;
    let updated: Vec<_> = history[2..].iter().map(|s| s.item_id.clone()).collect();
    assert_eq!(updated, vec![Some(from.id.to_string()), Some(to.id.to_string())]);
    Ok(())
}

#[test]
fn bulk_rejects_undecodable_payloads() -> Result<(), Box<dyn std::error::Error>> {
    let mut kts = TestProvider::new()?;

    let garbage = kts.resolve(Request::new(Operation::BulkInsert, ResourceKind::Bulk).with_payload("not json"));
    assert_eq!(garbage.result, ActionResult::ParseFailed);
    assert_eq!(garbage.affected(), 0);

    let missing = kts.resolve(Request::new(Operation::BulkInsert, ResourceKind::Bulk));
    assert_eq!(missing.result, ActionResult::MissingContent);

    let wrong_path = kts.resolve(Request::new(Operation::BulkInsert, ResourceKind::Album).with_payload("[]"));
    assert_eq!(wrong_path.result, ActionResult::UnknownUri);

    assert_eq!(
        kts.history_tags()?,
        vec![
            (ActionType::Insert, ActionResult::ParseFailed),
            (ActionType::Insert, ActionResult::MissingContent),
            (ActionType::Insert, ActionResult::UnknownUri),
        ]
    );
    assert!(kts.drain_events().is_empty());
    Ok(())
}

#[test]
fn empty_bulk_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut kts = TestProvider::new()?;

    let outcome = kts.resolve(Request::bulk_insert(&[])?);
    assert!(outcome.is_ok());
    assert_eq!(outcome.affected(), 0);
    assert_eq!(
        kts.last_history()?.and_then(|s| s.comments),
        Some("Bulk insert: 0".to_string())
    );
    assert!(kts.drain_events().is_empty());
    Ok(())
}

#[test]
fn bulk_payload_accepts_plain_json() -> Result<(), Box<dyn std::error::Error>> {
    let kts = TestProvider::new()?;
    let artist = Artist::new("json");
    let payload = serde_json::json!([
        { "type": "artist", "content": artist.to_json()? }
    ])
    .to_string();

    let outcome = kts.resolve(Request::new(Operation::BulkInsert, ResourceKind::Bulk).with_payload(payload));
    assert_eq!(outcome.affected(), 1);
    Ok(())
}
