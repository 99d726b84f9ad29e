use kts_core::{ActionResult, ActionType};
use kts_engine::{ProviderConfig, Request, ResourceKind};
use kts_harness::TestProvider;

#[test]
fn store_and_audit_trail_survive_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = ProviderConfig {
        database_path: Some(dir.path().join("kts.db")),
        ..ProviderConfig::default()
    };

    let (artist, albums) = {
        let kts = TestProvider::with_config(&config)?;
        let seeded = kts.seed_artist("A", &["x", "y"])?;
        let outcome = kts.resolve(Request::delete(ResourceKind::Album).with_id(seeded.1[0].id.as_str()));
        assert!(outcome.is_ok());
        seeded
    };

    let kts = TestProvider::with_config(&config)?;
    let stored = kts.artist(&artist.id)?.ok_or("artist not persisted")?;
    assert_eq!(stored.album_ids, vec![albums[1].id.clone()]);
    assert!(kts.album(&albums[0].id)?.is_none());

    let before = kts.history()?;
    assert_eq!(before.len(), 2);

    kts.resolve(Request::query(ResourceKind::Albums));
    let after = kts.history()?;
    assert_eq!(after.len(), 3);
    assert!(after[2].timestamp > before[1].timestamp);
    assert_eq!(
        (after[2].action_type, after[2].action_result),
        (ActionType::Query, ActionResult::Ok)
    );
    Ok(())
}

#[test]
fn timestamps_are_unique_under_bursts() -> Result<(), Box<dyn std::error::Error>> {
    let kts = TestProvider::new()?;
    for _ in 0..200 {
        kts.resolve(Request::query(ResourceKind::Status));
    }
    let history = kts.history()?;
    assert_eq!(history.len(), 200);
    assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    Ok(())
}
