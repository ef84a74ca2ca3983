use std::fs;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use wgr_schemas::{DeficitRecord, Wager, WagerSide};
use wgr_store::*;

fn wager(team: &str, side: WagerSide) -> Wager {
    Wager {
        sport: "WNBA".to_string(),
        team: team.to_string(),
        side,
        risk: dec!(12.50),
        to_win: dec!(10),
        date: "2024-06-01".to_string(),
        game_id: Some("g1".to_string()),
        game_key: None,
        created_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()),
    }
}

#[test]
fn scenario_typed_records_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = LedgerStore::new(Arc::new(JsonFileStore::open(dir.path()).unwrap()));
        store
            .append_pending(&[wager("Aces", WagerSide::Fav), wager("Sky", WagerSide::Dog)])
            .unwrap();
    }

    let store = LedgerStore::new(Arc::new(JsonFileStore::open(dir.path()).unwrap()));
    let pending = store.pending().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].team, "Aces");
    assert_eq!(pending[1].risk, dec!(12.50));

    let raw = fs::read_to_string(dir.path().join("pendingWagers.json")).unwrap();
    assert!(raw.contains("\"toWin\""));
    assert!(raw.contains("\"gameId\": \"g1\""));
}

#[test]
fn scenario_legacy_file_with_string_amounts_loads() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("deficits.json"),
        r#"[{"team":"Sky","type":"Dog","risk":"8","toWin":"10","deficit":"8","sport":"WNBA","date":"2024-06-01"}]"#,
    )
    .unwrap();

    let store = LedgerStore::new(Arc::new(JsonFileStore::open(dir.path()).unwrap()));
    let deficits: Vec<DeficitRecord> = store.deficits().unwrap();
    assert_eq!(deficits[0].deficit, dec!(8));
    assert!(deficits[0].settled_at.is_none());
}

#[test]
fn scenario_undecodable_record_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("pendingWagers.json"), r#"[{"team":"x"}]"#).unwrap();

    let store = LedgerStore::new(Arc::new(JsonFileStore::open(dir.path()).unwrap()));
    match store.pending().unwrap_err() {
        StoreError::Corrupt { collection, detail } => {
            assert_eq!(collection, Collection::PendingWagers);
            assert!(detail.starts_with("record 0"));
        }
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn scenario_memory_store_injected_failure() {
    let mem = Arc::new(MemoryStore::new());
    let store = LedgerStore::new(mem.clone());
    mem.fail_writes_to(Collection::Deficits);

    store.append_pending(&[wager("Aces", WagerSide::Fav)]).unwrap();
    let err = store.replace_deficits(&[]).unwrap_err();
    assert_eq!(err.kind(), "store_io");

    mem.heal();
    store.replace_deficits(&[]).unwrap();
    assert_eq!(store.pending().unwrap().len(), 1);
}
