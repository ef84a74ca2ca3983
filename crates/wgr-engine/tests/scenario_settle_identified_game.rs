use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use wgr_engine::*;
use wgr_schemas::{EntryType, WagerDraft, WagerSide};

fn draft(team: &str, side: WagerSide, risk: rust_decimal::Decimal, to_win: rust_decimal::Decimal) -> WagerDraft {
    WagerDraft {
        sport: Some("NFL".to_string()),
        team: Some(team.to_string()),
        side: Some(side),
        risk: Some(risk),
        to_win: Some(to_win),
        date: Some("2024-01-01".to_string()),
        game_key: None,
    }
}

#[test]
fn scenario_submit_then_settle_moves_both_sides() {
    let submitted_at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let settled_at = Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();

    let submission = GameSubmission {
        fav_wager: Some(draft("Fav", WagerSide::Fav, dec!(10), dec!(8))),
        dog_wager: Some(draft("Dog", WagerSide::Dog, dec!(8), dec!(10))),
    };
    let pending = build_game(&submission, "g1", submitted_at).unwrap().to_vec();
    assert_eq!(group(&pending).len(), 1);

    let req = SettleRequest {
        winner: WinnerRef {
            team: Some("Fav".to_string()),
        },
        game_id: Some("g1".to_string()),
        ..Default::default()
    };
    let criteria = GameCriteria::resolve(&req).unwrap();
    let matched = match_game(&pending, &criteria).unwrap();
    let plan = settle(&matched, "Fav", settled_at).unwrap();

    assert_eq!(plan.settled.len(), plan.matched());
    assert_eq!(plan.settled[0].team, "Fav");
    assert_eq!(plan.settled[0].amount, Some(dec!(8)));
    assert_eq!(plan.settled[0].entry_type, EntryType::Win);
    assert_eq!(plan.settled[1].team, "Dog");
    assert_eq!(plan.settled[1].amount, Some(dec!(-8)));
    assert_eq!(plan.settled[1].entry_type, EntryType::Loss);

    assert_eq!(plan.deficits.len(), 1);
    assert_eq!(plan.deficits[0].team, "Dog");
    assert_eq!(plan.deficits[0].deficit, dec!(8));

    let remaining = apply_removal(&pending, &plan.removal, plan.matched()).unwrap();
    assert!(remaining.is_empty());

    // Second settlement of the same identified game finds nothing.
    let again = match_game(&remaining, &criteria).unwrap_err();
    assert_eq!(again.kind(), "not_found");
}

#[test]
fn scenario_settlement_removes_only_the_matched_game() {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let mk = |id: &str, fav: &str, dog: &str| {
        build_game(
            &GameSubmission {
                fav_wager: Some(draft(fav, WagerSide::Fav, dec!(10), dec!(8))),
                dog_wager: Some(draft(dog, WagerSide::Dog, dec!(8), dec!(10))),
            },
            id,
            at,
        )
        .unwrap()
    };
    let mut pending = Vec::new();
    pending.extend(mk("g1", "A", "B"));
    pending.extend(mk("g2", "C", "D"));

    let matched = match_game(&pending, &GameCriteria::ById("g2".to_string())).unwrap();
    let plan = settle(&matched, "D", at).unwrap();
    assert_eq!(plan.deficits[0].team, "C");
    assert_eq!(plan.deficits[0].deficit, dec!(10));

    let remaining = apply_removal(&pending, &plan.removal, plan.matched()).unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|w| w.game_id() == Some("g1")));
}
