//! `wgr ledger ...` handlers.

use anyhow::Result;
use wgr_engine::{SettleRequest, WinnerRef};
use wgr_runtime::LedgerRuntime;

pub fn summary(ledger: &LedgerRuntime) -> Result<()> {
    let s = ledger.summary()?;
    println!("pending_games={}", s.pending_games);
    println!("pending_records={}", s.pending_records);
    println!("orphans={}", s.orphans);
    println!("settled_entries={}", s.settled_entries);
    println!("deficit_count={}", s.deficit_count);
    println!("total_deficit={}", s.total_deficit);
    println!("rolling_window_hours={}", s.rolling.window_hours);
    println!("rolling_net={}", s.rolling.net);
    Ok(())
}

pub fn cleanup_orphans(ledger: &LedgerRuntime, yes: bool) -> Result<()> {
    if !yes {
        let view = ledger.list_pending()?;
        println!("dry_run=true orphans={}", view.orphan_count);
        if view.orphan_count > 0 {
            println!("re-run with `wgr ledger cleanup-orphans --yes` to remove them");
        }
        return Ok(());
    }

    let out = ledger.cleanup_orphans()?;
    println!("removed={}", out.removed);
    Ok(())
}

pub fn settle(ledger: &LedgerRuntime, game_id: &str, winner: &str) -> Result<()> {
    let out = ledger.settle(&SettleRequest {
        winner: WinnerRef {
            team: Some(winner.to_string()),
        },
        game_id: Some(game_id.to_string()),
        ..Default::default()
    })?;
    println!(
        "settled=true matched_by={} winners={} losers={}",
        out.matched_by, out.winners, out.losers
    );
    for d in &out.deficits {
        println!("deficit team={} amount={}", d.team, d.deficit);
    }
    Ok(())
}
