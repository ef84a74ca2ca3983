//! Settlement and cancellation resolvers.
//!
//! Both produce a plan: every derived record is computed here, before the
//! writer touches any collection.

use chrono::{DateTime, Duration, Utc};
use wgr_schemas::{DeficitRecord, EntryType, SettledEntry, Wager};

use crate::error::LedgerError;
use crate::matcher::MatchedGame;
use crate::types::{CancelRequest, CancellationPlan, PendingRemoval, SettlementPlan};

/// Split a matched game by the reported winner and derive the ledger records.
///
/// `settled_at` stamps every entry; the n-th loser's deficit is stamped
/// `settled_at + n µs` so deficit identities stay distinct.
pub fn settle(
    game: &MatchedGame,
    winning_team: &str,
    settled_at: DateTime<Utc>,
) -> Result<SettlementPlan, LedgerError> {
    let winner = winning_team.trim();
    if winner.is_empty() {
        return Err(LedgerError::missing("winner.team"));
    }

    let (winners, losers): (Vec<&Wager>, Vec<&Wager>) = game
        .records
        .iter()
        .map(|r| &r.wager)
        .partition(|w| w.team_trimmed() == winner);

    if winners.is_empty() || losers.is_empty() {
        return Err(LedgerError::Partition {
            winner: winner.to_string(),
            matched: game.records.len(),
            winners: winners.len(),
        });
    }

    let mut settled = Vec::with_capacity(game.records.len());
    for w in &winners {
        settled.push(SettledEntry::from_wager(w, EntryType::Win, w.to_win, settled_at));
    }
    let mut deficits = Vec::with_capacity(losers.len());
    for (n, w) in losers.iter().enumerate() {
        settled.push(SettledEntry::from_wager(
            w,
            EntryType::Loss,
            -w.risk.abs(),
            settled_at,
        ));
        deficits.push(deficit_from(w, w.risk, false, stamp(settled_at, n)));
    }

    Ok(SettlementPlan {
        settled,
        deficits,
        removal: game.removal(),
        winners: winners.len(),
        losers: losers.len(),
    })
}

/// Remove a settled game from a pending snapshot.
///
/// `expected` is the matched record count; a removal that would drop a
/// different number of records means the snapshot moved underneath the plan.
pub fn apply_removal(
    pending: &[Wager],
    removal: &PendingRemoval,
    expected: usize,
) -> Result<Vec<Wager>, LedgerError> {
    let kept: Vec<Wager> = match removal {
        PendingRemoval::GameId(id) => pending
            .iter()
            .filter(|w| w.game_id() != Some(id.as_str()))
            .cloned()
            .collect(),
        PendingRemoval::GameKey(key) => pending
            .iter()
            .filter(|w| w.game_key() != Some(key.as_str()))
            .cloned()
            .collect(),
        PendingRemoval::Indices(indices) => {
            if let Some(bad) = indices.iter().find(|&&i| i >= pending.len()) {
                return Err(LedgerError::not_found(format!("pending record at index {bad}")));
            }
            pending
                .iter()
                .enumerate()
                .filter(|(i, _)| !indices.contains(i))
                .map(|(_, w)| w.clone())
                .collect()
        }
    };

    let removed = pending.len() - kept.len();
    if removed != expected {
        return Err(LedgerError::not_found(format!(
            "game in current snapshot (expected {expected} records, found {removed})"
        )));
    }
    Ok(kept)
}

/// Locate the single pending side a cancellation refers to and derive its
/// deficit, which credits `toWin` rather than `risk`.
pub fn cancel(
    pending: &[Wager],
    req: &CancelRequest,
    settled_at: DateTime<Utc>,
) -> Result<CancellationPlan, LedgerError> {
    let team = non_blank(req.team.as_deref()).ok_or_else(|| LedgerError::missing("team"))?;

    let found = if let Some(id) = non_blank(req.game_id.as_deref()) {
        find_first(pending, |w| w.game_id() == Some(id) && w.team_trimmed() == team)
    } else if let Some(key) = non_blank(req.game_key.as_deref()) {
        find_first(pending, |w| w.game_key() == Some(key) && w.team_trimmed() == team)
    } else {
        let sport = non_blank(req.sport.as_deref()).ok_or_else(|| LedgerError::missing("sport"))?;
        let date = non_blank(req.date.as_deref()).ok_or_else(|| LedgerError::missing("date"))?;
        find_first(pending, |w| {
            w.sport == sport && w.date == date && w.team_trimmed() == team
        })
    };

    let (index, wager) = found.ok_or_else(|| {
        LedgerError::not_found(format!("pending wager for team '{team}'"))
    })?;

    Ok(CancellationPlan {
        index,
        deficit: deficit_from(wager, wager.to_win, true, settled_at),
    })
}

fn deficit_from(
    w: &Wager,
    amount: rust_decimal::Decimal,
    cancellation_credit: bool,
    settled_at: DateTime<Utc>,
) -> DeficitRecord {
    DeficitRecord {
        team: w.team.clone(),
        side: w.side,
        risk: w.risk,
        to_win: w.to_win,
        deficit: amount,
        sport: w.sport.clone(),
        date: w.date.clone(),
        settled_at: Some(settled_at),
        cancellation_credit,
        game_id: w.game_id.clone(),
    }
}

fn stamp(base: DateTime<Utc>, n: usize) -> DateTime<Utc> {
    base + Duration::microseconds(n as i64)
}

fn find_first(pending: &[Wager], pred: impl Fn(&Wager) -> bool) -> Option<(usize, &Wager)> {
    pending.iter().enumerate().find(|(_, w)| pred(w))
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|v| !v.is_empty())
}
