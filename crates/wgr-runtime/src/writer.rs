use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;
use wgr_audit::{AuditEvent, AuditWriter};
use wgr_config::LedgerSettings;
use wgr_engine::{
    apply_removal, build_game, daily_totals, group, match_game, orphan_indices, pending_totals,
    remove_orphans, rolling_net, sort_by_combined, CancelRequest, GameCriteria, GameSubmission,
    LedgerError, RollingNet, SettleRequest,
};
use wgr_schemas::{DeficitRecord, SettledEntry, Wager};
use wgr_store::{JsonFileStore, LedgerStore, RecordStore};

use crate::error::RuntimeError;
use crate::views::{
    DailyRow, DeficitOrder, DeficitView, LedgerSummary, PendingView, RemovedCount, SettleOutcome,
    SubmittedGame,
};

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// The Ledger Writer.
///
/// Reads are lock-free snapshots. Every mutation runs under `write_lock`:
/// read the snapshot, let the engine compute the full plan, then journal an
/// intent, apply the writes, and journal the commit. A failure between
/// intent and commit leaves an uncommitted intent in the journal.
pub struct LedgerRuntime {
    store: LedgerStore,
    journal: Mutex<AuditWriter>,
    write_lock: Mutex<()>,
    tz: Tz,
    window_hours: u32,
}

impl LedgerRuntime {
    pub fn new(store: LedgerStore, journal: AuditWriter, tz: Tz, window_hours: u32) -> Self {
        Self {
            store,
            journal: Mutex::new(journal),
            write_lock: Mutex::new(()),
            tz,
            window_hours,
        }
    }

    /// File-backed runtime from settings; resumes an existing journal chain.
    pub fn open(settings: &LedgerSettings) -> anyhow::Result<Self> {
        let files = JsonFileStore::open(&settings.store.data_dir)?;
        let store = LedgerStore::new(Arc::new(files) as Arc<dyn RecordStore>);
        let journal = AuditWriter::resume(&settings.audit.path, settings.audit.hash_chain)?;
        Ok(Self::new(
            store,
            journal,
            settings.timezone()?,
            settings.ledger.rolling_window_hours,
        ))
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn window_hours(&self) -> u32 {
        self.window_hours
    }

    // -----------------------------------------------------------------------
    // Games
    // -----------------------------------------------------------------------

    pub fn submit_game(&self, submission: &GameSubmission) -> RuntimeResult<SubmittedGame> {
        let game_id = Uuid::new_v4().to_string();
        let pair = build_game(submission, &game_id, now()).map_err(|e| self.rejected("submit", e))?;

        let _w = self.lock_writes();
        self.journaled(
            "SUBMIT",
            json!({ "gameId": game_id, "sport": pair[0].sport, "date": pair[0].date }),
            || {
                self.store.append_pending(&pair)?;
                Ok(json!({ "gameId": game_id }))
            },
        )?;

        info!(game_id = %game_id, sport = %pair[0].sport, date = %pair[0].date, "game submitted");
        let [fav_wager, dog_wager] = pair;
        Ok(SubmittedGame {
            game_id,
            fav_wager,
            dog_wager,
        })
    }

    pub fn list_pending(&self) -> RuntimeResult<PendingView> {
        let pending = self.store.pending()?;
        let totals = pending_totals(&pending);
        Ok(PendingView {
            games: group(&pending),
            pending_count: pending.len(),
            orphan_count: orphan_indices(&pending).len(),
            total_risked: totals.total_risked,
            total_to_win: totals.total_to_win,
        })
    }

    pub fn settle(&self, req: &SettleRequest) -> RuntimeResult<SettleOutcome> {
        let criteria = GameCriteria::resolve(req).map_err(|e| self.rejected("settle", e))?;
        let winner = match req.winner.team.as_deref().map(str::trim) {
            Some(team) if !team.is_empty() => team.to_string(),
            _ => return Err(self.rejected("settle", LedgerError::missing("winner.team"))),
        };

        let _w = self.lock_writes();
        let pending = self.store.pending()?;
        let existing = self.store.deficits()?;

        let matched = match_game(&pending, &criteria).map_err(|e| self.rejected("settle", e))?;
        let stamp = next_stamp(&existing);
        let plan =
            wgr_engine::settle(&matched, &winner, stamp).map_err(|e| self.rejected("settle", e))?;
        let remaining = apply_removal(&pending, &plan.removal, plan.matched())
            .map_err(|e| self.rejected("settle", e))?;

        self.journaled(
            "SETTLE",
            json!({
                "criteria": criteria.label(),
                "removal": plan.removal,
                "winner": winner.trim(),
                "settled": plan.settled.len(),
                "deficits": plan.deficits.len(),
            }),
            || {
                self.store.append_settled(&plan.settled)?;
                self.store.append_deficits(&plan.deficits)?;
                self.store.replace_pending(&remaining)?;
                Ok(json!({ "winners": plan.winners, "losers": plan.losers }))
            },
        )?;

        info!(
            matched_by = criteria.label(),
            winner = %winner.trim(),
            winners = plan.winners,
            losers = plan.losers,
            "game settled"
        );
        Ok(SettleOutcome {
            matched_by: criteria.label(),
            winners: plan.winners,
            losers: plan.losers,
            settled: plan.settled,
            deficits: plan.deficits,
        })
    }

    pub fn cancel(&self, req: &CancelRequest) -> RuntimeResult<DeficitRecord> {
        let _w = self.lock_writes();
        let pending = self.store.pending()?;
        let existing = self.store.deficits()?;

        let plan = wgr_engine::cancel(&pending, req, next_stamp(&existing))
            .map_err(|e| self.rejected("cancel", e))?;
        let remaining = apply_removal(
            &pending,
            &wgr_engine::PendingRemoval::Indices(vec![plan.index]),
            1,
        )?;

        self.journaled(
            "CANCEL",
            json!({ "index": plan.index, "team": plan.deficit.team, "deficit": plan.deficit.deficit }),
            || {
                self.store.append_deficits(std::slice::from_ref(&plan.deficit))?;
                self.store.replace_pending(&remaining)?;
                Ok(json!({}))
            },
        )?;

        info!(team = %plan.deficit.team, deficit = %plan.deficit.deficit, "pending wager cancelled");
        Ok(plan.deficit)
    }

    // -----------------------------------------------------------------------
    // Pending maintenance
    // -----------------------------------------------------------------------

    pub fn delete_pending(&self, index: usize) -> RuntimeResult<Wager> {
        let _w = self.lock_writes();
        let mut pending = self.store.pending()?;
        if index >= pending.len() {
            return Err(self.rejected(
                "delete_pending",
                LedgerError::validation("index", format!("{index} is out of range")),
            ));
        }
        let removed = pending.remove(index);

        self.journaled("DELETE_PENDING", json!({ "index": index }), || {
            self.store.replace_pending(&pending)?;
            Ok(json!({}))
        })?;
        info!(index, team = %removed.team, "pending wager deleted");
        Ok(removed)
    }

    pub fn clear_pending(&self) -> RuntimeResult<RemovedCount> {
        let _w = self.lock_writes();
        let removed = self.store.pending()?.len();
        self.journaled("CLEAR_PENDING", json!({ "count": removed }), || {
            self.store.replace_pending(&[])?;
            Ok(json!({}))
        })?;
        info!(removed, "pending collection cleared");
        Ok(RemovedCount { removed })
    }

    /// Drop legacy records that cannot be paired.
    pub fn cleanup_orphans(&self) -> RuntimeResult<RemovedCount> {
        let _w = self.lock_writes();
        let pending = self.store.pending()?;
        let cleanup = remove_orphans(&pending);
        if cleanup.removed_count == 0 {
            return Ok(RemovedCount { removed: 0 });
        }

        self.journaled(
            "CLEANUP_ORPHANS",
            json!({ "count": cleanup.removed_count }),
            || {
                self.store.replace_pending(&cleanup.kept)?;
                Ok(json!({}))
            },
        )?;
        info!(removed = cleanup.removed_count, "orphaned pending wagers removed");
        Ok(RemovedCount {
            removed: cleanup.removed_count,
        })
    }

    // -----------------------------------------------------------------------
    // Deficits
    // -----------------------------------------------------------------------

    pub fn list_deficits(&self, order: DeficitOrder) -> RuntimeResult<DeficitView> {
        let mut deficits = self.store.deficits()?;
        if order == DeficitOrder::Combined {
            sort_by_combined(&mut deficits);
        }
        Ok(DeficitView::new(deficits))
    }

    pub fn delete_deficit_at(&self, index: usize) -> RuntimeResult<DeficitView> {
        let _w = self.lock_writes();
        let mut deficits = self.store.deficits()?;
        if index >= deficits.len() {
            return Err(self.rejected(
                "delete_deficit",
                LedgerError::validation("index", format!("{index} is out of range")),
            ));
        }
        deficits.remove(index);

        self.journaled("DELETE_DEFICIT", json!({ "index": index }), || {
            self.store.replace_deficits(&deficits)?;
            Ok(json!({}))
        })?;
        info!(index, "deficit deleted");
        Ok(DeficitView::new(deficits))
    }

    /// Remove every deficit stamped `settled_at`. The raw value must be an
    /// RFC 3339 timestamp.
    pub fn delete_deficit_by_timestamp(&self, raw: &str) -> RuntimeResult<DeficitView> {
        let target = DateTime::parse_from_rfc3339(raw.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                self.rejected(
                    "delete_deficit",
                    LedgerError::validation("settledAt", format!("'{raw}': {e}")),
                )
            })?;

        let _w = self.lock_writes();
        let deficits = self.store.deficits()?;
        let before = deficits.len();
        let kept: Vec<DeficitRecord> = deficits
            .into_iter()
            .filter(|d| d.settled_at != Some(target))
            .collect();
        let removed = before - kept.len();
        if removed == 0 {
            return Err(self.rejected(
                "delete_deficit",
                LedgerError::not_found(format!("deficit with settledAt {raw}")),
            ));
        }

        self.journaled(
            "DELETE_DEFICIT",
            json!({ "settledAt": target, "count": removed }),
            || {
                self.store.replace_deficits(&kept)?;
                Ok(json!({}))
            },
        )?;
        info!(settled_at = %target, removed, "deficit deleted");
        Ok(DeficitView::new(kept))
    }

    pub fn clear_deficits(&self) -> RuntimeResult<DeficitView> {
        let _w = self.lock_writes();
        let count = self.store.deficits()?.len();
        self.journaled("CLEAR_DEFICITS", json!({ "count": count }), || {
            self.store.replace_deficits(&[])?;
            Ok(json!({}))
        })?;
        info!(removed = count, "deficits cleared");
        Ok(DeficitView::new(Vec::new()))
    }

    // -----------------------------------------------------------------------
    // Settled
    // -----------------------------------------------------------------------

    pub fn list_settled(&self) -> RuntimeResult<Vec<SettledEntry>> {
        Ok(self.store.settled()?)
    }

    pub fn reset_settled(&self) -> RuntimeResult<Vec<SettledEntry>> {
        let _w = self.lock_writes();
        let count = self.store.settled()?.len();
        self.journaled("RESET_SETTLED", json!({ "count": count }), || {
            self.store.replace_settled(&[])?;
            Ok(json!({}))
        })?;
        info!(removed = count, "settled entries reset");
        Ok(Vec::new())
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    /// Rolling net over `hours` (default: the configured window).
    pub fn rolling_net(&self, hours: Option<u32>) -> RuntimeResult<RollingNet> {
        self.rolling_net_at(hours, Utc::now())
    }

    pub fn rolling_net_at(&self, hours: Option<u32>, at: DateTime<Utc>) -> RuntimeResult<RollingNet> {
        let hours = hours.unwrap_or(self.window_hours);
        if hours == 0 {
            return Err(LedgerError::validation("hours", "must be > 0").into());
        }
        let settled = self.store.settled()?;
        let deficits = self.store.deficits()?;
        Ok(rolling_net(hours, &settled, &deficits, at, &self.tz))
    }

    pub fn daily_stats(&self) -> RuntimeResult<Vec<DailyRow>> {
        let settled = self.store.settled()?;
        Ok(daily_totals(&settled)
            .into_iter()
            .map(|(date, totals)| DailyRow { date, totals })
            .collect())
    }

    pub fn summary(&self) -> RuntimeResult<LedgerSummary> {
        let pending = self.list_pending()?;
        let settled = self.store.settled()?;
        let deficits = self.store.deficits()?;
        let rolling = rolling_net(self.window_hours, &settled, &deficits, Utc::now(), &self.tz);
        Ok(LedgerSummary {
            pending_games: pending.games.len(),
            pending_records: pending.pending_count,
            orphans: pending.orphan_count,
            settled_entries: settled.len(),
            deficit_count: deficits.len(),
            total_deficit: wgr_engine::total_deficit(&deficits),
            rolling,
        })
    }

    // -----------------------------------------------------------------------
    // Journal
    // -----------------------------------------------------------------------

    /// Journaled operations that never committed.
    pub fn uncommitted_ops(&self) -> RuntimeResult<Vec<AuditEvent>> {
        let path = self.journal().path().to_path_buf();
        if !path.exists() {
            return Ok(Vec::new());
        }
        wgr_audit::find_uncommitted_intents(&path).map_err(RuntimeError::Journal)
    }

    fn journaled(
        &self,
        op: &str,
        intent: Value,
        apply: impl FnOnce() -> RuntimeResult<Value>,
    ) -> RuntimeResult<()> {
        let op_id = self
            .journal()
            .intent(op, intent)
            .map_err(RuntimeError::Journal)?;

        let commit = apply().map_err(|e| {
            error!(op, op_id = %op_id, error = %e, "ledger write failed after intent; collections may be partial");
            e
        })?;

        self.journal()
            .commit(op_id, op, commit)
            .map_err(RuntimeError::Journal)?;
        Ok(())
    }

    fn journal(&self) -> MutexGuard<'_, AuditWriter> {
        self.journal.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn rejected(&self, op: &str, e: LedgerError) -> RuntimeError {
        warn!(op, kind = e.kind(), error = %e, "request rejected");
        RuntimeError::Ledger(e)
    }
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A deficit stamp later than every existing one, so `settledAt` keeps
/// identifying a single record.
fn next_stamp(existing: &[DeficitRecord]) -> DateTime<Utc> {
    let now = now();
    match existing.iter().filter_map(|d| d.settled_at).max() {
        Some(last) if last >= now => last + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use wgr_schemas::WagerSide;

    fn deficit_at(at: DateTime<Utc>) -> DeficitRecord {
        DeficitRecord {
            team: "A".to_string(),
            side: WagerSide::Dog,
            risk: dec!(1),
            to_win: dec!(1),
            deficit: dec!(1),
            sport: "MLB".to_string(),
            date: "2024-01-01".to_string(),
            settled_at: Some(at),
            cancellation_credit: false,
            game_id: None,
        }
    }

    #[test]
    fn next_stamp_moves_past_future_stamps() {
        let future = Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap();
        let stamp = next_stamp(&[deficit_at(future)]);
        assert_eq!(stamp, future + Duration::microseconds(1));
    }

    #[test]
    fn next_stamp_is_now_when_history_is_older() {
        let past = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert!(next_stamp(&[deficit_at(past)]) > past);
        assert!(next_stamp(&[]) <= Utc::now());
    }
}
