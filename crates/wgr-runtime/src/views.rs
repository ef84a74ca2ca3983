//! Response shapes returned by the writer. Field names are camelCase on the
//! wire, like the persisted records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use wgr_engine::{DailyTotals, Game, RollingNet};
use wgr_schemas::{DeficitRecord, SettledEntry, Wager};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedGame {
    pub game_id: String,
    pub fav_wager: Wager,
    pub dog_wager: Wager,
}

/// Complete games only; totals cover every pending record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingView {
    pub games: Vec<Game>,
    pub pending_count: usize,
    pub orphan_count: usize,
    pub total_risked: Decimal,
    pub total_to_win: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleOutcome {
    pub matched_by: &'static str,
    pub winners: usize,
    pub losers: usize,
    pub settled: Vec<SettledEntry>,
    pub deficits: Vec<DeficitRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeficitEntry {
    #[serde(flatten)]
    pub record: DeficitRecord,
    pub reusable_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeficitView {
    pub deficits: Vec<DeficitEntry>,
    pub total_deficit: Decimal,
}

impl DeficitView {
    pub fn new(records: Vec<DeficitRecord>) -> Self {
        let total_deficit = wgr_engine::total_deficit(&records);
        let deficits = records
            .into_iter()
            .map(|record| DeficitEntry {
                reusable_amount: record.reusable_amount(),
                record,
            })
            .collect();
        Self {
            deficits,
            total_deficit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeficitOrder {
    /// Collection order.
    #[default]
    Stored,
    /// `risk + toWin` descending, ties in collection order.
    Combined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedCount {
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRow {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: DailyTotals,
}

/// Operator overview used by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub pending_games: usize,
    pub pending_records: usize,
    pub orphans: usize,
    pub settled_entries: usize,
    pub deficit_count: usize,
    pub total_deficit: Decimal,
    pub rolling: RollingNet,
}
