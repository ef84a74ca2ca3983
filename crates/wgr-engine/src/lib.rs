//! wgr-engine
//!
//! Wager lifecycle and reconciliation logic:
//! - group pending wagers into Fav/Dog games
//! - resolve a settlement request into one explicit match criteria
//! - split a matched game into winners and losers
//! - derive cancellation credits
//! - rolling and daily aggregates for reporting
//!
//! Deterministic, pure logic. No IO. Every function takes a snapshot and
//! returns a plan; applying the plan is the writer's job.

mod aggregate;
mod error;
mod grouper;
mod intake;
mod matcher;
mod settlement;
mod types;

pub use aggregate::{
    daily_totals, in_window, parse_anchor, pending_totals, rolling_net, sort_by_combined,
    total_deficit, DailyTotals, NetMode, PendingTotals, RollingNet,
};
pub use error::LedgerError;
pub use grouper::{group, orphan_indices, remove_orphans};
pub use intake::{build_game, validate_draft};
pub use matcher::{match_game, GameCriteria, MatchedGame};
pub use settlement::{apply_removal, cancel, settle};
pub use types::*;
