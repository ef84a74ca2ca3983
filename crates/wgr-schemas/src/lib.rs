//! Persisted record shapes for the wager ledger.
//!
//! Field names on the wire are camelCase (`toWin`, `gameId`, `settledAt`) so
//! that collections written by earlier versions of the ledger load unchanged.
//! Money is `rust_decimal::Decimal`; it deserializes from JSON numbers or from
//! numeric strings (older records stored raw form input).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// WagerSide
// ---------------------------------------------------------------------------

/// Which side of a game a wager backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WagerSide {
    Fav,
    Dog,
}

impl WagerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            WagerSide::Fav => "Fav",
            WagerSide::Dog => "Dog",
        }
    }
}

// ---------------------------------------------------------------------------
// Wager (PendingWagers)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wager {
    pub sport: String,
    pub team: String,
    #[serde(rename = "type")]
    pub side: WagerSide,
    pub risk: Decimal,
    pub to_win: Decimal,
    /// Calendar date (`YYYY-MM-DD`); older records may carry a full timestamp.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Wager {
    /// `gameId` if present and non-blank.
    pub fn game_id(&self) -> Option<&str> {
        non_blank(self.game_id.as_deref())
    }

    /// `gameKey` if present and non-blank.
    pub fn game_key(&self) -> Option<&str> {
        non_blank(self.game_key.as_deref())
    }

    pub fn team_trimmed(&self) -> &str {
        self.team.trim()
    }
}

/// A wager as submitted by a client, before validation.
///
/// Every field is optional so that a missing field can be reported by name
/// instead of failing JSON decoding wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WagerDraft {
    pub sport: Option<String>,
    pub team: Option<String>,
    #[serde(rename = "type")]
    pub side: Option<WagerSide>,
    pub risk: Option<Decimal>,
    pub to_win: Option<Decimal>,
    pub date: Option<String>,
    pub game_key: Option<String>,
}

// ---------------------------------------------------------------------------
// SettledEntry (SettledEntries)
// ---------------------------------------------------------------------------

/// Outcome tag on a settled entry.
///
/// Current entries are `win` / `loss`. Entries written before outcomes were
/// recorded still carry the wager side (`Fav` / `Dog`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    #[serde(rename = "win")]
    Win,
    #[serde(rename = "loss")]
    Loss,
    Fav,
    Dog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledEntry {
    pub sport: String,
    pub team: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub risk: Decimal,
    pub to_win: Decimal,
    pub date: String,
    /// Signed outcome: `+toWin` for a win, `-|risk|` for a loss.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl SettledEntry {
    /// Carry every wager field over and stamp the outcome.
    pub fn from_wager(
        wager: &Wager,
        entry_type: EntryType,
        amount: Decimal,
        settled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sport: wager.sport.clone(),
            team: wager.team.clone(),
            entry_type,
            risk: wager.risk,
            to_win: wager.to_win,
            date: wager.date.clone(),
            amount: Some(amount),
            settled_at: Some(settled_at),
            game_id: wager.game_id.clone(),
            game_key: wager.game_key.clone(),
            created_at: wager.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// DeficitRecord (Deficits)
// ---------------------------------------------------------------------------

/// Why a deficit exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeficitOrigin {
    /// Losing side of a settled game; `deficit == risk`.
    Loss,
    /// Pending wager voided by the user; `deficit == toWin`.
    Cancellation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeficitRecord {
    pub team: String,
    #[serde(rename = "type")]
    pub side: WagerSide,
    pub risk: Decimal,
    pub to_win: Decimal,
    pub deficit: Decimal,
    pub sport: String,
    pub date: String,
    /// Identity of the record. Positions are not stable across deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
    /// Set on deficits created by cancellation.
    #[serde(
        rename = "addToWinToDeficits",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub cancellation_credit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
}

impl DeficitRecord {
    pub fn origin(&self) -> DeficitOrigin {
        if self.cancellation_credit {
            DeficitOrigin::Cancellation
        } else {
            DeficitOrigin::Loss
        }
    }

    /// Amount available to reapply to a future wager.
    ///
    /// Cancellation credits surface `toWin`; loss deficits surface
    /// `risk + toWin`.
    pub fn reusable_amount(&self) -> Decimal {
        match self.origin() {
            DeficitOrigin::Cancellation => self.to_win,
            DeficitOrigin::Loss => self.risk + self.to_win,
        }
    }

    /// `risk + toWin`, the ordering key of the deficits view.
    pub fn combined(&self) -> Decimal {
        self.risk + self.to_win
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn legacy_wager_with_string_amounts_loads() {
        let raw = r#"{"sport":"MLB","team":"Yankees","type":"Fav","risk":"10","toWin":"8.50","date":"2024-01-01"}"#;
        let w: Wager = serde_json::from_str(raw).unwrap();
        assert_eq!(w.risk, dec!(10));
        assert_eq!(w.to_win, dec!(8.50));
        assert!(w.game_id().is_none());
    }

    #[test]
    fn blank_game_id_counts_as_absent() {
        let raw = r#"{"sport":"MLB","team":"A","type":"Dog","risk":1,"toWin":2,"date":"2024-01-01","gameId":"  "}"#;
        let w: Wager = serde_json::from_str(raw).unwrap();
        assert!(w.game_id().is_none());
    }

    #[test]
    fn deficit_tag_round_trips_under_wire_name() {
        let raw = r#"{"team":"A","type":"Dog","risk":8,"toWin":10,"deficit":10,"sport":"NBA","date":"2024-01-01","settledAt":"2024-01-01T12:00:00.000Z","addToWinToDeficits":true}"#;
        let d: DeficitRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(d.origin(), DeficitOrigin::Cancellation);
        assert_eq!(d.reusable_amount(), dec!(10));

        let back = serde_json::to_value(&d).unwrap();
        assert_eq!(back["addToWinToDeficits"], true);
    }

    #[test]
    fn loss_deficit_reuses_risk_plus_to_win() {
        let raw = r#"{"team":"A","type":"Dog","risk":8,"toWin":10,"deficit":8,"sport":"NBA","date":"2024-01-01"}"#;
        let d: DeficitRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(d.origin(), DeficitOrigin::Loss);
        assert_eq!(d.reusable_amount(), dec!(18));
        let back = serde_json::to_value(&d).unwrap();
        assert!(back.get("addToWinToDeficits").is_none());
    }

    #[test]
    fn legacy_settled_entry_without_amount_loads() {
        let raw = r#"{"sport":"NHL","team":"B","type":"Fav","risk":5,"toWin":4,"date":"2024-02-02"}"#;
        let s: SettledEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(s.entry_type, EntryType::Fav);
        assert!(s.amount.is_none());
    }
}
