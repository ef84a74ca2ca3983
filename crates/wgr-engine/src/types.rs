use serde::{Deserialize, Serialize};
use wgr_schemas::{DeficitRecord, SettledEntry, Wager, WagerDraft};

/// A pending wager together with its position in the collection snapshot it
/// was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedWager {
    pub index: usize,
    pub wager: Wager,
}

impl IndexedWager {
    pub fn new(index: usize, wager: Wager) -> Self {
        Self { index, wager }
    }
}

/// Which rule paired the two sides of a [`Game`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBasis {
    GameId,
    GameKey,
    Legacy,
}

/// A complete Fav/Dog pair. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    #[serde(serialize_with = "ser_wager")]
    pub fav: IndexedWager,
    #[serde(serialize_with = "ser_wager")]
    pub dog: IndexedWager,
    pub basis: GroupBasis,
}

impl Game {
    pub fn sport(&self) -> &str {
        &self.fav.wager.sport
    }

    pub fn date(&self) -> &str {
        &self.fav.wager.date
    }

    pub fn game_id(&self) -> Option<&str> {
        self.fav.wager.game_id()
    }

    pub fn indices(&self) -> [usize; 2] {
        [self.fav.index, self.dog.index]
    }
}

fn ser_wager<S: serde::Serializer>(w: &IndexedWager, s: S) -> Result<S::Ok, S::Error> {
    w.wager.serialize(s)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of a "submit game" request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSubmission {
    pub fav_wager: Option<WagerDraft>,
    pub dog_wager: Option<WagerDraft>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRef {
    pub team: Option<String>,
}

/// Body of a "settle game" request. Fields are resolved into exactly one
/// [`GameCriteria`] by [`GameCriteria::resolve`](crate::GameCriteria::resolve).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    #[serde(default)]
    pub winner: WinnerRef,
    pub game_id: Option<String>,
    pub game_key: Option<String>,
    pub sport: Option<String>,
    pub date: Option<String>,
    pub teams: Option<Vec<String>>,
}

/// Body of a "cancel" request: one pending side, identified by
/// `gameId`+`team`, `gameKey`+`team`, or `sport`+`date`+`team`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub game_id: Option<String>,
    pub game_key: Option<String>,
    pub team: Option<String>,
    pub sport: Option<String>,
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// Plans (computed before any store mutation)
// ---------------------------------------------------------------------------

/// How the matched records leave `PendingWagers`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum PendingRemoval {
    GameId(String),
    GameKey(String),
    /// Positions in the snapshot the plan was computed from.
    Indices(Vec<usize>),
}

/// Everything a settlement writes, derived up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementPlan {
    /// Winners first, then losers, each in collection order.
    pub settled: Vec<SettledEntry>,
    /// One per loser; `deficit == risk`.
    pub deficits: Vec<DeficitRecord>,
    pub removal: PendingRemoval,
    pub winners: usize,
    pub losers: usize,
}

impl SettlementPlan {
    pub fn matched(&self) -> usize {
        self.winners + self.losers
    }
}

/// A single-record cancellation, derived up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancellationPlan {
    pub index: usize,
    pub deficit: DeficitRecord,
}

/// Outcome of an orphan cleanup pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrphanCleanup {
    pub kept: Vec<Wager>,
    pub removed_count: usize,
}
