//! Wager matching for settlement.
//!
//! A request is resolved once into a [`GameCriteria`]; the variants are tried
//! in strict priority order and never combined.

use wgr_schemas::{Wager, WagerSide};

use crate::error::LedgerError;
use crate::types::{IndexedWager, PendingRemoval, SettleRequest};

/// Identifier scheme used to locate a game's pending records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameCriteria {
    ById(String),
    ByKey(String),
    /// Legacy records: first eligible Fav and first eligible Dog for the two
    /// (trimmed) team names, in collection order.
    ByHeuristic {
        sport: String,
        date: String,
        teams: [String; 2],
    },
}

impl GameCriteria {
    /// Pick the highest-priority scheme the request supports.
    pub fn resolve(req: &SettleRequest) -> Result<Self, LedgerError> {
        if let Some(id) = non_blank(req.game_id.as_deref()) {
            return Ok(Self::ById(id.to_string()));
        }
        if let Some(key) = non_blank(req.game_key.as_deref()) {
            return Ok(Self::ByKey(key.to_string()));
        }

        let sport = non_blank(req.sport.as_deref());
        let date = non_blank(req.date.as_deref());
        let teams = req.teams.as_deref().unwrap_or_default();
        match (sport, date) {
            (Some(sport), Some(date)) if !teams.is_empty() => {
                if teams.len() != 2 {
                    return Err(LedgerError::validation(
                        "teams",
                        format!("expected exactly 2 team names, got {}", teams.len()),
                    ));
                }
                Ok(Self::ByHeuristic {
                    sport: sport.to_string(),
                    date: date.to_string(),
                    teams: [teams[0].trim().to_string(), teams[1].trim().to_string()],
                })
            }
            _ => Err(LedgerError::validation(
                "gameId",
                "missing gameId, gameKey or sport/date/teams",
            )),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ById(_) => "game_id",
            Self::ByKey(_) => "game_key",
            Self::ByHeuristic { .. } => "heuristic",
        }
    }
}

/// The pending records selected by one criteria, plus how to remove them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedGame {
    pub criteria: GameCriteria,
    pub records: Vec<IndexedWager>,
}

impl MatchedGame {
    /// Removal strategy: exact `gameId`, else exact `gameKey`, else the
    /// positions found during matching.
    pub fn removal(&self) -> PendingRemoval {
        match &self.criteria {
            GameCriteria::ById(id) => PendingRemoval::GameId(id.clone()),
            GameCriteria::ByKey(key) => PendingRemoval::GameKey(key.clone()),
            GameCriteria::ByHeuristic { .. } => {
                PendingRemoval::Indices(self.records.iter().map(|r| r.index).collect())
            }
        }
    }

    pub fn indices(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.index).collect()
    }
}

/// Locate the records of one game in `pending`.
///
/// # Errors
/// [`LedgerError::NotFound`] when fewer than two records match.
pub fn match_game(pending: &[Wager], criteria: &GameCriteria) -> Result<MatchedGame, LedgerError> {
    let records: Vec<IndexedWager> = match criteria {
        GameCriteria::ById(id) => select(pending, |w| w.game_id() == Some(id.as_str())),
        GameCriteria::ByKey(key) => select(pending, |w| w.game_key() == Some(key.as_str())),
        GameCriteria::ByHeuristic { sport, date, teams } => {
            match_heuristic(pending, sport, date, teams)
        }
    };

    if records.len() < 2 {
        return Err(LedgerError::not_found(format!(
            "game ({}: {} of 2 records found)",
            criteria.label(),
            records.len()
        )));
    }

    Ok(MatchedGame {
        criteria: criteria.clone(),
        records,
    })
}

fn select(pending: &[Wager], pred: impl Fn(&Wager) -> bool) -> Vec<IndexedWager> {
    pending
        .iter()
        .enumerate()
        .filter(|(_, w)| pred(w))
        .map(|(i, w)| IndexedWager::new(i, w.clone()))
        .collect()
}

/// For each team, take the first record on `sport`+`date`+team whose side has
/// not been claimed yet. With duplicate games on one date only the earliest
/// unresolved instance is eligible.
fn match_heuristic(
    pending: &[Wager],
    sport: &str,
    date: &str,
    teams: &[String; 2],
) -> Vec<IndexedWager> {
    let mut claimed: Vec<WagerSide> = Vec::with_capacity(2);
    let mut out = Vec::with_capacity(2);

    for team in teams {
        let hit = pending.iter().enumerate().find(|(_, w)| {
            w.sport == sport
                && w.date == date
                && w.team_trimmed() == team
                && !claimed.contains(&w.side)
        });
        if let Some((i, w)) = hit {
            claimed.push(w.side);
            out.push(IndexedWager::new(i, w.clone()));
        }
    }

    out.sort_by_key(|r| r.index);
    out
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn w(team: &str, side: WagerSide) -> Wager {
        Wager {
            sport: "NBA".to_string(),
            team: team.to_string(),
            side,
            risk: dec!(10),
            to_win: dec!(8),
            date: "2024-01-01".to_string(),
            game_id: None,
            game_key: None,
            created_at: None,
        }
    }

    fn req() -> SettleRequest {
        SettleRequest {
            sport: Some("NBA".to_string()),
            date: Some("2024-01-01".to_string()),
            teams: Some(vec!["A".to_string(), " A ".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn game_id_wins_over_every_other_field() {
        let mut r = req();
        r.game_id = Some("g1".to_string());
        r.game_key = Some("k1".to_string());
        assert_eq!(
            GameCriteria::resolve(&r).unwrap(),
            GameCriteria::ById("g1".to_string())
        );
    }

    #[test]
    fn blank_game_id_falls_through_to_key() {
        let mut r = req();
        r.game_id = Some(String::new());
        r.game_key = Some("k1".to_string());
        assert_eq!(
            GameCriteria::resolve(&r).unwrap(),
            GameCriteria::ByKey("k1".to_string())
        );
    }

    #[test]
    fn heuristic_needs_two_teams() {
        let mut r = req();
        r.teams = Some(vec!["A".to_string()]);
        let err = GameCriteria::resolve(&r).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn nothing_usable_is_a_validation_error() {
        let err = GameCriteria::resolve(&SettleRequest::default()).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn heuristic_takes_first_unclaimed_side_per_team() {
        let pending = vec![w("A", WagerSide::Fav), w("A", WagerSide::Fav), w("A", WagerSide::Dog)];
        let criteria = GameCriteria::resolve(&req()).unwrap();
        let m = match_game(&pending, &criteria).unwrap();
        assert_eq!(m.indices(), vec![0, 2]);
        assert_eq!(m.removal(), PendingRemoval::Indices(vec![0, 2]));
    }

    #[test]
    fn single_record_is_not_found() {
        let pending = vec![w("A", WagerSide::Fav)];
        let criteria = GameCriteria::resolve(&req()).unwrap();
        let err = match_game(&pending, &criteria).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
