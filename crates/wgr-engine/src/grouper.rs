//! Game grouping.
//!
//! Rules, in priority order:
//! 1. records sharing a non-blank `gameId` form a bucket; only a bucket of
//!    exactly one Fav and one Dog is a game;
//! 2. records without `gameId` but sharing a non-blank `gameKey` are bucketed
//!    the same way;
//! 3. everything else is legacy and paired positionally: the first unconsumed
//!    record takes the first later unconsumed record with the same sport and
//!    date and the opposite side.
//!
//! Incomplete `gameId` buckets are hidden but never removed. Legacy records
//! that fail to pair are orphans; only [`remove_orphans`] deletes them.

use std::collections::HashMap;

use wgr_schemas::{Wager, WagerSide};

use crate::types::{Game, GroupBasis, IndexedWager, OrphanCleanup};

/// Group a pending snapshot into complete games.
///
/// Output order: `gameId` games by first appearance, then `gameKey` games by
/// first appearance, then legacy games in scan order.
pub fn group(wagers: &[Wager]) -> Vec<Game> {
    let split = split(wagers);
    let mut games = Vec::new();

    games.extend(complete_buckets(wagers, &split.by_id, GroupBasis::GameId));
    games.extend(complete_buckets(wagers, &split.by_key, GroupBasis::GameKey));

    let (legacy_games, _) = pair_legacy(wagers, &split.legacy);
    games.extend(legacy_games);
    games
}

/// Indices of legacy records that have no eligible partner.
pub fn orphan_indices(wagers: &[Wager]) -> Vec<usize> {
    let split = split(wagers);
    let (_, orphans) = pair_legacy(wagers, &split.legacy);
    orphans
}

/// Drop every legacy record that the positional rule cannot pair.
///
/// Records carrying a `gameId` are always kept, complete or not.
pub fn remove_orphans(wagers: &[Wager]) -> OrphanCleanup {
    let orphans = orphan_indices(wagers);
    let kept = wagers
        .iter()
        .enumerate()
        .filter(|(i, _)| !orphans.contains(i))
        .map(|(_, w)| w.clone())
        .collect();

    OrphanCleanup {
        kept,
        removed_count: orphans.len(),
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct Split {
    /// (gameId, member indices) in first-appearance order.
    by_id: Vec<(String, Vec<usize>)>,
    by_key: Vec<(String, Vec<usize>)>,
    legacy: Vec<usize>,
}

fn split(wagers: &[Wager]) -> Split {
    let mut by_id = Buckets::default();
    let mut by_key = Buckets::default();

    for (i, w) in wagers.iter().enumerate() {
        if let Some(id) = w.game_id() {
            by_id.push(id, i);
        } else if let Some(key) = w.game_key() {
            by_key.push(key, i);
        }
    }

    // gameKey buckets that do not form a pair fall back to positional pairing.
    let mut legacy: Vec<usize> = wagers
        .iter()
        .enumerate()
        .filter(|(_, w)| w.game_id().is_none() && w.game_key().is_none())
        .map(|(i, _)| i)
        .collect();

    let mut keyed = Vec::new();
    for (key, members) in by_key.into_vec() {
        if is_fav_dog_pair(wagers, &members) {
            keyed.push((key, members));
        } else {
            legacy.extend(members);
        }
    }
    legacy.sort_unstable();

    Split {
        by_id: by_id.into_vec(),
        by_key: keyed,
        legacy,
    }
}

#[derive(Default)]
struct Buckets {
    order: Vec<String>,
    members: HashMap<String, Vec<usize>>,
}

impl Buckets {
    fn push(&mut self, key: &str, index: usize) {
        match self.members.get_mut(key) {
            Some(v) => v.push(index),
            None => {
                self.order.push(key.to_string());
                self.members.insert(key.to_string(), vec![index]);
            }
        }
    }

    fn into_vec(mut self) -> Vec<(String, Vec<usize>)> {
        self.order
            .into_iter()
            .map(|k| {
                let m = self.members.remove(&k).unwrap_or_default();
                (k, m)
            })
            .collect()
    }
}

fn is_fav_dog_pair(wagers: &[Wager], members: &[usize]) -> bool {
    if members.len() != 2 {
        return false;
    }
    let a = wagers[members[0]].side;
    let b = wagers[members[1]].side;
    a != b
}

fn complete_buckets(
    wagers: &[Wager],
    buckets: &[(String, Vec<usize>)],
    basis: GroupBasis,
) -> Vec<Game> {
    buckets
        .iter()
        .filter(|(_, members)| is_fav_dog_pair(wagers, members))
        .map(|(_, members)| make_game(wagers, members[0], members[1], basis))
        .collect()
}

/// Positional pairing over `candidates` (ascending indices into `wagers`).
/// Returns the paired games and the indices left unpaired.
fn pair_legacy(wagers: &[Wager], candidates: &[usize]) -> (Vec<Game>, Vec<usize>) {
    let mut consumed = vec![false; candidates.len()];
    let mut games = Vec::new();
    let mut orphans = Vec::new();

    for pos in 0..candidates.len() {
        if consumed[pos] {
            continue;
        }
        let a = &wagers[candidates[pos]];

        let partner = (pos + 1..candidates.len()).find(|&q| {
            if consumed[q] {
                return false;
            }
            let b = &wagers[candidates[q]];
            b.sport == a.sport && b.date == a.date && b.side != a.side
        });

        match partner {
            Some(q) => {
                consumed[pos] = true;
                consumed[q] = true;
                games.push(make_game(
                    wagers,
                    candidates[pos],
                    candidates[q],
                    GroupBasis::Legacy,
                ));
            }
            None => {
                consumed[pos] = true;
                orphans.push(candidates[pos]);
            }
        }
    }

    (games, orphans)
}

fn make_game(wagers: &[Wager], i: usize, j: usize, basis: GroupBasis) -> Game {
    let (fav, dog) = if wagers[i].side == WagerSide::Fav {
        (i, j)
    } else {
        (j, i)
    };
    Game {
        fav: IndexedWager::new(fav, wagers[fav].clone()),
        dog: IndexedWager::new(dog, wagers[dog].clone()),
        basis,
    }
}
