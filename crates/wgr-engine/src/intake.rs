//! Validation of submitted games.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use wgr_schemas::{Wager, WagerDraft, WagerSide};

use crate::error::LedgerError;
use crate::types::GameSubmission;

/// Validate both sides of a submission and stamp them with a shared `gameId`.
///
/// Returns `[fav, dog]`. Nothing is persisted here; the writer appends the
/// pair in this order.
pub fn build_game(
    submission: &GameSubmission,
    game_id: &str,
    created_at: DateTime<Utc>,
) -> Result<[Wager; 2], LedgerError> {
    let fav_draft = submission
        .fav_wager
        .as_ref()
        .ok_or_else(|| LedgerError::missing("favWager"))?;
    let dog_draft = submission
        .dog_wager
        .as_ref()
        .ok_or_else(|| LedgerError::missing("dogWager"))?;

    let mut fav = validate_draft("favWager", fav_draft, WagerSide::Fav)?;
    let mut dog = validate_draft("dogWager", dog_draft, WagerSide::Dog)?;

    if fav.sport != dog.sport {
        return Err(LedgerError::validation(
            "dogWager.sport",
            format!("'{}' does not match favWager sport '{}'", dog.sport, fav.sport),
        ));
    }
    if fav.date != dog.date {
        return Err(LedgerError::validation(
            "dogWager.date",
            format!("'{}' does not match favWager date '{}'", dog.date, fav.date),
        ));
    }

    for w in [&mut fav, &mut dog] {
        w.game_id = Some(game_id.to_string());
        w.created_at = Some(created_at);
    }
    Ok([fav, dog])
}

/// Check one draft. `slot` prefixes field names in errors; `expected` is the
/// side the slot requires (an absent `type` takes it).
pub fn validate_draft(
    slot: &str,
    draft: &WagerDraft,
    expected: WagerSide,
) -> Result<Wager, LedgerError> {
    let field = |name: &str| format!("{slot}.{name}");

    let sport = required_text(draft.sport.as_deref()).ok_or_else(|| LedgerError::missing(field("sport")))?;
    let team = required_text(draft.team.as_deref()).ok_or_else(|| LedgerError::missing(field("team")))?;

    let side = draft.side.unwrap_or(expected);
    if side != expected {
        return Err(LedgerError::validation(
            field("type"),
            format!("expected {}, got {}", expected.as_str(), side.as_str()),
        ));
    }

    let risk = non_negative(draft.risk, &field("risk"))?;
    let to_win = non_negative(draft.to_win, &field("toWin"))?;

    let date = required_text(draft.date.as_deref()).ok_or_else(|| LedgerError::missing(field("date")))?;
    // Stored zero-padded: grouping and matching compare dates as text.
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| {
            LedgerError::validation(field("date"), format!("'{date}' is not a YYYY-MM-DD date"))
        })?
        .format("%Y-%m-%d")
        .to_string();

    Ok(Wager {
        sport: sport.to_string(),
        team: team.to_string(),
        side,
        risk,
        to_win,
        date,
        game_id: None,
        game_key: required_text(draft.game_key.as_deref()).map(str::to_string),
        created_at: None,
    })
}

fn required_text(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|v| !v.is_empty())
}

fn non_negative(v: Option<Decimal>, field: &str) -> Result<Decimal, LedgerError> {
    match v {
        None => Err(LedgerError::missing(field)),
        Some(d) if d.is_sign_negative() && !d.is_zero() => {
            Err(LedgerError::validation(field, format!("{d} is negative")))
        }
        Some(d) => Ok(d),
    }
}
