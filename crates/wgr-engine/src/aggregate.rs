//! Reporting aggregates over the settled and deficit collections.
//!
//! Rolling windows anchor on each record's own `date`, never on `settledAt`.
//! A date without a time component means local midnight in the supplied
//! timezone.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use wgr_schemas::{DeficitRecord, SettledEntry, Wager};

/// Which formula a rolling-net computation used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetMode {
    /// Σ amount over in-window settled entries.
    Amount,
    /// Σ toWin over in-window settled entries − Σ deficit over in-window
    /// deficits. Only used when no settled entry carries `amount`.
    Legacy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingNet {
    pub net: Decimal,
    pub mode: NetMode,
    pub window_hours: u32,
    /// Settled entries inside the window.
    pub settled_count: usize,
}

/// Net result over the trailing `window_hours`.
pub fn rolling_net<Tz: TimeZone>(
    window_hours: u32,
    settled: &[SettledEntry],
    deficits: &[DeficitRecord],
    now: DateTime<Utc>,
    tz: &Tz,
) -> RollingNet {
    let window = Duration::hours(i64::from(window_hours));
    let inside = |date: &str| in_window(date, now, window, tz);

    let in_window_settled: Vec<&SettledEntry> =
        settled.iter().filter(|s| inside(&s.date)).collect();

    let mode = if settled.iter().any(|s| s.amount.is_some()) {
        NetMode::Amount
    } else {
        NetMode::Legacy
    };

    let net = match mode {
        NetMode::Amount => in_window_settled
            .iter()
            .filter_map(|s| s.amount)
            .sum::<Decimal>(),
        NetMode::Legacy => {
            let credits: Decimal = in_window_settled.iter().map(|s| s.to_win).sum();
            let debits: Decimal = deficits
                .iter()
                .filter(|d| inside(&d.date))
                .map(|d| d.deficit)
                .sum();
            credits - debits
        }
    };

    RollingNet {
        net,
        mode,
        window_hours,
        settled_count: in_window_settled.len(),
    }
}

/// Window membership: `now - anchor < window`. Unparseable dates are out.
pub fn in_window<Tz: TimeZone>(date: &str, now: DateTime<Utc>, window: Duration, tz: &Tz) -> bool {
    match parse_anchor(date, tz) {
        Some(anchor) => now.signed_duration_since(anchor) < window,
        None => false,
    }
}

/// Parse a record date. `YYYY-MM-DD` is local midnight in `tz`; longer values
/// are RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` read as local time.
pub fn parse_anchor<Tz: TimeZone>(date: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let date = date.trim();
    if date.len() <= 10 {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        return local_to_utc(day.and_hms_opt(0, 0, 0)?, tz);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M"))
        .ok()?;
    local_to_utc(naive, tz)
}

fn local_to_utc<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Daily totals
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotals {
    pub total_wagered: Decimal,
    pub total_to_win: Decimal,
    pub net: Decimal,
    pub entries: usize,
}

/// Per-day totals keyed by the UTC date of `settledAt`, falling back to the
/// record's own date. Entries with neither are skipped.
pub fn daily_totals(settled: &[SettledEntry]) -> BTreeMap<NaiveDate, DailyTotals> {
    let mut out: BTreeMap<NaiveDate, DailyTotals> = BTreeMap::new();
    for s in settled {
        let day = match s.settled_at {
            Some(at) => Some(at.date_naive()),
            None => s
                .date
                .get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        };
        let Some(day) = day else {
            continue;
        };
        let t = out.entry(day).or_default();
        t.total_wagered += s.risk;
        t.total_to_win += s.to_win;
        t.net += s.amount.unwrap_or_default();
        t.entries += 1;
    }
    out
}

// ---------------------------------------------------------------------------
// Pending / deficit summaries
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTotals {
    pub total_risked: Decimal,
    pub total_to_win: Decimal,
}

/// Sums over every pending record, orphans included.
pub fn pending_totals(pending: &[Wager]) -> PendingTotals {
    PendingTotals {
        total_risked: pending.iter().map(|w| w.risk).sum(),
        total_to_win: pending.iter().map(|w| w.to_win).sum(),
    }
}

pub fn total_deficit(deficits: &[DeficitRecord]) -> Decimal {
    deficits.iter().map(|d| d.deficit).sum()
}

/// Order by `risk + toWin`, largest first. Ties keep collection order.
pub fn sort_by_combined(deficits: &mut [DeficitRecord]) {
    deficits.sort_by(|a, b| b.combined().cmp(&a.combined()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wgr_schemas::{EntryType, WagerSide};

    fn entry(date: &str, amount: Option<Decimal>, to_win: Decimal) -> SettledEntry {
        SettledEntry {
            sport: "MLB".to_string(),
            team: "A".to_string(),
            entry_type: EntryType::Win,
            risk: dec!(10),
            to_win,
            date: date.to_string(),
            amount,
            settled_at: None,
            game_id: None,
            game_key: None,
            created_at: None,
        }
    }

    fn deficit(date: &str, amount: Decimal) -> DeficitRecord {
        DeficitRecord {
            team: "B".to_string(),
            side: WagerSide::Dog,
            risk: amount,
            to_win: dec!(1),
            deficit: amount,
            sport: "MLB".to_string(),
            date: date.to_string(),
            settled_at: None,
            cancellation_credit: false,
            game_id: None,
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn amount_mode_sums_in_window_amounts() {
        let settled = vec![entry("2024-01-01", Some(dec!(50)), dec!(50))];
        let r = rolling_net(24, &settled, &[], noon(), &Utc);
        assert_eq!(r.net, dec!(50));
        assert_eq!(r.mode, NetMode::Amount);
        assert_eq!(r.settled_count, 1);
    }

    #[test]
    fn amount_mode_ignores_deficits() {
        let settled = vec![
            entry("2024-01-01", Some(dec!(8)), dec!(8)),
            entry("2024-01-01", Some(dec!(-8)), dec!(10)),
        ];
        let deficits = vec![deficit("2024-01-01", dec!(8))];
        let r = rolling_net(24, &settled, &deficits, noon(), &Utc);
        assert_eq!(r.net, dec!(0));
    }

    #[test]
    fn legacy_mode_subtracts_deficits() {
        let settled = vec![entry("2024-01-01", None, dec!(30))];
        let deficits = vec![deficit("2024-01-01", dec!(12)), deficit("2023-12-01", dec!(99))];
        let r = rolling_net(24, &settled, &deficits, noon(), &Utc);
        assert_eq!(r.mode, NetMode::Legacy);
        assert_eq!(r.net, dec!(18));
    }

    #[test]
    fn old_entries_fall_out_of_the_window() {
        let settled = vec![
            entry("2023-12-30", Some(dec!(100)), dec!(100)),
            entry("2024-01-01T06:00:00Z", Some(dec!(5)), dec!(5)),
        ];
        let r = rolling_net(24, &settled, &[], noon(), &Utc);
        assert_eq!(r.net, dec!(5));
        assert_eq!(r.settled_count, 1);
    }

    #[test]
    fn date_only_anchors_on_local_midnight() {
        let tz = chrono_tz::America::New_York;
        // 2024-01-01 00:00 New York == 05:00 UTC.
        let anchor = parse_anchor("2024-01-01", &tz).unwrap();
        assert_eq!(anchor, Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap());

        let now = Utc.with_ymd_and_hms(2024, 1, 2, 4, 30, 0).unwrap();
        assert!(in_window("2024-01-01", now, Duration::hours(24), &tz));
        assert!(!in_window("2024-01-01", now, Duration::hours(24), &Utc));
    }

    #[test]
    fn garbage_dates_are_excluded() {
        assert!(parse_anchor("not-a-date", &Utc).is_none());
        let settled = vec![entry("soon", Some(dec!(5)), dec!(5))];
        assert_eq!(rolling_net(24, &settled, &[], noon(), &Utc).net, dec!(0));
    }

    #[test]
    fn deficits_sort_by_combined_descending() {
        let mut ds = vec![deficit("2024-01-01", dec!(1)), deficit("2024-01-01", dec!(5))];
        sort_by_combined(&mut ds);
        assert_eq!(ds[0].risk, dec!(5));
        assert_eq!(total_deficit(&ds), dec!(6));
    }

    #[test]
    fn daily_totals_prefer_settled_at() {
        let mut a = entry("2024-01-01", Some(dec!(8)), dec!(8));
        a.settled_at = Some(Utc.with_ymd_and_hms(2024, 1, 3, 1, 0, 0).unwrap());
        let b = entry("2024-01-01", Some(dec!(-10)), dec!(4));
        let days = daily_totals(&[a, b]);
        assert_eq!(days.len(), 2);
        let d3 = &days[&NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()];
        assert_eq!(d3.entries, 1);
        assert_eq!(d3.net, dec!(8));
        let d1 = &days[&NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()];
        assert_eq!(d1.total_to_win, dec!(4));
    }
}
