//! Streak Tracker - pure derivation over the activity log.
//!
//! Policy decisions (recorded in DESIGN.md):
//! - A day is active when at least one *completion* event falls in it; logins
//!   alone do not keep a streak alive.
//! - Day boundaries are user-local, computed from the account's stored
//!   `timezone_offset_minutes` (0 = UTC).
//! - Default grace: a streak survives through "yesterday", so missing today
//!   so far does not zero it. Day N active, N+1 idle, N+2 active restarts at 1.
//!
//! `users.streak` is only a cache of this derivation; it is recomputed on
//! every completion, never incremented in place.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Statement,
};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::domain::LedgerError;
use crate::models::{activity_log, user};

/// Whether a single inactive day before today breaks the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grace {
    None,
    OneDay,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakView {
    pub current_streak: i32,
    /// Sunday-first activity map for the current user-local week
    pub week_progress: [bool; 7],
}

/// Calendar date of a timestamp in the user's configured zone.
pub fn local_date(ts: DateTime<Utc>, offset_minutes: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    ts.with_timezone(&offset).date_naive()
}

/// Collapses event timestamps into the set of active user-local days.
pub fn active_days(events: &[DateTime<Utc>], offset_minutes: i32) -> BTreeSet<NaiveDate> {
    events
        .iter()
        .map(|ts| local_date(*ts, offset_minutes))
        .collect()
}

/// Consecutive active days ending at today (or yesterday, with grace).
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate, grace: Grace) -> i32 {
    let anchor = if days.contains(&today) {
        today
    } else {
        let yesterday = today - Duration::days(1);
        match grace {
            Grace::OneDay if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    let mut day = anchor;
    while days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Activity map for the week containing `today`, Sunday-first.
pub fn week_progress(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> [bool; 7] {
    let week_start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
    let mut out = [false; 7];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = days.contains(&(week_start + Duration::days(i as i64)));
    }
    out
}

/// Active-day set for a user, derived from completion events only.
pub async fn completion_days<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    offset_minutes: i32,
) -> Result<BTreeSet<NaiveDate>, LedgerError> {
    let events = activity_log::Entity::find()
        .filter(activity_log::Column::UserId.eq(user_id))
        .filter(activity_log::Column::Kind.eq("completion"))
        .all(conn)
        .await?;

    let timestamps: Vec<DateTime<Utc>> = events
        .iter()
        .filter_map(|e| DateTime::parse_from_rfc3339(&e.occurred_at).ok())
        .map(|t| t.with_timezone(&Utc))
        .collect();

    Ok(active_days(&timestamps, offset_minutes))
}

/// Recomputes the cached `users.streak` from the log. Called inside the
/// completion transaction so the cache can never drift from the trail.
pub async fn recompute_streak<C: ConnectionTrait>(
    conn: &C,
    account: &user::Model,
    now: DateTime<Utc>,
) -> Result<i32, LedgerError> {
    let days = completion_days(conn, account.id, account.timezone_offset_minutes).await?;
    let today = local_date(now, account.timezone_offset_minutes);
    let streak = current_streak(&days, today, Grace::OneDay);

    conn.execute(Statement::from_sql_and_values(
        conn.get_database_backend(),
        "UPDATE users SET streak = ?, updated_at = ? WHERE id = ?",
        [streak.into(), now.to_rfc3339().into(), account.id.into()],
    ))
    .await?;
    Ok(streak)
}

/// Read-only streak summary for the client.
pub async fn streak_view(db: &DatabaseConnection, user_id: i32) -> Result<StreakView, LedgerError> {
    let account = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let days = completion_days(db, user_id, account.timezone_offset_minutes).await?;
    let today = local_date(Utc::now(), account.timezone_offset_minutes);

    Ok(StreakView {
        current_streak: current_streak(&days, today, Grace::OneDay),
        week_progress: week_progress(&days, today),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn set(dates: &[&str]) -> BTreeSet<NaiveDate> {
        dates.iter().map(|s| d(s)).collect()
    }

    #[test]
    fn streak_counts_consecutive_days_ending_today() {
        let days = set(&["2026-03-10", "2026-03-11", "2026-03-12"]);
        assert_eq!(current_streak(&days, d("2026-03-12"), Grace::OneDay), 3);
    }

    #[test]
    fn grace_day_keeps_streak_until_tomorrow() {
        let days = set(&["2026-03-10", "2026-03-11"]);
        // Today (the 12th) has no activity yet; yesterday anchors the streak
        assert_eq!(current_streak(&days, d("2026-03-12"), Grace::OneDay), 2);
        assert_eq!(current_streak(&days, d("2026-03-12"), Grace::None), 0);
    }

    #[test]
    fn gap_resets_streak_regardless_of_grace() {
        // Active day N and N+2, idle N+1
        let days = set(&["2026-03-10", "2026-03-12"]);
        assert_eq!(current_streak(&days, d("2026-03-12"), Grace::OneDay), 1);
        assert_eq!(current_streak(&days, d("2026-03-12"), Grace::None), 1);
        // Two idle days exhausts the grace window
        assert_eq!(current_streak(&days, d("2026-03-14"), Grace::OneDay), 0);
    }

    #[test]
    fn empty_history_is_zero() {
        let days = BTreeSet::new();
        assert_eq!(current_streak(&days, d("2026-03-12"), Grace::OneDay), 0);
    }

    #[test]
    fn week_progress_is_sunday_first() {
        // 2026-03-12 is a Thursday; that week runs Sun 03-08 .. Sat 03-14
        let days = set(&["2026-03-08", "2026-03-10", "2026-03-12"]);
        let week = week_progress(&days, d("2026-03-12"));
        assert_eq!(
            week,
            [true, false, true, false, true, false, false],
            "Sun, Tue, Thu active"
        );
    }

    #[test]
    fn timezone_offset_shifts_day_boundary() {
        // 23:30 UTC on the 10th is already the 11th at UTC+2
        let ts = DateTime::parse_from_rfc3339("2026-03-10T23:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(local_date(ts, 0), d("2026-03-10"));
        assert_eq!(local_date(ts, 120), d("2026-03-11"));
        // and still the 10th at UTC-5
        assert_eq!(local_date(ts, -300), d("2026-03-10"));
    }
}
