//! Reward Engine - converts completion events into credited amounts.
//!
//! This is the only code path that mutates `users.xp/gems/gel/hearts`
//! (admin credit adjustments go through the same atomic statements).
//! Counter updates are raw `SET x = x + ?` statements so concurrent credits
//! from different lessons both land; no read-modify-write in application code.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Statement, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::domain::LedgerError;
use crate::models::user;

/// Minutes per regenerated heart.
pub const HEART_REGEN_MINUTES: i64 = 30;

/// Client-supplied reward basis for a completion. Values are deltas, never
/// absolute totals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RewardInput {
    pub xp_base: i64,
    #[serde(default)]
    pub gems: i64,
    #[serde(default)]
    pub gel: i64,
}

impl RewardInput {
    /// Rejects negative amounts, naming every offending field.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let mut bad = Vec::new();
        if self.xp_base < 0 {
            bad.push("xp_base");
        }
        if self.gems < 0 {
            bad.push("gems");
        }
        if self.gel < 0 {
            bad.push("gel");
        }
        if bad.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Validation(format!(
                "reward amounts must be non-negative: {}",
                bad.join(", ")
            )))
        }
    }
}

/// Final credited amounts after boost application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardAmounts {
    pub xp: i64,
    pub gems: i64,
    pub gel: i64,
    /// Multiplier applied, if a boost was active at credit time
    pub boost_multiplier: Option<f64>,
}

/// A time-boxed XP multiplier as stored on the account row.
#[derive(Debug, Clone, Copy)]
pub struct XpBoost {
    pub multiplier: f64,
    pub granted_at: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl XpBoost {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.granted_at + Duration::minutes(self.duration_minutes)
    }

    /// Reads the boost trio off an account row; None if absent or unparseable.
    pub fn from_user(u: &user::Model) -> Option<XpBoost> {
        let multiplier = u.xp_boost_multiplier?;
        let granted_at = u
            .xp_boost_granted_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
            .with_timezone(&Utc);
        let duration_minutes = i64::from(u.xp_boost_duration_minutes?);
        Some(XpBoost {
            multiplier,
            granted_at,
            duration_minutes,
        })
    }
}

/// Pure computation: applies an active boost to the XP base, rounding down.
/// Gems and gel pass through unmultiplied.
pub fn compute_reward(
    input: RewardInput,
    boost: Option<XpBoost>,
    now: DateTime<Utc>,
) -> Result<RewardAmounts, LedgerError> {
    input.validate()?;

    let active = boost.filter(|b| b.is_active(now));
    let xp = match active {
        Some(b) => (input.xp_base as f64 * b.multiplier).floor() as i64,
        None => input.xp_base,
    };

    Ok(RewardAmounts {
        xp,
        gems: input.gems,
        gel: input.gel,
        boost_multiplier: active.map(|b| b.multiplier),
    })
}

/// Atomically increments the account counters. Safe under concurrent credits.
pub async fn credit_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    amounts: &RewardAmounts,
) -> Result<(), LedgerError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(Statement::from_sql_and_values(
        conn.get_database_backend(),
        "UPDATE users SET xp = xp + ?, gems = gems + ?, gel = gel + ?, updated_at = ? WHERE id = ?",
        [
            amounts.xp.into(),
            amounts.gems.into(),
            amounts.gel.into(),
            now.into(),
            user_id.into(),
        ],
    ))
    .await?;
    Ok(())
}

/// Grants (or replaces) the account's XP boost. The latest grant wins.
pub async fn grant_xp_boost(
    db: &DatabaseConnection,
    user_id: i32,
    multiplier: f64,
    duration_minutes: i32,
) -> Result<(), LedgerError> {
    if !(multiplier.is_finite() && multiplier > 0.0) {
        return Err(LedgerError::Validation(
            "multiplier must be a positive number".to_string(),
        ));
    }
    if duration_minutes <= 0 {
        return Err(LedgerError::Validation(
            "duration_minutes must be positive".to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();
    let res = db
        .execute(Statement::from_sql_and_values(
            db.get_database_backend(),
            r#"UPDATE users
               SET xp_boost_multiplier = ?, xp_boost_granted_at = ?,
                   xp_boost_duration_minutes = ?, updated_at = ?
               WHERE id = ?"#,
            [
                multiplier.into(),
                now.clone().into(),
                duration_minutes.into(),
                now.into(),
                user_id.into(),
            ],
        ))
        .await?;

    if res.rows_affected() == 0 {
        return Err(LedgerError::NotFound);
    }
    Ok(())
}

/// Hearts regenerate lazily: whole elapsed intervals since the regen anchor
/// are converted to hearts on read/use, capped at `max_hearts`. When full,
/// the anchor follows `now` so idle time does not bank future hearts.
fn regenerated(u: &user::Model, now: DateTime<Utc>) -> (i32, DateTime<Utc>) {
    let anchor = DateTime::parse_from_rfc3339(&u.last_heart_regen_at)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now);

    if u.hearts >= u.max_hearts {
        return (u.hearts, now);
    }

    let elapsed = now.signed_duration_since(anchor).num_minutes().max(0);
    let intervals = elapsed / HEART_REGEN_MINUTES;
    let missing = i64::from(u.max_hearts - u.hearts);
    let gained = intervals.min(missing);

    let hearts = u.hearts + gained as i32;
    let new_anchor = if hearts >= u.max_hearts {
        now
    } else {
        anchor + Duration::minutes(gained * HEART_REGEN_MINUTES)
    };
    (hearts, new_anchor)
}

/// Spends one heart (wrong answer), clamped at 0. Applies lazy regeneration
/// first so a long-idle user gets their hearts back before losing one.
pub async fn use_heart(db: &DatabaseConnection, user_id: i32) -> Result<i32, LedgerError> {
    let txn = db.begin().await?;

    let account = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let now = Utc::now();
    let (hearts, anchor) = regenerated(&account, now);

    // Persist the regen, then decrement atomically with a floor of 0.
    txn.execute(Statement::from_sql_and_values(
        txn.get_database_backend(),
        r#"UPDATE users
           SET hearts = MAX(? - 1, 0), last_heart_regen_at = ?, updated_at = ?
           WHERE id = ?"#,
        [
            hearts.into(),
            anchor.to_rfc3339().into(),
            now.to_rfc3339().into(),
            user_id.into(),
        ],
    ))
    .await?;

    txn.commit().await?;
    Ok((hearts - 1).max(0))
}

/// Current heart count with lazy regeneration applied and persisted.
pub async fn current_hearts(db: &DatabaseConnection, user_id: i32) -> Result<i32, LedgerError> {
    let txn = db.begin().await?;

    let account = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let now = Utc::now();
    let (hearts, anchor) = regenerated(&account, now);

    if hearts != account.hearts {
        txn.execute(Statement::from_sql_and_values(
            txn.get_database_backend(),
            "UPDATE users SET hearts = ?, last_heart_regen_at = ?, updated_at = ? WHERE id = ?",
            [
                hearts.into(),
                anchor.to_rfc3339().into(),
                now.to_rfc3339().into(),
                user_id.into(),
            ],
        ))
        .await?;
    }

    txn.commit().await?;
    Ok(hearts)
}
