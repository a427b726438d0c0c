//! Reward claim ledger. Claims are rows in `reward_claims` with a unique
//! `(telegram_id, title_name)` constraint, so claiming is a single insert
//! under the user row lock and a duplicate claim surfaces as a unique
//! violation rather than a race.

use crate::db::{DbError, PgPool};
use crate::ledger::accounts::{ensure_account_on, lock_account, AccountIdentity};
use crate::ledger::titles::{self, TitleTier};
use crate::models::NewRewardClaim;
use crate::schema::reward_claims;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::PgConnection;

#[derive(Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed { title: &'static TitleTier },
    /// No reward-bearing tier has this name.
    UnknownTitle,
    NotEnoughPoints { required: i32, current: i32 },
    AlreadyClaimed,
}

/// What `claim_reward` reports when called without a tier name.
#[derive(Debug)]
pub struct RewardSummary {
    pub total_points: i32,
    pub current_title: &'static TitleTier,
    pub available: Vec<&'static TitleTier>,
    /// The nearest unreached reward tier and the points still missing.
    pub next_reward: Option<(&'static TitleTier, i32)>,
}

pub fn available_rewards(
    pool: &PgPool,
    identity: &AccountIdentity,
) -> Result<RewardSummary, DbError> {
    let conn = &mut pool.get()?;
    let user = ensure_account_on(conn, identity)?;
    let claimed = claimed_titles(conn, user.telegram_id)?;
    Ok(summarize(user.total_points, &claimed))
}

pub fn claim_reward(
    pool: &PgPool,
    identity: &AccountIdentity,
    title_name: &str,
) -> Result<ClaimOutcome, DbError> {
    let Some(title) = titles::find_reward_tier(title_name.trim()) else {
        return Ok(ClaimOutcome::UnknownTitle);
    };

    let conn = &mut pool.get()?;
    conn.transaction(|conn| {
        ensure_account_on(conn, identity)?;
        let user = lock_account(conn, identity.telegram_id)?;

        if user.total_points < title.min_points {
            return Ok(ClaimOutcome::NotEnoughPoints {
                required: title.min_points,
                current: user.total_points,
            });
        }

        let inserted = conn.transaction(|conn| {
            diesel::insert_into(reward_claims::table)
                .values(&NewRewardClaim {
                    telegram_id: identity.telegram_id,
                    title_name: title.name,
                })
                .execute(conn)
        });
        match inserted {
            Ok(_) => {
                tracing::info!(
                    telegram_id = identity.telegram_id,
                    title = title.name,
                    "reward claimed"
                );
                Ok(ClaimOutcome::Claimed { title })
            }
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Ok(ClaimOutcome::AlreadyClaimed)
            }
            Err(e) => Err(e.into()),
        }
    })
}

pub(crate) fn claimed_titles(
    conn: &mut PgConnection,
    telegram_id: i64,
) -> Result<Vec<String>, DbError> {
    Ok(reward_claims::table
        .filter(reward_claims::telegram_id.eq(telegram_id))
        .select(reward_claims::title_name)
        .load(conn)?)
}

pub(crate) fn summarize(total_points: i32, claimed: &[String]) -> RewardSummary {
    let available: Vec<&'static TitleTier> = titles::TITLES
        .iter()
        .filter(|t| {
            t.reward.is_some()
                && total_points >= t.min_points
                && !claimed.iter().any(|c| c == t.name)
        })
        .collect();

    let next_reward = titles::TITLES
        .iter()
        .find(|t| t.reward.is_some() && t.min_points > total_points)
        .map(|t| (t, t.min_points - total_points));

    RewardSummary {
        total_points,
        current_title: titles::title_for_points(total_points),
        available,
        next_reward,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_reached_unclaimed_reward_tiers() {
        let summary = summarize(1200, &[]);
        let names: Vec<&str> = summary.available.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Bookworm", "Scholar"]);
        assert_eq!(summary.current_title.name, "Scholar");
    }

    #[test]
    fn test_summary_excludes_already_claimed() {
        let summary = summarize(1200, &["Bookworm".to_string()]);
        let names: Vec<&str> = summary.available.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Scholar"]);
    }

    #[test]
    fn test_summary_reports_next_reward_distance() {
        let summary = summarize(250, &[]);
        assert!(summary.available.is_empty());
        let (next, needed) = summary.next_reward.unwrap();
        assert_eq!(next.name, "Bookworm");
        assert_eq!(needed, 50);
    }

    #[test]
    fn test_summary_skips_rewardless_tiers_for_next() {
        // 1500 ("Sage") carries no reward; from 1200 the next reward tier
        // is "Philosopher".
        let (next, _) = summarize(1200, &[]).next_reward.unwrap();
        assert_eq!(next.name, "Philosopher");
    }

    #[test]
    fn test_summary_at_top_tier_has_no_next() {
        let summary = summarize(10000, &[]);
        assert!(summary.next_reward.is_none());
    }
}
