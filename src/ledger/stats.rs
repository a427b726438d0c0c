//! Read-only views over the ledger: a per-user engagement snapshot for the
//! /stats command and the aggregate counters served over HTTP.

use crate::db::{DbError, PgPool};
use crate::ledger::accounts::{ensure_account_on, AccountIdentity};
use crate::ledger::rewards::{claimed_titles, summarize};
use crate::ledger::titles::{self, TitleTier};
use crate::ledger::{today, LedgerConfig};
use crate::schema::{daily_activity, users};
use diesel::dsl::sum;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Debug)]
pub struct EngagementStats {
    pub total_points: i32,
    pub title: &'static TitleTier,
    pub next_title: Option<(&'static TitleTier, i32)>,
    pub daily_streak: i32,
    pub checked_in_today: bool,
    pub today_group_points: i32,
    pub remaining_group_points: i32,
    pub referral_code: Option<String>,
    pub referral_count: i32,
    pub available_rewards: Vec<&'static TitleTier>,
}

pub fn engagement_stats(
    pool: &PgPool,
    config: &LedgerConfig,
    identity: &AccountIdentity,
) -> Result<EngagementStats, DbError> {
    let conn = &mut pool.get()?;
    let user = ensure_account_on(conn, identity)?;

    let activity: Option<(i32, bool)> = daily_activity::table
        .filter(daily_activity::telegram_id.eq(user.telegram_id))
        .filter(daily_activity::activity_date.eq(today()))
        .select((daily_activity::daily_points, daily_activity::checked_in))
        .first(conn)
        .optional()?;
    let (today_group_points, checked_in_today) = activity.unwrap_or((0, false));

    let claimed = claimed_titles(conn, user.telegram_id)?;
    let summary = summarize(user.total_points, &claimed);

    Ok(EngagementStats {
        total_points: user.total_points,
        title: titles::title_for_points(user.total_points),
        next_title: titles::next_title(user.total_points),
        daily_streak: user.daily_streak,
        checked_in_today,
        today_group_points,
        remaining_group_points: (config.daily_cap - today_group_points).max(0),
        referral_code: user.referral_code,
        referral_count: user.referral_count,
        available_rewards: summary.available,
    })
}

#[derive(Debug, Serialize)]
pub struct GlobalStats {
    pub total_users: i64,
    pub checkins_today: i64,
    pub group_points_today: i64,
}

pub fn global_stats(pool: &PgPool) -> Result<GlobalStats, DbError> {
    let conn = &mut pool.get()?;
    let date = today();

    let total_users: i64 = users::table.count().get_result(conn)?;

    let checkins_today: i64 = daily_activity::table
        .filter(daily_activity::activity_date.eq(date))
        .filter(daily_activity::checked_in.eq(true))
        .count()
        .get_result(conn)?;

    let group_points_today: Option<i64> = daily_activity::table
        .filter(daily_activity::activity_date.eq(date))
        .select(sum(daily_activity::daily_points))
        .first(conn)?;

    Ok(GlobalStats {
        total_users,
        checkins_today,
        group_points_today: group_points_today.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_stats_serializes_flat() {
        let stats = GlobalStats {
            total_users: 42,
            checkins_today: 7,
            group_points_today: 180,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_users"], 42);
        assert_eq!(json["checkins_today"], 7);
        assert_eq!(json["group_points_today"], 180);
    }
}
