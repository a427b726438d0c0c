//! Daily check-in streak tracker. One check-in per calendar day; a streak
//! continues only from exactly yesterday and resets to 1 otherwise. Exact
//! multiples of 30 days grant the month bonus, other multiples of 7 the
//! week bonus.

use crate::db::{DbError, PgPool};
use crate::ledger::accounts::{credit_points, ensure_account_on, lock_account, AccountIdentity};
use crate::ledger::{today, LedgerConfig};
use crate::models::NewDailyActivity;
use crate::schema::{daily_activity, users};
use chrono::{Duration, NaiveDate};
use diesel::prelude::*;

#[derive(Debug, PartialEq, Eq)]
pub enum CheckinOutcome {
    CheckedIn {
        base: i32,
        bonus: i32,
        streak: i32,
    },
    /// Idempotent repeat on the same day; nothing written.
    AlreadyCheckedIn { streak: i32 },
}

pub fn check_in(
    pool: &PgPool,
    config: &LedgerConfig,
    identity: &AccountIdentity,
) -> Result<CheckinOutcome, DbError> {
    let conn = &mut pool.get()?;
    conn.transaction(|conn| {
        ensure_account_on(conn, identity)?;
        // Lock before reading the streak, or two concurrent check-ins
        // could both pass the "not today" test and double-award.
        let user = lock_account(conn, identity.telegram_id)?;

        let date = today();
        let (streak, bonus) =
            match decide_checkin(config, user.last_checkin, date, user.daily_streak) {
                CheckinDecision::AlreadyCheckedIn { streak } => {
                    return Ok(CheckinOutcome::AlreadyCheckedIn { streak });
                }
                CheckinDecision::CheckIn { streak, bonus } => (streak, bonus),
            };

        diesel::update(&user)
            .set((
                users::daily_streak.eq(streak),
                users::last_checkin.eq(Some(date)),
            ))
            .execute(conn)?;
        credit_points(conn, identity.telegram_id, config.checkin_points + bonus)?;

        diesel::insert_into(daily_activity::table)
            .values(&NewDailyActivity {
                telegram_id: identity.telegram_id,
                activity_date: date,
                message_count: 0,
                daily_points: 0,
                checked_in: true,
            })
            .on_conflict((daily_activity::telegram_id, daily_activity::activity_date))
            .do_update()
            .set(daily_activity::checked_in.eq(true))
            .execute(conn)?;

        tracing::info!(
            telegram_id = identity.telegram_id,
            streak,
            bonus,
            "daily check-in recorded"
        );

        Ok(CheckinOutcome::CheckedIn {
            base: config.checkin_points,
            bonus,
            streak,
        })
    })
}

#[derive(Debug, PartialEq, Eq)]
enum CheckinDecision {
    AlreadyCheckedIn { streak: i32 },
    CheckIn { streak: i32, bonus: i32 },
}

/// The whole decision for one check-in attempt, given the locked row's
/// state. A same-day repeat never writes.
fn decide_checkin(
    config: &LedgerConfig,
    last_checkin: Option<NaiveDate>,
    today: NaiveDate,
    current: i32,
) -> CheckinDecision {
    if last_checkin == Some(today) {
        return CheckinDecision::AlreadyCheckedIn { streak: current };
    }
    let streak = next_streak(last_checkin, today, current);
    CheckinDecision::CheckIn {
        streak,
        bonus: streak_bonus(config, streak),
    }
}

fn next_streak(last_checkin: Option<NaiveDate>, today: NaiveDate, current: i32) -> i32 {
    match last_checkin {
        Some(last) if last == today - Duration::days(1) => current + 1,
        _ => 1,
    }
}

fn streak_bonus(config: &LedgerConfig, streak: i32) -> i32 {
    if streak % 30 == 0 {
        config.month_bonus
    } else if streak % 7 == 0 {
        config.week_bonus
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn config() -> LedgerConfig {
        LedgerConfig::default()
    }

    #[test]
    fn test_same_day_checkin_is_idempotent() {
        // A repeat on the same calendar day returns the unchanged streak
        // and awards nothing.
        let decision = decide_checkin(&config(), Some(day(10)), day(10), 4);
        assert_eq!(decision, CheckinDecision::AlreadyCheckedIn { streak: 4 });
    }

    #[test]
    fn test_checkin_decision_pairs_streak_with_bonus() {
        let cfg = config();
        assert_eq!(
            decide_checkin(&cfg, Some(day(9)), day(10), 6),
            CheckinDecision::CheckIn {
                streak: 7,
                bonus: cfg.week_bonus,
            }
        );
        assert_eq!(
            decide_checkin(&cfg, None, day(10), 0),
            CheckinDecision::CheckIn { streak: 1, bonus: 0 }
        );
    }

    #[test]
    fn test_streak_continues_from_yesterday() {
        assert_eq!(next_streak(Some(day(9)), day(10), 4), 5);
    }

    #[test]
    fn test_streak_resets_after_gap_or_first_checkin() {
        assert_eq!(next_streak(Some(day(7)), day(10), 4), 1);
        assert_eq!(next_streak(None, day(10), 0), 1);
    }

    #[test]
    fn test_streak_day_sequence() {
        // Day D, D+1, then a skip to D+3.
        let s1 = next_streak(None, day(1), 0);
        assert_eq!(s1, 1);
        let s2 = next_streak(Some(day(1)), day(2), s1);
        assert_eq!(s2, 2);
        let s3 = next_streak(Some(day(2)), day(4), s2);
        assert_eq!(s3, 1);
    }

    #[test]
    fn test_week_bonus_on_multiples_of_seven() {
        let cfg = config();
        for streak in [7, 14, 21] {
            assert_eq!(streak_bonus(&cfg, streak), cfg.week_bonus);
        }
        for streak in [1, 6, 8, 13, 29] {
            assert_eq!(streak_bonus(&cfg, streak), 0);
        }
    }

    #[test]
    fn test_month_bonus_on_multiples_of_thirty() {
        let cfg = config();
        assert_eq!(streak_bonus(&cfg, 30), cfg.month_bonus);
        assert_eq!(streak_bonus(&cfg, 60), cfg.month_bonus);
    }

    #[test]
    fn test_month_bonus_wins_when_both_match() {
        // 210 is a multiple of both 7 and 30; the month bonus applies,
        // never both.
        let cfg = config();
        assert_eq!(streak_bonus(&cfg, 210), cfg.month_bonus);
    }
}
