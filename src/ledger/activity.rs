//! Daily engagement ledger: group messages earn points up to a hard daily
//! cap. The whole read-modify-write runs in one transaction under a row
//! lock on the user, so concurrent deliveries for the same user can never
//! push the day's total past the cap.

use crate::db::{DbError, PgPool};
use crate::ledger::accounts::{credit_points, ensure_account_on, lock_account, AccountIdentity};
use crate::ledger::{today, LedgerConfig};
use crate::models::{DailyActivity, NewDailyActivity};
use crate::schema::daily_activity;
use diesel::prelude::*;

#[derive(Debug, PartialEq, Eq)]
pub enum ActivityOutcome {
    Awarded {
        points: i32,
        daily_total: i32,
        remaining: i32,
    },
    /// The cap was already exhausted before this message.
    CapReached { daily_total: i32 },
    /// Not the qualifying group; nothing was read or written.
    WrongChat,
}

pub fn award_group_activity(
    pool: &PgPool,
    config: &LedgerConfig,
    identity: &AccountIdentity,
    chat_id: i64,
) -> Result<ActivityOutcome, DbError> {
    if chat_id != config.group_chat_id {
        return Ok(ActivityOutcome::WrongChat);
    }

    let conn = &mut pool.get()?;
    conn.transaction(|conn| {
        ensure_account_on(conn, identity)?;
        lock_account(conn, identity.telegram_id)?;

        let date = today();
        let activity = daily_activity::table
            .filter(daily_activity::telegram_id.eq(identity.telegram_id))
            .filter(daily_activity::activity_date.eq(date))
            .for_update()
            .first::<DailyActivity>(conn)
            .optional()?;

        let current = activity.as_ref().map(|a| a.daily_points).unwrap_or(0);
        let points = clamped_award(current, config.points_per_message, config.daily_cap);

        if points == 0 {
            // Commit anyway to release the locks cleanly.
            return Ok(ActivityOutcome::CapReached {
                daily_total: current,
            });
        }

        match activity {
            Some(a) => {
                diesel::update(&a)
                    .set((
                        daily_activity::message_count.eq(a.message_count + 1),
                        daily_activity::daily_points.eq(a.daily_points + points),
                    ))
                    .execute(conn)?;
            }
            None => {
                diesel::insert_into(daily_activity::table)
                    .values(&NewDailyActivity {
                        telegram_id: identity.telegram_id,
                        activity_date: date,
                        message_count: 1,
                        daily_points: points,
                        checked_in: false,
                    })
                    .execute(conn)?;
            }
        }

        credit_points(conn, identity.telegram_id, points)?;

        let daily_total = current + points;
        tracing::info!(
            telegram_id = identity.telegram_id,
            points,
            daily_total,
            "group activity points awarded"
        );

        Ok(ActivityOutcome::Awarded {
            points,
            daily_total,
            remaining: config.daily_cap - daily_total,
        })
    })
}

/// Points for one message given today's running total: the per-message
/// amount, clamped so the daily total never exceeds the cap.
fn clamped_award(current: i32, per_message: i32, cap: i32) -> i32 {
    per_message.min(cap - current).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_award_is_per_message_amount_below_cap() {
        assert_eq!(clamped_award(0, 2, 20), 2);
        assert_eq!(clamped_award(16, 2, 20), 2);
    }

    #[test]
    fn test_award_clamps_at_cap_boundary() {
        assert_eq!(clamped_award(19, 2, 20), 1);
        assert_eq!(clamped_award(20, 2, 20), 0);
        assert_eq!(clamped_award(25, 2, 20), 0);
    }

    #[test]
    fn test_fifteen_messages_stop_at_cap() {
        // 15 messages at 2 points with a cap of 20: the first ten award,
        // the rest return zero.
        let mut total = 0;
        let mut awards = Vec::new();
        for _ in 0..15 {
            let points = clamped_award(total, 2, 20);
            total += points;
            awards.push(points);
        }
        assert_eq!(total, 20);
        assert_eq!(awards.iter().sum::<i32>(), 20);
        assert!(awards[..10].iter().all(|&p| p == 2));
        assert!(awards[10..].iter().all(|&p| p == 0));
    }
}
