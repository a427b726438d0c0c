pub mod accounts;
pub mod activity;
pub mod checkin;
pub mod referrals;
pub mod rewards;
pub mod stats;
pub mod titles;

use chrono::{NaiveDate, Utc};

/// Tunable point amounts for the engagement ledger. Defaults mirror the
/// values the bot has always used; `AppConfig` overrides them from env.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Only messages in this group earn activity points.
    pub group_chat_id: i64,
    pub points_per_message: i32,
    pub daily_cap: i32,
    pub checkin_points: i32,
    pub week_bonus: i32,
    pub month_bonus: i32,
    pub referrer_bonus: i32,
    pub referee_bonus: i32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            group_chat_id: 0,
            points_per_message: 2,
            daily_cap: 20,
            checkin_points: 5,
            week_bonus: 20,
            month_bonus: 100,
            referrer_bonus: 50,
            referee_bonus: 25,
        }
    }
}

/// All calendar-day logic (daily cap, streaks) runs on the UTC date.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
