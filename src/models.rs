use crate::schema::{daily_activity, referrals, reward_claims, users};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub total_points: i32,
    pub title_id: i32,
    pub referral_code: Option<String>,
    pub referral_count: i32,
    pub daily_streak: i32,
    pub last_checkin: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser<'a> {
    pub telegram_id: i64,
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub referral_code: &'a str,
}

#[derive(Debug, Queryable, Identifiable, Selectable)]
#[diesel(table_name = daily_activity)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DailyActivity {
    pub id: i32,
    pub telegram_id: i64,
    pub activity_date: NaiveDate,
    pub message_count: i32,
    pub daily_points: i32,
    pub checked_in: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = daily_activity)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewDailyActivity {
    pub telegram_id: i64,
    pub activity_date: NaiveDate,
    pub message_count: i32,
    pub daily_points: i32,
    pub checked_in: bool,
}

#[derive(Debug, Queryable, Identifiable, Selectable)]
#[diesel(table_name = referrals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Referral {
    pub id: i32,
    pub referrer_telegram_id: i64,
    pub referee_telegram_id: i64,
    pub code: String,
    pub awarded: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = referrals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewReferral<'a> {
    pub referrer_telegram_id: i64,
    pub referee_telegram_id: i64,
    pub code: &'a str,
    pub awarded: bool,
}

#[derive(Debug, Queryable, Identifiable, Selectable)]
#[diesel(table_name = reward_claims)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RewardClaim {
    pub id: i32,
    pub telegram_id: i64,
    pub title_name: String,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = reward_claims)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewRewardClaim<'a> {
    pub telegram_id: i64,
    pub title_name: &'a str,
}
