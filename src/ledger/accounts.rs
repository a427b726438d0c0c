//! Account registry: lazily creates a `users` row on first contact and
//! keeps the stored identity fresh without letting Telegram placeholder
//! values overwrite real names.

use crate::db::{DbError, PgPool};
use crate::ledger::titles;
use crate::models::{NewUser, User};
use crate::schema::users;
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::PgConnection;
use rand::{thread_rng, Rng};

/// What the webhook layer substitutes when Telegram omits a field.
pub const PLACEHOLDER_USERNAME: &str = "unknown";
pub const PLACEHOLDER_FIRST_NAME: &str = "user";

const CODE_ATTEMPTS: usize = 4;
const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Copy)]
pub struct AccountIdentity<'a> {
    pub telegram_id: i64,
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
}

pub(crate) fn generate_referral_code() -> String {
    let mut rng = thread_rng();
    let suffix: String = (0..5)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect();
    format!("ref_{}", suffix)
}

pub fn ensure_account(pool: &PgPool, identity: &AccountIdentity) -> Result<User, DbError> {
    let conn = &mut pool.get()?;
    ensure_account_on(conn, identity)
}

/// Insert-or-refresh inside the caller's transaction. "Already exists" is
/// the normal path, never an error.
pub(crate) fn ensure_account_on(
    conn: &mut PgConnection,
    identity: &AccountIdentity,
) -> Result<User, DbError> {
    let existing = users::table
        .filter(users::telegram_id.eq(identity.telegram_id))
        .first::<User>(conn)
        .optional()?;

    match existing {
        Some(user) => refresh_identity(conn, user, identity),
        None => insert_account(conn, identity),
    }
}

fn insert_account(conn: &mut PgConnection, identity: &AccountIdentity) -> Result<User, DbError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let code = generate_referral_code();
        let new_user = NewUser {
            telegram_id: identity.telegram_id,
            username: non_placeholder(identity.username, PLACEHOLDER_USERNAME),
            first_name: non_placeholder(identity.first_name, PLACEHOLDER_FIRST_NAME),
            referral_code: &code,
        };

        // Savepoint, so a unique violation does not poison the outer
        // transaction.
        let inserted = conn.transaction(|conn| {
            diesel::insert_into(users::table)
                .values(&new_user)
                .get_result::<User>(conn)
        });

        match inserted {
            Ok(user) => return Ok(user),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
                if attempt < CODE_ATTEMPTS =>
            {
                // Either a concurrent request created this user first, or
                // the generated code collided with an existing one.
                if let Some(user) = users::table
                    .filter(users::telegram_id.eq(identity.telegram_id))
                    .first::<User>(conn)
                    .optional()?
                {
                    return refresh_identity(conn, user, identity);
                }
                tracing::warn!(
                    telegram_id = identity.telegram_id,
                    "referral code collision, regenerating"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn refresh_identity(
    conn: &mut PgConnection,
    user: User,
    identity: &AccountIdentity,
) -> Result<User, DbError> {
    let username = refreshed_value(
        identity.username,
        user.username.as_deref(),
        PLACEHOLDER_USERNAME,
    );
    let first_name = refreshed_value(
        identity.first_name,
        user.first_name.as_deref(),
        PLACEHOLDER_FIRST_NAME,
    );

    let updated = match (username, first_name) {
        (None, None) => return Ok(user),
        (Some(u), Some(f)) => diesel::update(&user)
            .set((
                users::username.eq(u),
                users::first_name.eq(f),
                users::updated_at.eq(Utc::now()),
            ))
            .get_result(conn)?,
        (Some(u), None) => diesel::update(&user)
            .set((users::username.eq(u), users::updated_at.eq(Utc::now())))
            .get_result(conn)?,
        (None, Some(f)) => diesel::update(&user)
            .set((users::first_name.eq(f), users::updated_at.eq(Utc::now())))
            .get_result(conn)?,
    };

    Ok(updated)
}

/// A new value is worth storing only when it is real and actually differs.
fn refreshed_value<'a>(
    new: Option<&'a str>,
    stored: Option<&str>,
    placeholder: &str,
) -> Option<&'a str> {
    match new {
        Some(v) if !v.is_empty() && v != placeholder && Some(v) != stored => Some(v),
        _ => None,
    }
}

fn non_placeholder<'a>(value: Option<&'a str>, placeholder: &str) -> Option<&'a str> {
    value.filter(|v| !v.is_empty() && *v != placeholder)
}

/// `SELECT ... FOR UPDATE` on the user row. Every read-modify-write in the
/// ledger takes this lock first, which serializes concurrent webhook
/// deliveries for the same user.
pub(crate) fn lock_account(conn: &mut PgConnection, telegram_id: i64) -> Result<User, DbError> {
    Ok(users::table
        .filter(users::telegram_id.eq(telegram_id))
        .for_update()
        .first::<User>(conn)?)
}

/// Add points to the running total and refresh the cached title tier.
/// Returns the new total.
pub(crate) fn credit_points(
    conn: &mut PgConnection,
    telegram_id: i64,
    points: i32,
) -> Result<i32, DbError> {
    let new_total: i32 = diesel::update(users::table.filter(users::telegram_id.eq(telegram_id)))
        .set((
            users::total_points.eq(users::total_points + points),
            users::updated_at.eq(Utc::now()),
        ))
        .returning(users::total_points)
        .get_result(conn)?;

    let tier = titles::title_for_points(new_total);
    diesel::update(users::table.filter(users::telegram_id.eq(telegram_id)))
        .set(users::title_id.eq(tier.id))
        .execute(conn)?;

    Ok(new_total)
}

/// The caller's referral code and how many users they have referred,
/// generating a code for legacy rows that never got one.
pub fn referral_code(pool: &PgPool, identity: &AccountIdentity) -> Result<(String, i32), DbError> {
    let conn = &mut pool.get()?;
    let user = ensure_account_on(conn, identity)?;

    if let Some(code) = &user.referral_code {
        return Ok((code.clone(), user.referral_count));
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        let code = generate_referral_code();
        // The NULL guard makes this update a no-op when a concurrent call
        // stored a code first.
        let updated = conn.transaction(|conn| {
            diesel::update(
                users::table
                    .filter(users::telegram_id.eq(identity.telegram_id))
                    .filter(users::referral_code.is_null()),
            )
            .set(users::referral_code.eq(code.as_str()))
            .execute(conn)
        });
        match updated {
            Ok(rows) => {
                if rows > 0 {
                    return Ok((code, user.referral_count));
                }
                let current = users::table
                    .filter(users::telegram_id.eq(identity.telegram_id))
                    .first::<User>(conn)?;
                return Ok((
                    code_to_report(rows, code, current.referral_code),
                    current.referral_count,
                ));
            }
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
                if attempt < CODE_ATTEMPTS =>
            {
                tracing::warn!(
                    telegram_id = identity.telegram_id,
                    "referral code collision, regenerating"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// The code a generating call hands back: its own generated code when its
/// guarded update stored it, otherwise whatever a concurrent call stored.
fn code_to_report(rows_updated: usize, generated: String, stored: Option<String>) -> String {
    if rows_updated > 0 {
        generated
    } else {
        stored.unwrap_or(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_code_format() {
        for _ in 0..50 {
            let code = generate_referral_code();
            assert_eq!(code.len(), 9);
            assert!(code.starts_with("ref_"));
            assert!(code[4..]
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_losing_code_generator_reports_the_stored_code() {
        // When the guarded update hits zero rows, a concurrent call won;
        // the stored code is the one every caller must see.
        assert_eq!(
            code_to_report(0, "ref_AAAAA".into(), Some("ref_BBBBB".into())),
            "ref_BBBBB"
        );
        assert_eq!(code_to_report(1, "ref_AAAAA".into(), None), "ref_AAAAA");
    }

    #[test]
    fn test_refreshed_value_accepts_real_changes() {
        assert_eq!(
            refreshed_value(Some("alice"), Some("old"), PLACEHOLDER_USERNAME),
            Some("alice")
        );
        assert_eq!(
            refreshed_value(Some("alice"), None, PLACEHOLDER_USERNAME),
            Some("alice")
        );
    }

    #[test]
    fn test_refreshed_value_never_stores_placeholders() {
        assert_eq!(
            refreshed_value(Some("unknown"), Some("alice"), PLACEHOLDER_USERNAME),
            None
        );
        assert_eq!(
            refreshed_value(Some("user"), Some("Alice"), PLACEHOLDER_FIRST_NAME),
            None
        );
        assert_eq!(refreshed_value(Some(""), None, PLACEHOLDER_USERNAME), None);
    }

    #[test]
    fn test_refreshed_value_skips_unchanged() {
        assert_eq!(
            refreshed_value(Some("alice"), Some("alice"), PLACEHOLDER_USERNAME),
            None
        );
        assert_eq!(refreshed_value(None, Some("alice"), PLACEHOLDER_USERNAME), None);
    }
}
