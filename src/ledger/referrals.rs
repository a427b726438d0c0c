//! Referral ledger: a one-time redemption crediting both parties. The
//! existence check and referrer lookup run under row locks in the same
//! transaction; the unique constraint on the referee column is the
//! backstop if two redemptions race anyway.

use crate::db::{DbError, PgPool};
use crate::ledger::accounts::{credit_points, ensure_account_on, AccountIdentity};
use crate::ledger::LedgerConfig;
use crate::models::{NewReferral, Referral, User};
use crate::schema::{referrals, users};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

#[derive(Debug, PartialEq, Eq)]
pub enum ReferralOutcome {
    Redeemed {
        referrer_points: i32,
        referee_points: i32,
        referrer_name: Option<String>,
    },
    /// The referee has redeemed a code before, ever.
    AlreadyRedeemed,
    InvalidCode,
    SelfReferral,
}

pub fn redeem_referral(
    pool: &PgPool,
    config: &LedgerConfig,
    code: &str,
    referee: &AccountIdentity,
) -> Result<ReferralOutcome, DbError> {
    let code = code.trim();
    let conn = &mut pool.get()?;

    conn.transaction(|conn| {
        let existing = referrals::table
            .filter(referrals::referee_telegram_id.eq(referee.telegram_id))
            .for_update()
            .first::<Referral>(conn)
            .optional()?;

        let referrer = users::table
            .filter(users::referral_code.eq(code))
            .for_update()
            .first::<User>(conn)
            .optional()?;
        if let Some(rejection) = redemption_rejection(
            existing.is_some(),
            referrer.as_ref().map(|r| r.telegram_id),
            referee.telegram_id,
        ) {
            return Ok(rejection);
        }
        let Some(referrer) = referrer else {
            return Ok(ReferralOutcome::InvalidCode);
        };

        ensure_account_on(conn, referee)?;

        let inserted = conn.transaction(|conn| {
            diesel::insert_into(referrals::table)
                .values(&NewReferral {
                    referrer_telegram_id: referrer.telegram_id,
                    referee_telegram_id: referee.telegram_id,
                    code,
                    awarded: true,
                })
                .execute(conn)
        });
        match inserted {
            Ok(_) => {}
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                // A concurrent redemption by the same referee won the race.
                return Ok(ReferralOutcome::AlreadyRedeemed);
            }
            Err(e) => return Err(e.into()),
        }

        credit_points(conn, referrer.telegram_id, config.referrer_bonus)?;
        diesel::update(&referrer)
            .set(users::referral_count.eq(users::referral_count + 1))
            .execute(conn)?;
        credit_points(conn, referee.telegram_id, config.referee_bonus)?;

        tracing::info!(
            referrer = referrer.telegram_id,
            referee = referee.telegram_id,
            "referral redeemed"
        );

        Ok(ReferralOutcome::Redeemed {
            referrer_points: config.referrer_bonus,
            referee_points: config.referee_bonus,
            referrer_name: referrer.first_name.clone(),
        })
    })
}

/// Validation order for one redemption attempt: a prior redemption by this
/// referee rejects first, then an unknown code, then self-referral. `None`
/// means the redemption may proceed.
fn redemption_rejection(
    already_redeemed: bool,
    referrer_id: Option<i64>,
    referee_id: i64,
) -> Option<ReferralOutcome> {
    if already_redeemed {
        return Some(ReferralOutcome::AlreadyRedeemed);
    }
    match referrer_id {
        None => Some(ReferralOutcome::InvalidCode),
        Some(id) if id == referee_id => Some(ReferralOutcome::SelfReferral),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_redemption_passes() {
        assert_eq!(redemption_rejection(false, Some(10), 20), None);
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(
            redemption_rejection(false, None, 20),
            Some(ReferralOutcome::InvalidCode)
        );
    }

    #[test]
    fn test_self_referral_rejected() {
        assert_eq!(
            redemption_rejection(false, Some(20), 20),
            Some(ReferralOutcome::SelfReferral)
        );
    }

    #[test]
    fn test_second_redemption_rejected_even_with_valid_code() {
        // A referee is referred at most once, ever: a later attempt with a
        // different valid code still rejects.
        assert_eq!(
            redemption_rejection(true, Some(10), 20),
            Some(ReferralOutcome::AlreadyRedeemed)
        );
    }

    #[test]
    fn test_prior_redemption_wins_over_other_rejections() {
        assert_eq!(
            redemption_rejection(true, None, 20),
            Some(ReferralOutcome::AlreadyRedeemed)
        );
        assert_eq!(
            redemption_rejection(true, Some(20), 20),
            Some(ReferralOutcome::AlreadyRedeemed)
        );
    }
}
