use crate::db::{DbError, PgPool};
use crate::ledger::accounts::{self, AccountIdentity};
use crate::ledger::activity::{self, ActivityOutcome};
use crate::ledger::checkin::{self, CheckinOutcome};
use crate::ledger::referrals::{self, ReferralOutcome};
use crate::ledger::rewards::{self, ClaimOutcome, RewardSummary};
use crate::ledger::stats::{self, EngagementStats};
use crate::ledger::LedgerConfig;
use crate::utils::telegram_admin::notify_admin;
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::macros::BotCommands;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::LoggingErrorHandler;
use teloxide::prelude::{ChatId, Message, Requester, ResponseResult, Update};
use teloxide::types::{ParseMode, User};
use teloxide::{dptree, filter_command, Bot};

const SERVICE_UNAVAILABLE: &str =
    "⚠️ The service is temporarily unavailable. Please try again in a moment.";

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub admin_chat_id: i64,
    pub admin_notifications: bool,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone)]
pub struct BotService {
    pub bot: Bot,
    config: BotConfig,
    pool: PgPool,
}

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
enum Command {
    #[command(description = "create your account and see how points work.")]
    Start(String),
    #[command(description = "daily check-in to keep your streak going.")]
    Checkin,
    #[command(description = "show your referral code.")]
    Referral,
    #[command(description = "redeem a referral code. Usage: /redeem ref_AB12C")]
    Redeem(String),
    #[command(description = "claim a title reward, or list what you can claim.")]
    Claim(String),
    #[command(description = "show your engagement stats.")]
    Stats,
}

fn identity_of(user: &User) -> AccountIdentity<'_> {
    AccountIdentity {
        telegram_id: user.id.0 as i64,
        username: user.username.as_deref(),
        first_name: Some(user.first_name.as_str()),
    }
}

impl BotService {
    pub fn new(config: BotConfig, pool: PgPool) -> Self {
        BotService {
            bot: Bot::new(&config.token),
            config,
            pool,
        }
    }

    async fn handle_command(&self, msg: Message, cmd: Command) -> ResponseResult<()> {
        let Some(from) = msg.from() else {
            return Ok(());
        };
        if from.is_bot {
            return Ok(());
        }
        let identity = identity_of(from);
        let chat_id = msg.chat.id.0;

        let reply = match cmd {
            Command::Start(payload) => self.handle_start(&identity, payload.trim()),
            Command::Checkin => self.handle_checkin(&identity),
            Command::Referral => self.handle_referral(&identity),
            Command::Redeem(code) => self.handle_redeem(&identity, code.trim()),
            Command::Claim(title) => self.handle_claim(&identity, title.trim()),
            Command::Stats => self.handle_stats(&identity),
        };

        self.send_html(chat_id, reply).await
    }

    fn handle_start(&self, identity: &AccountIdentity, payload: &str) -> String {
        // Deep links carry a referral code: t.me/<bot>?start=ref_AB12C
        if !payload.is_empty() {
            return self.handle_redeem(identity, payload);
        }

        match accounts::ensure_account(&self.pool, identity) {
            Ok(user) => render_welcome(user.referral_code.as_deref()),
            Err(e) => self.db_failure("start", e),
        }
    }

    fn handle_checkin(&self, identity: &AccountIdentity) -> String {
        match checkin::check_in(&self.pool, &self.config.ledger, identity) {
            Ok(outcome) => render_checkin(&outcome),
            Err(e) => self.db_failure("checkin", e),
        }
    }

    fn handle_referral(&self, identity: &AccountIdentity) -> String {
        match accounts::referral_code(&self.pool, identity) {
            Ok((code, count)) => render_referral_code(&code, count, &self.config.ledger),
            Err(e) => self.db_failure("referral", e),
        }
    }

    fn handle_redeem(&self, identity: &AccountIdentity, code: &str) -> String {
        if code.is_empty() {
            return "Send the code with the command, e.g. <code>/redeem ref_AB12C</code>."
                .to_string();
        }
        match referrals::redeem_referral(&self.pool, &self.config.ledger, code, identity) {
            Ok(outcome) => render_referral(&outcome),
            Err(e) => self.db_failure("redeem", e),
        }
    }

    fn handle_claim(&self, identity: &AccountIdentity, title: &str) -> String {
        if title.is_empty() {
            return match rewards::available_rewards(&self.pool, identity) {
                Ok(summary) => render_reward_summary(&summary),
                Err(e) => self.db_failure("claim", e),
            };
        }

        match rewards::claim_reward(&self.pool, identity, title) {
            Ok(outcome) => {
                if let ClaimOutcome::Claimed { title } = &outcome {
                    if self.config.admin_notifications {
                        notify_admin(
                            self.bot.clone(),
                            self.config.admin_chat_id,
                            render_admin_claim_alert(identity, title.name, title.reward),
                        );
                    }
                }
                render_claim(&outcome)
            }
            Err(e) => self.db_failure("claim", e),
        }
    }

    fn handle_stats(&self, identity: &AccountIdentity) -> String {
        match stats::engagement_stats(&self.pool, &self.config.ledger, identity) {
            Ok(stats) => render_stats(&stats, &self.config.ledger),
            Err(e) => self.db_failure("stats", e),
        }
    }

    /// Every non-command message lands here; points only accrue in the
    /// configured group.
    async fn handle_group_message(&self, msg: Message) -> ResponseResult<()> {
        let Some(from) = msg.from() else {
            return Ok(());
        };
        if from.is_bot {
            return Ok(());
        }
        let chat_id = msg.chat.id.0;
        if chat_id == self.config.admin_chat_id {
            return Ok(());
        }
        // Channel posts forwarded into the discussion group are not member
        // activity.
        if msg.forward_from_chat().is_some() {
            return Ok(());
        }
        if msg.text().is_none() {
            return Ok(());
        }

        let identity = identity_of(from);
        match activity::award_group_activity(&self.pool, &self.config.ledger, &identity, chat_id)
        {
            Ok(ActivityOutcome::WrongChat) => {
                if msg.chat.is_private() {
                    self.send_html(
                        chat_id,
                        "Activity points are only awarded in the official book club group."
                            .to_string(),
                    )
                    .await?;
                }
                Ok(())
            }
            Ok(outcome) => {
                self.send_html(chat_id, render_activity(&outcome, &self.config.ledger))
                    .await
            }
            Err(e) => {
                let reply = self.db_failure("group activity", e);
                self.send_html(chat_id, reply).await
            }
        }
    }

    fn db_failure(&self, operation: &str, e: DbError) -> String {
        tracing::error!("{} failed: {}", operation, e);
        SERVICE_UNAVAILABLE.to_string()
    }

    async fn send_html(&self, chat_id: i64, message: String) -> ResponseResult<()> {
        tracing::debug!("Sending message to {}: {}", chat_id, message);
        self.bot
            .send_message(ChatId(chat_id), message)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    pub async fn run_bot(self) {
        tracing::info!("Starting digest bot...");

        let handler = Update::filter_message()
            .branch(filter_command::<Command, _>().endpoint(
                move |msg: Message, cmd: Command, bot: BotService| async move {
                    bot.handle_command(msg, cmd).await
                },
            ))
            .branch(dptree::endpoint(
                move |msg: Message, bot: BotService| async move {
                    bot.handle_group_message(msg).await
                },
            ));

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self])
            .default_handler(|_| async {})
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        tracing::info!("Closing digest bot... Goodbye!");
    }
}

fn render_welcome(referral_code: Option<&str>) -> String {
    let code_line = referral_code
        .map(|c| format!("\n🔗 Your referral code: <code>{}</code>", c))
        .unwrap_or_default();
    format!(
        "📚 <b>Welcome to the book club!</b>\n\n\
         Earn points by being active:\n\
         • chat in the group\n\
         • /checkin every day to build a streak\n\
         • invite friends with /referral\n\
         • /claim rewards when your title grows\n\
         • /stats to see where you stand{}",
        code_line
    )
}

fn render_activity(outcome: &ActivityOutcome, config: &LedgerConfig) -> String {
    match outcome {
        ActivityOutcome::Awarded {
            points,
            daily_total,
            ..
        } => format!(
            "+{} points! 📊 Today: {}/{}",
            points, daily_total, config.daily_cap
        ),
        ActivityOutcome::CapReached { .. } => format!(
            "🎉 You reached today's cap of {} points! Come back tomorrow for more.",
            config.daily_cap
        ),
        ActivityOutcome::WrongChat => {
            "Activity points are only awarded in the official book club group.".to_string()
        }
    }
}

fn render_checkin(outcome: &CheckinOutcome) -> String {
    match outcome {
        CheckinOutcome::CheckedIn {
            base,
            bonus,
            streak,
        } => {
            let bonus_line = if *bonus > 0 {
                format!("\n🎉 <b>Streak bonus!</b> +{} extra points!", bonus)
            } else {
                String::new()
            };
            format!(
                "✅ <b>Checked in!</b>\n\n+{} points {}\n{} <b>Streak:</b> {} days in a row{}\n\n\
                 💡 <i>Check in every day to earn streak bonuses!</i>",
                base,
                streak_emoji(*streak),
                streak_emoji(*streak),
                streak,
                bonus_line
            )
        }
        CheckinOutcome::AlreadyCheckedIn { streak } => format!(
            "✅ You already checked in today!\n🔥 Current streak: <b>{}</b> days\n\n\
             ⏰ <b>Come back tomorrow</b> to keep it alive and earn more points!",
            streak
        ),
    }
}

fn render_referral_code(code: &str, count: i32, config: &LedgerConfig) -> String {
    format!(
        "<b>🔗 Your referral code:</b>\n\n<code>{}</code>\n\n\
         📊 <b>Referrals so far:</b> {}\n\n\
         <b>🎁 Rewards:</b>\n\
         • you get <b>+{} points</b> per friend\n\
         • your friend gets <b>+{} points</b>\n\n\
         💡 <i>Share the code with your friends!</i>",
        code, count, config.referrer_bonus, config.referee_bonus
    )
}

fn render_referral(outcome: &ReferralOutcome) -> String {
    match outcome {
        ReferralOutcome::Redeemed {
            referrer_points,
            referee_points,
            referrer_name,
        } => format!(
            "🎉 <b>Referral code accepted!</b>\n\n\
             ✅ You received <b>+{} points</b> as a welcome gift!\n\
             ✅ <b>{}</b> received <b>+{} points</b>\n\n\
             💡 <i>Create your own code with /referral and invite your friends!</i>",
            referee_points,
            referrer_name.as_deref().unwrap_or("your friend"),
            referrer_points
        ),
        ReferralOutcome::AlreadyRedeemed => {
            "⚠️ You have already used a referral code. Only one code can ever be redeemed."
                .to_string()
        }
        ReferralOutcome::InvalidCode => {
            "❌ That referral code is not valid. Check the code and try again.".to_string()
        }
        ReferralOutcome::SelfReferral => {
            "❌ You cannot redeem your own referral code!".to_string()
        }
    }
}

fn render_reward_summary(summary: &RewardSummary) -> String {
    if summary.available.is_empty() {
        let next_line = summary
            .next_reward
            .map(|(t, needed)| {
                format!(
                    "\n\n🔜 <b>Next reward:</b> {} ({})\n💪 You need <b>{}</b> more points",
                    t.name,
                    t.reward.unwrap_or(""),
                    needed
                )
            })
            .unwrap_or_default();
        format!(
            "📊 <b>Reward status</b>\n\n\
             🏆 <b>Current title:</b> {}\n\
             📈 <b>Your points:</b> {}\n\n\
             ⚠️ No rewards available to claim right now.{}",
            summary.current_title.name, summary.total_points, next_line
        )
    } else {
        let lines: Vec<String> = summary
            .available
            .iter()
            .map(|t| format!("🎁 <b>{}</b>: {}", t.name, t.reward.unwrap_or("")))
            .collect();
        format!(
            "🎁 <b>Rewards you can claim</b>\n\n{}\n\n\
             📊 <b>Your points:</b> {}\n🏆 <b>Your title:</b> {}\n\n\
             💡 To claim one, send: <code>/claim title</code>",
            lines.join("\n"),
            summary.total_points,
            summary.current_title.name
        )
    }
}

fn render_claim(outcome: &ClaimOutcome) -> String {
    match outcome {
        ClaimOutcome::Claimed { title } => format!(
            "🎉 <b>Reward claim recorded!</b>\n\n\
             🏆 <b>Title:</b> {}\n🎁 <b>Reward:</b> {}\n\n\
             ✅ The admins have been notified and will contact you soon.",
            title.name,
            title.reward.unwrap_or("")
        ),
        ClaimOutcome::UnknownTitle => {
            "❌ No reward exists for that title. Send /claim to see what you can claim."
                .to_string()
        }
        ClaimOutcome::NotEnoughPoints { required, current } => format!(
            "❌ You need <b>{}</b> points for that reward.\n📊 Your points: <b>{}</b>\n\
             💪 Still to go: <b>{}</b>",
            required,
            current,
            required - current
        ),
        ClaimOutcome::AlreadyClaimed => {
            "⚠️ You already claimed that title's reward! Each reward can be claimed once."
                .to_string()
        }
    }
}

fn render_stats(stats: &EngagementStats, config: &LedgerConfig) -> String {
    let checkin_line = if stats.checked_in_today {
        "✅ <b>Daily check-in:</b> done"
    } else {
        "⏰ <b>Daily check-in:</b> not yet"
    };
    let remaining_line = if stats.remaining_group_points > 0 {
        format!("💡 {} points still available today", stats.remaining_group_points)
    } else {
        "🎉 You hit today's cap!".to_string()
    };
    let next_line = stats
        .next_title
        .map(|(t, needed)| format!("\n💪 {} points to reach <b>{}</b>", needed, t.name))
        .unwrap_or_default();
    let rewards_line = if stats.available_rewards.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = stats
            .available_rewards
            .iter()
            .map(|t| format!("• {}: {}", t.name, t.reward.unwrap_or("")))
            .collect();
        format!("\n\n🎁 <b>Rewards you can claim:</b>\n{}", lines.join("\n"))
    };

    format!(
        "<b>📈 Your engagement</b>\n\n\
         🏆 <b>Title:</b> {} ({} points){}\n\n\
         {} <b>Streak:</b> {} days\n{}\n\n\
         📊 <b>Group points today:</b> {}/{}\n{}\n\n\
         🔗 <b>Referrals:</b> {}\n<code>{}</code>{}",
        stats.title.name,
        stats.total_points,
        next_line,
        streak_emoji(stats.daily_streak),
        stats.daily_streak,
        checkin_line,
        stats.today_group_points,
        config.daily_cap,
        remaining_line,
        stats.referral_count,
        stats.referral_code.as_deref().unwrap_or("no code yet"),
        rewards_line
    )
}

fn render_admin_claim_alert(
    identity: &AccountIdentity,
    title_name: &str,
    reward: Option<&str>,
) -> String {
    format!(
        "🎁 <b>New reward claim!</b>\n\n\
         👤 <b>User:</b> {}\n🆔 <b>Id:</b> <code>{}</code>\n\n\
         🏆 <b>Title:</b> {}\n🎁 <b>Reward:</b> {}",
        identity
            .first_name
            .or(identity.username)
            .unwrap_or("unknown"),
        identity.telegram_id,
        title_name,
        reward.unwrap_or("")
    )
}

fn streak_emoji(streak: i32) -> &'static str {
    if streak >= 30 {
        "🏆"
    } else if streak >= 14 {
        "⭐"
    } else if streak >= 7 {
        "🌟"
    } else {
        "🔥"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_referral_outcome_renders_distinctly() {
        let outcomes = [
            ReferralOutcome::Redeemed {
                referrer_points: 50,
                referee_points: 25,
                referrer_name: None,
            },
            ReferralOutcome::AlreadyRedeemed,
            ReferralOutcome::InvalidCode,
            ReferralOutcome::SelfReferral,
        ];
        let rendered: Vec<String> = outcomes.iter().map(render_referral).collect();
        for (i, a) in rendered.iter().enumerate() {
            assert!(!a.is_empty());
            for b in rendered.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_cap_reached_message_differs_from_award() {
        let config = LedgerConfig::default();
        let awarded = render_activity(
            &ActivityOutcome::Awarded {
                points: 2,
                daily_total: 10,
                remaining: 10,
            },
            &config,
        );
        let capped = render_activity(&ActivityOutcome::CapReached { daily_total: 20 }, &config);
        assert_ne!(awarded, capped);
        assert!(awarded.contains("10/20"));
        assert!(capped.contains("cap"));
    }

    #[test]
    fn test_checkin_bonus_only_rendered_when_nonzero() {
        let plain = render_checkin(&CheckinOutcome::CheckedIn {
            base: 5,
            bonus: 0,
            streak: 3,
        });
        assert!(!plain.contains("bonus!"));

        let with_bonus = render_checkin(&CheckinOutcome::CheckedIn {
            base: 5,
            bonus: 20,
            streak: 7,
        });
        assert!(with_bonus.contains("+20 extra points"));
    }

    #[test]
    fn test_streak_emoji_thresholds() {
        assert_eq!(streak_emoji(1), "🔥");
        assert_eq!(streak_emoji(7), "🌟");
        assert_eq!(streak_emoji(14), "⭐");
        assert_eq!(streak_emoji(30), "🏆");
    }
}
