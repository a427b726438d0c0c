use crate::ledger::LedgerConfig;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bot_token: String,
    pub admin_chat_id: i64,
    pub admin_logs: String,
    pub port: u16,
    pub ledger: LedgerConfig,
}

#[derive(Debug)]
pub struct ConfigError {
    pub missing_vars: Vec<String>,
    pub invalid_vars: Vec<(String, String)>,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.missing_vars.is_empty() {
            writeln!(f, "Missing required environment variables:")?;
            for var in &self.missing_vars {
                writeln!(f, "  - {}", var)?;
            }
        }
        if !self.invalid_vars.is_empty() {
            writeln!(f, "Invalid environment variables:")?;
            for (var, err) in &self.invalid_vars {
                writeln!(f, "  - {}: {}", var, err)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

fn get_required(name: &str, missing: &mut Vec<String>) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(name.to_string());
            None
        }
    }
}

fn get_required_i64(
    name: &str,
    missing: &mut Vec<String>,
    invalid: &mut Vec<(String, String)>,
) -> i64 {
    get_required(name, missing)
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| invalid.push((name.into(), e.to_string())))
                .ok()
        })
        .unwrap_or(0)
}

fn get_points(name: &str, default: i32, invalid: &mut Vec<(String, String)>) -> i32 {
    match env::var(name) {
        Ok(v) => v
            .parse::<i32>()
            .map_err(|e| invalid.push((name.into(), e.to_string())))
            .unwrap_or(default),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        let database_url = get_required("DATABASE_URL", &mut missing);
        let bot_token = get_required("TELOXIDE_TOKEN", &mut missing);
        let group_chat_id = get_required_i64("GROUP_CHAT_ID", &mut missing, &mut invalid);
        let admin_chat_id = get_required_i64("ADMIN_CHAT_ID", &mut missing, &mut invalid);
        let admin_logs = env::var("ADMIN_LOGS").unwrap_or_default();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse::<u16>()
            .map_err(|e| {
                invalid.push(("PORT".into(), e.to_string()));
            })
            .unwrap_or(8080);

        let defaults = LedgerConfig::default();
        let ledger = LedgerConfig {
            group_chat_id,
            points_per_message: get_points(
                "POINTS_PER_MESSAGE",
                defaults.points_per_message,
                &mut invalid,
            ),
            daily_cap: get_points("DAILY_GROUP_POINTS_CAP", defaults.daily_cap, &mut invalid),
            checkin_points: get_points("CHECKIN_POINTS", defaults.checkin_points, &mut invalid),
            week_bonus: get_points("STREAK_WEEK_BONUS", defaults.week_bonus, &mut invalid),
            month_bonus: get_points("STREAK_MONTH_BONUS", defaults.month_bonus, &mut invalid),
            referrer_bonus: get_points("REFERRER_BONUS", defaults.referrer_bonus, &mut invalid),
            referee_bonus: get_points("REFEREE_BONUS", defaults.referee_bonus, &mut invalid),
        };

        if !missing.is_empty() || !invalid.is_empty() {
            return Err(ConfigError {
                missing_vars: missing,
                invalid_vars: invalid,
            });
        }

        Ok(Self {
            database_url: database_url.unwrap(),
            bot_token: bot_token.unwrap(),
            admin_chat_id,
            admin_logs,
            port,
            ledger,
        })
    }

    pub fn is_admin_logs_active(&self) -> bool {
        self.admin_logs == "ACTIVE"
    }
}
