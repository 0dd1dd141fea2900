use std::env;
use std::str::FromStr;
use tracing::warn;

/// A reminder to schedule for every booking unless the caller says otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultReminder {
    pub channel: String,
    pub lead_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Refuse reminders whose dispatch time is already behind the clock.
    pub reject_past_reminders: bool,
    pub default_reminders: Vec<DefaultReminder>,
    pub max_recurrence_occurrences: u32,
    pub no_show_grace_minutes: i64,
    pub log_filter: String,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            reject_past_reminders: true,
            default_reminders: vec![
                DefaultReminder { channel: "email".to_string(), lead_minutes: 24 * 60 },
                DefaultReminder { channel: "sms".to_string(), lead_minutes: 60 },
            ],
            max_recurrence_occurrences: 104,
            no_show_grace_minutes: 30,
            log_filter: "info".to_string(),
        }
    }
}

impl SchedulingConfig {
    /// Read a `.env` file if one exists, then the process environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_reminders = match env::var("SCHEDULING_DEFAULT_REMINDERS") {
            Ok(raw) => parse_default_reminders(&raw).unwrap_or_else(|| {
                warn!("SCHEDULING_DEFAULT_REMINDERS is malformed ({}), using defaults", raw);
                defaults.default_reminders.clone()
            }),
            Err(_) => defaults.default_reminders.clone(),
        };

        let log_filter = env::var("RUST_LOG")
            .or_else(|_| env::var("SCHEDULING_LOG_FILTER"))
            .unwrap_or_else(|_| defaults.log_filter.clone());

        let config = Self {
            reject_past_reminders: parsed_var(
                "SCHEDULING_REJECT_PAST_REMINDERS",
                defaults.reject_past_reminders,
            ),
            default_reminders,
            max_recurrence_occurrences: parsed_var(
                "SCHEDULING_MAX_RECURRENCE_OCCURRENCES",
                defaults.max_recurrence_occurrences,
            ),
            no_show_grace_minutes: parsed_var(
                "SCHEDULING_NO_SHOW_GRACE_MINUTES",
                defaults.no_show_grace_minutes,
            ),
            log_filter,
        };

        if config.max_recurrence_occurrences == 0 {
            warn!("SCHEDULING_MAX_RECURRENCE_OCCURRENCES is 0, recurring bookings will be refused");
        }

        config
    }
}

fn parsed_var<T: FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Parse `channel:lead_minutes` pairs separated by commas, e.g. `email:1440,sms:60`.
pub fn parse_default_reminders(raw: &str) -> Option<Vec<DefaultReminder>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (channel, lead) = entry.split_once(':')?;
            Some(DefaultReminder {
                channel: channel.trim().to_lowercase(),
                lead_minutes: lead.trim().parse().ok()?,
            })
        })
        .collect()
}
