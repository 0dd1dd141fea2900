use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use shared_config::{DefaultReminder, SchedulingConfig};

use crate::clock::FixedClock;

pub struct TestConfig {
    pub reject_past_reminders: bool,
    pub default_reminders: Vec<(String, u32)>,
    pub max_recurrence_occurrences: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            reject_past_reminders: true,
            default_reminders: vec![("email".to_string(), 24 * 60), ("sms".to_string(), 60)],
            max_recurrence_occurrences: 52,
        }
    }
}

impl TestConfig {
    pub fn without_reminders() -> Self {
        Self { default_reminders: vec![], ..Self::default() }
    }

    pub fn lenient_reminders() -> Self {
        Self { reject_past_reminders: false, ..Self::default() }
    }

    pub fn to_scheduling_config(&self) -> SchedulingConfig {
        SchedulingConfig {
            reject_past_reminders: self.reject_past_reminders,
            default_reminders: self
                .default_reminders
                .iter()
                .map(|(channel, lead_minutes)| DefaultReminder {
                    channel: channel.clone(),
                    lead_minutes: *lead_minutes,
                })
                .collect(),
            max_recurrence_occurrences: self.max_recurrence_occurrences,
            ..SchedulingConfig::default()
        }
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    date(year, month, day)
        .and_hms_opt(hour, minute, 0)
        .expect("valid test time")
}

pub fn fixed_clock(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(instant(year, month, day, hour, minute)))
}
