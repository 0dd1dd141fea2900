use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::{overlaps, TimeOfDay};

/// Weekly availability for one practitioner on one weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityTemplate {
    pub id: Uuid,
    pub practitioner_id: Uuid,
    pub day_of_week: u8, // 0 = Monday .. 6 = Sunday
    pub window_start: TimeOfDay,
    pub window_end: TimeOfDay,
    pub slot_duration_minutes: u32,
    pub gap_minutes: u32,
    pub max_concurrent: u32,
    pub is_active: bool,
}

impl AvailabilityTemplate {
    pub fn weekday(&self) -> Option<Weekday> {
        match self.day_of_week {
            0 => Some(Weekday::Mon),
            1 => Some(Weekday::Tue),
            2 => Some(Weekday::Wed),
            3 => Some(Weekday::Thu),
            4 => Some(Weekday::Fri),
            5 => Some(Weekday::Sat),
            6 => Some(Weekday::Sun),
            _ => None,
        }
    }

    pub fn window_minutes(&self) -> u32 {
        self.window_start.minutes_until(self.window_end).unwrap_or(0)
    }

    pub fn applies_to(&self, date: NaiveDate) -> bool {
        self.is_active && self.day_of_week == day_of_week_index(date)
    }

    /// Checks run when a template is created or edited. The slot generator
    /// itself never rejects a template.
    pub fn validate(&self) -> Result<(), AvailabilityError> {
        if self.weekday().is_none() {
            return Err(AvailabilityError::InvalidDay(self.day_of_week));
        }
        if self.window_start >= self.window_end {
            return Err(AvailabilityError::InvalidRange(format!(
                "window start {} must be before window end {}",
                self.window_start, self.window_end
            )));
        }
        if self.slot_duration_minutes == 0 {
            return Err(AvailabilityError::InvalidRange(
                "slot duration must be positive".to_string(),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(AvailabilityError::InvalidRange(
                "at least one booking per slot must be allowed".to_string(),
            ));
        }
        if self.slot_duration_minutes > self.window_minutes() {
            return Err(AvailabilityError::InvalidRange(format!(
                "{} minute slots do not fit in {}-{}",
                self.slot_duration_minutes, self.window_start, self.window_end
            )));
        }
        Ok(())
    }
}

/// One-off change to a practitioner's availability for a single date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityOverride {
    pub id: Uuid,
    pub practitioner_id: Uuid,
    pub override_date: NaiveDate,
    pub is_available: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub duration_minutes: u32,
}

impl Slot {
    pub fn overlaps(&self, start: TimeOfDay, end: TimeOfDay) -> bool {
        overlaps(self.start, self.end, start, end)
    }
}

/// Theoretical slots for one practitioner on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlots {
    pub practitioner_id: Uuid,
    pub date: NaiveDate,
    pub template: AvailabilityTemplate,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Invalid availability range: {0}")]
    InvalidRange(String),

    #[error("Day of week must be between 0 (Monday) and 6 (Sunday), got {0}")]
    InvalidDay(u8),

    #[error("Database error: {0}")]
    Database(String),
}

/// 0 = Monday .. 6 = Sunday
pub fn day_of_week_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}
