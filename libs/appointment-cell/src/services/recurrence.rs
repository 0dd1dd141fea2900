use chrono::{Days, Months, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use shared_config::SchedulingConfig;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, Frequency, RecurrenceEnd, RecurrencePattern,
};

/// Dates of a series after the seed, in order.
///
/// The k-th date is `seed + k * interval` units, always measured from the
/// seed, so a monthly series started on the 31st clamps to the end of short
/// months without drifting in later ones.
#[derive(Debug, Clone)]
pub struct OccurrenceDates {
    seed_date: NaiveDate,
    frequency: Frequency,
    interval: u32,
    end: RecurrenceEnd,
    index: u32,
}

impl OccurrenceDates {
    pub fn new(seed_date: NaiveDate, pattern: &RecurrencePattern) -> Self {
        Self {
            seed_date,
            frequency: pattern.frequency,
            interval: pattern.interval,
            end: pattern.end,
            index: 0,
        }
    }
}

impl Iterator for OccurrenceDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.interval == 0 {
            return None;
        }

        self.index = self.index.checked_add(1)?;
        if let RecurrenceEnd::Count(count) = self.end {
            if self.index >= count {
                return None;
            }
        }

        let date = shift_date(self.seed_date, self.frequency, self.interval.checked_mul(self.index)?)?;

        if let RecurrenceEnd::Until(until) = self.end {
            if date > until {
                return None;
            }
        }

        Some(date)
    }
}

/// `None` when the result falls outside chrono's date range.
pub fn shift_date(date: NaiveDate, frequency: Frequency, units: u32) -> Option<NaiveDate> {
    match frequency {
        Frequency::Daily => date.checked_add_days(Days::new(units as u64)),
        Frequency::Weekly => date.checked_add_days(Days::new(units as u64 * 7)),
        Frequency::Monthly => date.checked_add_months(Months::new(units)),
    }
}

impl RecurrencePattern {
    pub fn occurrence_dates(&self, seed_date: NaiveDate) -> OccurrenceDates {
        OccurrenceDates::new(seed_date, self)
    }
}

pub struct RecurrenceExpander {
    max_occurrences: u32,
}

impl RecurrenceExpander {
    pub fn new(max_occurrences: u32) -> Self {
        Self { max_occurrences }
    }

    pub fn with_config(config: &SchedulingConfig) -> Self {
        Self::new(config.max_recurrence_occurrences)
    }

    /// Instances generated from `seed` under `pattern`, seed excluded.
    ///
    /// Each instance copies the seed's times, type, location and notes,
    /// starts SCHEDULED and points back at the seed. The whole list is
    /// produced or an error is returned; there is no partial series.
    pub fn expand(
        &self,
        seed: &Appointment,
        pattern: &RecurrencePattern,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        pattern.validate()?;

        if seed.is_series_child() {
            return Err(AppointmentError::ValidationError(
                "an appointment generated by a series cannot start another series".to_string(),
            ));
        }

        if let RecurrenceEnd::Count(count) = pattern.end {
            if count > self.max_occurrences {
                return Err(self.too_many());
            }
        }

        let mut instances = Vec::new();
        for date in pattern.occurrence_dates(seed.appointment_date) {
            // +1 for the seed, +1 for the instance about to be added
            if instances.len() as u64 + 2 > self.max_occurrences as u64 {
                return Err(self.too_many());
            }
            instances.push(Self::instance_of(seed, date));
        }

        debug!(
            "Expanded appointment {} into {} recurring instance(s)",
            seed.id,
            instances.len()
        );

        Ok(instances)
    }

    fn instance_of(seed: &Appointment, date: NaiveDate) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            appointment_date: date,
            status: AppointmentStatus::Scheduled,
            parent_appointment_id: Some(seed.id),
            recurrence: None,
            confirmed_at: None,
            cancellation_reason: None,
            cancelled_at: None,
            updated_at: seed.created_at,
            ..seed.clone()
        }
    }

    fn too_many(&self) -> AppointmentError {
        AppointmentError::ValidationError(format!(
            "recurring series may not exceed {} appointments",
            self.max_occurrences
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_monthly_shift_clamps_to_month_end() {
        assert_eq!(shift_date(d(2025, 1, 31), Frequency::Monthly, 1), Some(d(2025, 2, 28)));
        assert_eq!(shift_date(d(2024, 1, 31), Frequency::Monthly, 1), Some(d(2024, 2, 29)));
        assert_eq!(shift_date(d(2025, 1, 31), Frequency::Monthly, 3), Some(d(2025, 4, 30)));
    }

    #[test]
    fn test_weekly_shift() {
        assert_eq!(shift_date(d(2025, 1, 6), Frequency::Weekly, 2), Some(d(2025, 1, 20)));
    }

    #[test]
    fn test_zero_interval_produces_nothing() {
        let pattern = RecurrencePattern {
            frequency: Frequency::Daily,
            interval: 0,
            end: RecurrenceEnd::Count(5),
        };
        assert_eq!(pattern.occurrence_dates(d(2025, 1, 1)).count(), 0);
    }
}
