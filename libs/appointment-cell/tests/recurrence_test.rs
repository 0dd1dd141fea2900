mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentError, AppointmentStatus, Frequency, RecurrenceEnd, RecurrencePattern,
};
use appointment_cell::services::RecurrenceExpander;
use shared_config::SchedulingConfig;
use shared_utils::test_utils::date;

use common::{created, recurring};

fn seed(seed_date: NaiveDate, pattern: RecurrencePattern) -> Appointment {
    Appointment::new(
        recurring(Uuid::new_v4(), seed_date, "14:00", "14:45", pattern),
        created(),
    )
    .unwrap()
}

fn pattern(frequency: Frequency, interval: u32, end: RecurrenceEnd) -> RecurrencePattern {
    RecurrencePattern {
        frequency,
        interval,
        end,
    }
}

fn dates(instances: &[Appointment]) -> Vec<NaiveDate> {
    instances.iter().map(|a| a.appointment_date).collect()
}

#[test]
fn test_fortnightly_series_by_count() {
    let pattern = pattern(Frequency::Weekly, 2, RecurrenceEnd::Count(3));
    let seed = seed(date(2025, 1, 6), pattern.clone());

    let instances = RecurrenceExpander::new(104).expand(&seed, &pattern).unwrap();

    assert_eq!(dates(&instances), vec![date(2025, 1, 20), date(2025, 2, 3)]);
    for instance in &instances {
        assert_ne!(instance.id, seed.id);
        assert_eq!(instance.parent_appointment_id, Some(seed.id));
        assert_eq!(instance.status, AppointmentStatus::Scheduled);
        assert_eq!(instance.start_time, seed.start_time);
        assert_eq!(instance.end_time, seed.end_time);
        assert_eq!(instance.duration_minutes, 45);
        assert_eq!(instance.appointment_type, seed.appointment_type);
        assert_eq!(instance.location, seed.location);
        assert_eq!(instance.practitioner_id, seed.practitioner_id);
        assert_eq!(instance.patient_id, seed.patient_id);
        assert!(instance.recurrence.is_none());
    }
}

#[test]
fn test_count_includes_the_seed() {
    let expander = RecurrenceExpander::new(104);
    for count in 1..=6 {
        let pattern = pattern(Frequency::Daily, 1, RecurrenceEnd::Count(count));
        let seed = seed(date(2025, 3, 3), pattern.clone());
        let instances = expander.expand(&seed, &pattern).unwrap();
        assert_eq!(instances.len() as u32, count - 1);
    }
}

#[test]
fn test_until_date_is_inclusive() {
    let expander = RecurrenceExpander::new(104);

    let on_boundary = pattern(Frequency::Weekly, 1, RecurrenceEnd::Until(date(2025, 3, 24)));
    let instances = expander
        .expand(&seed(date(2025, 3, 3), on_boundary.clone()), &on_boundary)
        .unwrap();
    assert_eq!(
        dates(&instances),
        vec![date(2025, 3, 10), date(2025, 3, 17), date(2025, 3, 24)]
    );

    let before_boundary = pattern(Frequency::Weekly, 1, RecurrenceEnd::Until(date(2025, 3, 23)));
    let instances = expander
        .expand(&seed(date(2025, 3, 3), before_boundary.clone()), &before_boundary)
        .unwrap();
    assert_eq!(instances.len(), 2);

    let before_seed = pattern(Frequency::Daily, 1, RecurrenceEnd::Until(date(2025, 3, 1)));
    let instances = expander
        .expand(&seed(date(2025, 3, 3), before_seed.clone()), &before_seed)
        .unwrap();
    assert!(instances.is_empty());
}

#[test]
fn test_monthly_series_clamps_without_drifting() {
    let pattern = pattern(Frequency::Monthly, 1, RecurrenceEnd::Count(4));
    let seed = seed(date(2025, 1, 31), pattern.clone());

    let instances = RecurrenceExpander::new(104).expand(&seed, &pattern).unwrap();

    assert_eq!(
        dates(&instances),
        vec![date(2025, 2, 28), date(2025, 3, 31), date(2025, 4, 30)]
    );
}

#[test]
fn test_invalid_patterns_are_rejected() {
    let expander = RecurrenceExpander::new(104);

    let zero_interval = pattern(Frequency::Weekly, 0, RecurrenceEnd::Count(3));
    let mut seed_appt = seed(date(2025, 3, 3), pattern(Frequency::Weekly, 1, RecurrenceEnd::Count(3)));
    assert_matches!(
        expander.expand(&seed_appt, &zero_interval),
        Err(AppointmentError::ValidationError(_))
    );

    let zero_count = pattern(Frequency::Weekly, 1, RecurrenceEnd::Count(0));
    assert_matches!(
        expander.expand(&seed_appt, &zero_count),
        Err(AppointmentError::ValidationError(_))
    );

    seed_appt.parent_appointment_id = Some(Uuid::new_v4());
    let weekly = pattern(Frequency::Weekly, 1, RecurrenceEnd::Count(3));
    assert_matches!(
        expander.expand(&seed_appt, &weekly),
        Err(AppointmentError::ValidationError(_))
    );
}

#[test]
fn test_series_size_is_capped() {
    let expander = RecurrenceExpander::new(10);

    let at_cap = pattern(Frequency::Daily, 1, RecurrenceEnd::Count(10));
    let instances = expander
        .expand(&seed(date(2025, 3, 3), at_cap.clone()), &at_cap)
        .unwrap();
    assert_eq!(instances.len(), 9);

    let over_cap = pattern(Frequency::Daily, 1, RecurrenceEnd::Count(11));
    assert_matches!(
        expander.expand(&seed(date(2025, 3, 3), over_cap.clone()), &over_cap),
        Err(AppointmentError::ValidationError(_))
    );

    let long_until = pattern(Frequency::Daily, 1, RecurrenceEnd::Until(date(2026, 3, 3)));
    assert_matches!(
        expander.expand(&seed(date(2025, 3, 3), long_until.clone()), &long_until),
        Err(AppointmentError::ValidationError(_))
    );
}

#[test]
fn test_expander_reads_cap_from_config() {
    let config = SchedulingConfig {
        max_recurrence_occurrences: 3,
        ..SchedulingConfig::default()
    };
    let expander = RecurrenceExpander::with_config(&config);
    let pattern = pattern(Frequency::Weekly, 1, RecurrenceEnd::Count(4));

    assert_matches!(
        expander.expand(&seed(date(2025, 3, 3), pattern.clone()), &pattern),
        Err(AppointmentError::ValidationError(_))
    );
}

#[test]
fn test_occurrence_dates_iterator() {
    let pattern = pattern(Frequency::Daily, 3, RecurrenceEnd::Count(4));
    let produced: Vec<NaiveDate> = pattern.occurrence_dates(date(2025, 2, 26)).collect();
    assert_eq!(produced, vec![date(2025, 3, 1), date(2025, 3, 4), date(2025, 3, 7)]);
}
