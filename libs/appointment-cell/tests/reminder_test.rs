mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentError, AppointmentStatus, ReminderChannel, ReminderOutcome, ReminderSpec,
};
use appointment_cell::services::{render_message, ReminderScheduler};
use shared_utils::test_utils::{date, fixed_clock, instant, TestConfig};
use shared_utils::{Clock, FixedClock};

use common::{appointment, context, with_status};

fn spec(channel: ReminderChannel, lead_time_minutes: u32) -> ReminderSpec {
    ReminderSpec {
        channel,
        lead_time_minutes,
    }
}

fn scheduler(clock: Arc<FixedClock>, reject_past: bool) -> ReminderScheduler {
    ReminderScheduler::new(clock, reject_past, vec![])
}

#[test]
fn test_reminder_is_lead_time_before_start() {
    let clock = fixed_clock(2025, 3, 1, 8, 0);
    let appt = appointment(Uuid::new_v4(), date(2025, 3, 3), "14:00", "14:50");

    let reminder = scheduler(clock, true)
        .schedule(&appt, &spec(ReminderChannel::Sms, 60), &context())
        .unwrap();

    assert_eq!(reminder.scheduled_for, instant(2025, 3, 3, 13, 0));
    assert_eq!(reminder.appointment_id, appt.id);
    assert_eq!(reminder.lead_time_minutes, 60);
    assert_eq!(reminder.outcome, ReminderOutcome::Pending);
    assert_eq!(reminder.created_at, instant(2025, 3, 1, 8, 0));
}

#[test]
fn test_lead_time_can_cross_midnight() {
    let clock = fixed_clock(2025, 3, 1, 8, 0);
    let appt = appointment(Uuid::new_v4(), date(2025, 3, 3), "08:30", "09:00");

    let reminder = scheduler(clock, true)
        .schedule(&appt, &spec(ReminderChannel::Email, 24 * 60), &context())
        .unwrap();

    assert_eq!(reminder.scheduled_for, instant(2025, 3, 2, 8, 30));
}

#[test]
fn test_past_reminder_policy() {
    let clock = fixed_clock(2025, 3, 3, 13, 30);
    let appt = appointment(Uuid::new_v4(), date(2025, 3, 3), "14:00", "14:50");
    let one_hour = spec(ReminderChannel::Sms, 60);

    assert_matches!(
        scheduler(Arc::clone(&clock), true).schedule(&appt, &one_hour, &context()),
        Err(AppointmentError::PastReminder { scheduled_for, now })
            if scheduled_for == instant(2025, 3, 3, 13, 0) && now == instant(2025, 3, 3, 13, 30)
    );

    let lenient = scheduler(Arc::clone(&clock), false)
        .schedule(&appt, &one_hour, &context())
        .unwrap();
    assert_eq!(lenient.scheduled_for, instant(2025, 3, 3, 13, 0));
    assert!(lenient.is_pending(clock.now()));
}

#[test]
fn test_inactive_appointments_get_no_reminders() {
    let clock = fixed_clock(2025, 3, 1, 8, 0);
    let appt = with_status(
        appointment(Uuid::new_v4(), date(2025, 3, 3), "14:00", "14:50"),
        AppointmentStatus::Cancelled,
    );

    assert_matches!(
        scheduler(clock, true).schedule(&appt, &spec(ReminderChannel::Email, 60), &context()),
        Err(AppointmentError::ValidationError(_))
    );
}

#[test]
fn test_defaults_skip_reminders_already_due() {
    // 20 hours before the appointment: the 24h reminder has passed, the 1h one has not.
    let clock = fixed_clock(2025, 3, 2, 18, 0);
    let appt = appointment(Uuid::new_v4(), date(2025, 3, 3), "14:00", "14:50");
    let config = TestConfig::default().to_scheduling_config();

    let scheduler = ReminderScheduler::with_config(clock, &config);
    assert_eq!(scheduler.default_specs().len(), 2);

    let reminders = scheduler.schedule_defaults(&appt, &context()).unwrap();

    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].channel, ReminderChannel::Sms);
    assert_eq!(reminders[0].scheduled_for, instant(2025, 3, 3, 13, 0));
}

#[test]
fn test_unknown_default_channel_is_dropped() {
    let clock = fixed_clock(2025, 3, 1, 8, 0);
    let config = TestConfig {
        default_reminders: vec![("pager".to_string(), 30), ("push".to_string(), 15)],
        ..TestConfig::default()
    }
    .to_scheduling_config();

    let scheduler = ReminderScheduler::with_config(clock, &config);

    assert_eq!(scheduler.default_specs(), &[spec(ReminderChannel::Push, 15)]);
}

#[test]
fn test_email_rendering() {
    let appt = appointment(Uuid::new_v4(), date(2025, 3, 3), "14:00", "14:50");

    let (subject, body) = render_message(&appt, ReminderChannel::Email, &context());

    let subject = subject.unwrap();
    assert!(subject.contains("2025-03-03"));
    assert!(subject.contains("14:00"));
    assert!(body.contains("Joana Silva"));
    assert!(body.contains("Dr. Ana Ferreira"));
    assert!(body.contains("Monday 03 March 2025"));
    assert!(body.contains("14:00 - 14:50"));
    assert!(body.contains("Room 2"));
    assert!(body.lines().count() > 3);
}

#[test]
fn test_short_channels_render_one_line() {
    let mut appt = appointment(Uuid::new_v4(), date(2025, 3, 3), "14:00", "14:50");
    appt.location = None;

    for channel in [ReminderChannel::Sms, ReminderChannel::Whatsapp, ReminderChannel::Push] {
        let (subject, body) = render_message(&appt, channel, &context());
        assert!(subject.is_none());
        assert_eq!(body.lines().count(), 1);
        assert!(body.contains("Dr. Ana Ferreira"));
        assert!(body.contains("the clinic"));
    }
}

#[test]
fn test_outcomes_are_exclusive() {
    let clock = fixed_clock(2025, 3, 1, 8, 0);
    let appt = appointment(Uuid::new_v4(), date(2025, 3, 3), "14:00", "14:50");
    let scheduler = scheduler(clock, true);

    let mut sent = scheduler
        .schedule(&appt, &spec(ReminderChannel::Sms, 60), &context())
        .unwrap();
    assert!(!sent.is_pending(instant(2025, 3, 3, 12, 59)));
    assert!(sent.is_pending(instant(2025, 3, 3, 13, 0)));

    sent.mark_sent(instant(2025, 3, 3, 13, 0)).unwrap();
    assert!(sent.is_resolved());
    assert!(!sent.is_pending(instant(2025, 3, 3, 13, 5)));
    assert_matches!(
        sent.mark_failed(instant(2025, 3, 3, 13, 1), "gateway timeout"),
        Err(AppointmentError::ReminderAlreadyResolved(id)) if id == sent.id
    );
    assert_eq!(sent.outcome, ReminderOutcome::Sent { at: instant(2025, 3, 3, 13, 0) });

    let mut failed = scheduler
        .schedule(&appt, &spec(ReminderChannel::Email, 120), &context())
        .unwrap();
    failed.mark_failed(instant(2025, 3, 3, 12, 0), "mailbox full").unwrap();
    assert_matches!(&failed.outcome, ReminderOutcome::Failed { error, .. } if error == "mailbox full");
    assert!(failed.mark_sent(instant(2025, 3, 3, 12, 1)).is_err());
}

#[test]
fn test_dispatch_payload() {
    let clock = fixed_clock(2025, 3, 1, 8, 0);
    let appt = appointment(Uuid::new_v4(), date(2025, 3, 3), "14:00", "14:50");
    let reminder = scheduler(clock, true)
        .schedule(&appt, &spec(ReminderChannel::Whatsapp, 30), &context())
        .unwrap();

    let payload = reminder.dispatch_payload();

    assert_eq!(payload["reminder_id"], reminder.id.to_string());
    assert_eq!(payload["appointment_id"], appt.id.to_string());
    assert_eq!(payload["channel"], "whatsapp");
    assert_eq!(payload["scheduled_for"], "2025-03-03T13:30:00");
    assert!(payload["subject"].is_null());
}
