use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_utils::Clock;

use crate::models::{
    Appointment, AppointmentError, ReminderChannel, ReminderContext, ReminderOutcome, ReminderSpec,
    ScheduledReminder,
};

pub struct ReminderScheduler {
    clock: Arc<dyn Clock>,
    reject_past: bool,
    defaults: Vec<ReminderSpec>,
}

impl ReminderScheduler {
    pub fn new(clock: Arc<dyn Clock>, reject_past: bool, defaults: Vec<ReminderSpec>) -> Self {
        Self {
            clock,
            reject_past,
            defaults,
        }
    }

    /// Unknown channels in the configured defaults are logged and dropped.
    pub fn with_config(clock: Arc<dyn Clock>, config: &SchedulingConfig) -> Self {
        let defaults = config
            .default_reminders
            .iter()
            .filter_map(|entry| match entry.channel.parse::<ReminderChannel>() {
                Ok(channel) => Some(ReminderSpec {
                    channel,
                    lead_time_minutes: entry.lead_minutes,
                }),
                Err(e) => {
                    warn!("Ignoring default reminder: {}", e);
                    None
                }
            })
            .collect();

        Self::new(clock, config.reject_past_reminders, defaults)
    }

    pub fn default_specs(&self) -> &[ReminderSpec] {
        &self.defaults
    }

    /// Compute the dispatch instant and render the message for one reminder.
    pub fn schedule(
        &self,
        appointment: &Appointment,
        spec: &ReminderSpec,
        context: &ReminderContext,
    ) -> Result<ScheduledReminder, AppointmentError> {
        if !appointment.is_active() {
            return Err(AppointmentError::ValidationError(format!(
                "cannot remind about a {} appointment",
                appointment.status
            )));
        }

        let now = self.clock.now();
        let scheduled_for =
            appointment.start_instant() - Duration::minutes(spec.lead_time_minutes as i64);

        if scheduled_for < now {
            if self.reject_past {
                return Err(AppointmentError::PastReminder { scheduled_for, now });
            }
            debug!(
                "Reminder for appointment {} is already due ({} < {})",
                appointment.id, scheduled_for, now
            );
        }

        let (subject, message) = render_message(appointment, spec.channel, context);

        Ok(ScheduledReminder {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            channel: spec.channel,
            lead_time_minutes: spec.lead_time_minutes,
            scheduled_for,
            subject,
            message,
            outcome: ReminderOutcome::Pending,
            created_at: now,
        })
    }

    /// Schedule the configured default reminders. Ones already in the past are skipped.
    pub fn schedule_defaults(
        &self,
        appointment: &Appointment,
        context: &ReminderContext,
    ) -> Result<Vec<ScheduledReminder>, AppointmentError> {
        let mut reminders = Vec::with_capacity(self.defaults.len());

        for spec in &self.defaults {
            match self.schedule(appointment, spec, context) {
                Ok(reminder) => reminders.push(reminder),
                Err(AppointmentError::PastReminder { scheduled_for, .. }) => {
                    debug!(
                        "Skipping {} reminder for appointment {}: {} already passed",
                        spec.channel, appointment.id, scheduled_for
                    );
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Scheduled {} reminder(s) for appointment {}",
            reminders.len(),
            appointment.id
        );
        Ok(reminders)
    }
}

/// Email gets a subject and a multi-line body; every other channel a single line.
pub fn render_message(
    appointment: &Appointment,
    channel: ReminderChannel,
    context: &ReminderContext,
) -> (Option<String>, String) {
    let date = appointment.appointment_date.format("%A %d %B %Y");
    let location = appointment.location.as_deref().unwrap_or("the clinic");

    match channel {
        ReminderChannel::Email => {
            let subject = format!(
                "Reminder: {} appointment on {} at {}",
                appointment.appointment_type, appointment.appointment_date, appointment.start_time
            );
            let body = format!(
                "Hello {patient},\n\n\
                 This is a reminder of your {kind} appointment.\n\n\
                 Practitioner: {practitioner}\n\
                 Date: {date}\n\
                 Time: {start} - {end}\n\
                 Location: {location}\n\n\
                 If you cannot attend, please let us know as soon as possible.",
                patient = context.patient_name,
                kind = appointment.appointment_type,
                practitioner = context.practitioner_name,
                date = date,
                start = appointment.start_time,
                end = appointment.end_time,
                location = location,
            );
            (Some(subject), body)
        }
        ReminderChannel::Sms | ReminderChannel::Whatsapp | ReminderChannel::Push => {
            let body = format!(
                "Reminder: {} with {} on {} at {}, {}.",
                appointment.appointment_type,
                context.practitioner_name,
                appointment.appointment_date,
                appointment.start_time,
                location
            );
            (None, body)
        }
    }
}
