use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, warn};

use shared_config::SchedulingConfig;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, Transition};

pub struct AppointmentLifecycleService {
    no_show_grace: Duration,
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self::with_config(&SchedulingConfig::default())
    }

    pub fn with_config(config: &SchedulingConfig) -> Self {
        Self {
            no_show_grace: Duration::minutes(config.no_show_grace_minutes),
        }
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !current_status.can_transition_to(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Apply a transition and its side effects. Returns the previous status.
    ///
    /// CONFIRMED stamps `confirmed_at`; CANCELLED stamps `cancelled_at` and
    /// records the (non-blank) reason.
    pub fn apply(
        &self,
        appointment: &mut Appointment,
        transition: Transition,
        now: NaiveDateTime,
    ) -> Result<AppointmentStatus, AppointmentError> {
        let previous = appointment.status;
        let target = transition.target();
        self.validate_status_transition(previous, target)?;

        match transition {
            Transition::Confirm => {
                appointment.confirmed_at = Some(now);
            }
            Transition::Cancel { reason } => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(AppointmentError::ValidationError(
                        "a cancellation reason is required".to_string(),
                    ));
                }
                appointment.cancellation_reason = Some(reason.to_string());
                appointment.cancelled_at = Some(now);
            }
            Transition::Start
            | Transition::Complete
            | Transition::MarkNoShow
            | Transition::MarkRescheduled => {}
        }

        appointment.status = target;
        appointment.updated_at = now;

        info!("Appointment {} moved {} -> {}", appointment.id, previous, target);
        Ok(previous)
    }

    /// Date, time, type and location may only change while SCHEDULED or CONFIRMED.
    pub fn ensure_editable(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        if appointment.status.is_editable() {
            Ok(())
        } else {
            warn!(
                "Refusing to edit appointment {} in status {}",
                appointment.id, appointment.status
            );
            Err(AppointmentError::NotEditable(appointment.status))
        }
    }

    /// Check if an appointment should be marked as no-show
    pub fn should_mark_no_show(&self, appointment: &Appointment, now: NaiveDateTime) -> bool {
        if !appointment.status.can_transition_to(AppointmentStatus::NoShow) {
            return false;
        }

        now > appointment.start_instant() + self.no_show_grace
    }
}
