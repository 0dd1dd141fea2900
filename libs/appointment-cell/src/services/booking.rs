use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_utils::Clock;

use crate::models::{
    validate_time_range, Appointment, AppointmentError, AppointmentStatus, BookingOutcome,
    NewAppointment, ReminderContext, RescheduleAppointmentRequest, RescheduleOutcome,
    ScheduleChange, Transition,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::recurrence::RecurrenceExpander;
use crate::services::reminder::ReminderScheduler;
use crate::services::store::AppointmentStore;

/// Runs booking requests through validation, conflict detection and
/// persistence. Every write happens under the store's schedule lock for
/// the practitioner involved.
pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    recurrence_expander: RecurrenceExpander,
    reminder_scheduler: ReminderScheduler,
    clock: Arc<dyn Clock>,
}

fn database_error(e: anyhow::Error) -> AppointmentError {
    AppointmentError::DatabaseError(e.to_string())
}

impl AppointmentBookingService {
    pub fn new(store: Arc<dyn AppointmentStore>, clock: Arc<dyn Clock>, config: &SchedulingConfig) -> Self {
        Self {
            conflict_service: ConflictDetectionService::new(Arc::clone(&store)),
            lifecycle_service: AppointmentLifecycleService::with_config(config),
            recurrence_expander: RecurrenceExpander::with_config(config),
            reminder_scheduler: ReminderScheduler::with_config(Arc::clone(&clock), config),
            store,
            clock,
        }
    }

    pub fn lifecycle(&self) -> &AppointmentLifecycleService {
        &self.lifecycle_service
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminder_scheduler
    }

    /// Book one appointment, or a whole recurring series when the request
    /// carries a recurrence pattern. A series is saved only if every
    /// instance is free; otherwise nothing is saved and the error lists
    /// every clashing instance.
    pub async fn book_appointment(
        &self,
        request: NewAppointment,
        context: &ReminderContext,
    ) -> Result<BookingOutcome, AppointmentError> {
        info!(
            "Booking appointment for patient {} with practitioner {} on {}",
            request.patient_id, request.practitioner_id, request.appointment_date
        );

        let seed = Appointment::new(request, self.clock.now())?;
        let instances = match &seed.recurrence {
            Some(pattern) => self.recurrence_expander.expand(&seed, pattern)?,
            None => Vec::new(),
        };

        let mut series = Vec::with_capacity(instances.len() + 1);
        series.push(seed);
        series.extend(instances);

        {
            let _guard = self
                .store
                .acquire_schedule_lock(series[0].practitioner_id)
                .await
                .map_err(database_error)?;

            if let Err(e) = self.conflict_service.ensure_available(&series, &[]).await {
                warn!(
                    "Booking rejected for practitioner {} on {}: {}",
                    series[0].practitioner_id, series[0].appointment_date, e
                );
                return Err(e);
            }

            self.store.save_series(&series).await.map_err(database_error)?;
        }

        let mut reminders = Vec::new();
        for appointment in &series {
            reminders.extend(self.reminder_scheduler.schedule_defaults(appointment, context)?);
        }

        let mut series = series.into_iter();
        let seed = series.next().ok_or_else(|| {
            AppointmentError::ValidationError("booking produced no appointment".to_string())
        })?;
        let instances: Vec<Appointment> = series.collect();

        info!(
            "Appointment {} booked with {} recurring instance(s)",
            seed.id,
            instances.len()
        );

        Ok(BookingOutcome {
            seed,
            instances,
            reminders,
        })
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .find_by_id(appointment_id)
            .await
            .map_err(database_error)?
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    /// Move or retype an appointment. The edited appointment is re-checked
    /// for conflicts with its pre-edit self excluded.
    pub async fn update_schedule(
        &self,
        appointment_id: Uuid,
        change: ScheduleChange,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating schedule of appointment {}", appointment_id);

        let practitioner_id = self.get_appointment(appointment_id).await?.practitioner_id;
        let _guard = self
            .store
            .acquire_schedule_lock(practitioner_id)
            .await
            .map_err(database_error)?;

        // Re-read under the lock.
        let mut appointment = self.get_appointment(appointment_id).await?;
        self.lifecycle_service.ensure_editable(&appointment)?;

        if change.is_empty() {
            return Ok(appointment);
        }

        if let Some(date) = change.appointment_date {
            appointment.appointment_date = date;
        }
        if let Some(start) = change.start_time {
            appointment.start_time = start;
        }
        if let Some(end) = change.end_time {
            appointment.end_time = end;
        }
        if let Some(kind) = change.appointment_type {
            appointment.appointment_type = kind;
        }
        if let Some(location) = change.location {
            appointment.location = Some(location);
        }
        appointment.duration_minutes = validate_time_range(appointment.start_time, appointment.end_time)?;
        appointment.updated_at = self.clock.now();

        self.conflict_service
            .ensure_available(std::slice::from_ref(&appointment), &[appointment_id])
            .await?;
        self.store.update(&appointment).await.map_err(database_error)?;

        info!("Appointment {} updated successfully", appointment_id);
        Ok(appointment)
    }

    pub async fn change_status(
        &self,
        appointment_id: Uuid,
        transition: Transition,
    ) -> Result<Appointment, AppointmentError> {
        let practitioner_id = self.get_appointment(appointment_id).await?.practitioner_id;
        let _guard = self
            .store
            .acquire_schedule_lock(practitioner_id)
            .await
            .map_err(database_error)?;

        // Re-read under the lock.
        let mut appointment = self.get_appointment(appointment_id).await?;
        self.lifecycle_service
            .apply(&mut appointment, transition, self.clock.now())?;
        self.store.update(&appointment).await.map_err(database_error)?;
        Ok(appointment)
    }

    /// Supersede an appointment with a new booking at another time. The old
    /// one ends RESCHEDULED; the replacement starts SCHEDULED.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<RescheduleOutcome, AppointmentError> {
        let practitioner_id = self.get_appointment(appointment_id).await?.practitioner_id;
        let _guard = self
            .store
            .acquire_schedule_lock(practitioner_id)
            .await
            .map_err(database_error)?;

        let mut previous = self.get_appointment(appointment_id).await?;
        self.lifecycle_service
            .validate_status_transition(previous.status, AppointmentStatus::Rescheduled)?;

        let now = self.clock.now();
        let replacement = Appointment::new(
            NewAppointment {
                practitioner_id: previous.practitioner_id,
                patient_id: previous.patient_id,
                created_by: previous.created_by,
                appointment_date: request.new_date,
                start_time: request.new_start_time,
                end_time: request.new_end_time,
                appointment_type: previous.appointment_type,
                location: previous.location.clone(),
                notes: previous.notes.clone(),
                requires_confirmation: previous.requires_confirmation,
                recurrence: None,
            },
            now,
        )?;

        self.conflict_service
            .ensure_available(std::slice::from_ref(&replacement), &[previous.id])
            .await?;

        self.lifecycle_service
            .apply(&mut previous, Transition::MarkRescheduled, now)?;
        self.store
            .replace(&previous, &replacement)
            .await
            .map_err(database_error)?;

        info!("Appointment {} rescheduled as {}", previous.id, replacement.id);
        Ok(RescheduleOutcome {
            previous,
            replacement,
        })
    }

    /// Cancel a series seed and every instance that can still be cancelled.
    /// Instances already started, finished or in the past are left alone.
    pub async fn cancel_series(
        &self,
        seed_id: Uuid,
        reason: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let practitioner_id = self.get_appointment(seed_id).await?.practitioner_id;
        let _guard = self
            .store
            .acquire_schedule_lock(practitioner_id)
            .await
            .map_err(database_error)?;

        let seed = self.get_appointment(seed_id).await?;
        let children = self.store.children_of(seed_id).await.map_err(database_error)?;
        let now = self.clock.now();

        let mut cancelled = Vec::new();
        for mut appointment in std::iter::once(seed).chain(children) {
            if !appointment.can_be_cancelled(now) {
                debug!(
                    "Leaving appointment {} ({}) out of series cancellation",
                    appointment.id, appointment.status
                );
                continue;
            }
            self.lifecycle_service.apply(
                &mut appointment,
                Transition::Cancel {
                    reason: reason.to_string(),
                },
                now,
            )?;
            cancelled.push(appointment);
        }

        self.store.update_many(&cancelled).await.map_err(database_error)?;

        info!("Cancelled {} appointment(s) of series {}", cancelled.len(), seed_id);
        Ok(cancelled)
    }

    /// Delete an appointment together with every instance generated from it.
    pub async fn delete_series(&self, seed_id: Uuid) -> Result<usize, AppointmentError> {
        let seed = self.get_appointment(seed_id).await?;
        let _guard = self
            .store
            .acquire_schedule_lock(seed.practitioner_id)
            .await
            .map_err(database_error)?;

        let mut ids: Vec<Uuid> = self
            .store
            .children_of(seed_id)
            .await
            .map_err(database_error)?
            .into_iter()
            .map(|child| child.id)
            .collect();
        ids.push(seed_id);

        self.store.delete(&ids).await.map_err(database_error)?;

        info!("Deleted series {} ({} appointment(s))", seed_id, ids.len());
        Ok(ids.len())
    }
}
