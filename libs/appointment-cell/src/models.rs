use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use practitioner_cell::models::AvailabilityError;
use shared_models::{overlaps, TimeError, TimeOfDay};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub practitioner_id: Uuid,
    pub patient_id: Uuid,
    pub created_by: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub duration_minutes: u32,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub location: Option<String>,
    /// Seed of the recurring series this appointment was generated from.
    pub parent_appointment_id: Option<Uuid>,
    /// Only ever present on a series seed.
    pub recurrence: Option<RecurrencePattern>,
    pub requires_confirmation: bool,
    pub confirmed_at: Option<NaiveDateTime>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    /// Build a fresh SCHEDULED appointment from a booking request.
    pub fn new(request: NewAppointment, now: NaiveDateTime) -> Result<Self, AppointmentError> {
        let duration_minutes = validate_time_range(request.start_time, request.end_time)?;

        if let Some(pattern) = &request.recurrence {
            pattern.validate()?;
        }

        Ok(Self {
            id: Uuid::new_v4(),
            practitioner_id: request.practitioner_id,
            patient_id: request.patient_id,
            created_by: request.created_by,
            appointment_date: request.appointment_date,
            start_time: request.start_time,
            end_time: request.end_time,
            duration_minutes,
            appointment_type: request.appointment_type,
            status: AppointmentStatus::Scheduled,
            location: request.location,
            parent_appointment_id: None,
            recurrence: request.recurrence,
            requires_confirmation: request.requires_confirmation,
            confirmed_at: None,
            cancellation_reason: None,
            cancelled_at: None,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn start_instant(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.start_time.to_naive_time())
    }

    pub fn end_instant(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.end_time.to_naive_time())
    }

    /// True once the start instant has been reached.
    pub fn is_past(&self, now: NaiveDateTime) -> bool {
        self.start_instant() <= now
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_seed(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn is_series_child(&self) -> bool {
        self.parent_appointment_id.is_some()
    }

    /// Same practitioner, same date and overlapping times. Status is not considered.
    pub fn collides_with(&self, other: &Appointment) -> bool {
        self.practitioner_id == other.practitioner_id
            && self.appointment_date == other.appointment_date
            && overlaps(self.start_time, self.end_time, other.start_time, other.end_time)
    }

    pub fn can_be_cancelled(&self, now: NaiveDateTime) -> bool {
        self.status.can_transition_to(AppointmentStatus::Cancelled) && !self.is_past(now)
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes as i64)
    }
}

/// Returns the duration in minutes of a valid `[start, end)` range.
pub fn validate_time_range(start: TimeOfDay, end: TimeOfDay) -> Result<u32, AppointmentError> {
    match start.minutes_until(end) {
        Some(minutes) if minutes > 0 => Ok(minutes),
        _ => Err(AppointmentError::InvalidRange(format!(
            "start {} must be before end {}",
            start, end
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl AppointmentStatus {
    /// The one transition table every status check goes through.
    pub fn allowed_transitions(&self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Scheduled => &[Confirmed, InProgress, Cancelled, NoShow, Rescheduled],
            Confirmed => &[InProgress, Cancelled, NoShow, Rescheduled],
            InProgress => &[Completed],
            Completed | Cancelled | NoShow | Rescheduled => &[],
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Statuses that still hold the practitioner's time.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed | AppointmentStatus::InProgress
        )
    }

    /// Statuses in which date, time, type and location may change.
    pub fn is_editable(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }

    pub const ALL: [AppointmentStatus; 7] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
        AppointmentStatus::Rescheduled,
    ];
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Evaluation,
    Treatment,
    #[serde(alias = "followup")]
    FollowUp,
    #[serde(alias = "group_session")]
    Group,
    HomeVisit,
    #[serde(alias = "virtual")]
    Telehealth,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Evaluation => write!(f, "evaluation"),
            AppointmentType::Treatment => write!(f, "treatment"),
            AppointmentType::FollowUp => write!(f, "follow-up"),
            AppointmentType::Group => write!(f, "group session"),
            AppointmentType::HomeVisit => write!(f, "home visit"),
            AppointmentType::Telehealth => write!(f, "telehealth"),
        }
    }
}

/// A requested status change. Cancellation has to say why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Transition {
    Confirm,
    Start,
    Complete,
    Cancel { reason: String },
    MarkNoShow,
    MarkRescheduled,
}

impl Transition {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            Transition::Confirm => AppointmentStatus::Confirmed,
            Transition::Start => AppointmentStatus::InProgress,
            Transition::Complete => AppointmentStatus::Completed,
            Transition::Cancel { .. } => AppointmentStatus::Cancelled,
            Transition::MarkNoShow => AppointmentStatus::NoShow,
            Transition::MarkRescheduled => AppointmentStatus::Rescheduled,
        }
    }
}

// ==============================================================================
// RECURRENCE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

/// How a series stops. A count includes the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceEnd {
    Count(u32),
    Until(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    pub interval: u32,
    pub end: RecurrenceEnd,
}

impl RecurrencePattern {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.interval == 0 {
            return Err(AppointmentError::ValidationError(
                "recurrence interval must be at least 1".to_string(),
            ));
        }
        if let RecurrenceEnd::Count(0) = self.end {
            return Err(AppointmentError::ValidationError(
                "recurrence count must include the first appointment".to_string(),
            ));
        }
        Ok(())
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub practitioner_id: Uuid,
    pub patient_id: Uuid,
    pub created_by: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub appointment_type: AppointmentType,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub requires_confirmation: bool,
    pub recurrence: Option<RecurrencePattern>,
}

/// Booking request as it arrives from a form, with `HH:MM` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub practitioner_id: Uuid,
    pub patient_id: Uuid,
    pub created_by: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub appointment_type: AppointmentType,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub requires_confirmation: bool,
    pub recurrence: Option<RecurrencePattern>,
}

impl TryFrom<BookAppointmentRequest> for NewAppointment {
    type Error = AppointmentError;

    fn try_from(request: BookAppointmentRequest) -> Result<Self, Self::Error> {
        Ok(NewAppointment {
            practitioner_id: request.practitioner_id,
            patient_id: request.patient_id,
            created_by: request.created_by,
            appointment_date: request.appointment_date,
            start_time: TimeOfDay::parse(&request.start_time)?,
            end_time: TimeOfDay::parse(&request.end_time)?,
            appointment_type: request.appointment_type,
            location: request.location,
            notes: request.notes,
            requires_confirmation: request.requires_confirmation,
            recurrence: request.recurrence,
        })
    }
}

/// Edit of the scheduling fields of an existing appointment. `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleChange {
    pub appointment_date: Option<NaiveDate>,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
    pub appointment_type: Option<AppointmentType>,
    pub location: Option<String>,
}

impl ScheduleChange {
    pub fn is_empty(&self) -> bool {
        self.appointment_date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.appointment_type.is_none()
            && self.location.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: NaiveDate,
    pub new_start_time: TimeOfDay,
    pub new_end_time: TimeOfDay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleOutcome {
    pub previous: Appointment,
    pub replacement: Appointment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingOutcome {
    pub seed: Appointment,
    pub instances: Vec<Appointment>,
    pub reminders: Vec<ScheduledReminder>,
}

impl BookingOutcome {
    pub fn all_appointments(&self) -> impl Iterator<Item = &Appointment> {
        std::iter::once(&self.seed).chain(self.instances.iter())
    }
}

/// A slot from the weekly template that nothing active overlaps yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSlot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub duration_minutes: u32,
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

/// One candidate and every active appointment it collides with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clash {
    pub candidate: Appointment,
    pub conflicting: Vec<Appointment>,
}

// ==============================================================================
// REMINDER MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderChannel {
    Email,
    Sms,
    Whatsapp,
    Push,
}

impl fmt::Display for ReminderChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderChannel::Email => write!(f, "email"),
            ReminderChannel::Sms => write!(f, "sms"),
            ReminderChannel::Whatsapp => write!(f, "whatsapp"),
            ReminderChannel::Push => write!(f, "push"),
        }
    }
}

impl FromStr for ReminderChannel {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(ReminderChannel::Email),
            "sms" => Ok(ReminderChannel::Sms),
            "whatsapp" => Ok(ReminderChannel::Whatsapp),
            "push" => Ok(ReminderChannel::Push),
            other => Err(AppointmentError::ValidationError(format!(
                "unknown reminder channel: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSpec {
    pub channel: ReminderChannel,
    pub lead_time_minutes: u32,
}

/// Names the scheduling core does not own but reminder text needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderContext {
    pub practitioner_name: String,
    pub patient_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ReminderOutcome {
    Pending,
    Sent { at: NaiveDateTime },
    Failed { at: NaiveDateTime, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledReminder {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub channel: ReminderChannel,
    pub lead_time_minutes: u32,
    pub scheduled_for: NaiveDateTime,
    pub subject: Option<String>,
    pub message: String,
    pub outcome: ReminderOutcome,
    pub created_at: NaiveDateTime,
}

impl ScheduledReminder {
    /// Nothing recorded yet and the dispatch time has arrived.
    pub fn is_pending(&self, now: NaiveDateTime) -> bool {
        matches!(self.outcome, ReminderOutcome::Pending) && now >= self.scheduled_for
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.outcome, ReminderOutcome::Pending)
    }

    pub fn mark_sent(&mut self, at: NaiveDateTime) -> Result<(), AppointmentError> {
        if self.is_resolved() {
            return Err(AppointmentError::ReminderAlreadyResolved(self.id));
        }
        self.outcome = ReminderOutcome::Sent { at };
        Ok(())
    }

    pub fn mark_failed(&mut self, at: NaiveDateTime, error: impl Into<String>) -> Result<(), AppointmentError> {
        if self.is_resolved() {
            return Err(AppointmentError::ReminderAlreadyResolved(self.id));
        }
        self.outcome = ReminderOutcome::Failed { at, error: error.into() };
        Ok(())
    }

    /// What the dispatch worker receives.
    pub fn dispatch_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "reminder_id": self.id,
            "appointment_id": self.appointment_id,
            "channel": self.channel,
            "scheduled_for": self.scheduled_for,
            "subject": self.subject,
            "message": self.message,
        })
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Appointment conflicts with existing bookings ({} clashing appointment(s))", .clashes.len())]
    ConflictDetected { clashes: Vec<Clash> },

    #[error("Status transition from {from} to {to} is not permitted")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Reminder would be sent at {scheduled_for}, which is before {now}")]
    PastReminder {
        scheduled_for: NaiveDateTime,
        now: NaiveDateTime,
    },

    #[error("Appointment cannot be modified in current status: {0}")]
    NotEditable(AppointmentStatus),

    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Reminder {0} already has an outcome")]
    ReminderAlreadyResolved(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Availability error: {0}")]
    Availability(#[from] AvailabilityError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<TimeError> for AppointmentError {
    fn from(err: TimeError) -> Self {
        match err {
            TimeError::InvalidFormat(msg) => AppointmentError::InvalidFormat(msg),
            TimeError::InvalidRange(msg) => AppointmentError::InvalidRange(msg),
        }
    }
}

impl AppointmentError {
    /// Every existing appointment involved in a conflict, once each.
    pub fn conflicting_appointments(&self) -> Vec<&Appointment> {
        let AppointmentError::ConflictDetected { clashes } = self else {
            return Vec::new();
        };
        let mut seen = Vec::new();
        for appointment in clashes.iter().flat_map(|c| c.conflicting.iter()) {
            if !seen.iter().any(|a: &&Appointment| a.id == appointment.id) {
                seen.push(appointment);
            }
        }
        seen
    }
}
