#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentStatus, AppointmentType, NewAppointment, RecurrencePattern,
    ReminderContext,
};
use shared_models::TimeOfDay;
use shared_utils::test_utils::instant;

pub fn t(raw: &str) -> TimeOfDay {
    TimeOfDay::parse(raw).unwrap()
}

pub fn request(practitioner_id: Uuid, date: NaiveDate, start: &str, end: &str) -> NewAppointment {
    NewAppointment {
        practitioner_id,
        patient_id: Uuid::new_v4(),
        created_by: Uuid::new_v4(),
        appointment_date: date,
        start_time: t(start),
        end_time: t(end),
        appointment_type: AppointmentType::Treatment,
        location: Some("Room 2".to_string()),
        notes: None,
        requires_confirmation: false,
        recurrence: None,
    }
}

pub fn recurring(
    practitioner_id: Uuid,
    date: NaiveDate,
    start: &str,
    end: &str,
    pattern: RecurrencePattern,
) -> NewAppointment {
    NewAppointment {
        recurrence: Some(pattern),
        ..request(practitioner_id, date, start, end)
    }
}

/// An appointment built directly, created well before any test clock.
pub fn appointment(practitioner_id: Uuid, date: NaiveDate, start: &str, end: &str) -> Appointment {
    Appointment::new(request(practitioner_id, date, start, end), created()).unwrap()
}

pub fn with_status(mut appointment: Appointment, status: AppointmentStatus) -> Appointment {
    appointment.status = status;
    appointment
}

pub fn created() -> NaiveDateTime {
    instant(2024, 12, 1, 9, 0)
}

pub fn context() -> ReminderContext {
    ReminderContext {
        practitioner_name: "Dr. Ana Ferreira".to_string(),
        patient_name: "Joana Silva".to_string(),
    }
}
