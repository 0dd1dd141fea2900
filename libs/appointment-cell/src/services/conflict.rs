use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::{overlaps, TimeOfDay};

use crate::models::{Appointment, AppointmentError, Clash};
use crate::services::store::AppointmentStore;

/// Whether `other` holds any part of `[start, end)` on its own date.
pub fn blocks(other: &Appointment, start: TimeOfDay, end: TimeOfDay) -> bool {
    other.is_active() && overlaps(start, end, other.start_time, other.end_time)
}

/// Active appointments in `existing` that collide with `candidate`.
///
/// Only the same practitioner and date are compared, the candidate's own id
/// and `exclusions` are skipped, and non-active statuses never conflict.
pub fn find_conflicts(
    candidate: &Appointment,
    existing: &[Appointment],
    exclusions: &[Uuid],
) -> Vec<Appointment> {
    existing
        .iter()
        .filter(|other| other.id != candidate.id && !exclusions.contains(&other.id))
        .filter(|other| {
            other.practitioner_id == candidate.practitioner_id
                && other.appointment_date == candidate.appointment_date
        })
        .filter(|other| blocks(other, candidate.start_time, candidate.end_time))
        .cloned()
        .collect()
}

pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Every active appointment the candidate would collide with.
    pub async fn check_conflicts(
        &self,
        candidate: &Appointment,
        exclusions: &[Uuid],
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!(
            "Checking conflicts for practitioner {} on {} {}-{}",
            candidate.practitioner_id, candidate.appointment_date, candidate.start_time, candidate.end_time
        );

        let existing = self
            .store
            .find_active_by_practitioner_and_date(candidate.practitioner_id, candidate.appointment_date)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(find_conflicts(candidate, &existing, exclusions))
    }

    /// Check each candidate against stored bookings and against the other
    /// candidates. Returns one `Clash` per colliding candidate.
    pub async fn check_series(
        &self,
        candidates: &[Appointment],
        exclusions: &[Uuid],
    ) -> Result<Vec<Clash>, AppointmentError> {
        let days: BTreeSet<(Uuid, chrono::NaiveDate)> = candidates
            .iter()
            .map(|c| (c.practitioner_id, c.appointment_date))
            .collect();

        debug!(
            "Checking {} candidate(s) across {} practitioner-day(s)",
            candidates.len(),
            days.len()
        );

        let lookups = days.iter().map(|(practitioner_id, date)| {
            self.store.find_active_by_practitioner_and_date(*practitioner_id, *date)
        });
        let mut existing: Vec<Appointment> = try_join_all(lookups)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .into_iter()
            .flatten()
            .collect();
        existing.extend(candidates.iter().cloned());

        let clashes: Vec<Clash> = candidates
            .iter()
            .filter_map(|candidate| {
                let conflicting = find_conflicts(candidate, &existing, exclusions);
                (!conflicting.is_empty()).then(|| Clash {
                    candidate: candidate.clone(),
                    conflicting,
                })
            })
            .collect();

        if !clashes.is_empty() {
            warn!(
                "{} of {} candidate(s) conflict with existing bookings",
                clashes.len(),
                candidates.len()
            );
        }

        Ok(clashes)
    }

    /// `ConflictDetected` listing every clash, or `Ok` when all candidates are free.
    pub async fn ensure_available(
        &self,
        candidates: &[Appointment],
        exclusions: &[Uuid],
    ) -> Result<(), AppointmentError> {
        let clashes = self.check_series(candidates, exclusions).await?;
        if clashes.is_empty() {
            Ok(())
        } else {
            Err(AppointmentError::ConflictDetected { clashes })
        }
    }
}
