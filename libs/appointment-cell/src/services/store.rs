use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::models::Appointment;

/// Held while conflicts are checked and the result persisted.
pub type ScheduleGuard = OwnedMutexGuard<()>;

/// Persistence boundary for appointments.
///
/// Multi-row writes (`save_series`, `update_many`, `replace`, `delete`)
/// must be all-or-nothing.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>>;

    /// SCHEDULED, CONFIRMED and IN_PROGRESS appointments only.
    async fn find_active_by_practitioner_and_date(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>>;

    async fn children_of(&self, parent_id: Uuid) -> Result<Vec<Appointment>>;

    async fn save_series(&self, appointments: &[Appointment]) -> Result<()>;

    async fn update(&self, appointment: &Appointment) -> Result<()>;

    async fn update_many(&self, appointments: &[Appointment]) -> Result<()>;

    /// Persist a superseded booking and its replacement together.
    async fn replace(&self, superseded: &Appointment, replacement: &Appointment) -> Result<()>;

    async fn delete(&self, ids: &[Uuid]) -> Result<()>;

    /// Serialization point for "detect conflicts, then persist" on one practitioner.
    async fn acquire_schedule_lock(&self, practitioner_id: Uuid) -> Result<ScheduleGuard>;
}

#[derive(Debug, Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    schedule_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }

    /// Insert without any scheduling checks, for seeding fixtures.
    pub async fn insert(&self, appointment: Appointment) {
        self.appointments.write().await.insert(appointment.id, appointment);
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn find_active_by_practitioner_and_date(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>> {
        let appointments = self.appointments.read().await;
        let mut found: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.practitioner_id == practitioner_id && a.appointment_date == date && a.is_active())
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_time);
        Ok(found)
    }

    async fn children_of(&self, parent_id: Uuid) -> Result<Vec<Appointment>> {
        let appointments = self.appointments.read().await;
        let mut children: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.parent_appointment_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by_key(|a| a.start_instant());
        Ok(children)
    }

    async fn save_series(&self, series: &[Appointment]) -> Result<()> {
        let mut appointments = self.appointments.write().await;
        if let Some(existing) = series.iter().find(|a| appointments.contains_key(&a.id)) {
            return Err(anyhow!("appointment {} already exists", existing.id));
        }
        for appointment in series {
            appointments.insert(appointment.id, appointment.clone());
        }
        debug!("Saved {} appointment(s)", series.len());
        Ok(())
    }

    async fn update(&self, appointment: &Appointment) -> Result<()> {
        self.update_many(std::slice::from_ref(appointment)).await
    }

    async fn update_many(&self, changed: &[Appointment]) -> Result<()> {
        let mut appointments = self.appointments.write().await;
        if let Some(missing) = changed.iter().find(|a| !appointments.contains_key(&a.id)) {
            return Err(anyhow!("appointment {} does not exist", missing.id));
        }
        for appointment in changed {
            appointments.insert(appointment.id, appointment.clone());
        }
        Ok(())
    }

    async fn replace(&self, superseded: &Appointment, replacement: &Appointment) -> Result<()> {
        let mut appointments = self.appointments.write().await;
        if !appointments.contains_key(&superseded.id) {
            return Err(anyhow!("appointment {} does not exist", superseded.id));
        }
        if appointments.contains_key(&replacement.id) {
            return Err(anyhow!("appointment {} already exists", replacement.id));
        }
        appointments.insert(superseded.id, superseded.clone());
        appointments.insert(replacement.id, replacement.clone());
        Ok(())
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<()> {
        let mut appointments = self.appointments.write().await;
        for id in ids {
            appointments.remove(id);
        }
        Ok(())
    }

    async fn acquire_schedule_lock(&self, practitioner_id: Uuid) -> Result<ScheduleGuard> {
        let lock = {
            let mut locks = self.schedule_locks.lock().await;
            Arc::clone(locks.entry(practitioner_id).or_default())
        };
        Ok(lock.lock_owned().await)
    }
}
