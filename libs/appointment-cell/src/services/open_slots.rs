use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use practitioner_cell::services::AvailabilityService;
use shared_utils::Clock;

use crate::models::{AppointmentError, OpenSlot};
use crate::services::conflict::blocks;
use crate::services::store::AppointmentStore;

/// Answers "what can still be booked": template slots minus active bookings.
pub struct OpenSlotService {
    availability: AvailabilityService,
    store: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
}

impl OpenSlotService {
    pub fn new(
        availability: AvailabilityService,
        store: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            availability,
            store,
            clock,
        }
    }

    /// Template slots no active booking overlaps, using the same test the
    /// booking path applies. Slots that have already started are left out.
    pub async fn open_slots(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<OpenSlot>, AppointmentError> {
        let Some(day) = self.availability.slots_for_date(practitioner_id, date).await? else {
            return Ok(Vec::new());
        };

        let booked = self
            .store
            .find_active_by_practitioner_and_date(practitioner_id, date)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let now = self.clock.now();

        let open: Vec<OpenSlot> = day
            .slots
            .iter()
            .filter(|slot| date.and_time(slot.start.to_naive_time()) > now)
            .filter(|slot| !booked.iter().any(|a| blocks(a, slot.start, slot.end)))
            .map(|slot| OpenSlot {
                start: slot.start,
                end: slot.end,
                duration_minutes: slot.duration_minutes,
            })
            .collect();

        debug!(
            "{} of {} slot(s) open for practitioner {} on {}",
            open.len(),
            day.slots.len(),
            practitioner_id,
            date
        );

        Ok(open)
    }
}
