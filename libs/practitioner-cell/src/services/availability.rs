use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{day_of_week_index, AvailabilityError, AvailabilityTemplate, DaySlots};
use crate::services::slots::generate_slots;
use crate::services::store::TemplateStore;

pub struct AvailabilityService {
    store: Arc<dyn TemplateStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self { store }
    }

    /// Resolve the template that governs `date`, honouring date overrides.
    pub async fn template_for_date(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityTemplate>, AvailabilityError> {
        let override_entry = self
            .store
            .override_for(practitioner_id, date)
            .await
            .map_err(|e| AvailabilityError::Database(e.to_string()))?;

        if let Some(entry) = override_entry {
            if !entry.is_available {
                debug!(
                    "Practitioner {} unavailable on {} ({})",
                    practitioner_id,
                    date,
                    entry.reason.as_deref().unwrap_or("no reason given")
                );
                return Ok(None);
            }
        }

        let template = self
            .store
            .template_for(practitioner_id, day_of_week_index(date))
            .await
            .map_err(|e| AvailabilityError::Database(e.to_string()))?;

        Ok(template.filter(|t| t.applies_to(date)))
    }

    /// Every theoretical slot for `date`. Bookings are not consulted.
    pub async fn slots_for_date(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DaySlots>, AvailabilityError> {
        let Some(template) = self.template_for_date(practitioner_id, date).await? else {
            debug!("No active template for practitioner {} on {}", practitioner_id, date);
            return Ok(None);
        };

        let slots = generate_slots(&template);
        if slots.is_empty() {
            warn!(
                "Template {} produces no slots ({} min slots in {}-{})",
                template.id, template.slot_duration_minutes, template.window_start, template.window_end
            );
        }

        debug!("Generated {} slots for practitioner {} on {}", slots.len(), practitioner_id, date);

        Ok(Some(DaySlots {
            practitioner_id,
            date,
            template,
            slots,
        }))
    }
}
