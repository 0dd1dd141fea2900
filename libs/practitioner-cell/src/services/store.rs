use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{AvailabilityError, AvailabilityOverride, AvailabilityTemplate};

/// Read side of the template persistence layer.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// The active template for a practitioner on a weekday (0 = Monday), if any.
    async fn template_for(
        &self,
        practitioner_id: Uuid,
        day_of_week: u8,
    ) -> Result<Option<AvailabilityTemplate>>;

    async fn override_for(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityOverride>>;
}

#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<Vec<AvailabilityTemplate>>,
    overrides: RwLock<Vec<AvailabilityOverride>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a validated template. An active template replaces any other
    /// active one for the same practitioner and weekday.
    pub async fn upsert_template(&self, template: AvailabilityTemplate) -> Result<(), AvailabilityError> {
        template.validate()?;

        let mut templates = self.templates.write().await;
        if template.is_active {
            for existing in templates.iter_mut().filter(|t| {
                t.practitioner_id == template.practitioner_id
                    && t.day_of_week == template.day_of_week
                    && t.id != template.id
            }) {
                existing.is_active = false;
            }
        }
        templates.retain(|t| t.id != template.id);

        debug!(
            "Stored availability template {} for practitioner {} (day {})",
            template.id, template.practitioner_id, template.day_of_week
        );
        templates.push(template);
        Ok(())
    }

    pub async fn upsert_override(&self, entry: AvailabilityOverride) {
        let mut overrides = self.overrides.write().await;
        overrides.retain(|o| {
            !(o.practitioner_id == entry.practitioner_id && o.override_date == entry.override_date)
        });
        overrides.push(entry);
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn template_for(
        &self,
        practitioner_id: Uuid,
        day_of_week: u8,
    ) -> Result<Option<AvailabilityTemplate>> {
        let templates = self.templates.read().await;
        Ok(templates
            .iter()
            .find(|t| t.practitioner_id == practitioner_id && t.day_of_week == day_of_week && t.is_active)
            .cloned())
    }

    async fn override_for(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityOverride>> {
        let overrides = self.overrides.read().await;
        Ok(overrides
            .iter()
            .find(|o| o.practitioner_id == practitioner_id && o.override_date == date)
            .cloned())
    }
}
