use shared_models::TimeOfDay;

use crate::models::{AvailabilityTemplate, Slot};

/// Walks a template's window, emitting `slot_duration` slots separated by `gap`.
///
/// Pure: the same template always yields the same sequence, and the
/// generator never looks at bookings.
#[derive(Debug, Clone)]
pub struct SlotGenerator {
    cursor: u32,
    window_end: u32,
    duration: u32,
    step: u32,
}

impl SlotGenerator {
    pub fn new(template: &AvailabilityTemplate) -> Self {
        Self {
            cursor: template.window_start.minutes() as u32,
            window_end: template.window_end.minutes() as u32,
            duration: template.slot_duration_minutes,
            step: template.slot_duration_minutes.saturating_add(template.gap_minutes),
        }
    }
}

impl Iterator for SlotGenerator {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        let slot_end = self.cursor.saturating_add(self.duration);
        // A zero-length slot would never advance the cursor.
        if self.duration == 0 || slot_end > self.window_end {
            return None;
        }

        let start = TimeOfDay::from_minutes(self.cursor as u16).ok()?;
        let end = TimeOfDay::from_minutes(slot_end as u16).ok()?;
        self.cursor = self.cursor.saturating_add(self.step);

        Some(Slot {
            start,
            end,
            duration_minutes: self.duration,
        })
    }
}

pub fn generate_slots(template: &AvailabilityTemplate) -> Vec<Slot> {
    SlotGenerator::new(template).collect()
}
