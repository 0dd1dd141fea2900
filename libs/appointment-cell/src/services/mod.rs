pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod open_slots;
pub mod recurrence;
pub mod reminder;
pub mod store;

pub use booking::AppointmentBookingService;
pub use conflict::{blocks, find_conflicts, ConflictDetectionService};
pub use lifecycle::AppointmentLifecycleService;
pub use open_slots::OpenSlotService;
pub use recurrence::{OccurrenceDates, RecurrenceExpander};
pub use reminder::{render_message, ReminderScheduler};
pub use store::{AppointmentStore, InMemoryAppointmentStore, ScheduleGuard};
