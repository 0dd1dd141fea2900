pub mod availability;
pub mod slots;
pub mod store;

pub use availability::AvailabilityService;
pub use slots::{generate_slots, SlotGenerator};
pub use store::{InMemoryTemplateStore, TemplateStore};
