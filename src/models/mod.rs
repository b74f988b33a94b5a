pub mod due_item;
pub mod note;
pub mod occurrence;
pub mod recurring;

pub use due_item::{DueItem, NewDueItemRequest, UpdateDueItemRequest};
pub use note::{Note, UpdateNoteRequest};
pub use occurrence::{Occurrence, OccurrenceFilter, UpdateOccurrenceRequest};
pub use recurring::{NewRecurringRequest, RecurringDefinition, UpdateRecurringRequest};
