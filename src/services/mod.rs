pub mod intake_service;
pub mod materializer;
pub mod recurrence_service;

pub use intake_service::{ContentEntry, IntakeOutcome, IntakePreview, IntakeService};
pub use materializer::{MaterializeReport, materialize};
pub use recurrence_service::{RecurrenceService, RegenerateStats};
