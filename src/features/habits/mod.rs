//! # Feature: Habits
//!
//! Habit records, their invariants, and the CRUD service that keeps each
//! habit's reminder registered.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod model;
pub mod service;
pub mod validation;

pub use model::{Habit, HabitDraft, HabitPatch};
pub use service::{HabitService, ResyncReport};
pub use validation::{validate_draft, RelatedLookup};
