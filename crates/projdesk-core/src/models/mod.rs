//! Data models for the project API.
//!
//! - `StatusPriority`, `Choice`: the selectable statuses and priorities
//! - `NewProject`: the body sent to `/create_project/`
//! - `Project`: the created project as echoed by the server

pub mod project;

pub use project::{Choice, NewProject, Project, StatusPriority, DEADLINE_FORMAT};
