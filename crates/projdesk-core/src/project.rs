//! Client-side checks for the project creation form.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{NewProject, StatusPriority, DEADLINE_FORMAT};

/// Deadline formats accepted from user input
const DEADLINE_INPUT_FORMATS: [&str; 2] = [DEADLINE_FORMAT, "%Y-%m-%d %H:%M"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid deadline '{0}', expected YYYY-MM-DDTHH:MM")]
    InvalidDeadline(String),

    #[error("The deadline date and time cannot be earlier than the current time.")]
    DeadlineInPast,

    #[error("Invalid {field} '{value}', expected a numeric id")]
    InvalidChoice { field: &'static str, value: String },

    #[error("Unknown {field} id {id}")]
    UnknownChoice { field: &'static str, id: i64 },
}

/// Raw form input, as typed
#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    pub deadline: String,
    pub status: String,
    pub priority: String,
}

impl ProjectDraft {
    /// Turn the draft into a request body.
    ///
    /// `now` is local wall-clock time, matching the timezone-less deadline.
    /// When `options` is given, status and priority must be among them.
    pub fn validate(
        &self,
        now: NaiveDateTime,
        options: Option<&StatusPriority>,
    ) -> Result<NewProject, ProjectValidationError> {
        let name = required("name", &self.name)?;
        let description = required("description", &self.description)?;
        let deadline = required("deadline", &self.deadline)?;
        let status = required("status", &self.status)?;
        let priority = required("priority", &self.priority)?;

        let deadline_date = parse_deadline(deadline)?;
        if deadline_date < now {
            return Err(ProjectValidationError::DeadlineInPast);
        }

        let status = parse_choice("status", status)?;
        let priority = parse_choice("priority", priority)?;

        if let Some(options) = options {
            if options.status(status).is_none() {
                return Err(ProjectValidationError::UnknownChoice {
                    field: "status",
                    id: status,
                });
            }
            if options.priority(priority).is_none() {
                return Err(ProjectValidationError::UnknownChoice {
                    field: "priority",
                    id: priority,
                });
            }
        }

        Ok(NewProject {
            name: name.to_string(),
            description: description.to_string(),
            deadline_date,
            status,
            priority,
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ProjectValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ProjectValidationError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}

fn parse_deadline(value: &str) -> Result<NaiveDateTime, ProjectValidationError> {
    DEADLINE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| ProjectValidationError::InvalidDeadline(value.to_string()))
}

fn parse_choice(field: &'static str, value: &str) -> Result<i64, ProjectValidationError> {
    value
        .parse()
        .map_err(|_| ProjectValidationError::InvalidChoice {
            field,
            value: value.to_string(),
        })
}
