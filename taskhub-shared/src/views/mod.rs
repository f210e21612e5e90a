/// View projection layer
///
/// Read side: entity records become the JSON shapes clients see, with raw
/// foreign keys next to derived display strings. Write side: request
/// payloads are validated and turned into model inputs. Server-owned fields
/// (ids, timestamps, creator, author) are never read from a payload; a
/// client that sends them is silently ignored.
///
/// Everything here is synchronous and side-effect free.

pub mod category;
pub mod comment;
pub mod task;
pub mod user;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::auth::password::PasswordError;

/// How a write payload is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// POST: required fields must be present
    Create,

    /// PUT: required fields must be present, the rest may be omitted
    Replace,

    /// PATCH: every field is optional
    Partial,
}

impl WriteMode {
    fn requires_all(&self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Per-field validation failures of one payload
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("Validation failed: {} errors", .0.len())]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    /// Ok when nothing was collected
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn required(&mut self, field: &str) {
        self.push(field, "This field is required.");
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut collected: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| FieldError {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        collected.sort_by(|a, b| a.field.cmp(&b.field));
        FieldErrors(collected)
    }
}

/// Failure to turn a payload into a model input
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error(transparent)]
    Invalid(#[from] FieldErrors),

    /// Hashing the submitted credential failed
    #[error(transparent)]
    Credential(#[from] PasswordError),
}

/// Name shown for a user: `"{first} {last}"` trimmed, else the username
pub fn display_name(first_name: &str, last_name: &str, username: &str) -> String {
    let full = format!("{} {}", first_name, last_name);
    let full = full.trim();

    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

/// Runs derive-based validation, collecting failures
fn check<T: Validate>(payload: &T, errors: &mut FieldErrors) {
    if let Err(failures) = payload.validate() {
        errors.0.extend(FieldErrors::from(failures).0);
    }
}

/// Distinguishes an absent field (None) from an explicit null (Some(None))
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_max_chars(errors: &mut FieldErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.push(
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
        }
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC)
fn parse_datetime(errors: &mut FieldErrors, field: &str, value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Some(midnight.and_utc());
    }

    errors.push(
        field,
        "Datetime has wrong format. Use YYYY-MM-DDThh:mm:ssZ or YYYY-MM-DD.",
    );
    None
}

fn parse_id(errors: &mut FieldErrors, field: &str, value: &str) -> Option<Uuid> {
    match Uuid::parse_str(value) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(field, format!("\"{value}\" is not a valid UUID."));
            None
        }
    }
}

/// Malformed entries are reported and dropped
fn parse_ids(errors: &mut FieldErrors, field: &str, values: &[String]) -> Vec<Uuid> {
    values
        .iter()
        .filter_map(|value| parse_id(errors, field, value))
        .collect()
}

fn invalid_choice(errors: &mut FieldErrors, field: &str, value: &str) {
    errors.push(field, format!("\"{value}\" is not a valid choice."));
}
