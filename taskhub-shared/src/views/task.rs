/// Task projections and payloads
///
/// Collections render [`TaskSummary`]; a single fetch renders [`TaskDetail`],
/// which adds the task's comments in creation order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::comment::CommentView;
use super::{
    check, check_max_chars, display_name, invalid_choice, nullable, parse_datetime, parse_ids,
    FieldErrors, WriteMode,
};
use crate::models::comment::CommentRecord;
use crate::models::task::{CreateTask, Priority, TaskRecord, TaskStatus, UpdateTask};
use crate::models::user::UserRef;

fn name_of(user: &UserRef) -> String {
    display_name(&user.first_name, &user.last_name, &user.username)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_by_name: String,
    pub assigned_to: Vec<Uuid>,
    pub assigned_to_names: Vec<String>,
    pub priority: Priority,
    pub priority_display: String,
    pub status: TaskStatus,
    pub status_display: String,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub categories: Vec<Uuid>,
    pub category_names: Vec<String>,
}

impl From<&TaskRecord> for TaskSummary {
    fn from(record: &TaskRecord) -> Self {
        let task = &record.task;

        TaskSummary {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            created_by: task.created_by,
            created_by_name: name_of(&record.creator),
            assigned_to: record.assignee_ids(),
            assigned_to_names: record.assignees.iter().map(name_of).collect(),
            priority: task.priority,
            priority_display: task.priority.label().to_string(),
            status: task.status,
            status_display: task.status.label().to_string(),
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
            categories: record.category_ids(),
            category_names: record.categories.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub summary: TaskSummary,
    pub comments: Vec<CommentView>,
}

impl TaskDetail {
    /// `comments` must already be in creation order
    pub fn new(record: &TaskRecord, comments: &[CommentRecord]) -> Self {
        TaskDetail {
            summary: TaskSummary::from(record),
            comments: comments.iter().map(CommentView::from).collect(),
        }
    }
}

/// Task write payload
///
/// Enum, date and id fields arrive as strings so bad values are reported per
/// field. The creator always comes from the acting user, never the payload.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TaskPayload {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    pub priority: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<String>,

    /// Full replacement of the assignee set when present
    pub assigned_to: Option<Vec<String>>,

    /// Full replacement of the category set when present
    pub categories: Option<Vec<String>>,
}

impl TaskPayload {
    /// Well-formed user and category ids, for existence checks
    ///
    /// Malformed ids are reported by the payload conversion instead.
    pub fn referenced_ids(&self) -> (Vec<Uuid>, Vec<Uuid>) {
        let mut malformed = FieldErrors::new();

        (
            parse_ids(&mut malformed, "assigned_to", self.assigned_to.as_deref().unwrap_or_default()),
            parse_ids(&mut malformed, "categories", self.categories.as_deref().unwrap_or_default()),
        )
    }

    fn parse(self, mode: WriteMode) -> Result<UpdateTask, FieldErrors> {
        let mut errors = FieldErrors::new();
        check(&self, &mut errors);

        if mode.requires_all() {
            if self.title.is_none() {
                errors.required("title");
            }
            if self.due_date.is_none() {
                errors.required("due_date");
            }
        }
        check_max_chars(
            &mut errors,
            "description",
            self.description.as_ref().and_then(|d| d.as_deref()),
            10_000,
        );

        let priority = self.priority.as_deref().and_then(|value| {
            let parsed = Priority::parse(value);
            if parsed.is_none() {
                invalid_choice(&mut errors, "priority", value);
            }
            parsed
        });
        let status = self.status.as_deref().and_then(|value| {
            let parsed = TaskStatus::parse(value);
            if parsed.is_none() {
                invalid_choice(&mut errors, "status", value);
            }
            parsed
        });
        let due_date = self
            .due_date
            .as_deref()
            .and_then(|value| parse_datetime(&mut errors, "due_date", value));
        let assigned_to = self
            .assigned_to
            .as_deref()
            .map(|ids| parse_ids(&mut errors, "assigned_to", ids));
        let categories = self
            .categories
            .as_deref()
            .map(|ids| parse_ids(&mut errors, "categories", ids));

        errors.into_result()?;

        Ok(UpdateTask {
            title: self.title,
            description: self.description,
            priority,
            status,
            due_date,
            assigned_to,
            categories,
        })
    }

    /// Builds a new task owned by `created_by`
    pub fn into_create(self, created_by: Uuid) -> Result<CreateTask, FieldErrors> {
        let fields = self.parse(WriteMode::Create)?;

        let (Some(title), Some(due_date)) = (fields.title, fields.due_date) else {
            return Err(FieldErrors::single("title", "This field is required."));
        };

        Ok(CreateTask {
            title,
            description: fields.description.flatten(),
            priority: fields.priority.unwrap_or_default(),
            status: fields.status.unwrap_or_default(),
            due_date,
            created_by,
            assigned_to: fields.assigned_to.unwrap_or_default(),
            categories: fields.categories.unwrap_or_default(),
        })
    }

    pub fn into_update(self, mode: WriteMode) -> Result<UpdateTask, FieldErrors> {
        self.parse(mode)
    }
}

/// Per-field errors for referenced ids that don't exist
pub fn reference_errors(missing_users: &[Uuid], missing_categories: &[Uuid]) -> FieldErrors {
    let mut errors = FieldErrors::new();

    for id in missing_users {
        errors.push("assigned_to", format!("Invalid pk \"{id}\" - object does not exist."));
    }
    for id in missing_categories {
        errors.push("categories", format!("Invalid pk \"{id}\" - object does not exist."));
    }

    errors
}
