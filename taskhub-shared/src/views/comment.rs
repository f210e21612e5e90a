/// Comment projections and payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{check, display_name, parse_id, FieldErrors, WriteMode};
use crate::models::comment::{CommentRecord, CreateComment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub task: Uuid,

    /// Author id
    pub user: Uuid,

    /// Author display name
    pub user_name: String,

    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CommentRecord> for CommentView {
    fn from(record: &CommentRecord) -> Self {
        let author = &record.author;

        CommentView {
            id: record.comment.id,
            task: record.comment.task_id,
            user: record.comment.user_id,
            user_name: display_name(&author.first_name, &author.last_name, &author.username),
            content: record.comment.content.clone(),
            created_at: record.comment.created_at,
        }
    }
}

/// Comment payload
///
/// The author always comes from the request's actor. `task` is read on
/// create only; a comment never moves to another task.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CommentPayload {
    pub task: Option<String>,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub content: Option<String>,
}

impl CommentPayload {
    /// Checks the fields `mode` needs, returning the parsed task on create
    fn validate_fields(&self, mode: WriteMode) -> Result<Option<Uuid>, FieldErrors> {
        let mut errors = FieldErrors::new();
        check(self, &mut errors);

        let mut task = None;
        if mode == WriteMode::Create {
            match self.task.as_deref() {
                Some(value) => task = parse_id(&mut errors, "task", value),
                None => errors.required("task"),
            }
        }
        if mode.requires_all() && self.content.is_none() {
            errors.required("content");
        }

        errors.into_result()?;
        Ok(task)
    }

    /// Target task of a new comment, once the payload is known to be valid
    pub fn task_id(&self) -> Result<Uuid, FieldErrors> {
        self.validate_fields(WriteMode::Create)?
            .ok_or_else(|| FieldErrors::single("task", "This field is required."))
    }

    pub fn into_create(self, author: Uuid) -> Result<CreateComment, FieldErrors> {
        let task_id = self.task_id()?;

        Ok(CreateComment {
            task_id,
            user_id: author,
            content: self.content.unwrap_or_default(),
        })
    }

    /// New content, or None when a partial update leaves it alone
    pub fn into_update(self, mode: WriteMode) -> Result<Option<String>, FieldErrors> {
        self.validate_fields(mode)?;
        Ok(self.content)
    }
}
