/// Category projections and payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{check, nullable, FieldErrors, WriteMode};
use crate::models::category::{Category, CreateCategory, UpdateCategory, DEFAULT_COLOR};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        CategoryView {
            id: category.id,
            name: category.name.clone(),
            description: category.description.clone(),
            color: category.color.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CategoryPayload {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    pub color: Option<String>,
}

/// `#RRGGBB`
fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

impl CategoryPayload {
    fn validate_fields(&self, mode: WriteMode) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check(self, &mut errors);

        if mode.requires_all() && self.name.is_none() {
            errors.required("name");
        }
        if let Some(color) = &self.color {
            if !is_hex_color(color) {
                errors.push("color", "Enter a hex color like #007bff.");
            }
        }

        errors.into_result()
    }

    pub fn into_create(self) -> Result<CreateCategory, FieldErrors> {
        self.validate_fields(WriteMode::Create)?;

        Ok(CreateCategory {
            name: self.name.unwrap_or_default(),
            description: self.description.flatten(),
            color: self.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        })
    }

    pub fn into_update(self, mode: WriteMode) -> Result<UpdateCategory, FieldErrors> {
        self.validate_fields(mode)?;

        Ok(UpdateCategory {
            name: self.name,
            description: self.description,
            color: self.color,
        })
    }
}
