/// User projections and payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use super::{check, check_max_chars, display_name, invalid_choice, nullable, FieldErrors, WriteError, WriteMode};
use crate::auth::password::{hash_password, validate_password_strength, HashParams};
use crate::models::user::{CreateUser, Role, UpdateUser, User};

/// Read projection of a user; never carries the credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub role: Role,
    pub role_display: String,
    pub profile_picture: Option<String>,
    pub date_joined: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            display_name: display_name(&user.first_name, &user.last_name, &user.username),
            role: user.role,
            role_display: user.role.label().to_string(),
            profile_picture: user.profile_picture.clone(),
            date_joined: user.date_joined,
        }
    }
}

/// Registration and profile payload
///
/// `role` is honored only when the acting user is an admin. `password` is
/// write-only: it is strength-checked and hashed before it reaches the store.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserPayload {
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: Option<String>,

    /// Optional; an empty string clears it
    pub email: Option<String>,

    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: Option<String>,

    pub role: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub profile_picture: Option<Option<String>>,

    pub password: Option<String>,
}

impl UserPayload {
    /// Builds a new account; role defaults to employee
    pub fn into_create(self, actor_is_admin: bool, params: &HashParams) -> Result<CreateUser, WriteError> {
        let (fields, password_hash) = self.prepare(WriteMode::Create, actor_is_admin, params)?;

        Ok(CreateUser {
            username: fields.username.unwrap_or_default(),
            email: fields.email.unwrap_or_default(),
            first_name: fields.first_name.unwrap_or_default(),
            last_name: fields.last_name.unwrap_or_default(),
            role: fields.role.unwrap_or_default(),
            profile_picture: fields.profile_picture.flatten(),
            password_hash: password_hash.unwrap_or_default(),
        })
    }

    /// Builds an update; an absent password leaves the stored hash untouched
    pub fn into_update(
        self,
        mode: WriteMode,
        actor_is_admin: bool,
        params: &HashParams,
    ) -> Result<UpdateUser, WriteError> {
        let (fields, password_hash) = self.prepare(mode, actor_is_admin, params)?;

        Ok(UpdateUser {
            username: fields.username,
            email: fields.email,
            first_name: fields.first_name,
            last_name: fields.last_name,
            role: fields.role,
            profile_picture: fields.profile_picture,
            password_hash,
        })
    }

    fn prepare(
        self,
        mode: WriteMode,
        actor_is_admin: bool,
        params: &HashParams,
    ) -> Result<(UpdateUser, Option<String>), WriteError> {
        let mut errors = FieldErrors::new();
        check(&self, &mut errors);

        if mode.requires_all() && self.username.is_none() {
            errors.required("username");
        }
        if mode == WriteMode::Create && self.password.is_none() {
            errors.required("password");
        }
        if let Some(email) = self.email.as_deref().filter(|email| !email.is_empty()) {
            if !email.validate_email() {
                errors.push("email", "Enter a valid email address.");
            }
        }
        if let Some(password) = &self.password {
            if let Err(message) = validate_password_strength(password) {
                errors.push("password", message);
            }
        }
        check_max_chars(
            &mut errors,
            "profile_picture",
            self.profile_picture.as_ref().and_then(|p| p.as_deref()),
            512,
        );

        let role = match self.role.as_deref() {
            Some(value) if actor_is_admin => {
                let parsed = Role::parse(value);
                if parsed.is_none() {
                    invalid_choice(&mut errors, "role", value);
                }
                parsed
            }
            _ => None,
        };

        errors.into_result()?;

        let password_hash = match &self.password {
            Some(password) => Some(hash_password(password, params)?),
            None => None,
        };

        let fields = UpdateUser {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
            profile_picture: self.profile_picture,
            password_hash: None,
        };

        Ok((fields, password_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;

    fn payload(json: serde_json::Value) -> UserPayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_view_omits_credential() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::Manager,
            profile_picture: None,
            password_hash: "$argon2id$secret".to_string(),
            date_joined: now,
            updated_at: now,
        };

        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2id"));
        assert_eq!(json["display_name"], "ada");
        assert_eq!(json["role"], "manager");
        assert_eq!(json["role_display"], "Manager");
    }

    #[test]
    fn test_registration_hashes_password_and_defaults_role() {
        let create = payload(serde_json::json!({
            "username": "new",
            "password": "MyP@ssw0rd!",
            "role": "admin"
        }))
        .into_create(false, &HashParams::fast())
        .unwrap();

        assert_eq!(create.role, Role::Employee);
        assert_ne!(create.password_hash, "MyP@ssw0rd!");
        assert!(verify_password("MyP@ssw0rd!", &create.password_hash).unwrap());
    }

    #[test]
    fn test_admin_may_set_role() {
        let create = payload(serde_json::json!({
            "username": "boss",
            "password": "MyP@ssw0rd!",
            "role": "manager"
        }))
        .into_create(true, &HashParams::fast())
        .unwrap();
        assert_eq!(create.role, Role::Manager);

        let err = payload(serde_json::json!({ "role": "owner" }))
            .into_update(WriteMode::Partial, true, &HashParams::fast())
            .unwrap_err();
        assert!(matches!(err, WriteError::Invalid(errors) if errors.contains("role")));
    }

    #[test]
    fn test_create_requires_username_and_password() {
        let err = payload(serde_json::json!({ "email": "not-an-email" }))
            .into_create(false, &HashParams::fast())
            .unwrap_err();

        let WriteError::Invalid(errors) = err else {
            panic!("expected field errors");
        };
        assert!(errors.contains("username"));
        assert!(errors.contains("password"));
        assert!(errors.contains("email"));
    }

    #[test]
    fn test_blank_email_is_accepted() {
        let create = payload(serde_json::json!({
            "username": "quiet",
            "email": "",
            "password": "MyP@ssw0rd!"
        }))
        .into_create(false, &HashParams::fast())
        .unwrap();
        assert_eq!(create.email, "");

        let update = payload(serde_json::json!({ "email": "" }))
            .into_update(WriteMode::Partial, false, &HashParams::fast())
            .unwrap();
        assert_eq!(update.email.as_deref(), Some(""));
    }

    #[test]
    fn test_update_without_password_keeps_credential() {
        let update = payload(serde_json::json!({ "first_name": "Ada" }))
            .into_update(WriteMode::Partial, false, &HashParams::fast())
            .unwrap();

        assert!(update.password_hash.is_none());
        assert_eq!(update.first_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_weak_password_is_rejected() {
        let err = payload(serde_json::json!({ "password": "weak" }))
            .into_update(WriteMode::Partial, false, &HashParams::fast())
            .unwrap_err();
        assert!(matches!(err, WriteError::Invalid(errors) if errors.contains("password")));
    }

    #[test]
    fn test_profile_picture_null_clears() {
        let update = payload(serde_json::json!({ "profile_picture": null }))
            .into_update(WriteMode::Partial, false, &HashParams::fast())
            .unwrap();
        assert_eq!(update.profile_picture, Some(None));

        let update = payload(serde_json::json!({}))
            .into_update(WriteMode::Partial, false, &HashParams::fast())
            .unwrap();
        assert_eq!(update.profile_picture, None);
    }
}
