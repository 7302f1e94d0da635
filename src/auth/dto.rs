use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::{Role, User};
use crate::error::{ApiError, FieldError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Trims and lowercases, then checks every field constraint at once.
    pub fn validated(mut self) -> Result<Self, ApiError> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();

        let mut errors = Vec::new();
        if self.name.is_empty() {
            errors.push(FieldError::new("name", "Please provide a name"));
        } else if self.name.chars().count() > 50 {
            errors.push(FieldError::new(
                "name",
                "Name cannot be more than 50 characters",
            ));
        }
        if !is_valid_email(&self.email) {
            errors.push(FieldError::new("email", "Please provide a valid email"));
        }
        if self.password.chars().count() < 6 {
            errors.push(FieldError::new(
                "password",
                "Password must be at least 6 characters",
            ));
        }

        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Partial profile update; absent fields keep their stored value.
#[derive(Debug, Deserialize)]
pub struct UpdateDetailsRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UpdateDetailsRequest {
    /// Merges onto the stored profile and re-validates the result.
    pub fn merged(self, user: &User) -> Result<(String, String), ApiError> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| user.name.clone());
        let email = self
            .email
            .map(|e| e.trim().to_lowercase())
            .unwrap_or_else(|| user.email.clone());

        let mut errors = Vec::new();
        if name.is_empty() {
            errors.push(FieldError::new("name", "Please provide a name"));
        } else if name.chars().count() > 50 {
            errors.push(FieldError::new(
                "name",
                "Name cannot be more than 50 characters",
            ));
        }
        if !is_valid_email(&email) {
            errors.push(FieldError::new("email", "Please provide a valid email"));
        }

        if errors.is_empty() {
            Ok((name, email))
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Public part of the user returned to clients. The password hash is not a
/// field here, so it cannot be serialized by accident.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Response for register, login and password change.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub data: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::User,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn email_pattern_accepts_plausible_addresses() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("two@@example.com"));
    }

    #[test]
    fn register_normalizes_and_accepts() {
        let req = RegisterRequest {
            name: "  Ada Lovelace  ".into(),
            email: "  Ada@Example.COM ".into(),
            password: "secret1".into(),
        };
        let req = req.validated().expect("valid");
        assert_eq!(req.name, "Ada Lovelace");
        assert_eq!(req.email, "ada@example.com");
    }

    #[test]
    fn register_reports_every_violated_field() {
        let req = RegisterRequest {
            name: "".into(),
            email: "nope".into(),
            password: "1234".into(),
        };
        let err = req.validated().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["name", "email", "password"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn register_rejects_overlong_name() {
        let req = RegisterRequest {
            name: "x".repeat(51),
            email: "ada@example.com".into(),
            password: "secret1".into(),
        };
        assert!(matches!(
            req.validated().unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn update_details_keeps_stored_values_for_absent_fields() {
        let user = make_user();
        let req = UpdateDetailsRequest {
            name: None,
            email: Some("NEW@Example.com".into()),
        };
        let (name, email) = req.merged(&user).expect("valid");
        assert_eq!(name, "Ada");
        assert_eq!(email, "new@example.com");
    }

    #[test]
    fn update_details_revalidates_merged_result() {
        let user = make_user();
        let req = UpdateDetailsRequest {
            name: Some("   ".into()),
            email: None,
        };
        assert!(matches!(
            req.merged(&user).unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn public_user_never_contains_password_hash() {
        let public: PublicUser = make_user().into();
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("secret"));
        assert!(json.contains("\"isActive\":true"));
    }
}
