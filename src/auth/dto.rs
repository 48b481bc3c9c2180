use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for OTP verification.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub user_id: Uuid,
    pub otp: String,
}

/// Partial profile update. A submitted non-empty value replaces the stored
/// one; an omitted or empty field keeps the previous value. Explicit field
/// clearing is not supported.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub hostel_type: Option<String>,
    pub hostel_block: Option<String>,
    pub mobile_number: Option<String>,
}

fn submitted(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl UpdateProfileRequest {
    pub fn name(&self) -> Option<&str> {
        submitted(&self.name)
    }
    pub fn hostel_type(&self) -> Option<&str> {
        submitted(&self.hostel_type)
    }
    pub fn hostel_block(&self) -> Option<&str> {
        submitted(&self.hostel_block)
    }
    pub fn mobile_number(&self) -> Option<&str> {
        submitted(&self.mobile_number)
    }

    /// Profile completeness is judged on this payload alone: all four
    /// fields must be submitted and non-empty. An update omitting one of
    /// them flips completeness to false even if a value is already stored.
    pub fn is_complete(&self) -> bool {
        self.name().is_some()
            && self.hostel_type().is_some()
            && self.hostel_block().is_some()
            && self.mobile_number().is_some()
    }
}

/// Response returned after register, verify or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Client-facing projection of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub hostel_type: Option<String>,
    pub hostel_block: Option<String>,
    pub mobile_number: Option<String>,
    pub is_verified: bool,
    pub is_profile_complete: bool,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            hostel_type: user.hostel_type,
            hostel_block: user.hostel_block,
            mobile_number: user.mobile_number,
            is_verified: user.is_verified,
            is_profile_complete: user.is_profile_complete,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_update() -> UpdateProfileRequest {
        UpdateProfileRequest {
            name: Some("Alice".into()),
            hostel_type: Some("Female".into()),
            hostel_block: Some("C Block".into()),
            mobile_number: Some("9876543210".into()),
        }
    }

    #[test]
    fn complete_when_all_four_fields_submitted() {
        assert!(full_update().is_complete());
    }

    #[test]
    fn omitting_mobile_number_flips_completeness_to_false() {
        let update = UpdateProfileRequest {
            mobile_number: None,
            ..full_update()
        };
        assert!(!update.is_complete());
    }

    #[test]
    fn empty_string_counts_as_absent() {
        let update = UpdateProfileRequest {
            hostel_block: Some("   ".into()),
            ..full_update()
        };
        assert!(!update.is_complete());
        assert_eq!(update.hostel_block(), None);
        assert_eq!(update.name(), Some("Alice"));
    }

    #[test]
    fn submitted_values_are_trimmed() {
        let update = UpdateProfileRequest {
            name: Some("  Bob  ".into()),
            ..Default::default()
        };
        assert_eq!(update.name(), Some("Bob"));
    }
}
