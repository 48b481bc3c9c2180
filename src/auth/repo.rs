use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::UpdateProfileRequest;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 hash, not exposed in JSON
    pub hostel_type: Option<String>,
    pub hostel_block: Option<String>,
    pub mobile_number: Option<String>,
    pub is_verified: bool,
    pub is_profile_complete: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, hostel_type, hostel_block, \
     mobile_number, is_verified, is_profile_complete, created_at, updated_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    /// Create a new, unverified user with hashed password.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, is_verified) \
             VALUES ($1, $2, $3, FALSE) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .fetch_one(db)
            .await?;
        Ok(user)
    }

    /// Re-registration before verification: overwrite name and password in
    /// place and reset the verified flag. Same identity, no second record.
    pub async fn reregister(
        db: &PgPool,
        id: Uuid,
        name: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let sql = format!(
            "UPDATE users \
             SET name = $2, password_hash = $3, is_verified = FALSE, updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(name)
            .bind(password_hash)
            .fetch_one(db)
            .await?;
        Ok(user)
    }

    pub async fn mark_verified(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Patch-by-presence profile update: NULL binds keep the stored value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        patch: &UpdateProfileRequest,
        is_complete: bool,
    ) -> anyhow::Result<Option<User>> {
        let sql = format!(
            "UPDATE users \
             SET name = COALESCE($2, name), \
                 hostel_type = COALESCE($3, hostel_type), \
                 hostel_block = COALESCE($4, hostel_block), \
                 mobile_number = COALESCE($5, mobile_number), \
                 is_profile_complete = $6, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(patch.name())
            .bind(patch.hostel_type())
            .bind(patch.hostel_block())
            .bind(patch.mobile_number())
            .bind(is_complete)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "alice@campus.edu".into(),
            password_hash: "$argon2id$super-secret".into(),
            hostel_type: None,
            hostel_block: None,
            mobile_number: None,
            is_verified: false,
            is_profile_complete: false,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("super-secret"));
        assert!(json.contains("alice@campus.edu"));
    }
}
