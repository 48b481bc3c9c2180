use rand::Rng;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Codes are valid for one hour from issuance.
pub const OTP_TTL: Duration = Duration::hours(1);

/// One outstanding verification code for a pending user. Only the argon2
/// hash of the code is ever stored.
#[derive(Debug, Clone, FromRow)]
pub struct OtpRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code_hash: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Uniform random 4-digit code, 1000..=9999.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(1000..10000).to_string()
}

/// The record a submitted code must be compared against: the most recently
/// created one among those still unexpired. Codes matching any other record
/// are rejected.
pub fn latest_unexpired(records: &[OtpRecord], now: OffsetDateTime) -> Option<&OtpRecord> {
    records
        .iter()
        .filter(|r| r.expires_at > now)
        .max_by_key(|r| r.created_at)
}

pub async fn issue(db: &PgPool, user_id: Uuid, code_hash: &str) -> anyhow::Result<OtpRecord> {
    let now = OffsetDateTime::now_utc();
    let record = sqlx::query_as::<_, OtpRecord>(
        r#"
        INSERT INTO otp_verifications (user_id, code_hash, created_at, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, code_hash, created_at, expires_at
        "#,
    )
    .bind(user_id)
    .bind(code_hash)
    .bind(now)
    .bind(now + OTP_TTL)
    .fetch_one(db)
    .await?;
    Ok(record)
}

/// Load every outstanding record for a user, locking the rows so that
/// concurrent verification attempts for the same user serialize: the
/// second attempt observes the rows already deleted and fails cleanly.
pub async fn load_for_update(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> anyhow::Result<Vec<OtpRecord>> {
    let records = sqlx::query_as::<_, OtpRecord>(
        r#"
        SELECT id, user_id, code_hash, created_at, expires_at
        FROM otp_verifications
        WHERE user_id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(records)
}

/// Purge every record for the user, not just the matched one, so sibling
/// codes from repeated registrations cannot be replayed.
pub async fn delete_all_for_user(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM otp_verifications WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(created_offset_mins: i64, expires_offset_mins: i64, now: OffsetDateTime) -> OtpRecord {
        OtpRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code_hash: "$argon2id$fake".into(),
            created_at: now + Duration::minutes(created_offset_mins),
            expires_at: now + Duration::minutes(expires_offset_mins),
        }
    }

    #[test]
    fn generated_codes_are_four_digits_and_never_below_1000() {
        for _ in 0..256 {
            let code = generate_code();
            assert_eq!(code.len(), 4);
            let n: u32 = code.parse().expect("numeric");
            assert!((1000..=9999).contains(&n), "out of range: {n}");
        }
    }

    #[test]
    fn selects_newest_among_unexpired() {
        let now = OffsetDateTime::now_utc();
        let older = record(-30, 30, now);
        let newer = record(-5, 55, now);
        let records = vec![older.clone(), newer.clone()];
        let selected = latest_unexpired(&records, now).expect("one valid");
        assert_eq!(selected.id, newer.id);
    }

    #[test]
    fn expired_newest_falls_back_to_older_still_valid_record() {
        // The newest overall is already expired; the older record is the
        // latest *valid* one and must be selected.
        let now = OffsetDateTime::now_utc();
        let older_valid = record(-40, 20, now);
        let newer_expired = record(-10, -1, now);
        let records = vec![older_valid.clone(), newer_expired];
        let selected = latest_unexpired(&records, now).expect("older still valid");
        assert_eq!(selected.id, older_valid.id);
    }

    #[test]
    fn all_expired_yields_none() {
        let now = OffsetDateTime::now_utc();
        let records = vec![record(-120, -60, now), record(-90, -30, now)];
        assert!(latest_unexpired(&records, now).is_none());
    }

    #[test]
    fn empty_set_yields_none() {
        let now = OffsetDateTime::now_utc();
        assert!(latest_unexpired(&[], now).is_none());
    }
}
