use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, PublicUser, RegisterRequest, UpdateProfileRequest,
            VerifyOtpRequest,
        },
        jwt::{AuthUser, JwtKeys},
        otp,
        password::{hash_password, verify_password},
        repo::User,
    },
    error::ApiError,
    hostel,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", post(verify_otp))
        .route("/auth/me", get(get_me))
        .route("/auth/profile", put(update_profile))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_mobile(mobile: &str) -> bool {
    lazy_static! {
        static ref MOBILE_RE: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
    }
    MOBILE_RE.is_match(mobile)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();

    if name.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("All fields are required"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    let existing = User::find_by_email(&state.db, &payload.email).await?;
    if existing.as_ref().is_some_and(|u| u.is_verified) {
        warn!(email = %payload.email, "email already in use");
        return Err(ApiError::Conflict("Email already in use".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = match existing {
        // Re-registration of an unverified account overwrites it in place.
        Some(u) => User::reregister(&state.db, u.id, name, &hash).await?,
        None => User::create(&state.db, name, &payload.email, &hash).await?,
    };

    let code = otp::generate_code();
    let code_hash = hash_password(&code)?;
    otp::issue(&state.db, user.id, &code_hash).await?;

    // Best-effort: a failed delivery is logged, never fails registration.
    let body = format!(
        "<p>Enter <b>{code}</b> in the app to verify your email address.</p>\
         <p>This code expires in <b>1 hour</b>.</p>"
    );
    if let Err(e) = state.mailer.send(&user.email, "Verify your Email", &body).await {
        warn!(error = %e, user_id = %user.id, "otp email delivery failed");
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let code = payload.otp.trim();
    if code.is_empty() {
        return Err(ApiError::validation("Otp not provided"));
    }

    // Row locks serialize concurrent attempts for the same user: the
    // loser of the race sees no records left and gets NotFound.
    let mut tx = state.db.begin().await?;
    let records = otp::load_for_update(&mut tx, payload.user_id).await?;

    if records.is_empty() {
        return Err(ApiError::NotFound(
            "Account already verified or does not exist".into(),
        ));
    }

    let now = OffsetDateTime::now_utc();
    let Some(latest) = otp::latest_unexpired(&records, now) else {
        return Err(ApiError::OtpExpired);
    };

    if !verify_password(code, &latest.code_hash)? {
        warn!(user_id = %payload.user_id, "otp mismatch");
        return Err(ApiError::InvalidOtp);
    }

    otp::delete_all_for_user(&mut tx, payload.user_id).await?;
    User::mark_verified(&mut tx, payload.user_id).await?;
    tx.commit().await?;

    let user = User::find_by_id(&state.db, payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, "user verified");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("All fields are required"));
    }

    // Existence is checked before anything else; unknown email and wrong
    // password share one client-facing message.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !user.is_verified {
        warn!(user_id = %user.id, "login attempt on unverified account");
        return Err(ApiError::Forbidden(
            "User not verified, please register again".into(),
        ));
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if let Some(hostel_type) = payload.hostel_type() {
        if !hostel::is_valid_type(hostel_type) {
            return Err(ApiError::validation("Invalid hostel type"));
        }
    }
    if let Some(block) = payload.hostel_block() {
        if !hostel::is_valid_block(block) {
            return Err(ApiError::validation("Invalid hostel block"));
        }
    }
    if let Some(mobile) = payload.mobile_number() {
        if !is_valid_mobile(mobile) {
            return Err(ApiError::validation("Invalid mobile number"));
        }
    }

    // Completeness is judged on the submitted payload, not the merged row.
    let is_complete = payload.is_complete();
    let user = User::update_profile(&state.db, user_id, &payload, is_complete)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, is_profile_complete = is_complete, "profile updated");
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_campus_addresses() {
        assert!(is_valid_email("a@x.edu"));
        assert!(is_valid_email("first.last@campus.ac.in"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@at.com"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }

    #[test]
    fn mobile_regex_requires_exactly_ten_digits() {
        assert!(is_valid_mobile("9876543210"));
        assert!(!is_valid_mobile("987654321"));
        assert!(!is_valid_mobile("98765432100"));
        assert!(!is_valid_mobile("98765-4321"));
        assert!(!is_valid_mobile(""));
    }
}
