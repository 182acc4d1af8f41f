//! Phone + one-time password authentication.
//!
//! There is no SMS gateway wired in: issued codes are logged at `debug` and,
//! when `STOREFRONT_EXPOSE_OTP` is set, echoed in the response.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::Phone;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireUser, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::generate_code;
use crate::state::AppState;

/// Body of `POST /api/auth/otp/request`.
#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub phone: String,
}

/// Response to an OTP request.
#[derive(Debug, Serialize)]
pub struct OtpIssued {
    pub message: &'static str,
    /// Seconds until the code expires.
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Body of `POST /api/auth/otp/verify`.
#[derive(Debug, Deserialize)]
pub struct OtpVerify {
    pub phone: String,
    pub code: String,
}

fn parse_phone(raw: &str) -> Result<Phone> {
    Phone::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Issue a login code for a phone number.
#[instrument(skip_all)]
pub async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpRequest>,
) -> Result<Json<OtpIssued>> {
    let phone = parse_phone(&body.phone)?;
    let otp = &state.config().otp;

    let code = generate_code();
    state.otp().put(&phone, code.clone(), otp.ttl).await;
    tracing::debug!(phone = %phone, code = %code, "Issued login code");

    Ok(Json(OtpIssued {
        message: "OTP sent",
        expires_in: otp.ttl.as_secs(),
        code: otp.expose_in_response.then_some(code),
    }))
}

/// Verify a login code and start a session.
///
/// The user is created on first successful login.
#[instrument(skip_all)]
pub async fn verify_otp(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<OtpVerify>,
) -> Result<Json<User>> {
    let phone = parse_phone(&body.phone)?;

    if !state.otp().take_if_matches(&phone, body.code.trim()).await {
        tracing::info!(phone = %phone, "Rejected login code");
        return Err(AppError::Unauthorized(
            "invalid or expired code".to_string(),
        ));
    }

    let user = state.backend().find_or_create_user_by_phone(&phone).await?;
    if !user.is_active {
        return Err(AppError::Forbidden("account is disabled".to_string()));
    }

    let current = CurrentUser {
        id: user.id,
        phone: user.phone.clone(),
    };
    set_current_user(&session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&user.id);

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(user))
}

/// End the current session.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user.
pub async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<User>> {
    state
        .backend()
        .find_user(current.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("user no longer exists".to_string()))
}
