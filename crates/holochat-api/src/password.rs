use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use rand::Rng;
use serde_json::Value;
use tracing::{error, info};

use holochat_db::models::CodeGated;
use holochat_types::api::{PasswordChangedResponse, ResetCodeResponse, TokenPurpose, UpdatePasswordRequest};

use crate::auth::{create_token, hash_password};
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::mail::{deliver, password_changed_mail, reset_code_mail};
use crate::middleware::basic_credentials;
use crate::validation::{is_valid_password, is_value_provided, normalize_email, required, value_as_i64};
use crate::{AppState, run_db};

/// How long a mailed reset code stays usable.
pub const RESET_CODE_TTL_MINUTES: i64 = 15;

/// GET /changePassword: Basic auth carrying the email; mails a 4-digit code.
pub async fn send_reset_code(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&basic_credentials(&headers)?.email);
    let code: i64 = rand::rng().random_range(1000..=9998);

    let lookup = email.clone();
    let stored = run_db(&state, move |db| {
        db.set_reset_code(&lookup, code, RESET_CODE_TTL_MINUTES)
    })
    .await?;
    if !stored {
        return Err(ApiError::not_found("User not found"));
    }

    let token = create_token(&state.jwt_secret, &email, TokenPurpose::Reset, None).map_err(|e| {
        error!("Failed to sign token: {}", e);
        ApiError::Internal
    })?;
    deliver(&state, reset_code_mail(&email, code)).await;
    info!("Issued reset code for {}", email);

    Ok(Json(ResetCodeResponse {
        success: true,
        message: "Authentication successful, Email has been sent!".into(),
        token,
    }))
}

/// POST /changePassword: `verifCode`, `email`, `password`.
pub async fn update_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) = (required(req.email.as_deref()), required(req.password.as_deref()))
    else {
        return Err(ApiError::missing_information());
    };
    let code = reset_code(req.verif_code.as_ref())?;

    if !is_valid_password(password) {
        return Err(ApiError::bad_request("Invalid password"));
    }

    let email = normalize_email(email);
    let (salted_hash, salt) = hash_password(password.to_string()).await?;

    let lookup = email.clone();
    let outcome = run_db(&state, move |db| {
        db.update_password_with_code(&lookup, code, &salted_hash, &salt)
    })
    .await?;
    check_code_gate(outcome)?;

    info!("Password changed for {}", email);
    deliver(&state, password_changed_mail(&email)).await;

    Ok((
        StatusCode::CREATED,
        Json(PasswordChangedResponse {
            success: true,
            email,
        }),
    ))
}

/// Pull the reset code out of the body. Missing is a 400; a value that is not
/// a number can never match and is reported as a mismatch.
pub(crate) fn reset_code(value: Option<&Value>) -> Result<i64, ApiError> {
    if !is_value_provided(value) {
        return Err(ApiError::missing_information());
    }
    value
        .and_then(value_as_i64)
        .ok_or_else(|| ApiError::bad_request("Verification code does not match."))
}

pub(crate) fn check_code_gate(outcome: CodeGated) -> Result<(), ApiError> {
    match outcome {
        CodeGated::Applied => Ok(()),
        CodeGated::UnknownMember => Err(ApiError::not_found("User not found")),
        CodeGated::CodeMismatch => Err(ApiError::bad_request("Verification code does not match.")),
        CodeGated::UsernameTaken => Err(ApiError::bad_request("Username exists")),
    }
}
