use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::{info, warn};

use holochat_types::api::TokenPurpose;

use crate::error::ApiError;
use crate::middleware::decode_token;
use crate::{AppState, run_db};

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

/// GET /service?token=...: the link mailed at registration.
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Invalid verification token"))?;

    let claims = decode_token(&state.jwt_secret, &token).map_err(|e| {
        warn!("Rejected verification token: {}", e);
        ApiError::bad_request("Invalid verification token")
    })?;
    if claims.purpose != TokenPurpose::Verify {
        warn!("Rejected {:?} token on the verification link", claims.purpose);
        return Err(ApiError::bad_request("Invalid verification token"));
    }

    let email = claims.email;
    let lookup = email.clone();
    if !run_db(&state, move |db| db.verify_member(&lookup)).await? {
        return Err(ApiError::not_found("User not found"));
    }

    info!("Verified {}", email);
    Ok(Redirect::to("/service/success"))
}
