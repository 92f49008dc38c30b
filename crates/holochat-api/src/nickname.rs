use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use holochat_types::api::{NicknameChangedResponse, UpdateNicknameRequest};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::mail::{deliver, nickname_changed_mail};
use crate::password::{check_code_gate, reset_code};
use crate::validation::{normalize_email, required};
use crate::{AppState, run_db};

/// POST /changeNickname: `verifCode`, `email`, `username`.
pub async fn update_nickname(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpdateNicknameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(username)) = (required(req.email.as_deref()), required(req.username.as_deref()))
    else {
        return Err(ApiError::missing_information());
    };
    let code = reset_code(req.verif_code.as_ref())?;

    let email = normalize_email(email);
    let username = username.to_string();

    let (lookup, new_name) = (email.clone(), username.clone());
    let outcome = run_db(&state, move |db| {
        db.update_username_with_code(&lookup, code, &new_name)
    })
    .await?;
    check_code_gate(outcome)?;

    info!("Username of {} changed to {}", email, username);
    deliver(&state, nickname_changed_mail(&email)).await;

    Ok((
        StatusCode::CREATED,
        Json(NicknameChangedResponse {
            success: true,
            email,
            username,
        }),
    ))
}
