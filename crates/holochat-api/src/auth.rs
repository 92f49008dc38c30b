use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};

use holochat_db::models::{CreateMember, NewMember};
use holochat_types::api::{Claims, RegisterRequest, RegisterResponse, SignInResponse, TokenPurpose};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::mail::{deliver, verification_mail};
use crate::middleware::basic_credentials;
use crate::validation::{is_valid_email, is_valid_password, normalize_email, required};
use crate::{AppState, run_db};

/// Lifetime of every token this service signs.
pub const TOKEN_LIFETIME_DAYS: i64 = 14;

/// POST /auth: create a member and mail a verification link.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(first), Some(last), Some(email), Some(password)) = (
        required(req.first.as_deref()),
        required(req.last.as_deref()),
        required(req.email.as_deref()),
        required(req.password.as_deref()),
    ) else {
        return Err(ApiError::missing_information());
    };

    let email = normalize_email(email);
    let username = required(req.username.as_deref()).unwrap_or(&email).to_string();

    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email"));
    }
    if !is_valid_password(password) {
        return Err(ApiError::bad_request("Invalid password"));
    }

    let (salted_hash, salt) = hash_password(password.to_string()).await?;

    let (first, last, member_email) = (first.to_string(), last.to_string(), email.clone());
    let outcome = run_db(&state, move |db| {
        db.create_member(&NewMember {
            first_name: &first,
            last_name: &last,
            username: &username,
            email: &member_email,
            salted_hash: &salted_hash,
            salt: &salt,
        })
    })
    .await?;

    let member_id = match outcome {
        CreateMember::Created(id) => id,
        CreateMember::UsernameTaken => return Err(ApiError::bad_request("Username exists")),
        CreateMember::EmailTaken => return Err(ApiError::bad_request("Email exists")),
    };
    info!("Registered member {} ({})", member_id, email);

    let token = create_token(&state.jwt_secret, &email, TokenPurpose::Verify, None).map_err(|e| {
        error!("Failed to sign verification token: {}", e);
        ApiError::Internal
    })?;
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let link = format!("http://{}/service?token={}", host, token);
    deliver(&state, verification_mail(&email, &link)).await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            email,
        }),
    ))
}

/// GET /auth: Basic `email:password` in, bearer token out.
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let creds = basic_credentials(&headers)?;
    if creds.password.is_empty() {
        return Err(ApiError::bad_request("Malformed Authorization Header"));
    }
    let email = normalize_email(&creds.email);

    let lookup = email.clone();
    let (member, credentials) = run_db(&state, move |db| {
        let Some(member) = db.get_member_by_email(&lookup)? else {
            return Ok(None);
        };
        let credentials = db.get_credentials(member.member_id)?;
        Ok(Some((member, credentials)))
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    let credentials = credentials.ok_or_else(|| ApiError::bad_request("Credentials did not match"))?;
    if !verify_password(creds.password, credentials.salted_hash).await? {
        return Err(ApiError::bad_request("Credentials did not match"));
    }
    if !member.verified {
        return Err(ApiError::bad_request("Email not verified"));
    }

    let token = create_token(&state.jwt_secret, &email, TokenPurpose::Session, Some(member.member_id))
        .map_err(|e| {
            error!("Failed to sign token: {}", e);
            ApiError::Internal
        })?;

    Ok(Json(SignInResponse {
        success: true,
        message: "Authentication successful!".into(),
        token,
        memberid: member.member_id,
    }))
}

pub fn create_token(
    secret: &str,
    email: &str,
    purpose: TokenPurpose,
    memberid: Option<i64>,
) -> anyhow::Result<String> {
    let claims = Claims {
        email: email.to_string(),
        purpose,
        memberid,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Hash with Argon2id on the blocking pool. Returns the PHC string and its salt.
pub(crate) async fn hash_password(password: String) -> Result<(String, String), ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string());
        hash.map(|h| (h, salt.as_str().to_string()))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })?
    .map_err(|e| {
        error!("Password hashing failed: {}", e);
        ApiError::Internal
    })
}

async fn verify_password(password: String, salted_hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&salted_hash).map_err(|e| {
            error!("Stored hash is not a PHC string: {}", e);
            ApiError::Internal
        })?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })?
}
