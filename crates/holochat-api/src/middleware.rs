use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use jsonwebtoken::{DecodingKey, Validation, decode};

use holochat_types::api::{Claims, TokenPurpose};

use crate::AppState;
use crate::error::ApiError;

/// Extract and validate the JWT from `Authorization` (or `x-access-token`).
///
/// The `Bearer ` prefix is optional; the mobile client sends bare tokens.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get("x-access-token")
        .or_else(|| req.headers().get(header::AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Auth token is not supplied".into()))?;

    let claims = decode_token(&state.jwt_secret, token)
        .map_err(|_| ApiError::Forbidden("Token is not valid".into()))?;

    // Verification and reset tokens share the secret but never name a member
    let member_id = match (claims.purpose, claims.memberid) {
        (TokenPurpose::Session, Some(id)) => id,
        _ => return Err(ApiError::missing_information()),
    };

    req.extensions_mut().insert(AuthMember {
        member_id,
        email: claims.email,
    });
    Ok(next.run(req).await)
}

/// The signed-in member, inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthMember {
    pub member_id: i64,
    pub email: String,
}

pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Credentials carried by an HTTP Basic `Authorization` header.
#[derive(Debug)]
pub struct BasicCredentials {
    pub email: String,
    pub password: String,
}

/// Parse `Authorization: Basic base64(email[:password])`.
///
/// The reset-code endpoint only sends the email, so the password part may be
/// absent; callers that need it check for emptiness themselves.
pub fn basic_credentials(headers: &HeaderMap) -> Result<BasicCredentials, ApiError> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or_else(|| ApiError::bad_request("Missing Authorization Header"))?;

    let malformed = || ApiError::bad_request("Malformed Authorization Header");

    let decoded = B64.decode(encoded.trim()).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;

    let (email, password) = decoded.split_once(':').unwrap_or((decoded.as_str(), ""));
    if email.is_empty() {
        return Err(malformed());
    }

    Ok(BasicCredentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn basic(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", B64.encode(raw))).unwrap(),
        );
        headers
    }

    #[test]
    fn basic_with_password() {
        let creds = basic_credentials(&basic("cfb3@fake.email:Test12!")).unwrap();
        assert_eq!(creds.email, "cfb3@fake.email");
        assert_eq!(creds.password, "Test12!");
    }

    #[test]
    fn basic_email_only() {
        let creds = basic_credentials(&basic("cfb3@fake.email")).unwrap();
        assert_eq!(creds.email, "cfb3@fake.email");
        assert!(creds.password.is_empty());
    }

    #[test]
    fn basic_rejections() {
        let err = basic_credentials(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "Missing Authorization Header");

        let mut bearer = HeaderMap::new();
        bearer.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(
            basic_credentials(&bearer).unwrap_err().to_string(),
            "Missing Authorization Header"
        );

        let mut garbage = HeaderMap::new();
        garbage.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert_eq!(
            basic_credentials(&garbage).unwrap_err().to_string(),
            "Malformed Authorization Header"
        );

        assert_eq!(
            basic_credentials(&basic(":secret")).unwrap_err().to_string(),
            "Malformed Authorization Header"
        );
    }
}
