use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- JWT Claims --

/// What a token was issued for. A token is only accepted by the route that
/// matches its purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    /// Mailed verification link.
    Verify,
    /// Returned by the reset-code request.
    Reset,
    /// Bearer token handed out at sign-in.
    Session,
}

/// JWT claims shared by the verification link, the reset-code flow and the
/// bearer tokens handed out at sign-in. Only session tokens carry a member id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub purpose: TokenPurpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memberid: Option<i64>,
    pub exp: usize,
}

// -- Auth --

/// Registration body. Every field is optional on the wire so a missing field
/// can be answered with the usual "Missing required information" message.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub first: Option<String>,
    pub last: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub memberid: i64,
}

// -- Reset code gated changes --

#[derive(Debug, Serialize)]
pub struct ResetCodeResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub verif_code: Option<Value>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PasswordChangedResponse {
    pub success: bool,
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNicknameRequest {
    pub verif_code: Option<Value>,
    pub email: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NicknameChangedResponse {
    pub success: bool,
    pub email: String,
    pub username: String,
}

// -- Contacts --

/// `memberId` and `verified` arrive either as JSON numbers or numeric strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub member_id: Option<Value>,
    pub verified: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search_string: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactsResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub contacts: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct ChatListResponse<T> {
    pub success: bool,
    pub chats: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// -- Weather --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub temp_c: f64,
    pub temp_f: f64,
    pub feel: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub description: Value,
    pub latitude: f64,
    pub longitude: f64,
    pub hourly: Value,
    pub daily: Value,
}

// -- Errors --

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
