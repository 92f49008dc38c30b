use serde::{Deserialize, Serialize};

/// Public view of a member, as returned by search and directory listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub member_id: i64,
}

/// One outgoing contact edge joined with the member it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactEntry {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub member_id: i64,
    pub verified: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub chat: i64,
    pub name: String,
}

/// A member who shares `chat` with the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMemberEntry {
    pub chat: i64,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub member_id: i64,
}
