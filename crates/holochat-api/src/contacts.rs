//! Contact list management for the signed-in member.
//!
//! Every mutation runs the same gate sequence before touching the contacts
//! table: the id must be numeric, the other member must exist, and the edge
//! must (or must not) already be there.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::{debug, info};

use holochat_db::models::{AddContact, ChatMemberRow, ChatRow, ContactRow, MemberRow};
use holochat_types::api::{
    ChatListResponse, ContactRequest, ContactsResponse, SearchQuery, SuccessResponse,
};
use holochat_types::models::{ChatEntry, ChatMemberEntry, ContactEntry, MemberSummary};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::middleware::AuthMember;
use crate::validation::{normalize_email, required, value_as_i64};
use crate::{AppState, run_db};

fn parse_id(raw: &str, malformed: &str) -> Result<i64, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::bad_request(malformed))
}

/// GET /contacts
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthMember>,
) -> Result<impl IntoResponse, ApiError> {
    let me = caller.member_id;

    let rows = run_db(&state, move |db| db.list_contacts(me)).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("Contact not found"));
    }

    Ok(Json(ContactsResponse {
        success: true,
        email: Some(caller.email),
        contacts: rows.into_iter().map(contact_entry).collect(),
    }))
}

/// GET /contacts/search?search_string=
pub async fn search(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthMember>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let needle = required(query.search_string.as_deref())
        .ok_or_else(ApiError::missing_information)?
        .to_string();

    let rows = run_db(&state, move |db| db.search_members(&needle)).await?;

    Ok(Json(ContactsResponse {
        success: true,
        email: Some(caller.email),
        contacts: rows.into_iter().map(member_summary).collect::<Vec<_>>(),
    }))
}

/// GET /contacts/search/{email}
pub async fn search_by_email(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthMember>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&email);

    let row = run_db(&state, move |db| db.get_member_by_email(&email)).await?;

    Ok(Json(ContactsResponse {
        success: true,
        email: Some(caller.email),
        contacts: row.into_iter().map(member_summary).collect::<Vec<_>>(),
    }))
}

/// POST /contacts/{memberid_b}: send a contact request (one unverified edge).
pub async fn add_contact(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthMember>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let me = caller.member_id;
    let other = parse_id(&raw_id, "Malformed Parameter, Memberid Must Be A Number")?;
    if other == me {
        return Err(ApiError::bad_request("Cannot add yourself"));
    }

    if !run_db(&state, move |db| db.member_exists(other)).await? {
        return Err(ApiError::not_found("User Not Found"));
    }
    if run_db(&state, move |db| db.contact_exists(me, other)).await? {
        return Err(ApiError::bad_request("User Already Exists as a Contact"));
    }

    match run_db(&state, move |db| db.add_contact_request(me, other)).await? {
        AddContact::Added => {
            info!("Member {} requested contact {}", me, other);
            Ok(Json(SuccessResponse { success: true }))
        }
        AddContact::AlreadyContact => Err(ApiError::bad_request("User Already Exists as a Contact")),
    }
}

/// POST /contacts with `{memberId, verified}`.
///
/// `verified == 1` accepts: the caller's own edge towards `memberId` is marked
/// verified. Any other flag adds both directions at once, the caller's edge
/// verified and the reverse edge carrying the given flag.
pub async fn add_or_accept_contact(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthMember>,
    JsonBody(req): JsonBody<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let me = caller.member_id;
    if req.member_id.is_none() && req.verified.is_none() {
        return Err(ApiError::missing_information());
    }

    let malformed =
        || ApiError::bad_request("Malformed parameter. memberId must be a number, verified must be a number");
    let other = req.member_id.as_ref().and_then(value_as_i64).ok_or_else(malformed)?;
    let verified = req.verified.as_ref().and_then(value_as_i64).ok_or_else(malformed)?;
    if other == me {
        return Err(ApiError::bad_request("Cannot add yourself"));
    }

    if !run_db(&state, move |db| db.member_exists(other)).await? {
        return Err(ApiError::not_found("Member trying to add does not exist"));
    }

    if verified == 1 {
        debug!("Member {} accepting contact {}", me, other);
        if !run_db(&state, move |db| db.accept_contact(me, other)).await? {
            return Err(ApiError::not_found("Contact request not found"));
        }
        return Ok(Json(SuccessResponse { success: true }));
    }

    if run_db(&state, move |db| db.contact_exists(me, other)).await? {
        return Err(ApiError::bad_request("User Already Exists as a Contact"));
    }
    match run_db(&state, move |db| db.add_mutual_contact(me, other, verified)).await? {
        AddContact::Added => {
            info!("Member {} added mutual contact {}", me, other);
            Ok(Json(SuccessResponse { success: true }))
        }
        AddContact::AlreadyContact => Err(ApiError::bad_request("User Already Exists as a Contact")),
    }
}

/// DELETE /contacts/{memberid_b}: removes the caller's edge only.
pub async fn remove_contact(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthMember>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let me = caller.member_id;
    let other = parse_id(&raw_id, "Malformed Parameter, Member ID Must Be A Number")?;

    if !run_db(&state, move |db| db.member_exists(other)).await? {
        return Err(ApiError::not_found("User Not Found"));
    }
    if !run_db(&state, move |db| db.contact_exists(me, other)).await? {
        return Err(ApiError::bad_request("User Not a Contact"));
    }

    // A concurrent delete may have won; the edge is gone either way
    run_db(&state, move |db| db.delete_contact(me, other)).await?;
    info!("Member {} removed contact {}", me, other);

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /contacts/all
pub async fn list_all_members(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthMember>,
) -> Result<impl IntoResponse, ApiError> {
    let me = caller.member_id;

    let rows = run_db(&state, move |db| db.list_members_except(me)).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("Contact not found"));
    }

    Ok(Json(ContactsResponse {
        success: true,
        email: None,
        contacts: rows.into_iter().map(member_summary).collect::<Vec<_>>(),
    }))
}

/// GET /contacts/getNonFriends/{memberid}
pub async fn list_non_friends(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthMember>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = parse_id(&raw_id, "Malformed parameter. memberId must be a number")?;

    let rows = run_db(&state, move |db| db.list_non_contacts(member_id)).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("No non-contacts found"));
    }

    Ok(Json(ContactsResponse {
        success: true,
        email: Some(caller.email),
        contacts: rows.into_iter().map(member_summary).collect::<Vec<_>>(),
    }))
}

/// GET /contacts/contact/{member_id}
pub async fn get_contact(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = parse_id(&raw_id, "Malformed parameter. memberId must be a number")?;

    let row = run_db(&state, move |db| db.get_member_by_id(member_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Contact not found"))?;

    Ok(Json(member_summary(row)))
}

/// GET /contacts/chatlist
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthMember>,
) -> Result<impl IntoResponse, ApiError> {
    let me = caller.member_id;

    let rows = run_db(&state, move |db| db.list_chats_for(me)).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("No messages"));
    }

    Ok(Json(ChatListResponse {
        success: true,
        chats: rows.into_iter().map(chat_entry).collect(),
    }))
}

/// GET /contacts/chats
pub async fn list_chat_members(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthMember>,
) -> Result<impl IntoResponse, ApiError> {
    let me = caller.member_id;

    let rows = run_db(&state, move |db| db.list_chat_comembers(me)).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("No messages"));
    }

    Ok(Json(ContactsResponse {
        success: true,
        email: None,
        contacts: rows.into_iter().map(chat_member_entry).collect(),
    }))
}

fn member_summary(row: MemberRow) -> MemberSummary {
    MemberSummary {
        email: row.email,
        first_name: row.first_name,
        last_name: row.last_name,
        user_name: row.username,
        member_id: row.member_id,
    }
}

fn contact_entry(row: ContactRow) -> ContactEntry {
    ContactEntry {
        email: row.member.email,
        first_name: row.member.first_name,
        last_name: row.member.last_name,
        user_name: row.member.username,
        member_id: row.member.member_id,
        verified: row.verified,
    }
}

fn chat_entry(row: ChatRow) -> ChatEntry {
    ChatEntry {
        chat: row.chat_id,
        name: row.name,
    }
}

fn chat_member_entry(row: ChatMemberRow) -> ChatMemberEntry {
    ChatMemberEntry {
        chat: row.chat_id,
        first_name: row.member.first_name,
        last_name: row.member.last_name,
        user_name: row.member.username,
        email: row.member.email,
        member_id: row.member.member_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_numeric() {
        assert_eq!(parse_id("12", "bad").unwrap(), 12);
        assert_eq!(parse_id(" 7 ", "bad").unwrap(), 7);
        assert_eq!(parse_id("abc", "bad").unwrap_err().to_string(), "bad");
        assert_eq!(parse_id("1.5", "bad").unwrap_err().to_string(), "bad");
    }
}
