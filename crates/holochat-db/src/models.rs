//! Database row types. These map directly to SQLite rows and stay
//! independent of the wire types in holochat-types.

#[derive(Debug, Clone)]
pub struct MemberRow {
    pub member_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub verified: bool,
}

#[derive(Debug, Clone)]
pub struct CredentialRow {
    pub member_id: i64,
    pub salted_hash: String,
    pub salt: String,
}

/// Everything needed to create a member and its credential in one go.
pub struct NewMember<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub salted_hash: &'a str,
    pub salt: &'a str,
}

/// Outgoing contact edge joined with the target member.
#[derive(Debug, Clone)]
pub struct ContactRow {
    pub member: MemberRow,
    pub verified: i64,
}

#[derive(Debug, Clone)]
pub struct ChatRow {
    pub chat_id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ChatMemberRow {
    pub chat_id: i64,
    pub member: MemberRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMember {
    Created(i64),
    UsernameTaken,
    EmailTaken,
}

/// Result of an update gated by a member's reset code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeGated {
    Applied,
    UnknownMember,
    CodeMismatch,
    UsernameTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddContact {
    Added,
    AlreadyContact,
}
