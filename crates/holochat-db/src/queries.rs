use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::models::{CodeGated, CreateMember, CredentialRow, MemberRow, NewMember};
use crate::{Database, is_constraint_violation};

pub(crate) const MEMBER_COLUMNS: &str =
    "m.member_id, m.first_name, m.last_name, m.username, m.email, m.verification";

/// Read a [`MemberRow`] laid out as [`MEMBER_COLUMNS`] starting at `offset`.
pub(crate) fn member_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<MemberRow> {
    Ok(MemberRow {
        member_id: row.get(offset)?,
        first_name: row.get(offset + 1)?,
        last_name: row.get(offset + 2)?,
        username: row.get(offset + 3)?,
        email: row.get(offset + 4)?,
        verified: row.get::<_, i64>(offset + 5)? != 0,
    })
}

impl Database {
    // -- Members --

    /// Insert a member together with its credential row.
    ///
    /// Both rows land in one transaction so a failed credential insert never
    /// leaves a member without a password.
    pub fn create_member(&self, new: &NewMember<'_>) -> Result<CreateMember> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if row_exists(&tx, "SELECT 1 FROM members WHERE email = ?1", new.email)? {
                return Ok(CreateMember::EmailTaken);
            }
            if row_exists(&tx, "SELECT 1 FROM members WHERE username = ?1", new.username)? {
                return Ok(CreateMember::UsernameTaken);
            }

            let inserted = tx.execute(
                "INSERT INTO members (first_name, last_name, username, email) VALUES (?1, ?2, ?3, ?4)",
                params![new.first_name, new.last_name, new.username, new.email],
            );
            match inserted {
                Err(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.contains("members.email") => {
                    return Ok(CreateMember::EmailTaken);
                }
                Err(e) if is_constraint_violation(&e) => return Ok(CreateMember::UsernameTaken),
                other => {
                    other?;
                }
            }
            let member_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO credentials (member_id, salted_hash, salt) VALUES (?1, ?2, ?3)",
                params![member_id, new.salted_hash, new.salt],
            )?;

            tx.commit()?;
            Ok(CreateMember::Created(member_id))
        })
    }

    pub fn get_member_by_email(&self, email: &str) -> Result<Option<MemberRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {MEMBER_COLUMNS} FROM members m WHERE m.email = ?1");
            Ok(conn.query_row(&sql, [email], |row| member_at(row, 0)).optional()?)
        })
    }

    pub fn get_member_by_id(&self, member_id: i64) -> Result<Option<MemberRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {MEMBER_COLUMNS} FROM members m WHERE m.member_id = ?1");
            Ok(conn.query_row(&sql, [member_id], |row| member_at(row, 0)).optional()?)
        })
    }

    pub fn get_credentials(&self, member_id: i64) -> Result<Option<CredentialRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT member_id, salted_hash, salt FROM credentials WHERE member_id = ?1",
                    [member_id],
                    |row| {
                        Ok(CredentialRow {
                            member_id: row.get(0)?,
                            salted_hash: row.get(1)?,
                            salt: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Flip the verification flag. Returns false when no unverified member
    /// has this email.
    pub fn verify_member(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE members SET verification = 1 WHERE email = ?1 AND verification = 0",
                [email],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Reset codes --

    /// Store a fresh reset code valid for `ttl_minutes`. Returns false when
    /// the email is unknown.
    pub fn set_reset_code(&self, email: &str, code: i64, ttl_minutes: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE members
                 SET code = ?1, code_expires_at = datetime('now', '+' || ?2 || ' minutes')
                 WHERE email = ?3",
                params![code, ttl_minutes, email],
            )?;
            Ok(changed > 0)
        })
    }

    /// Replace the member's password hash if `code` matches their live reset
    /// code. The code is consumed on success.
    pub fn update_password_with_code(
        &self,
        email: &str,
        code: i64,
        salted_hash: &str,
        salt: &str,
    ) -> Result<CodeGated> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let member_id = match check_reset_code(&tx, email, code)? {
                Ok(id) => id,
                Err(rejected) => return Ok(rejected),
            };

            tx.execute(
                "UPDATE credentials SET salted_hash = ?1, salt = ?2 WHERE member_id = ?3",
                params![salted_hash, salt, member_id],
            )?;
            clear_reset_code(&tx, member_id)?;

            tx.commit()?;
            Ok(CodeGated::Applied)
        })
    }

    /// Change the member's username if `code` matches their live reset code.
    /// A taken username leaves the code in place.
    pub fn update_username_with_code(&self, email: &str, code: i64, username: &str) -> Result<CodeGated> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let member_id = match check_reset_code(&tx, email, code)? {
                Ok(id) => id,
                Err(rejected) => return Ok(rejected),
            };

            let updated = tx.execute(
                "UPDATE members SET username = ?1 WHERE member_id = ?2",
                params![username, member_id],
            );
            match updated {
                Err(e) if is_constraint_violation(&e) => return Ok(CodeGated::UsernameTaken),
                other => {
                    other?;
                }
            }
            clear_reset_code(&tx, member_id)?;

            tx.commit()?;
            Ok(CodeGated::Applied)
        })
    }
}

fn row_exists(conn: &Connection, sql: &str, value: &str) -> Result<bool> {
    Ok(conn.query_row(sql, [value], |_| Ok(())).optional()?.is_some())
}

fn check_reset_code(conn: &Connection, email: &str, code: i64) -> Result<std::result::Result<i64, CodeGated>> {
    let row: Option<(i64, Option<i64>, Option<bool>)> = conn
        .query_row(
            "SELECT member_id, code, code_expires_at > datetime('now') FROM members WHERE email = ?1",
            [email],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    Ok(match row {
        None => Err(CodeGated::UnknownMember),
        Some((member_id, Some(stored), Some(true))) if stored == code => Ok(member_id),
        Some(_) => Err(CodeGated::CodeMismatch),
    })
}

fn clear_reset_code(conn: &Connection, member_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE members SET code = NULL, code_expires_at = NULL WHERE member_id = ?1",
        [member_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member<'a>(username: &'a str, email: &'a str) -> NewMember<'a> {
        NewMember {
            first_name: "Charles",
            last_name: "Bryan",
            username,
            email,
            salted_hash: "hash",
            salt: "salt",
        }
    }

    #[test]
    fn create_member_stores_credentials() {
        let db = Database::open_in_memory().unwrap();
        let CreateMember::Created(id) = db.create_member(&member("cfb3", "cfb3@fake.email")).unwrap() else {
            panic!("member was not created");
        };

        let row = db.get_member_by_email("cfb3@fake.email").unwrap().unwrap();
        assert_eq!(row.member_id, id);
        assert!(!row.verified);

        let creds = db.get_credentials(id).unwrap().unwrap();
        assert_eq!(creds.salted_hash, "hash");
        assert_eq!(creds.salt, "salt");
    }

    #[test]
    fn duplicate_email_and_username_are_reported() {
        let db = Database::open_in_memory().unwrap();
        db.create_member(&member("cfb3", "cfb3@fake.email")).unwrap();

        assert_eq!(
            db.create_member(&member("other", "cfb3@fake.email")).unwrap(),
            CreateMember::EmailTaken
        );
        assert_eq!(
            db.create_member(&member("cfb3", "other@fake.email")).unwrap(),
            CreateMember::UsernameTaken
        );
    }

    #[test]
    fn verify_member_only_once() {
        let db = Database::open_in_memory().unwrap();
        db.create_member(&member("cfb3", "cfb3@fake.email")).unwrap();

        assert!(db.verify_member("cfb3@fake.email").unwrap());
        assert!(!db.verify_member("cfb3@fake.email").unwrap());
        assert!(!db.verify_member("nobody@fake.email").unwrap());
        assert!(db.get_member_by_email("cfb3@fake.email").unwrap().unwrap().verified);
    }

    #[test]
    fn reset_code_is_single_use() {
        let db = Database::open_in_memory().unwrap();
        db.create_member(&member("cfb3", "cfb3@fake.email")).unwrap();
        assert!(db.set_reset_code("cfb3@fake.email", 4321, 15).unwrap());

        assert_eq!(
            db.update_password_with_code("cfb3@fake.email", 1111, "h2", "s2").unwrap(),
            CodeGated::CodeMismatch
        );
        assert_eq!(
            db.update_password_with_code("cfb3@fake.email", 4321, "h2", "s2").unwrap(),
            CodeGated::Applied
        );
        assert_eq!(
            db.update_password_with_code("cfb3@fake.email", 4321, "h3", "s3").unwrap(),
            CodeGated::CodeMismatch
        );

        let id = db.get_member_by_email("cfb3@fake.email").unwrap().unwrap().member_id;
        assert_eq!(db.get_credentials(id).unwrap().unwrap().salted_hash, "h2");
    }

    #[test]
    fn expired_reset_code_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_member(&member("cfb3", "cfb3@fake.email")).unwrap();
        db.set_reset_code("cfb3@fake.email", 4321, 15).unwrap();
        db.with_conn(|conn| {
            conn.execute("UPDATE members SET code_expires_at = datetime('now', '-1 minutes')", [])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(
            db.update_username_with_code("cfb3@fake.email", 4321, "fresh").unwrap(),
            CodeGated::CodeMismatch
        );
    }

    #[test]
    fn username_change_keeps_code_when_taken() {
        let db = Database::open_in_memory().unwrap();
        db.create_member(&member("cfb3", "cfb3@fake.email")).unwrap();
        db.create_member(&member("taken", "taken@fake.email")).unwrap();
        db.set_reset_code("cfb3@fake.email", 4321, 15).unwrap();

        assert_eq!(
            db.update_username_with_code("cfb3@fake.email", 4321, "taken").unwrap(),
            CodeGated::UsernameTaken
        );
        assert_eq!(
            db.update_username_with_code("cfb3@fake.email", 4321, "fresh").unwrap(),
            CodeGated::Applied
        );
        assert_eq!(
            db.update_username_with_code("nobody@fake.email", 4321, "x").unwrap(),
            CodeGated::UnknownMember
        );
        assert_eq!(db.get_member_by_email("cfb3@fake.email").unwrap().unwrap().username, "fresh");
    }
}
