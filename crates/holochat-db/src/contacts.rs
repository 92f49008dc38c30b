use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use crate::models::{AddContact, ChatMemberRow, ChatRow, ContactRow, MemberRow};
use crate::queries::{MEMBER_COLUMNS, member_at};
use crate::{Database, is_constraint_violation};

impl Database {
    // -- Contact edges --

    pub fn member_exists(&self, member_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM members WHERE member_id = ?1", [member_id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Whether the directed edge `member_a -> member_b` exists.
    pub fn contact_exists(&self, member_a: i64, member_b: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM contacts WHERE member_id_a = ?1 AND member_id_b = ?2",
                    [member_a, member_b],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Insert the unverified edge `member_a -> member_b`.
    ///
    /// The unique index on the ordered pair settles races between two
    /// requests that both passed the existence check.
    pub fn add_contact_request(&self, member_a: i64, member_b: i64) -> Result<AddContact> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO contacts (member_id_a, member_id_b, verified) VALUES (?1, ?2, 0)",
                [member_a, member_b],
            );
            match inserted {
                Ok(_) => Ok(AddContact::Added),
                Err(e) if is_constraint_violation(&e) => Ok(AddContact::AlreadyContact),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Create both directions at once: `other -> member` carrying `verified`
    /// and `member -> other` already verified. Either both rows are written or
    /// neither is.
    pub fn add_mutual_contact(&self, member: i64, other: i64, verified: i64) -> Result<AddContact> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            // A verification flag on the reverse edge never goes back down
            tx.execute(
                "INSERT INTO contacts (member_id_a, member_id_b, verified) VALUES (?1, ?2, ?3)
                 ON CONFLICT(member_id_a, member_id_b)
                 DO UPDATE SET verified = MAX(verified, excluded.verified)",
                params![other, member, verified],
            )?;

            let inserted = tx.execute(
                "INSERT INTO contacts (member_id_a, member_id_b, verified) VALUES (?1, ?2, 1)",
                [member, other],
            );
            match inserted {
                Err(e) if is_constraint_violation(&e) => return Ok(AddContact::AlreadyContact),
                result => {
                    result?;
                }
            }

            tx.commit()?;
            Ok(AddContact::Added)
        })
    }

    /// Mark `member_a -> member_b` verified. Returns false when the edge is missing.
    pub fn accept_contact(&self, member_a: i64, member_b: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE contacts SET verified = 1 WHERE member_id_a = ?1 AND member_id_b = ?2",
                [member_a, member_b],
            )?;
            Ok(changed > 0)
        })
    }

    /// Remove the single edge `member_a -> member_b`; the reverse edge stays.
    pub fn delete_contact(&self, member_a: i64, member_b: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM contacts WHERE member_id_a = ?1 AND member_id_b = ?2",
                [member_a, member_b],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn list_contacts(&self, member_id: i64) -> Result<Vec<ContactRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEMBER_COLUMNS}, c.verified
                 FROM contacts c
                 INNER JOIN members m ON c.member_id_b = m.member_id
                 WHERE c.member_id_a = ?1
                 ORDER BY m.member_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([member_id], |row| {
                    Ok(ContactRow {
                        member: member_at(row, 0)?,
                        verified: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Member directory --

    /// Case-insensitive substring match over "first last", username and email.
    pub fn search_members(&self, needle: &str) -> Result<Vec<MemberRow>> {
        let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEMBER_COLUMNS} FROM members m
                 WHERE (m.first_name || ' ' || m.last_name) LIKE ?1 ESCAPE '\\'
                    OR m.username LIKE ?1 ESCAPE '\\'
                    OR m.email LIKE ?1 ESCAPE '\\'
                 ORDER BY m.member_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([&pattern], |row| member_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_members_except(&self, member_id: i64) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEMBER_COLUMNS} FROM members m WHERE m.member_id != ?1 ORDER BY m.member_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([member_id], |row| member_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Members that are neither `member_id` itself nor the target of one of its edges.
    pub fn list_non_contacts(&self, member_id: i64) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEMBER_COLUMNS} FROM members m
                 WHERE m.member_id != ?1
                   AND m.member_id NOT IN (SELECT member_id_b FROM contacts WHERE member_id_a = ?1)
                 ORDER BY m.member_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([member_id], |row| member_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Chats (read-only) --

    pub fn list_chats_for(&self, member_id: i64) -> Result<Vec<ChatRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.chat_id, c.name FROM chats c
                 WHERE c.chat_id IN (SELECT chat_id FROM chat_members WHERE member_id = ?1)
                 ORDER BY c.chat_id",
            )?;
            let rows = stmt
                .query_map([member_id], |row| {
                    Ok(ChatRow {
                        chat_id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every (chat, member) pair where the member shares that chat with `member_id`.
    pub fn list_chat_comembers(&self, member_id: i64) -> Result<Vec<ChatMemberRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT cm.chat_id, {MEMBER_COLUMNS}
                 FROM chat_members cm
                 INNER JOIN members m ON cm.member_id = m.member_id
                 WHERE cm.chat_id IN (SELECT chat_id FROM chat_members WHERE member_id = ?1)
                   AND cm.member_id != ?1
                 ORDER BY cm.chat_id, m.member_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([member_id], |row| {
                    Ok(ChatMemberRow {
                        chat_id: row.get(0)?,
                        member: member_at(row, 1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateMember, NewMember};

    fn seed(db: &Database, username: &str, first: &str) -> i64 {
        let email = format!("{username}@fake.email");
        let created = db
            .create_member(&NewMember {
                first_name: first,
                last_name: "Tester",
                username,
                email: &email,
                salted_hash: "hash",
                salt: "salt",
            })
            .unwrap();
        match created {
            CreateMember::Created(id) => id,
            other => panic!("seed failed: {other:?}"),
        }
    }

    #[test]
    fn request_then_duplicate_then_delete() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed(&db, "alice", "Alice");
        let bob = seed(&db, "bob", "Bob");

        assert_eq!(db.add_contact_request(alice, bob).unwrap(), AddContact::Added);
        assert_eq!(db.add_contact_request(alice, bob).unwrap(), AddContact::AlreadyContact);
        assert!(db.contact_exists(alice, bob).unwrap());
        assert!(!db.contact_exists(bob, alice).unwrap());

        let contacts = db.list_contacts(alice).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].member.username, "bob");
        assert_eq!(contacts[0].verified, 0);

        assert!(db.delete_contact(alice, bob).unwrap());
        assert!(!db.delete_contact(alice, bob).unwrap());
        assert!(db.list_contacts(alice).unwrap().is_empty());
    }

    #[test]
    fn accept_marks_edge_verified() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed(&db, "alice", "Alice");
        let bob = seed(&db, "bob", "Bob");

        assert!(!db.accept_contact(alice, bob).unwrap());
        db.add_contact_request(alice, bob).unwrap();
        assert!(db.accept_contact(alice, bob).unwrap());
        assert_eq!(db.list_contacts(alice).unwrap()[0].verified, 1);
    }

    #[test]
    fn mutual_contact_writes_both_edges_or_none() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed(&db, "alice", "Alice");
        let bob = seed(&db, "bob", "Bob");
        let carol = seed(&db, "carol", "Carol");

        assert_eq!(db.add_mutual_contact(alice, bob, 0).unwrap(), AddContact::Added);
        assert_eq!(db.list_contacts(alice).unwrap()[0].verified, 1);
        assert_eq!(db.list_contacts(bob).unwrap()[0].verified, 0);

        // alice -> carol already exists, so carol -> alice must not be written either
        db.add_contact_request(alice, carol).unwrap();
        assert_eq!(db.add_mutual_contact(alice, carol, 1).unwrap(), AddContact::AlreadyContact);
        assert!(!db.contact_exists(carol, alice).unwrap());
    }

    #[test]
    fn directory_queries() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed(&db, "alice", "Alice");
        let bob = seed(&db, "bob", "Bob");
        let carol = seed(&db, "carol", "Carol");
        db.add_contact_request(alice, bob).unwrap();

        let others: Vec<i64> = db.list_members_except(alice).unwrap().iter().map(|m| m.member_id).collect();
        assert_eq!(others, vec![bob, carol]);

        let strangers: Vec<i64> = db.list_non_contacts(alice).unwrap().iter().map(|m| m.member_id).collect();
        assert_eq!(strangers, vec![carol]);

        let found = db.search_members("CAROL T").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].member_id, carol);

        assert!(db.search_members("100%").unwrap().is_empty());
        assert_eq!(db.search_members("fake.email").unwrap().len(), 3);
    }

    #[test]
    fn chat_membership_queries() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed(&db, "alice", "Alice");
        let bob = seed(&db, "bob", "Bob");
        let carol = seed(&db, "carol", "Carol");
        db.with_conn(|conn| {
            conn.execute_batch(&format!(
                "INSERT INTO chats (chat_id, name) VALUES (1, 'general'), (2, 'side');
                 INSERT INTO chat_members (chat_id, member_id) VALUES
                    (1, {alice}), (1, {bob}), (2, {bob}), (2, {carol});"
            ))?;
            Ok(())
        })
        .unwrap();

        let chats = db.list_chats_for(bob).unwrap();
        assert_eq!(chats.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["general", "side"]);

        let comembers = db.list_chat_comembers(alice).unwrap();
        assert_eq!(comembers.len(), 1);
        assert_eq!((comembers[0].chat_id, comembers[0].member.member_id), (1, bob));

        assert!(db.list_chats_for(9999).unwrap().is_empty());
    }
}
