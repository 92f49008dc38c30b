use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (members, credentials, contacts, chats)");
        conn.execute_batch(
            "
            CREATE TABLE members (
                member_id       INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name      TEXT NOT NULL,
                last_name       TEXT NOT NULL,
                username        TEXT NOT NULL UNIQUE,
                email           TEXT NOT NULL UNIQUE,
                verification    INTEGER NOT NULL DEFAULT 0,
                code            INTEGER,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE credentials (
                member_id       INTEGER PRIMARY KEY REFERENCES members(member_id) ON DELETE CASCADE,
                salted_hash     TEXT NOT NULL,
                salt            TEXT NOT NULL
            );

            CREATE TABLE contacts (
                contact_id      INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id_a     INTEGER NOT NULL REFERENCES members(member_id) ON DELETE CASCADE,
                member_id_b     INTEGER NOT NULL REFERENCES members(member_id) ON DELETE CASCADE,
                verified        INTEGER NOT NULL DEFAULT 0,
                UNIQUE(member_id_a, member_id_b)
            );

            CREATE INDEX idx_contacts_b ON contacts(member_id_b);

            CREATE TABLE chats (
                chat_id         INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL
            );

            CREATE TABLE chat_members (
                chat_id         INTEGER NOT NULL REFERENCES chats(chat_id) ON DELETE CASCADE,
                member_id       INTEGER NOT NULL REFERENCES members(member_id) ON DELETE CASCADE,
                PRIMARY KEY (chat_id, member_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        // Reset codes expire instead of living until the next request
        info!("Running migration v2 (reset code expiry)");
        conn.execute_batch(
            "
            ALTER TABLE members ADD COLUMN code_expires_at TEXT;

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
