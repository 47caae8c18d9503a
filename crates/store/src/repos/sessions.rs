use artvault_core::Role;
use rusqlite::{params, Connection, Row};

use super::query_one;
use crate::codec::{parse, timestamp, ts};
use crate::error::StoreResult;
use crate::records::SessionRecord;

fn from_row(row: &Row<'_>) -> StoreResult<SessionRecord> {
    let role: String = row.get("role")?;
    let login_time: String = row.get("login_time")?;

    Ok(SessionRecord {
        role: parse("sessions.role", &role)?,
        email: row.get("email")?,
        username: row.get("username")?,
        logged_in: row.get("logged_in")?,
        login_time: timestamp("sessions.login_time", &login_time)?,
    })
}

/// Repository for the `sessions` table (one row per role)
pub struct SessionRepo;

impl SessionRepo {
    /// Store the session for its role, replacing any previous one
    pub fn put(conn: &Connection, session: &SessionRecord) -> StoreResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO sessions (role, email, username, logged_in, login_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.role.to_string(),
                session.email,
                session.username,
                session.logged_in,
                ts(&session.login_time),
            ],
        )?;
        Ok(())
    }

    pub fn get(conn: &Connection, role: Role) -> StoreResult<Option<SessionRecord>> {
        query_one(
            conn,
            "SELECT role, email, username, logged_in, login_time FROM sessions WHERE role = ?1",
            params![role.to_string()],
            from_row,
        )
    }

    /// Remove the session of a role; returns whether one existed
    pub fn delete(conn: &Connection, role: Role) -> StoreResult<bool> {
        let rows = conn.execute("DELETE FROM sessions WHERE role = ?1", params![role.to_string()])?;
        Ok(rows > 0)
    }
}
