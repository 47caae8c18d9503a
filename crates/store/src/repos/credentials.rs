use artvault_core::Role;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{query_all, query_one};
use crate::codec::{parse, timestamp, timestamp_opt, ts};
use crate::error::{StoreError, StoreResult};
use crate::records::CredentialRecord;

const COLUMNS: &str = "role, email, username, password_hash, password_salt, password_iterations, \
                       wallet_phrase, created_at, last_login";

fn from_row(row: &Row<'_>) -> StoreResult<CredentialRecord> {
    let role: String = row.get("role")?;
    let created_at: String = row.get("created_at")?;
    let last_login: Option<String> = row.get("last_login")?;

    Ok(CredentialRecord {
        role: parse("credentials.role", &role)?,
        email: row.get("email")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        password_salt: row.get("password_salt")?,
        password_iterations: row.get("password_iterations")?,
        wallet_phrase: row.get("wallet_phrase")?,
        created_at: timestamp("credentials.created_at", &created_at)?,
        last_login: timestamp_opt("credentials.last_login", last_login.as_deref())?,
    })
}

/// Repository for the `credentials` table
pub struct CredentialRepo;

impl CredentialRepo {
    /// Insert a new credential; fails if the email or username is taken
    /// within the role
    pub fn insert(conn: &Connection, record: &CredentialRecord) -> StoreResult<()> {
        let result = conn.execute(
            &format!("INSERT INTO credentials ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                record.role.to_string(),
                record.email,
                record.username,
                record.password_hash,
                record.password_salt,
                record.password_iterations,
                record.wallet_phrase,
                ts(&record.created_at),
                record.last_login.as_ref().map(ts),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = StoreError::from(e);
                if err.is_unique_violation() {
                    Err(StoreError::already_exists("Credential", &record.email))
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Look up a credential by email
    pub fn get(conn: &Connection, role: Role, email: &str) -> StoreResult<Option<CredentialRecord>> {
        query_one(
            conn,
            &format!("SELECT {COLUMNS} FROM credentials WHERE role = ?1 AND email = ?2"),
            params![role.to_string(), email],
            from_row,
        )
    }

    /// Look up a credential by username or email
    pub fn find_by_login(
        conn: &Connection,
        role: Role,
        login: &str,
    ) -> StoreResult<Option<CredentialRecord>> {
        query_one(
            conn,
            &format!(
                "SELECT {COLUMNS} FROM credentials
                 WHERE role = ?1 AND (username = ?2 OR email = ?2)
                 ORDER BY (email = ?2) DESC LIMIT 1"
            ),
            params![role.to_string(), login],
            from_row,
        )
    }

    pub fn email_exists(conn: &Connection, role: Role, email: &str) -> StoreResult<bool> {
        let found: i64 = conn.query_row(
            "SELECT COUNT(*) FROM credentials WHERE role = ?1 AND email = ?2",
            params![role.to_string(), email],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }

    pub fn username_exists(conn: &Connection, role: Role, username: &str) -> StoreResult<bool> {
        let found: i64 = conn.query_row(
            "SELECT COUNT(*) FROM credentials WHERE role = ?1 AND username = ?2",
            params![role.to_string(), username],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }

    /// All credentials of a role, oldest first
    pub fn list(conn: &Connection, role: Role) -> StoreResult<Vec<CredentialRecord>> {
        query_all(
            conn,
            &format!("SELECT {COLUMNS} FROM credentials WHERE role = ?1 ORDER BY created_at, email"),
            params![role.to_string()],
            from_row,
        )
    }

    /// Replace the stored record identified by `(role, email)`
    ///
    /// `record.email` may differ from `email` to rename the identity.
    pub fn update(conn: &Connection, email: &str, record: &CredentialRecord) -> StoreResult<()> {
        let result = conn.execute(
            "UPDATE credentials
             SET email = ?1, username = ?2, password_hash = ?3, password_salt = ?4,
                 password_iterations = ?5, wallet_phrase = ?6, last_login = ?7
             WHERE role = ?8 AND email = ?9",
            params![
                record.email,
                record.username,
                record.password_hash,
                record.password_salt,
                record.password_iterations,
                record.wallet_phrase,
                record.last_login.as_ref().map(ts),
                record.role.to_string(),
                email,
            ],
        );

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                let err = StoreError::from(e);
                return if err.is_unique_violation() {
                    Err(StoreError::already_exists("Credential", &record.email))
                } else {
                    Err(err)
                };
            }
        };

        if rows == 0 {
            return Err(StoreError::not_found("Credential", email));
        }
        Ok(())
    }

    /// Stamp the last login time
    pub fn touch_last_login(
        conn: &Connection,
        role: Role,
        email: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let rows = conn.execute(
            "UPDATE credentials SET last_login = ?1 WHERE role = ?2 AND email = ?3",
            params![ts(&at), role.to_string(), email],
        )?;

        if rows == 0 {
            return Err(StoreError::not_found("Credential", email));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    fn record(role: Role, email: &str, username: Option<&str>) -> CredentialRecord {
        CredentialRecord {
            role,
            email: email.to_string(),
            username: username.map(str::to_string),
            password_hash: "ab".repeat(32),
            password_salt: "cd".repeat(16),
            password_iterations: 10_000,
            wallet_phrase: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_write_then_read_is_equal() {
        let store = Store::in_memory().unwrap();
        let written = record(Role::User, "ann@example.com", Some("ann"));

        store
            .with_conn(|conn| CredentialRepo::insert(conn, &written))
            .unwrap();
        let all = store
            .with_conn(|conn| CredentialRepo::list(conn, Role::User))
            .unwrap();

        assert_eq!(all, vec![written]);
    }

    #[test]
    fn test_uniqueness_is_per_role() {
        let store = Store::in_memory().unwrap();
        store
            .with_conn(|conn| {
                CredentialRepo::insert(conn, &record(Role::User, "a@x.io", Some("a")))?;
                CredentialRepo::insert(conn, &record(Role::Admin, "a@x.io", None))
            })
            .unwrap();

        let dup_email = store.with_conn(|conn| {
            CredentialRepo::insert(conn, &record(Role::User, "a@x.io", Some("other")))
        });
        assert!(matches!(dup_email, Err(StoreError::AlreadyExists { .. })));

        let dup_username = store.with_conn(|conn| {
            CredentialRepo::insert(conn, &record(Role::User, "b@x.io", Some("a")))
        });
        assert!(matches!(dup_username, Err(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn test_find_by_login_and_touch() {
        let store = Store::in_memory().unwrap();
        store
            .with_conn(|conn| CredentialRepo::insert(conn, &record(Role::User, "c@x.io", Some("cat"))))
            .unwrap();

        let by_name = store
            .with_conn(|conn| CredentialRepo::find_by_login(conn, Role::User, "cat"))
            .unwrap()
            .unwrap();
        assert_eq!(by_name.email, "c@x.io");

        let now = Utc::now();
        store
            .with_conn(|conn| CredentialRepo::touch_last_login(conn, Role::User, "c@x.io", now))
            .unwrap();
        let reread = store
            .with_conn(|conn| CredentialRepo::get(conn, Role::User, "c@x.io"))
            .unwrap()
            .unwrap();
        assert_eq!(reread.last_login, Some(now));

        let missing = store.with_conn(|conn| {
            CredentialRepo::touch_last_login(conn, Role::User, "nobody@x.io", now)
        });
        assert!(missing.unwrap_err().is_not_found());
    }
}
