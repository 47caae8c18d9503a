//! Credentials and sessions
//!
//! One credential collection per role, one session per role. Logging in
//! overwrites the role's session; there is no expiry.

use artvault_config::AuthConfig;
use artvault_core::Role;
use artvault_store::{
    CredentialRecord, CredentialRepo, OwnerRepo, SessionRecord, SessionRepo, Store, StoreError,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::error::{AuthError, AuthResult};
use crate::password::{PasswordHash, PasswordHasher};
use crate::validation::{validate_email, validate_password, validate_username};

/// Signup form
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub role: Role,
    pub email: String,
    pub username: Option<String>,
    pub password: String,
    pub wallet_phrase: Option<String>,
}

/// Fields a user may change on the settings page; `None` leaves a field as is
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub wallet_phrase: Option<String>,
}

/// Session/identity store
pub struct IdentityStore {
    store: Arc<Store>,
    hasher: PasswordHasher,
    min_password_len: usize,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn stored_hash(record: &CredentialRecord) -> PasswordHash {
    PasswordHash {
        hash: record.password_hash.clone(),
        salt: record.password_salt.clone(),
        iterations: record.password_iterations,
    }
}

impl IdentityStore {
    pub fn new(store: Arc<Store>, config: &AuthConfig) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(config.hash_iterations),
            min_password_len: config.min_password_len,
        }
    }

    /// Create a credential
    pub fn register(&self, request: RegisterRequest) -> AuthResult<CredentialRecord> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        validate_password(&request.password, self.min_password_len)?;

        let username = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        if request.role == Role::User {
            validate_username(username.as_deref().unwrap_or(""))?;
        }

        let hashed = self.hasher.hash(&request.password);
        let record = CredentialRecord {
            role: request.role,
            email: email.clone(),
            username: username.clone(),
            password_hash: hashed.hash,
            password_salt: hashed.salt,
            password_iterations: hashed.iterations,
            wallet_phrase: request
                .wallet_phrase
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            created_at: Utc::now(),
            last_login: None,
        };

        let role = request.role;
        self.store.transaction(|tx| {
            if CredentialRepo::email_exists(tx, role, &email)? {
                return Err(AuthError::DuplicateIdentity {
                    role,
                    field: "email",
                    value: email.clone(),
                });
            }
            if let Some(username) = &username {
                if CredentialRepo::username_exists(tx, role, username)? {
                    return Err(AuthError::DuplicateIdentity {
                        role,
                        field: "username",
                        value: username.clone(),
                    });
                }
            }

            CredentialRepo::insert(tx, &record).map_err(|e| match e {
                StoreError::AlreadyExists { .. } => AuthError::DuplicateIdentity {
                    role,
                    field: "email",
                    value: email.clone(),
                },
                other => AuthError::Store(other),
            })
        })?;

        info!(%role, email = %record.email, "Registered account");
        Ok(record)
    }

    /// True iff a credential exists for `login` (email or username) and the
    /// secret matches
    pub fn authenticate(&self, role: Role, login: &str, secret: &str) -> AuthResult<bool> {
        let login = login.trim();
        let record = self.store.with_conn(|conn| {
            match CredentialRepo::get(conn, role, &normalize_email(login))? {
                Some(record) => Ok(Some(record)),
                None => CredentialRepo::find_by_login(conn, role, login),
            }
        })?;

        Ok(record.is_some_and(|r| stored_hash(&r).verify(secret)))
    }

    /// Replace the role's session and stamp `last_login`
    pub fn start_session(&self, role: Role, email: &str) -> AuthResult<SessionRecord> {
        let email = normalize_email(email);
        let now = Utc::now();

        let session = self.store.transaction(|tx| {
            let record = CredentialRepo::get(tx, role, &email)?.ok_or_else(|| AuthError::NotFound {
                role,
                email: email.clone(),
            })?;

            let session = SessionRecord {
                role,
                email: record.email.clone(),
                username: record.username.clone(),
                logged_in: true,
                login_time: now,
            };
            SessionRepo::put(tx, &session)?;
            CredentialRepo::touch_last_login(tx, role, &record.email, now)?;
            Ok::<_, AuthError>(session)
        })?;

        info!(%role, email = %session.email, "Session started");
        Ok(session)
    }

    /// Authenticate then start a session; `InvalidCredentials` on mismatch
    pub fn login(&self, role: Role, login: &str, secret: &str) -> AuthResult<SessionRecord> {
        if !self.authenticate(role, login, secret)? {
            return Err(AuthError::InvalidCredentials);
        }

        let login = login.trim();
        let record = self
            .store
            .with_conn(|conn| match CredentialRepo::get(conn, role, &normalize_email(login))? {
                Some(record) => Ok(Some(record)),
                None => CredentialRepo::find_by_login(conn, role, login),
            })?
            .ok_or(AuthError::InvalidCredentials)?;

        self.start_session(role, &record.email)
    }

    /// Drop the role's session; returns whether one existed
    pub fn end_session(&self, role: Role) -> AuthResult<bool> {
        let ended = self.store.with_conn(|conn| SessionRepo::delete(conn, role))?;
        if ended {
            info!(%role, "Session ended");
        }
        Ok(ended)
    }

    pub fn current_session(&self, role: Role) -> AuthResult<Option<SessionRecord>> {
        Ok(self.store.with_conn(|conn| SessionRepo::get(conn, role))?)
    }

    pub fn credential(&self, role: Role, email: &str) -> AuthResult<Option<CredentialRecord>> {
        let email = normalize_email(email);
        Ok(self
            .store
            .with_conn(|conn| CredentialRepo::get(conn, role, &email))?)
    }

    /// Credential matched by username or email
    pub fn find(&self, role: Role, login: &str) -> AuthResult<Option<CredentialRecord>> {
        Ok(self
            .store
            .with_conn(|conn| CredentialRepo::find_by_login(conn, role, login.trim()))?)
    }

    /// All credentials of a role
    pub fn list(&self, role: Role) -> AuthResult<Vec<CredentialRecord>> {
        Ok(self.store.with_conn(|conn| CredentialRepo::list(conn, role))?)
    }

    /// Apply a settings-page edit
    ///
    /// For users, balances, holds, transactions and events follow an email
    /// change, and artworks follow a username change, in the same database
    /// transaction. The session follows both.
    pub fn update_profile(
        &self,
        role: Role,
        email: &str,
        update: ProfileUpdate,
    ) -> AuthResult<CredentialRecord> {
        let current_email = normalize_email(email);

        let new_email = update.email.as_deref().map(normalize_email);
        if let Some(new_email) = &new_email {
            validate_email(new_email)?;
        }
        let new_username = update.username.as_deref().map(|u| u.trim().to_string());
        if let Some(username) = &new_username {
            validate_username(username)?;
        }
        if let Some(password) = &update.password {
            validate_password(password, self.min_password_len)?;
        }
        let hashed = update.password.as_deref().map(|p| self.hasher.hash(p));

        let updated = self.store.transaction(|tx| {
            let mut record = CredentialRepo::get(tx, role, &current_email)?.ok_or_else(|| {
                AuthError::NotFound {
                    role,
                    email: current_email.clone(),
                }
            })?;
            let previous_username = record.username.clone();

            if let Some(new_email) = new_email.filter(|e| *e != record.email) {
                if CredentialRepo::email_exists(tx, role, &new_email)? {
                    return Err(AuthError::DuplicateIdentity {
                        role,
                        field: "email",
                        value: new_email,
                    });
                }
                record.email = new_email;
            }
            if let Some(username) = new_username.filter(|u| Some(u) != record.username.as_ref()) {
                if CredentialRepo::username_exists(tx, role, &username)? {
                    return Err(AuthError::DuplicateIdentity {
                        role,
                        field: "username",
                        value: username,
                    });
                }
                record.username = Some(username);
            }
            if let Some(hashed) = hashed {
                record.password_hash = hashed.hash;
                record.password_salt = hashed.salt;
                record.password_iterations = hashed.iterations;
            }
            if let Some(phrase) = update.wallet_phrase {
                let phrase = phrase.trim().to_string();
                record.wallet_phrase = (!phrase.is_empty()).then_some(phrase);
            }

            CredentialRepo::update(tx, &current_email, &record)?;

            // The admin's ledger key and artworks are `admin`, not its identity
            if role == Role::User {
                OwnerRepo::rename_email(tx, &current_email, &record.email).map_err(|e| {
                    if e.is_unique_violation() {
                        AuthError::DuplicateIdentity {
                            role,
                            field: "email",
                            value: record.email.clone(),
                        }
                    } else {
                        AuthError::Store(e)
                    }
                })?;
                if let (Some(from), Some(to)) = (&previous_username, &record.username) {
                    OwnerRepo::rename_username(tx, from, to)?;
                }
            }

            if let Some(mut session) = SessionRepo::get(tx, role)? {
                if session.email == current_email {
                    session.email = record.email.clone();
                    session.username = record.username.clone();
                    SessionRepo::put(tx, &session)?;
                }
            }

            Ok::<_, AuthError>(record)
        })?;

        info!(%role, email = %updated.email, "Profile updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identities() -> IdentityStore {
        let config = AuthConfig {
            min_password_len: 6,
            hash_iterations: 10,
        };
        IdentityStore::new(Arc::new(Store::in_memory().unwrap()), &config)
    }

    fn user(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            role: Role::User,
            email: email.to_string(),
            username: Some(username.to_string()),
            password: "secret1".to_string(),
            wallet_phrase: None,
        }
    }

    #[test]
    fn test_register_stores_hash_not_plaintext() {
        let ids = identities();
        let record = ids.register(user("Ann@Example.com", "ann")).unwrap();

        assert_eq!(record.email, "ann@example.com");
        assert_ne!(record.password_hash, "secret1");
        assert!(!record.password_hash.contains("secret1"));

        let stored = ids.credential(Role::User, "ann@example.com").unwrap();
        assert_eq!(stored, Some(record));
    }

    #[test]
    fn test_register_validation() {
        let ids = identities();

        let bad_email = ids.register(user("not-an-email", "ann"));
        assert!(matches!(bad_email, Err(AuthError::Validation(_))));

        let mut short = user("a@x.io", "ann");
        short.password = "12345".to_string();
        assert!(matches!(ids.register(short), Err(AuthError::Validation(_))));

        let mut nameless = user("a@x.io", "ann");
        nameless.username = None;
        assert!(matches!(ids.register(nameless), Err(AuthError::Validation(_))));
    }

    #[test]
    fn test_duplicate_identity() {
        let ids = identities();
        ids.register(user("a@x.io", "ann")).unwrap();

        let same_email = ids.register(user("A@x.io", "other"));
        assert!(matches!(
            same_email,
            Err(AuthError::DuplicateIdentity { field: "email", .. })
        ));

        let same_name = ids.register(user("b@x.io", "ann"));
        assert!(matches!(
            same_name,
            Err(AuthError::DuplicateIdentity { field: "username", .. })
        ));

        // The admin collection is separate
        let admin = RegisterRequest {
            role: Role::Admin,
            email: "a@x.io".to_string(),
            username: None,
            password: "adminpass".to_string(),
            wallet_phrase: None,
        };
        assert!(ids.register(admin).is_ok());
    }

    #[test]
    fn test_authenticate_by_email_or_username() {
        let ids = identities();
        ids.register(user("a@x.io", "ann")).unwrap();

        assert!(ids.authenticate(Role::User, "a@x.io", "secret1").unwrap());
        assert!(ids.authenticate(Role::User, "ann", "secret1").unwrap());
        assert!(!ids.authenticate(Role::User, "a@x.io", "wrong!!").unwrap());
        assert!(!ids.authenticate(Role::User, "ghost@x.io", "secret1").unwrap());
        assert!(!ids.authenticate(Role::Admin, "a@x.io", "secret1").unwrap());
    }

    #[test]
    fn test_session_lifecycle() {
        let ids = identities();
        ids.register(user("a@x.io", "ann")).unwrap();
        ids.register(user("b@x.io", "bob")).unwrap();

        ids.login(Role::User, "ann", "secret1").unwrap();
        let session = ids.login(Role::User, "b@x.io", "secret1").unwrap();
        assert_eq!(session.username.as_deref(), Some("bob"));

        let current = ids.current_session(Role::User).unwrap().unwrap();
        assert_eq!(current.email, "b@x.io");
        assert!(current.logged_in);

        let bob = ids.credential(Role::User, "b@x.io").unwrap().unwrap();
        assert_eq!(bob.last_login, Some(current.login_time));

        assert!(ids.end_session(Role::User).unwrap());
        assert!(ids.current_session(Role::User).unwrap().is_none());
        assert!(!ids.end_session(Role::User).unwrap());
    }

    #[test]
    fn test_login_wrong_password() {
        let ids = identities();
        ids.register(user("a@x.io", "ann")).unwrap();

        let result = ids.login(Role::User, "a@x.io", "nope123");
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(ids.current_session(Role::User).unwrap().is_none());
    }

    #[test]
    fn test_update_profile_moves_session() {
        let ids = identities();
        ids.register(user("a@x.io", "ann")).unwrap();
        ids.login(Role::User, "a@x.io", "secret1").unwrap();

        let updated = ids
            .update_profile(
                Role::User,
                "a@x.io",
                ProfileUpdate {
                    email: Some("ann@y.io".to_string()),
                    password: Some("newsecret".to_string()),
                    wallet_phrase: Some("apple banana cherry".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.email, "ann@y.io");
        assert_eq!(updated.wallet_phrase.as_deref(), Some("apple banana cherry"));
        assert!(ids.authenticate(Role::User, "ann@y.io", "newsecret").unwrap());
        assert!(!ids.authenticate(Role::User, "ann@y.io", "secret1").unwrap());
        assert_eq!(
            ids.current_session(Role::User).unwrap().unwrap().email,
            "ann@y.io"
        );
        assert!(ids.credential(Role::User, "a@x.io").unwrap().is_none());
    }

    #[test]
    fn test_credentials_survive_iteration_change() {
        let store = Arc::new(Store::in_memory().unwrap());
        let config = |hash_iterations| AuthConfig {
            min_password_len: 6,
            hash_iterations,
        };

        let before = IdentityStore::new(store.clone(), &config(10));
        before.register(user("a@x.io", "ann")).unwrap();

        let after = IdentityStore::new(store, &config(20));
        assert!(after.authenticate(Role::User, "a@x.io", "secret1").unwrap());
        assert!(!after.authenticate(Role::User, "a@x.io", "secret2").unwrap());

        // New hashes use the configured count
        after.register(user("b@x.io", "bob")).unwrap();
        let bob = after.credential(Role::User, "b@x.io").unwrap().unwrap();
        assert_eq!(bob.password_iterations, 20);
        let ann = after.credential(Role::User, "a@x.io").unwrap().unwrap();
        assert_eq!(ann.password_iterations, 10);

        after
            .update_profile(
                Role::User,
                "a@x.io",
                ProfileUpdate {
                    password: Some("rotated1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let ann = after.credential(Role::User, "a@x.io").unwrap().unwrap();
        assert_eq!(ann.password_iterations, 20);
        assert!(after.authenticate(Role::User, "ann", "rotated1").unwrap());
    }
}
