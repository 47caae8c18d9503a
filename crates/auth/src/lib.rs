//! ArtVault Auth - Session/identity store
//!
//! Admin and user credentials with salted password hashes, and a single
//! session per role.

pub mod error;
pub mod identity;
pub mod password;
pub mod validation;

pub use error::{AuthError, AuthResult};
pub use identity::{IdentityStore, ProfileUpdate, RegisterRequest};
pub use password::{PasswordHash, PasswordHasher};
