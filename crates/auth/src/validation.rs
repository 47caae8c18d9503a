//! Signup and profile input checks

use crate::error::{AuthError, AuthResult};

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the
/// domain with something on both sides
pub fn validate_email(email: &str) -> AuthResult<()> {
    let invalid = || AuthError::validation(format!("Invalid email address: {email:?}"));

    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let has_dotted_domain = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !has_dotted_domain {
        return Err(invalid());
    }

    Ok(())
}

pub fn validate_password(password: &str, min_len: usize) -> AuthResult<()> {
    if password.chars().count() < min_len {
        return Err(AuthError::validation(format!(
            "Password must be at least {min_len} characters"
        )));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> AuthResult<()> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(AuthError::validation("Username is required"));
    }
    if trimmed == "admin" {
        return Err(AuthError::validation("Username 'admin' is reserved"));
    }
    if trimmed.contains('@') {
        return Err(AuthError::validation("Username cannot contain '@'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        for email in ["a@b.co", "first.last@example.com", "x+tag@sub.domain.io"] {
            assert!(validate_email(email).is_ok(), "{email} should be valid");
        }
    }

    #[test]
    fn test_invalid_emails() {
        for email in ["", "plain", "@b.co", "a@", "a@b", "a@.co", "a@b.", "a b@c.de", "a@b@c.de"] {
            assert!(
                matches!(validate_email(email), Err(AuthError::Validation(_))),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345", 6).is_err());
        assert!(validate_password("123456", 6).is_ok());
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ann").is_ok());
        assert!(validate_username("  ").is_err());
        assert!(validate_username("admin").is_err());
        assert!(validate_username("a@b").is_err());
    }
}
