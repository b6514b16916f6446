use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::{
    dto::{AuthResponse, PublicUser},
    jwt::JwtKeys,
    repo_types::User,
};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// Email and username are compared case-insensitively; we store them lowered.
pub(crate) fn normalize_login(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub(crate) fn issue_tokens(keys: &JwtKeys, user: User) -> anyhow::Result<AuthResponse> {
    let access_token = keys.sign_access(user.id, &user.username)?;
    let refresh_token = keys.sign_refresh(user.id, &user.username)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ana@example.org"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example@x.org"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn username_validation() {
        assert!(is_valid_username("ana_b"));
        assert!(is_valid_username("neighbour.42"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("ana@home"));
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_login("  Ana@Example.ORG "), "ana@example.org");
    }
}
