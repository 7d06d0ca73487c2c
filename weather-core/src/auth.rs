//! Account registration payloads and the bearer token service.

use std::sync::LazyLock;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AuthError, ValidationError},
    model::AccountId,
};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const PASSWORD_MIN: usize = 6;

/// Word-character local part and domain labels joined by single `.` or `-`, ending in
/// one or more 2-3 character suffixes. `\w` is ASCII only.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("valid regex")
});

/// Unvalidated registration payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// A validated registration, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationRequest {
    /// Trims the username, lower-cases the email and checks every field.
    pub fn validate(self) -> Result<NewAccount, ValidationError> {
        let mut err = ValidationError::default();

        let username = self.username.map(|u| u.trim().to_string()).unwrap_or_default();
        let email = self.email.map(|e| e.trim().to_lowercase()).unwrap_or_default();
        let password = self.password.unwrap_or_default();

        let username_len = username.chars().count();
        if username.is_empty() {
            err.push("username", "username is required");
        } else if username_len < USERNAME_MIN {
            err.push("username", format!("username must be at least {USERNAME_MIN} characters"));
        } else if username_len > USERNAME_MAX {
            err.push("username", format!("username cannot exceed {USERNAME_MAX} characters"));
        }

        if email.is_empty() {
            err.push("email", "email is required");
        } else if !looks_like_email(&email) {
            err.push("email", "invalid email");
        }

        if password.is_empty() {
            err.push("password", "password is required");
        } else if password.chars().count() < PASSWORD_MIN {
            err.push("password", format!("password must be at least {PASSWORD_MIN} characters"));
        }

        err.into_result(NewAccount {
            username,
            email,
            password,
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Issues and checks the opaque bearer tokens carried by authenticated requests.
pub trait TokenService: Send + Sync {
    fn issue(&self, account: AccountId) -> Result<String, AuthError>;

    fn verify(&self, token: &str) -> Result<AccountId, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: String,
    iat: i64,
    exp: i64,
}

/// HS256-signed JWT carrying the account id and an expiry.
#[derive(Clone)]
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, account: AccountId) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            id: account.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    fn verify(&self, token: &str) -> Result<AccountId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(|e| {
            log::debug!("rejected bearer token: {e}");
            AuthError::InvalidToken
        })?;

        data.claims.id.parse().map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str, password: &str) -> RegistrationRequest {
        RegistrationRequest {
            username: Some(username.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[test]
    fn registration_is_normalized() {
        let account = request("  bob  ", " Bob@Example.COM ", "secret1")
            .validate()
            .expect("valid registration");

        assert_eq!(account.username, "bob");
        assert_eq!(account.email, "bob@example.com");
    }

    #[test]
    fn registration_reports_every_invalid_field() {
        let err = request("ab", "not-an-email", "123").validate().unwrap_err();
        assert_eq!(
            err.fields().collect::<Vec<_>>(),
            vec!["username", "email", "password"]
        );

        let err = RegistrationRequest::default().validate().unwrap_err();
        assert_eq!(err.violations.len(), 3);
    }

    #[test]
    fn username_length_is_bounded() {
        let long = "x".repeat(USERNAME_MAX + 1);
        let err = request(&long, "x@y.io", "secret1").validate().unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["username"]);
    }

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("a.b-c@mail.example.org"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("a@@example.com"));
        assert!(!looks_like_email("a b@example.com"));
    }

    #[test]
    fn email_punctuation_and_suffix_length_are_checked() {
        for email in [
            "a!b@example.com",
            "a..b@example.com",
            "bob@mail.example.info",
            "x@y-.fr",
            ".a@b.fr",
            "zoé@example.fr",
        ] {
            let err = request("bob", email, "secret1").validate().unwrap_err();
            assert_eq!(err.fields().collect::<Vec<_>>(), vec!["email"], "{email}");
        }

        assert!(request("bob", "jean-luc.picard@star-fleet.co.uk", "secret1")
            .validate()
            .is_ok());
    }

    #[test]
    fn issued_token_verifies_to_same_account() {
        let tokens = JwtTokenService::new("test-secret", Duration::days(7));
        let account = AccountId::new();

        let token = tokens.issue(account).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), account);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = JwtTokenService::new("one", Duration::days(7));
        let verifier = JwtTokenService::new("two", Duration::days(7));

        let token = issuer.issue(AccountId::new()).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(verifier.verify("garbage"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = JwtTokenService::new("test-secret", Duration::days(-1));
        let token = tokens.issue(AccountId::new()).unwrap();

        assert!(matches!(tokens.verify(&token), Err(AuthError::InvalidToken)));
    }
}
