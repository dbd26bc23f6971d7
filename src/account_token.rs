//! Signed single-purpose account tokens for activation and password reset.
//!
//! A token is an HS256 JWT carrying the user id, its purpose, an expiry and a
//! fingerprint of the account state. Activating an account or changing its
//! password changes the fingerprint, so a consumed token stops verifying.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenPurpose {
    Activation,
    PasswordReset,
}

impl TokenPurpose {
    fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::Activation => "activate",
            TokenPurpose::PasswordReset => "reset",
        }
    }
}

#[derive(Serialize, Deserialize)]
struct AccountClaims {
    uid: i32,
    purpose: String,
    fp: String,
    exp: usize,
}

pub fn make_token(config: &AppConfig, user: &user::Model, purpose: TokenPurpose) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::seconds(config.password_reset_timeout_secs)).timestamp() as usize;
    let claims = AccountClaims {
        uid: user.id,
        purpose: purpose.as_str().to_string(),
        fp: fingerprint(user),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|_| AppError::system_exception())
}

pub fn check_token(config: &AppConfig, user: &user::Model, purpose: TokenPurpose, token: &str) -> bool {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let claims = match decode::<AccountClaims>(token, &key, &validation) {
        Ok(data) => data.claims,
        Err(_) => return false,
    };
    claims.uid == user.id && claims.purpose == purpose.as_str() && claims.fp == fingerprint(user)
}

pub fn encode_uid(id: i32) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

pub fn decode_uid(uid: &str) -> Option<i32> {
    let bytes = URL_SAFE_NO_PAD.decode(uid).ok()?;
    String::from_utf8(bytes).ok()?.parse().ok()
}

/// Digest of the stored password hash. Sessions carry it so a password
/// change or reset ends them.
pub fn password_fingerprint(password_hash: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn fingerprint(user: &user::Model) -> String {
    let login = user.last_login.map(|t| t.timestamp_micros()).unwrap_or(0);
    let mut hasher = Md5::new();
    hasher.update(format!("{}|{}|{}|{}", user.id, user.password_hash, user.is_active, login).as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl: i64) -> AppConfig {
        AppConfig {
            server_port: 0,
            sqlite_path: String::new(),
            database_url: None,
            jwt_secret: "unit-test-secret".to_string(),
            token_header: "token".to_string(),
            upload_storage_path: String::new(),
            site_url: "http://localhost".to_string(),
            session_ttl_secs: 3600,
            password_reset_timeout_secs: ttl,
            bcrypt_cost: 4,
            admin_email: None,
            admin_password: None,
        }
    }

    fn sample_user() -> user::Model {
        user::Model {
            id: 7,
            email: "ann@example.com".to_string(),
            password_hash: "$2b$04$abcdefghijklmnopqrstuv".to_string(),
            name: Some("Ann".to_string()),
            avatar_path: None,
            is_active: false,
            is_staff: false,
            is_superuser: false,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn fresh_token_verifies_for_its_purpose_only() {
        let cfg = config(600);
        let user = sample_user();
        let token = make_token(&cfg, &user, TokenPurpose::Activation).unwrap();
        assert!(check_token(&cfg, &user, TokenPurpose::Activation, &token));
        assert!(!check_token(&cfg, &user, TokenPurpose::PasswordReset, &token));
    }

    #[test]
    fn state_change_consumes_token() {
        let cfg = config(600);
        let mut user = sample_user();
        let token = make_token(&cfg, &user, TokenPurpose::Activation).unwrap();
        user.is_active = true;
        assert!(!check_token(&cfg, &user, TokenPurpose::Activation, &token));

        let reset = make_token(&cfg, &user, TokenPurpose::PasswordReset).unwrap();
        user.password_hash = "$2b$04$somethingelseentirely".to_string();
        assert!(!check_token(&cfg, &user, TokenPurpose::PasswordReset, &reset));
    }

    #[test]
    fn other_user_or_secret_rejected() {
        let cfg = config(600);
        let user = sample_user();
        let token = make_token(&cfg, &user, TokenPurpose::PasswordReset).unwrap();

        let other = user::Model { id: 8, ..sample_user() };
        assert!(!check_token(&cfg, &other, TokenPurpose::PasswordReset, &token));

        let mut rotated = config(600);
        rotated.jwt_secret = "rotated".to_string();
        assert!(!check_token(&rotated, &user, TokenPurpose::PasswordReset, &token));
        assert!(!check_token(&cfg, &user, TokenPurpose::PasswordReset, "garbage"));
    }

    #[test]
    fn expired_token_rejected() {
        let cfg = config(-120);
        let user = sample_user();
        let token = make_token(&cfg, &user, TokenPurpose::Activation).unwrap();
        assert!(!check_token(&cfg, &user, TokenPurpose::Activation, &token));
    }

    #[test]
    fn uid_round_trip_and_garbage() {
        assert_eq!(decode_uid(&encode_uid(42)), Some(42));
        assert_eq!(decode_uid("!!"), None);
        assert_eq!(decode_uid(&URL_SAFE_NO_PAD.encode("abc")), None);
    }
}
