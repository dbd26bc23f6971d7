#![allow(dead_code)]

use std::sync::Mutex;

use sea_orm::DatabaseConnection;
use studynotes::config::AppConfig;
use studynotes::entity::user;
use studynotes::error::AppError;
use studynotes::forms::NoteInput;
use studynotes::mailer::{Mailer, OutgoingMail};
use studynotes::{db, users};

pub const SITE_URL: &str = "http://testserver";
pub const PASSWORD: &str = "correct-horse-9";

pub fn test_config(upload_dir: &str) -> AppConfig {
    AppConfig {
        server_port: 0,
        sqlite_path: ":memory:".to_string(),
        database_url: Some("sqlite::memory:".to_string()),
        jwt_secret: "integration-secret".to_string(),
        token_header: "token".to_string(),
        upload_storage_path: upload_dir.to_string(),
        site_url: SITE_URL.to_string(),
        session_ttl_secs: 3600,
        password_reset_timeout_secs: 600,
        bcrypt_cost: 4,
        admin_email: None,
        admin_password: None,
    }
}

pub async fn memory_db() -> DatabaseConnection {
    db::connect("sqlite::memory:").await.expect("in-memory sqlite")
}

pub async fn active_user(db: &DatabaseConnection, email: &str, name: &str) -> user::Model {
    let created = users::create_user(db, email, name, PASSWORD, 4).await.expect("create user");
    users::activate_user(db, created.id).await.expect("activate user")
}

pub fn note_input(title: &str, is_public: bool, tags: &[&str]) -> NoteInput {
    NoteInput {
        title: title.to_string(),
        description: format!("{} description", title),
        link: String::new(),
        is_public,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Keeps every mail so tests can follow the links inside.
#[derive(Default)]
pub struct CapturingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
    pub fail: bool,
}

impl CapturingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Path part of the site link in the most recent mail.
    pub fn last_link_path(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let body = &sent.last()?.body;
        body.split_whitespace()
            .find(|w| w.starts_with(SITE_URL))
            .map(|w| w[SITE_URL.len()..].to_string())
    }
}

impl Mailer for CapturingMailer {
    fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::fail("mail relay unavailable"));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}
