use std::env;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::warn;
use rand::RngCore;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_header: String,
    pub upload_storage_path: String,
    pub site_url: String,
    pub session_ttl_secs: i64,
    pub password_reset_timeout_secs: i64,
    pub bcrypt_cost: u32,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = parse_var("SERVER_PORT").unwrap_or(8000);

        let sqlite_path = env::var("SQLITE_PATH").unwrap_or_else(|_| "./data/studynotes.sqlite".to_string());
        let database_url = env::var("DATABASE_URL").ok();

        let jwt_secret = env::var("SECRET_KEY")
            .or_else(|_| env::var("JWT_SECRET"))
            .unwrap_or_else(|_| {
                warn!("SECRET_KEY is not set, using a random secret; issued tokens die with the process");
                random_secret()
            });

        let token_header = env::var("TOKEN_HEADER").unwrap_or_else(|_| "token".to_string());
        let upload_storage_path = env::var("UPLOAD_STORAGE_PATH").unwrap_or_else(|_| "./media".to_string());
        let site_url = env::var("SITE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://localhost:{}", server_port));

        Self {
            server_port,
            sqlite_path,
            database_url,
            jwt_secret,
            token_header,
            upload_storage_path,
            site_url,
            session_ttl_secs: parse_var("SESSION_TTL_SECS").unwrap_or(14 * 24 * 3600),
            password_reset_timeout_secs: parse_var("PASSWORD_RESET_TIMEOUT").unwrap_or(14400),
            bcrypt_cost: parse_var("BCRYPT_COST").unwrap_or(10),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}?mode=rwc", path)
    }

    pub fn upload_storage_path(&self) -> String {
        self.upload_storage_path.clone()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
