//! Request payloads and their validation.
//!
//! Every form has a `clean` step that either yields the cleaned values or the
//! first field error, in field order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::tags::{self, MAX_TAG_LEN, MAX_TAG_ROWS};

pub const TITLE_MAX_LEN: usize = 100;
pub const LINK_MAX_LEN: usize = 200;
pub const EMAIL_MAX_LEN: usize = 100;
pub const NAME_MAX_LEN: usize = 40;
pub const PASSWORD_MAX_LEN: usize = 100;
pub const PASSWORD_MIN_LEN: usize = 8;

const REQUIRED: &str = "This field is required.";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(https?|ftp)://[^\s/?#]+\.[^\s/?#]+(:\d+)?([/?#]\S*)?$").expect("url regex"));

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NoteForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteInput {
    pub title: String,
    pub description: String,
    pub link: String,
    pub is_public: bool,
    pub tags: Vec<String>,
}

impl NoteForm {
    pub fn clean(self) -> Result<NoteInput, AppError> {
        let title = required("title", self.title)?;
        max_len("title", &title, TITLE_MAX_LEN)?;

        let description = self.description.unwrap_or_default();
        if description.trim().is_empty() {
            return Err(AppError::field("description", REQUIRED));
        }

        let link = self.link.unwrap_or_default().trim().to_string();
        if !link.is_empty() {
            max_len("link", &link, LINK_MAX_LEN)?;
            if !URL_RE.is_match(&link) {
                return Err(AppError::field("link", "Enter a valid URL."));
            }
        }

        let tags = tags::clean_tags(&self.tags.unwrap_or_default())?;

        Ok(NoteInput {
            title,
            description,
            link,
            is_public: self.is_public.unwrap_or(false),
            tags,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
}

#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl RegisterForm {
    pub fn clean(self) -> Result<Registration, AppError> {
        let email = clean_email(self.email)?;
        let name = required("name", self.name)?;
        max_len("name", &name, NAME_MAX_LEN)?;
        let password = clean_password_pair("password1", "password2", self.password1, self.password2, &email)?;
        Ok(Registration { email, name, password })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginForm {
    pub fn clean(self) -> Result<(String, String), AppError> {
        let email = required("email", self.email)?;
        let password = self.password.unwrap_or_default();
        if password.is_empty() {
            return Err(AppError::field("password", REQUIRED));
        }
        Ok((normalize_email(&email), password))
    }
}

#[derive(Deserialize)]
pub struct SetPasswordForm {
    pub new_password1: Option<String>,
    pub new_password2: Option<String>,
}

impl SetPasswordForm {
    /// `email` feeds the similarity check.
    pub fn clean(self, email: &str) -> Result<String, AppError> {
        clean_password_pair("new_password1", "new_password2", self.new_password1, self.new_password2, email)
    }
}

#[derive(Deserialize)]
pub struct ResetRequestForm {
    pub email: Option<String>,
}

impl ResetRequestForm {
    pub fn clean(self) -> Result<String, AppError> {
        clean_email(self.email)
    }
}

#[derive(Deserialize)]
pub struct ProfileNameForm {
    pub name: Option<String>,
}

impl ProfileNameForm {
    pub fn clean(self) -> Result<String, AppError> {
        let name = required("name", self.name)?;
        max_len("name", &name, NAME_MAX_LEN)?;
        Ok(name)
    }
}

/// Lowercases the domain part, like most mail systems treat it.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn clean_email(raw: Option<String>) -> Result<String, AppError> {
    let email = required("email", raw)?;
    max_len("email", &email, EMAIL_MAX_LEN)?;
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::field("email", "Enter a valid email address."));
    }
    Ok(normalize_email(&email))
}

fn clean_password_pair(
    first: &str,
    second: &str,
    password1: Option<String>,
    password2: Option<String>,
    email: &str,
) -> Result<String, AppError> {
    let password1 = password1.unwrap_or_default();
    let password2 = password2.unwrap_or_default();
    if password1.is_empty() {
        return Err(AppError::field(first, REQUIRED));
    }
    if password2.is_empty() {
        return Err(AppError::field(second, REQUIRED));
    }
    max_len(first, &password1, PASSWORD_MAX_LEN)?;
    if password1 != password2 {
        return Err(AppError::field(second, "Passwords don't match"));
    }
    check_password_policy(&password1, email).map_err(|msg| AppError::field(second, msg))?;
    Ok(password1)
}

pub fn check_password_policy(password: &str, email: &str) -> Result<(), String> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(format!(
            "This password is too short. It must contain at least {} characters.",
            PASSWORD_MIN_LEN
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("This password is entirely numeric.".to_string());
    }
    let local = email.split('@').next().unwrap_or("").to_lowercase();
    let lowered = password.to_lowercase();
    if local.chars().count() >= 3 && (lowered.contains(&local) || local.contains(&lowered)) {
        return Err("The password is too similar to the email address.".to_string());
    }
    Ok(())
}

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    let value = value.unwrap_or_default().trim().to_string();
    if value.is_empty() {
        return Err(AppError::field(field, REQUIRED));
    }
    Ok(value)
}

fn max_len(field: &str, value: &str, limit: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len > limit {
        return Err(AppError::field(
            field,
            format!("Ensure this value has at most {} characters (it has {}).", limit, len),
        ));
    }
    Ok(())
}

/// Blank-form description served on the GET side of every form route.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDescriptor {
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
}

impl FieldDescriptor {
    fn new(name: &'static str, required: bool, max_length: Option<usize>) -> Self {
        Self { name, required, max_length, max_rows: None }
    }
}

impl FormDescriptor {
    pub fn note() -> Self {
        Self {
            fields: vec![
                FieldDescriptor::new("title", true, Some(TITLE_MAX_LEN)),
                FieldDescriptor::new("description", true, None),
                FieldDescriptor::new("link", false, Some(LINK_MAX_LEN)),
                FieldDescriptor::new("isPublic", false, None),
                FieldDescriptor {
                    max_rows: Some(MAX_TAG_ROWS),
                    ..FieldDescriptor::new("tags", false, Some(MAX_TAG_LEN))
                },
            ],
        }
    }

    pub fn register() -> Self {
        Self {
            fields: vec![
                FieldDescriptor::new("email", true, Some(EMAIL_MAX_LEN)),
                FieldDescriptor::new("name", true, Some(NAME_MAX_LEN)),
                FieldDescriptor::new("password1", true, Some(PASSWORD_MAX_LEN)),
                FieldDescriptor::new("password2", true, Some(PASSWORD_MAX_LEN)),
            ],
        }
    }

    pub fn login() -> Self {
        Self {
            fields: vec![
                FieldDescriptor::new("email", true, Some(EMAIL_MAX_LEN)),
                FieldDescriptor::new("password", true, None),
            ],
        }
    }

    pub fn set_password() -> Self {
        Self {
            fields: vec![
                FieldDescriptor::new("new_password1", true, Some(PASSWORD_MAX_LEN)),
                FieldDescriptor::new("new_password2", true, Some(PASSWORD_MAX_LEN)),
            ],
        }
    }

    pub fn reset_request() -> Self {
        Self {
            fields: vec![FieldDescriptor::new("email", true, Some(EMAIL_MAX_LEN))],
        }
    }
}
