use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use log::{info, warn};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::forms::ProfileNameForm;
use crate::notes::{display_name, to_rfc3339};
use crate::response::{ok, ResponseDto};
use crate::users;

pub const AVATAR_FIELD: &str = "profile_img";
pub const AVATAR_MAX_BYTES: usize = 1024 * 1024;
const AVATAR_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(profile)))
        .service(web::resource("/").route(web::get().to(profile)))
        .service(
            web::resource("/name")
                .route(web::get().to(current_name))
                .route(web::post().to(update_name)),
        )
        .service(
            web::resource("/avatar")
                .route(web::get().to(current_avatar))
                .route(web::post().to(upload_avatar)),
        );
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub is_staff: bool,
    pub date_joined: String,
}

pub fn user_dto(u: &user::Model) -> UserDto {
    UserDto {
        id: u.id,
        email: u.email.clone(),
        name: display_name(u),
        avatar_url: u.avatar_path.as_deref().map(media_url),
        is_staff: u.is_staff,
        date_joined: to_rfc3339(u.date_joined),
    }
}

pub fn media_url(relative: &str) -> String {
    format!("/media/{}", relative)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NameDto {
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AvatarDto {
    avatar_url: Option<String>,
}

async fn profile(db: web::Data<DatabaseConnection>, auth: AuthUser) -> Result<HttpResponse, AppError> {
    let user = current_user(db.get_ref(), &auth).await?;
    Ok(ok(user_dto(&user)))
}

async fn current_name(db: web::Data<DatabaseConnection>, auth: AuthUser) -> Result<HttpResponse, AppError> {
    let user = current_user(db.get_ref(), &auth).await?;
    Ok(ok(NameDto { name: user.name }))
}

async fn update_name(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    form: web::Json<ProfileNameForm>,
) -> Result<HttpResponse, AppError> {
    let name = form.into_inner().clean()?;
    let updated = users::update_name(db.get_ref(), auth.user_id, &name).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::message(Some(user_dto(&updated)), "Username has been updated")))
}

async fn current_avatar(db: web::Data<DatabaseConnection>, auth: AuthUser) -> Result<HttpResponse, AppError> {
    let user = current_user(db.get_ref(), &auth).await?;
    Ok(ok(AvatarDto {
        avatar_url: user.avatar_path.as_deref().map(media_url),
    }))
}

async fn upload_avatar(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    auth: AuthUser,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|_| AppError::fail("Failed to read the upload"))?;
        if field.name() != AVATAR_FIELD || upload.is_some() {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|_| AppError::fail("Failed to read the upload"))?;
            }
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .map(|s| s.to_string())
            .unwrap_or_default();
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|_| AppError::fail("Failed to read the upload"))?;
            if data.len() + chunk.len() > AVATAR_MAX_BYTES {
                return Err(AppError::field(AVATAR_FIELD, "The file is too big."));
            }
            data.extend_from_slice(&chunk);
        }
        upload = Some((filename, data));
    }

    let (filename, data) = upload.ok_or_else(|| AppError::field(AVATAR_FIELD, "This field is required."))?;
    let file_name = sanitize_file_name(&filename)
        .ok_or_else(|| AppError::field(AVATAR_FIELD, "No file was submitted."))?;
    check_avatar_extension(&file_name)?;

    let user = current_user(db.get_ref(), &auth).await?;
    let relative = format!("Users/{}/{}", user.id, file_name);
    let root = PathBuf::from(config.upload_storage_path());
    let target = root.join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            warn!("avatar dir create failed path={} err={}", parent.display(), e);
            AppError::system_exception()
        })?;
    }
    tokio::fs::write(&target, &data).await.map_err(|e| {
        warn!("avatar write failed path={} err={}", target.display(), e);
        AppError::system_exception()
    })?;

    let updated = users::update_avatar_path(db.get_ref(), user.id, &relative).await?;
    if let Some(old) = user.avatar_path.as_deref().filter(|old| *old != relative) {
        if let Err(e) = tokio::fs::remove_file(root.join(old)).await {
            warn!("old avatar remove failed path={} err={}", old, e);
        }
    }
    info!("avatar updated user={} path={} size={}", user.id, relative, data.len());
    Ok(HttpResponse::Ok().json(ResponseDto::message(Some(user_dto(&updated)), "Profile image has been updated")))
}

async fn current_user(db: &DatabaseConnection, auth: &AuthUser) -> Result<user::Model, AppError> {
    users::find_by_id(db, auth.user_id)
        .await?
        .ok_or_else(AppError::need_login)
}

fn check_avatar_extension(file_name: &str) -> Result<(), AppError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if AVATAR_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(AppError::field(AVATAR_FIELD, "Wrong extension of the image"))
    }
}

/// Base name of an uploaded file with anything outside `[A-Za-z0-9._-]`
/// replaced by `_`. `None` when nothing usable is left.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
