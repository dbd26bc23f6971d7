//! Account storage operations used by the identity routes.

use bcrypt::{hash, verify};
use chrono::Utc;
use log::{error, info};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entity::user;
use crate::error::AppError;
use crate::forms::normalize_email;

pub fn hash_password(raw: &str, cost: u32) -> Result<String, AppError> {
    hash(raw, cost).map_err(|e| {
        error!("bcrypt hash failed: {}", e);
        AppError::system_exception()
    })
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<user::Model>, AppError> {
    Ok(user::Entity::find_by_id(id).one(db).await?)
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<user::Model>, AppError> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?)
}

/// Creates an inactive account. Activation happens through a mailed token.
pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    email: &str,
    name: &str,
    password: &str,
    cost: u32,
) -> Result<user::Model, AppError> {
    insert_user(db, email, Some(name.to_string()), password, cost, false, false).await
}

pub async fn create_superuser<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
    cost: u32,
) -> Result<user::Model, AppError> {
    insert_user(db, email, None, password, cost, true, true).await
}

async fn insert_user<C: ConnectionTrait>(
    db: &C,
    email: &str,
    name: Option<String>,
    password: &str,
    cost: u32,
    active: bool,
    staff: bool,
) -> Result<user::Model, AppError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::field("email", "The email must be set"));
    }
    if find_by_email(db, &email).await?.is_some() {
        return Err(AppError::field("email", "User with this Email address already exists."));
    }

    let model = user::ActiveModel {
        email: Set(email),
        password_hash: Set(hash_password(password, cost)?),
        name: Set(name),
        avatar_path: Set(None),
        is_active: Set(active),
        is_staff: Set(staff),
        is_superuser: Set(staff),
        date_joined: Set(Utc::now()),
        last_login: Set(None),
        ..Default::default()
    };

    match model.insert(db).await {
        Ok(created) => Ok(created),
        Err(err) => {
            let msg = err.to_string();
            if msg.contains("Duplicate") || msg.contains("UNIQUE") {
                return Err(AppError::field("email", "User with this Email address already exists."));
            }
            Err(err.into())
        }
    }
}

pub async fn activate_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    let existing = find_by_id(db, id).await?.ok_or(AppError::NotFound)?;
    let mut active: user::ActiveModel = existing.into();
    active.is_active = Set(true);
    let updated = active.update(db).await?;
    info!("user activated id={}", updated.id);
    Ok(updated)
}

pub async fn set_password<C: ConnectionTrait>(db: &C, id: i32, raw: &str, cost: u32) -> Result<(), AppError> {
    let active = user::ActiveModel {
        id: Set(id),
        password_hash: Set(hash_password(raw, cost)?),
        ..Default::default()
    };
    user::Entity::update(active).exec(db).await?;
    info!("password changed user={}", id);
    Ok(())
}

/// Returns the user only for a matching password on an active account.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
) -> Result<Option<user::Model>, AppError> {
    let user = match find_by_email(db, email).await? {
        Some(user) => user,
        None => return Ok(None),
    };
    let ok = verify(password, &user.password_hash).map_err(|e| {
        error!("bcrypt verify failed: {}", e);
        AppError::system_exception()
    })?;
    if !ok || !user.is_active {
        return Ok(None);
    }
    Ok(Some(user))
}

pub async fn touch_last_login<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), AppError> {
    let active = user::ActiveModel {
        id: Set(id),
        last_login: Set(Some(Utc::now())),
        ..Default::default()
    };
    user::Entity::update(active).exec(db).await?;
    Ok(())
}

pub async fn update_name<C: ConnectionTrait>(db: &C, id: i32, name: &str) -> Result<user::Model, AppError> {
    let active = user::ActiveModel {
        id: Set(id),
        name: Set(Some(name.to_string())),
        ..Default::default()
    };
    Ok(user::Entity::update(active).exec(db).await?)
}

pub async fn update_avatar_path<C: ConnectionTrait>(
    db: &C,
    id: i32,
    avatar_path: &str,
) -> Result<user::Model, AppError> {
    let active = user::ActiveModel {
        id: Set(id),
        avatar_path: Set(Some(avatar_path.to_string())),
        ..Default::default()
    };
    Ok(user::Entity::update(active).exec(db).await?)
}

/// Creates the configured superuser on first start.
pub async fn ensure_superuser<C: ConnectionTrait>(
    db: &C,
    email: Option<&str>,
    password: Option<&str>,
    cost: u32,
) -> Result<(), AppError> {
    let (email, password) = match (email, password) {
        (Some(e), Some(p)) => (e, p),
        _ => return Ok(()),
    };
    if find_by_email(db, email).await?.is_some() {
        return Ok(());
    }
    let admin = create_superuser(db, email, password, cost).await?;
    info!("superuser created id={} email={}", admin.id, admin.email);
    Ok(())
}
