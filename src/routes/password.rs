use actix_web::{web, HttpResponse};
use log::{debug, error};
use sea_orm::DatabaseConnection;

use crate::account_token::{self, TokenPurpose};
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::forms::{FormDescriptor, ResetRequestForm, SetPasswordForm};
use crate::mailer::{password_reset_mail, Mailer};
use crate::response::{ok, ok_msg};
use crate::users;

const RESET_SENT: &str =
    "We've emailed you instructions for setting your password, if an account exists with the email you entered.";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/change")
            .route(web::get().to(change_form))
            .route(web::post().to(change)),
    )
    .service(
        web::resource("/reset")
            .route(web::get().to(reset_form))
            .route(web::post().to(reset_request)),
    )
    .service(
        web::resource("/reset/{uid}/{token}")
            .route(web::get().to(reset_check))
            .route(web::post().to(reset_confirm)),
    );
}

async fn change_form(_auth: AuthUser) -> HttpResponse {
    ok(FormDescriptor::set_password())
}

async fn change(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    auth: AuthUser,
    form: web::Json<SetPasswordForm>,
) -> Result<HttpResponse, AppError> {
    let password = form.into_inner().clean(&auth.email)?;
    users::set_password(db.get_ref(), auth.user_id, &password, config.bcrypt_cost).await?;
    Ok(ok_msg("Password has been changed"))
}

async fn reset_form() -> HttpResponse {
    ok(FormDescriptor::reset_request())
}

async fn reset_request(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
    form: web::Json<ResetRequestForm>,
) -> Result<HttpResponse, AppError> {
    let email = form.into_inner().clean()?;
    match users::find_by_email(db.get_ref(), &email).await? {
        Some(user) if user.is_active => {
            let token = account_token::make_token(&config, &user, TokenPurpose::PasswordReset)?;
            let link = format!(
                "{}/password/reset/{}/{}",
                config.site_url,
                account_token::encode_uid(user.id),
                token
            );
            if let Err(err) = mailer.send(password_reset_mail(&user.email, &link)) {
                error!("password reset mail failed user={} err={}", user.id, err);
            }
        }
        _ => debug!("password reset requested for unknown or inactive account"),
    }
    Ok(ok_msg(RESET_SENT))
}

async fn reset_check(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (uid, token) = path.into_inner();
    reset_target(db.get_ref(), &config, &uid, &token).await?;
    Ok(ok(FormDescriptor::set_password()))
}

async fn reset_confirm(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    path: web::Path<(String, String)>,
    form: web::Json<SetPasswordForm>,
) -> Result<HttpResponse, AppError> {
    let (uid, token) = path.into_inner();
    let user = reset_target(db.get_ref(), &config, &uid, &token).await?;
    let password = form.into_inner().clean(&user.email)?;
    users::set_password(db.get_ref(), user.id, &password, config.bcrypt_cost).await?;
    Ok(ok_msg("Your password has been reset"))
}

/// The account a reset link points at, if the link still verifies.
async fn reset_target(
    db: &DatabaseConnection,
    config: &AppConfig,
    uid: &str,
    token: &str,
) -> Result<user::Model, AppError> {
    let user = match account_token::decode_uid(uid) {
        Some(id) => users::find_by_id(db, id).await?,
        None => None,
    };
    user.filter(|u| account_token::check_token(config, u, TokenPurpose::PasswordReset, token))
        .ok_or_else(|| AppError::fail("Link expired"))
}
