use actix_web::{web, HttpResponse};
use log::{info, warn};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::account_token::{self, TokenPurpose};
use crate::auth::{issue_session_token, OptionalAuthUser};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::forms::{FormDescriptor, LoginForm, RegisterForm};
use crate::mailer::{activation_mail, Mailer};
use crate::response::{ok, ok_msg, ResponseDto};
use crate::routes::profile::{user_dto, UserDto};
use crate::users;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/register")
            .route(web::get().to(register_form))
            .route(web::post().to(register)),
    )
    .service(
        web::resource("/login")
            .route(web::get().to(login_form))
            .route(web::post().to(login)),
    )
    .service(
        web::resource("/logout")
            .route(web::get().to(logout))
            .route(web::post().to(logout)),
    )
    .service(web::resource("/activate/{uid}/{token}").route(web::get().to(activate)));
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredDto {
    user_id: i32,
    email: String,
}

#[derive(Serialize)]
struct LoginDto {
    token: String,
    user: UserDto,
}

async fn register_form(auth: OptionalAuthUser) -> Result<HttpResponse, AppError> {
    if auth.0.is_some() {
        return Err(AppError::fail("You are already logged in"));
    }
    Ok(ok(FormDescriptor::register()))
}

async fn register(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
    auth: OptionalAuthUser,
    form: web::Json<RegisterForm>,
) -> Result<HttpResponse, AppError> {
    if auth.0.is_some() {
        return Err(AppError::fail("You are already logged in"));
    }
    let reg = form.into_inner().clean()?;
    let user = users::create_user(db.get_ref(), &reg.email, &reg.name, &reg.password, config.bcrypt_cost).await?;
    info!("user registered id={} email={}", user.id, user.email);

    let token = account_token::make_token(&config, &user, TokenPurpose::Activation)?;
    let link = format!(
        "{}/activate/{}/{}",
        config.site_url,
        account_token::encode_uid(user.id),
        token
    );
    if let Err(err) = mailer.send(activation_mail(&user.email, &link)) {
        warn!("activation mail failed user={} err={}", user.id, err);
        return Err(AppError::fail(format!(
            "Problem sending confirmation email to {}, check if you typed it correctly.",
            user.email
        )));
    }

    let msg = format!(
        "Dear {}, please go to your email {} inbox and click on the received activation link to confirm and complete the registration. Note: Check your spam folder.",
        reg.name, user.email
    );
    Ok(HttpResponse::Ok().json(ResponseDto::message(
        Some(RegisteredDto {
            user_id: user.id,
            email: user.email,
        }),
        msg,
    )))
}

async fn login_form() -> HttpResponse {
    ok(FormDescriptor::login())
}

async fn login(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    form: web::Json<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let (email, password) = form.into_inner().clean()?;
    let user = users::authenticate(db.get_ref(), &email, &password)
        .await?
        .ok_or_else(|| AppError::fail("Wrong email or password"))?;

    users::touch_last_login(db.get_ref(), user.id).await?;
    let token = issue_session_token(&config, &user)?;
    info!("user logged in id={}", user.id);
    Ok(ok(LoginDto {
        token,
        user: user_dto(&user),
    }))
}

async fn logout(auth: OptionalAuthUser) -> HttpResponse {
    if let Some(id) = auth.user_id() {
        info!("user logged out id={}", id);
    }
    ok_msg("Logged out")
}

async fn activate(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (uid, token) = path.into_inner();
    let user = match account_token::decode_uid(&uid) {
        Some(id) => users::find_by_id(db.get_ref(), id).await?,
        None => None,
    };
    match user {
        Some(user) if account_token::check_token(&config, &user, TokenPurpose::Activation, &token) => {
            users::activate_user(db.get_ref(), user.id).await?;
            Ok(ok_msg("Thank you for email confirmation"))
        }
        _ => Err(AppError::fail("Activation link is invalid")),
    }
}
