use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::auth::OptionalAuthUser;
use crate::error::AppError;
use crate::response::ok;
use crate::routes::profile::{user_dto, UserDto};
use crate::{notes, users};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)));
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HomeDto {
    app: &'static str,
    user: Option<UserDto>,
    public_notes: u64,
}

async fn home(db: web::Data<DatabaseConnection>, auth: OptionalAuthUser) -> Result<HttpResponse, AppError> {
    let user = match auth.user_id() {
        Some(id) => users::find_by_id(db.get_ref(), id).await?.map(|u| user_dto(&u)),
        None => None,
    };
    let public_notes = notes::count_public(db.get_ref()).await?;
    Ok(ok(HomeDto {
        app: "StudyNotes",
        user,
        public_notes,
    }))
}
