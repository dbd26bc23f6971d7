use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthUser, OptionalAuthUser};
use crate::error::AppError;
use crate::forms::{FormDescriptor, NoteForm};
use crate::likes;
use crate::notes::{self, NoteView, PageQuery};
use crate::response::{ok, ok_msg, ResponseDto};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/mine").route(web::get().to(mine)))
        .service(web::resource("/public").route(web::get().to(public)))
        .service(
            web::resource("/new")
                .route(web::get().to(new_form))
                .route(web::post().to(create)),
        )
        .service(web::resource("/like").route(web::post().to(like)))
        .service(web::resource("/{id:\\d+}").route(web::get().to(detail)))
        .service(
            web::resource("/{id:\\d+}/edit")
                .route(web::get().to(edit_form))
                .route(web::post().to(update)),
        )
        .service(
            web::resource("/{id:\\d+}/delete")
                .route(web::get().to(delete_confirm))
                .route(web::post().to(delete)),
        );
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeRequest {
    #[serde(alias = "note_id")]
    note_id: i32,
}

#[derive(Serialize)]
struct EditDto {
    form: FormDescriptor,
    note: NoteView,
}

async fn mine(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let page = notes::list_by_owner(db.get_ref(), auth.user_id, query.into_inner()).await?;
    Ok(ok(page))
}

async fn public(
    db: web::Data<DatabaseConnection>,
    auth: OptionalAuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let page = notes::list_public(db.get_ref(), auth.user_id(), query.into_inner()).await?;
    Ok(ok(page))
}

async fn detail(
    db: web::Data<DatabaseConnection>,
    auth: OptionalAuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let note = notes::find_visible(db.get_ref(), path.into_inner(), auth.user_id()).await?;
    Ok(ok(note))
}

async fn new_form(_auth: AuthUser) -> HttpResponse {
    ok(FormDescriptor::note())
}

async fn create(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    form: web::Json<NoteForm>,
) -> Result<HttpResponse, AppError> {
    let input = form.into_inner().clean()?;
    let note = notes::create_note(db.get_ref(), auth.user_id, input).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::message(Some(note), "Note has been created")))
}

async fn edit_form(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let note = notes::find_owned(db.get_ref(), path.into_inner(), auth.user_id).await?;
    Ok(ok(EditDto {
        form: FormDescriptor::note(),
        note,
    }))
}

async fn update(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<i32>,
    form: web::Json<NoteForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    // Ownership first, so a stranger's invalid form still answers not-found.
    notes::find_owned(db.get_ref(), id, auth.user_id).await?;
    let input = form.into_inner().clean()?;
    let note = notes::update_note(db.get_ref(), id, auth.user_id, input).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::message(Some(note), "Note has been updated")))
}

async fn delete_confirm(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let note = notes::find_owned(db.get_ref(), path.into_inner(), auth.user_id).await?;
    Ok(ok(note))
}

async fn delete(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    notes::delete_note(db.get_ref(), path.into_inner(), auth.user_id).await?;
    Ok(ok_msg("Note has been deleted"))
}

async fn like(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    body: web::Json<LikeRequest>,
) -> Result<HttpResponse, AppError> {
    let state = likes::toggle_like(db.get_ref(), body.note_id, auth.user_id).await?;
    Ok(ok(state))
}
