use std::path::{Component, Path, PathBuf};

use actix_web::{http::header, web, HttpResponse};
use log::debug;

use crate::config::AppConfig;
use crate::error::AppError;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/{tail:.*}").route(web::get().to(serve)));
}

async fn serve(config: web::Data<AppConfig>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let relative = path.into_inner();
    let file_path = resolve(&config.upload_storage_path(), &relative).ok_or(AppError::NotFound)?;
    let bytes = tokio::fs::read(&file_path).await.map_err(|e| {
        debug!("media read failed path={} err={}", file_path.display(), e);
        AppError::NotFound
    })?;
    let mime = mime_guess::from_path(&file_path).first_or_octet_stream();
    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, mime.essence_str().to_string()))
        .body(bytes))
}

/// Joins `relative` under `root`, refusing anything that could leave it.
fn resolve(root: &str, relative: &str) -> Option<PathBuf> {
    if relative.is_empty() {
        return None;
    }
    let rel = Path::new(relative);
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(Path::new(root).join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_escapes() {
        assert_eq!(
            resolve("/srv/media", "Users/1/me.png"),
            Some(PathBuf::from("/srv/media/Users/1/me.png"))
        );
        assert_eq!(resolve("/srv/media", "../secret"), None);
        assert_eq!(resolve("/srv/media", "Users/../../secret"), None);
        assert_eq!(resolve("/srv/media", "/etc/passwd"), None);
        assert_eq!(resolve("/srv/media", ""), None);
    }
}
