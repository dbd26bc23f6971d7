pub mod account;
pub mod cors;
pub mod home;
pub mod media;
pub mod note;
pub mod password;
pub mod profile;

use actix_web::web;

use crate::response::json_error_handler;

/// Mounts every route of the service onto an `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .configure(home::config)
        .configure(account::config)
        .service(web::scope("/notes").configure(note::config))
        .service(web::scope("/profile").configure(profile::config))
        .service(web::scope("/password").configure(password::config))
        .service(web::scope("/media").configure(media::config));
}
