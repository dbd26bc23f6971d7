use std::io;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use log::info;

use studynotes::config::AppConfig;
use studynotes::db::connect_db;
use studynotes::mailer::{LogMailer, Mailer};
use studynotes::{routes, users};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let config = AppConfig::from_env();
    let db = connect_db(&config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("database init failed: {}", e)))?;
    users::ensure_superuser(
        &db,
        config.admin_email.as_deref(),
        config.admin_password.as_deref(),
        config.bcrypt_cost,
    )
    .await
    .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("superuser init failed: {}", e)))?;

    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
    let server_port = config.server_port;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::from(mailer.clone()))
            .wrap(middleware::Logger::default())
            .wrap(middleware::from_fn(routes::cors::cors_handler))
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", server_port))?;
    info!("server started at http://0.0.0.0:{}", server_port);
    server.run().await
}
