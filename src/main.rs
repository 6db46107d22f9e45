use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

mod auth;
mod config;
mod data;
mod db;
mod enc;
mod error;
mod mailer;
mod routes;
mod services;
mod state;

use config::Settings;
use mailer::{Mailer, SmtpMailer};
use state::AppState;

fn startup_error(e: impl ToString) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env().map_err(startup_error)?;

    let conn = db::open(&settings.database_path).map_err(startup_error)?;
    db::init_schema(&conn).map_err(startup_error)?;
    drop(conn);
    std::fs::create_dir_all(&settings.upload_dir)?;

    let mailer: Arc<dyn Mailer> =
        Arc::new(SmtpMailer::from_settings(&settings).map_err(startup_error)?);
    let app_state = web::Data::new(AppState {
        settings: settings.clone(),
        mailer,
    });

    tracing::info!("listening on {}", settings.bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Cors::permissive())
            .service(routes::users::dispatch)
            .service(routes::users::confirm_account)
            .service(routes::users::validate_reset)
            .service(routes::jobs::query)
            .service(routes::jobs::dispatch)
            .service(routes::admin::query)
            .service(routes::admin::dispatch)
            .service(routes::profile::fetch)
            .service(routes::profile::update)
            .service(routes::profile::remove)
            .service(routes::misc::health_check)
            .service(routes::misc::serve_upload)
    })
    .bind(&settings.bind_addr)?
    .run()
    .await
}
