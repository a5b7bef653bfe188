use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod payroll;
mod routes;
mod state;
mod store;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::payroll::notify::{LogDelivery, NotificationDispatcher, run_delivery_worker};
use crate::payroll::payslip::LocalDirStorage;
use crate::routes::Limiters;
use crate::state::AppState;
use crate::store::mysql::MySqlStore;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "payroll.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    let limiters = Limiters::from_config(&config)?;

    let (notifier, notices) = NotificationDispatcher::channel(config.notify_queue_capacity);
    actix_web::rt::spawn(run_delivery_worker(notices, Arc::new(LogDelivery)));

    let state = Data::new(AppState::new(
        Arc::new(MySqlStore::new(pool)),
        Arc::new(LocalDirStorage::new(&config.payslip_dir)),
        notifier,
    ));

    let server_addr = config.server_addr.clone();
    let api_prefix = config.api_prefix.clone();
    let config_data = Data::new(config);

    info!(addr = %server_addr, prefix = %api_prefix, "Listening");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .configure(|cfg| routes::configure(cfg, &api_prefix, limiters.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
