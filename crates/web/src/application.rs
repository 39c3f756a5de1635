use std::collections::HashMap;

use actix_web::{
    middleware::{from_fn, Logger},
    web, App, HttpServer,
};
use jetpack_core::{
    config::{ConfigError, LogConfig, PathConfig, ServerConfig},
    logging::{configure, LoggerOptions, LoggingError},
};
use thiserror::Error;

use crate::{
    error::{json_config, path_config, query_config},
    exception_handlers::exception_handlers,
    middleware::{correlation_id, handle_exceptions},
    routes::{self, ERROR_KINDS},
};

pub const PROJECT_NAME: &str = "jetpack-demo";

pub async fn run() -> Result<(), BootstrapError> {
    let log_config = LogConfig::load_from_env()?;
    let paths = PathConfig::load_from_env()?;
    let server = ServerConfig::load_from_env()?;

    let options = LoggerOptions::from_config(&log_config, &paths).with_project_name(PROJECT_NAME);
    // Held until shutdown so the file writer keeps flushing.
    let logging = configure(&options, &paths)?;
    tracing::info!(
        bind = server.bind_address(),
        log_file = ?logging.log_file(),
        level = logging.root_level().as_ref(),
        "starting service"
    );

    let handlers = web::Data::new(exception_handlers(&ERROR_KINDS, None, HashMap::new()));

    HttpServer::new(move || {
        App::new()
            .app_data(handlers.clone())
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .wrap(from_fn(handle_exceptions))
            .wrap(from_fn(correlation_id))
            .wrap(Logger::default())
            .configure(routes::configure)
    })
    .bind(server.bind_address())?
    .run()
    .await?;

    tracing::info!("service stopped");
    drop(logging);
    Ok(())
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
