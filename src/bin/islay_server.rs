use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::info;

use islay::clock::SystemClock;
use islay::config::ServerConfig;
use islay::exchange::Exchange;
use islay::http::configure;
use islay::registry::Registry;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = ServerConfig::from_env()?;

    let registry = match &config.instruments {
        Some(path) => Registry::from_csv(path)
            .with_context(|| format!("loading instruments from {}", path.display()))?,
        None => Registry::sample(),
    };

    let exchange = Exchange::with_config(registry, Arc::new(SystemClock), config.exchange);
    let state = web::Data::new(exchange);

    if config.exchange.retention.is_some() {
        let compacting = state.clone();
        let every = std::time::Duration::try_from(config.compact_every)
            .context("compaction interval must be positive")?;
        actix_web::rt::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = compacting.compact();
                info!("SERVER: Compaction removed {:?} trades", removed);
            }
        });
    }

    info!("SERVER: Listening on {}:{}", config.address, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.address.as_str(), config.port))?
    .run()
    .await?;
    Ok(())
}
