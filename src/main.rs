use std::sync::Arc;

use dotenvy::dotenv;
use order_management::config::AppConfig;
use order_management::consumer::{self, DomainEventsConsumer};
use order_management::infrastructure::kafka::{domain_events_consumer, KafkaTransport};
use order_management::infrastructure::DieselStore;
use order_management::outbox::OutboxRelay;
use order_management::{build_server, create_pool, run_migrations};
use tokio::sync::watch;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[actix_web::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url)?;
    run_migrations(&pool)?;
    let store = Arc::new(DieselStore::new(pool));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut background = Vec::new();

    if config.relay.enabled {
        let transport = KafkaTransport::new(&config.kafka, config.relay.send_timeout)?;
        let relay = OutboxRelay::new(
            Arc::clone(&store),
            transport,
            config.kafka.topics.clone(),
            config.relay.clone(),
        );
        background.push(tokio::spawn(relay.run(shutdown_rx.clone())));
    } else {
        log::info!("Outbox relay disabled");
    }

    if config.consumer_enabled {
        let kafka_consumer = domain_events_consumer(&config.kafka)?;
        background.push(tokio::spawn(consumer::run(
            kafka_consumer,
            DomainEventsConsumer::default(),
            shutdown_rx.clone(),
        )));
    } else {
        log::info!("Domain events consumer disabled");
    }

    log::info!("Starting server at http://{}:{}", config.host, config.port);
    let served = build_server(store, &config.host, config.port)?.await;

    let _ = shutdown_tx.send(true);
    for task in background {
        if let Err(e) = task.await {
            log::error!("Background task ended abnormally: {}", e);
        }
    }

    served.map_err(Into::into)
}
