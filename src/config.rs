use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::infrastructure::kafka::KafkaConfig;
use crate::outbox::relay::RelayConfig;
use crate::outbox::transport::Destinations;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub kafka: KafkaConfig,
    pub relay: RelayConfig,
    pub consumer_enabled: bool,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let kafka_defaults = KafkaConfig::default();
        let kafka = KafkaConfig {
            brokers: lookup("KAFKA_BROKERS").unwrap_or(kafka_defaults.brokers),
            consumer_group: lookup("KAFKA_CONSUMER_GROUP")
                .unwrap_or(kafka_defaults.consumer_group),
            topics: Destinations {
                orders: lookup("KAFKA_ORDERS_TOPIC").unwrap_or(kafka_defaults.topics.orders),
                products: lookup("KAFKA_PRODUCTS_TOPIC")
                    .unwrap_or(kafka_defaults.topics.products),
            },
        };

        let relay_defaults = RelayConfig::default();
        let batch_size: i64 = parse_or(&lookup, "OUTBOX_RELAY_BATCH_SIZE", relay_defaults.batch_size)?;
        if batch_size < 1 {
            return Err(ConfigError::Invalid {
                key: "OUTBOX_RELAY_BATCH_SIZE",
                value: batch_size.to_string(),
            });
        }
        let relay = RelayConfig {
            enabled: parse_or(&lookup, "OUTBOX_RELAY_ENABLED", relay_defaults.enabled)?,
            poll_interval: millis_or(
                &lookup,
                "OUTBOX_RELAY_POLL_INTERVAL_MS",
                relay_defaults.poll_interval,
            )?,
            batch_size,
            send_timeout: millis_or(
                &lookup,
                "OUTBOX_RELAY_SEND_TIMEOUT_MS",
                relay_defaults.send_timeout,
            )?,
        };

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            kafka,
            relay,
            consumer_enabled: parse_or(&lookup, "EVENT_CONSUMER_ENABLED", true)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn millis_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let ms: u64 = parse_or(lookup, key, default.as_millis() as u64)?;
    if ms == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: ms.to_string(),
        });
    }
    Ok(Duration::from_millis(ms))
}
