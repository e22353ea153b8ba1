use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::domain::errors::DomainError;
use crate::domain::outbox::OutboxRecord;
use crate::domain::ports::OutboxStore;

use super::transport::{Destinations, Transport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub enabled: bool,
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub send_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_millis(1000),
            batch_size: 50,
            send_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of one polling pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub published: usize,
    pub failed: usize,
}

/// Background publisher for the outbox table.
///
/// Each tick loads up to `batch_size` pending rows, oldest first, and sends
/// them one by one keyed by aggregate id. A row is marked published only after
/// the transport acknowledged it. The first failed send ends the tick; that row
/// and everything after it stay pending for the next tick, which keeps
/// per-aggregate order intact and gives at-least-once delivery.
pub struct OutboxRelay<S, T> {
    store: Arc<S>,
    transport: T,
    destinations: Destinations,
    config: RelayConfig,
}

impl<S: OutboxStore, T: Transport> OutboxRelay<S, T> {
    pub fn new(store: Arc<S>, transport: T, destinations: Destinations, config: RelayConfig) -> Self {
        Self {
            store,
            transport,
            destinations,
            config,
        }
    }

    pub async fn tick(&self) -> Result<TickReport, DomainError> {
        let store = Arc::clone(&self.store);
        let limit = self.config.batch_size;
        let pending = blocking(move || store.fetch_pending(limit)).await?;

        let mut report = TickReport::default();
        for record in pending {
            if let Err(e) = self.deliver(&record).await {
                log::warn!(
                    "Outbox event {} ({}) not delivered, will retry: {}",
                    record.id,
                    record.event_type,
                    e
                );
                report.failed += 1;
                break;
            }

            let store = Arc::clone(&self.store);
            let (id, at) = (record.id, Utc::now());
            if blocking(move || store.mark_published(id, at)).await? {
                log::debug!(
                    "Published outbox event {} type={} aggregate={}",
                    record.id,
                    record.event_type,
                    record.aggregate_id
                );
                report.published += 1;
            } else {
                log::debug!("Outbox event {} was already marked published", record.id);
            }
        }
        Ok(report)
    }

    async fn deliver(&self, record: &OutboxRecord) -> Result<(), TransportError> {
        let destination = self.destinations.resolve(record.aggregate_type);
        let key = record.aggregate_id.to_string();
        let payload = record.payload_bytes().map_err(|e| TransportError::Send {
            destination: destination.to_string(),
            reason: e.to_string(),
        })?;

        match tokio::time::timeout(
            self.config.send_timeout,
            self.transport.send(destination, &key, &payload),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                destination: destination.to_string(),
            }),
        }
    }

    /// Polls until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!(
            "Outbox relay started (interval {:?}, batch size {})",
            self.config.poll_interval,
            self.config.batch_size
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(report) if report.failed > 0 => {
                            log::info!("Outbox relay published {} event(s), stopped at a failed send", report.published);
                        }
                        Ok(report) if report.published > 0 => {
                            log::info!("Outbox relay published {} event(s)", report.published);
                        }
                        Ok(_) => {}
                        Err(e) => log::error!("Outbox relay tick failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("Outbox relay stopped");
    }
}

async fn blocking<R, F>(f: F) -> Result<R, DomainError>
where
    F: FnOnce() -> Result<R, DomainError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
}
