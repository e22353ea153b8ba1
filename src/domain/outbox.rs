use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::errors::DomainError;
use super::events::{AggregateType, EventEnvelope};

/// Outbox row to be written inside the business transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxRecord {
    pub id: Uuid,
    pub aggregate_type: AggregateType,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
}

impl NewOutboxRecord {
    /// The row id is the event id, so consumers can deduplicate on either.
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Self, DomainError> {
        let (aggregate_type, aggregate_id) = envelope.event.aggregate();
        Ok(Self {
            id: envelope.event_id,
            aggregate_type,
            aggregate_id,
            event_type: envelope.event.event_type().to_string(),
            payload: encode_payload(envelope)?,
            occurred_at: envelope.occurred_at,
        })
    }
}

/// Serializes an event payload. A failure here must abort the enclosing
/// transaction.
pub fn encode_payload<T: Serialize + ?Sized>(event: &T) -> Result<Value, DomainError> {
    serde_json::to_value(event).map_err(DomainError::from)
}

/// Stored outbox row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub aggregate_type: AggregateType,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxRecord {
    pub fn is_pending(&self) -> bool {
        self.published_at.is_none()
    }

    /// Bytes handed to the transport. Derived from the stored payload only, so
    /// every delivery attempt of the same row sends identical bytes.
    pub fn payload_bytes(&self) -> Result<Vec<u8>, DomainError> {
        serde_json::to_vec(&self.payload).map_err(DomainError::from)
    }
}
