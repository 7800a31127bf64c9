//! Domain event publishing over NATS.

use crate::domain::events::DomainEvent;

/// Publishes domain events when a NATS connection is configured, and does
/// nothing otherwise. Failures are logged and never reach the caller.
#[derive(Clone, Debug, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub async fn connect(url: &str) -> Result<Self, async_nats::ConnectError> {
        let client = async_nats::connect(url).await?;
        tracing::info!(url, "connected to NATS");
        Ok(Self::new(Some(client)))
    }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub async fn publish(&self, event: impl Into<DomainEvent>) {
        let Some(client) = &self.nats else { return };
        let event = event.into();
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => { tracing::error!(error = %e, subject = event.subject(), "failed to encode event"); return; }
        };
        if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
            tracing::warn!(error = %e, subject = event.subject(), "failed to publish event");
        }
    }

    pub async fn flush(&self) {
        if let Some(client) = &self.nats {
            if let Err(e) = client.flush().await { tracing::warn!(error = %e, "failed to flush NATS client"); }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::ProductEvent;

    #[tokio::test]
    async fn test_disabled_publisher_is_noop() {
        let publisher = EventPublisher::disabled();
        assert!(!publisher.is_enabled());
        publisher.publish(ProductEvent::Created { product_id: uuid::Uuid::nil() }).await;
        publisher.flush().await;
    }
}
