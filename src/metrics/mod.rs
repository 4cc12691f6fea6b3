// Metrics module - Usage events and their optional delivery to a sink

mod event;
pub mod tcp;

pub use event::{EventState, UsageEvent};
pub use tcp::TcpSink;

use crate::error::Result;
use tracing::{debug, warn};

/// Destination for usage events
#[allow(async_fn_in_trait)]
pub trait MetricsSink {
    /// Deliver one event over the sink's connection
    async fn send(&mut self, event: &UsageEvent) -> Result<()>;
}

/// Reports usage events, to a sink when one is configured
///
/// Delivery failures are logged and dropped; they never reach the caller.
pub struct MetricsReporter<K> {
    sink: Option<K>,
    failures: u64,
}

impl<K: MetricsSink> MetricsReporter<K> {
    pub fn new(sink: Option<K>) -> Self {
        Self { sink, failures: 0 }
    }

    /// Log the event and send it to the sink, if any
    pub async fn emit(&mut self, event: &UsageEvent) {
        debug!("{}", event.description);

        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        if let Err(e) = sink.send(event).await {
            self.failures += 1;
            warn!(
                "Failed to report {} (failure #{}): {}",
                event.service, self.failures, e
            );
        }
    }

    pub fn sink(&self) -> Option<&K> {
        self.sink.as_ref()
    }

    /// Number of events the sink failed to accept
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WardenError;

    struct BrokenSink;

    impl MetricsSink for BrokenSink {
        async fn send(&mut self, _event: &UsageEvent) -> Result<()> {
            Err(WardenError::SinkError("connection reset".to_string()))
        }
    }

    #[derive(Default)]
    struct CollectingSink(Vec<UsageEvent>);

    impl MetricsSink for CollectingSink {
        async fn send(&mut self, event: &UsageEvent) -> Result<()> {
            self.0.push(event.clone());
            Ok(())
        }
    }

    fn event() -> UsageEvent {
        UsageEvent::new("process:web:limits:mem", EventState::Ok, 10.0, "web is fine")
    }

    #[tokio::test]
    async fn test_emit_without_sink() {
        let mut reporter = MetricsReporter::<CollectingSink>::new(None);
        reporter.emit(&event()).await;
        assert!(reporter.sink().is_none());
        assert_eq!(reporter.failures(), 0);
    }

    #[tokio::test]
    async fn test_emit_delivers_to_sink() {
        let mut reporter = MetricsReporter::new(Some(CollectingSink::default()));
        reporter.emit(&event()).await;
        assert_eq!(reporter.sink().unwrap().0, vec![event()]);
    }

    #[tokio::test]
    async fn test_emit_swallows_sink_failures() {
        let mut reporter = MetricsReporter::new(Some(BrokenSink));
        reporter.emit(&event()).await;
        reporter.emit(&event()).await;
        assert_eq!(reporter.failures(), 2);
    }
}
