// TCP metrics sink - newline-delimited JSON events over one connection

use crate::error::{WardenError, Result};
use crate::metrics::{MetricsSink, UsageEvent};
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

/// Event as written on the wire
#[derive(Serialize)]
struct WireEvent<'a> {
    /// Unix timestamp in seconds
    time: i64,
    #[serde(flatten)]
    event: &'a UsageEvent,
}

/// Metrics sink writing one JSON object per line to a TCP collector
///
/// The connection is opened once and reused. A failed write is reported to
/// the caller and never retried or reconnected; it may have left a partial
/// line on the stream, so every later send fails without writing.
pub struct TcpSink {
    stream: TcpStream,
    address: String,
    timeout: Duration,
    broken: bool,
}

impl TcpSink {
    /// Connect to the collector at `host:port`
    pub async fn connect(host: &str, port: u16, timeout_after: Duration) -> Result<Self> {
        let address = format!("{}:{}", host, port);

        let stream = match timeout(timeout_after, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(WardenError::SinkError(format!(
                    "Failed to connect to {}: {}",
                    address, e
                )))
            }
            Err(_) => {
                return Err(WardenError::TimeoutError(format!(
                    "Connecting to {} took longer than {:?}",
                    address, timeout_after
                )))
            }
        };

        info!("Connected to metrics sink at {}", address);

        Ok(Self {
            stream,
            address,
            timeout: timeout_after,
            broken: false,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether an earlier write failed and the connection is no longer used
    pub fn is_broken(&self) -> bool {
        self.broken
    }
}

impl MetricsSink for TcpSink {
    async fn send(&mut self, event: &UsageEvent) -> Result<()> {
        if self.broken {
            return Err(WardenError::SinkError(format!(
                "Connection to {} is broken after an earlier failed write",
                self.address
            )));
        }

        let wire = WireEvent {
            time: Utc::now().timestamp(),
            event,
        };

        let mut line = serde_json::to_string(&wire).map_err(|e| {
            WardenError::SerializationError(format!("Failed to serialize event: {}", e))
        })?;
        line.push('\n');

        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(line.as_bytes()).await?;
            stream.flush().await
        };

        let result = match timeout(self.timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(WardenError::SinkError(format!(
                "Failed to send event to {}: {}",
                self.address, e
            ))),
            Err(_) => Err(WardenError::TimeoutError(format!(
                "Sending event to {} took longer than {:?}",
                self.address, self.timeout
            ))),
        };

        if result.is_err() {
            warn!("Giving up on metrics sink at {}", self.address);
            self.broken = true;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EventState;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_send_writes_json_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let reader = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut lines = BufReader::new(socket).lines();
            lines.next_line().await.unwrap().unwrap()
        });

        let mut sink = TcpSink::connect("127.0.0.1", port, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(sink.address(), format!("127.0.0.1:{}", port));

        let event = UsageEvent::new(
            "process:leaky:limits:mem",
            EventState::Critical,
            150.0,
            "leaky is using 1500b of 1000b RSS (150.00%)",
        );
        sink.send(&event).await.unwrap();

        let line = reader.await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(json["service"], "process:leaky:limits:mem");
        assert_eq!(json["state"], "critical");
        assert_eq!(json["metric"], 150.0);
        assert!(json["time"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_stalled_write_breaks_the_sink() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Accept and hold the connection without ever reading from it
        let holder = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let mut sink = TcpSink::connect("127.0.0.1", port, Duration::from_millis(100))
            .await
            .unwrap();

        let event = UsageEvent::new(
            "process:leaky:limits:mem",
            EventState::Critical,
            150.0,
            "x".repeat(1 << 20),
        );

        let mut first_error = None;
        for _ in 0..64 {
            if let Err(e) = sink.send(&event).await {
                first_error = Some(e);
                break;
            }
        }

        assert!(matches!(first_error, Some(WardenError::TimeoutError(_))));
        assert!(sink.is_broken());

        let result = sink.send(&event).await;
        assert!(matches!(result, Err(WardenError::SinkError(_))));

        holder.abort();
    }

    #[tokio::test]
    async fn test_connect_refused_is_sink_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpSink::connect("127.0.0.1", port, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(WardenError::SinkError(_))));
    }
}
