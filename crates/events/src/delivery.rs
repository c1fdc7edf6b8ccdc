//! Telemetry delivery over HTTP with exponential-backoff retry.
//!
//! [`TelemetryDelivery`] POSTs each [`TelemetryRecord`] as JSON to a
//! collector URL. A failed attempt is retried after 1 s, 2 s and 4 s before
//! the record is dropped.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::telemetry::TelemetryRecord;

const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Telemetry collector returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// TelemetryDelivery
// ---------------------------------------------------------------------------

pub struct TelemetryDelivery {
    client: reqwest::Client,
    url: String,
    retry_delays: Vec<Duration>,
}

impl TelemetryDelivery {
    pub fn new(url: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
        })
    }

    /// Replace the backoff schedule. One retry is made per entry.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver one record, retrying per the backoff schedule.
    ///
    /// Returns the error of the final attempt when every attempt fails.
    pub async fn deliver(&self, record: &TelemetryRecord) -> Result<(), DeliveryError> {
        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(record).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %self.url,
                        error = %e,
                        "Telemetry delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        self.try_send(record).await.inspect_err(|e| {
            tracing::error!(
                url = %self.url,
                session_id = %record.session_id,
                error = %e,
                "Telemetry delivery failed after all retries"
            );
        })
    }

    /// Deliver queued records in order until the sending side is dropped.
    pub async fn run(self, mut receiver: mpsc::UnboundedReceiver<TelemetryRecord>) {
        while let Some(record) = receiver.recv().await {
            // Failures are already logged; the record is dropped.
            let _ = self.deliver(&record).await;
        }
        tracing::info!(url = %self.url, "Telemetry queue closed, delivery shutting down");
    }

    async fn try_send(&self, record: &TelemetryRecord) -> Result<(), DeliveryError> {
        let response = self.client.post(&self.url).json(record).send().await?;
        if !response.status().is_success() {
            return Err(DeliveryError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::telemetry::AnalyticsEvent;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use uuid::Uuid;

    /// Minimal HTTP/1.1 server answering every request with `status_line`.
    async fn collector(status_line: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/events", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    let response = format!(
                        "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (url, hits)
    }

    /// Consume headers and a `content-length` body.
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let Ok(n) = socket.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        if !name.eq_ignore_ascii_case("content-length") {
                            return None;
                        }
                        value.trim().parse::<usize>().ok()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    fn record() -> TelemetryRecord {
        TelemetryRecord {
            session_id: Uuid::now_v7(),
            event: AnalyticsEvent::form_submit(),
        }
    }

    #[tokio::test]
    async fn success_sends_once() {
        let (url, hits) = collector("204 No Content").await;
        let delivery = TelemetryDelivery::new(url).unwrap();

        delivery.deliver(&record()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_retries_then_reports_status() {
        let (url, hits) = collector("503 Service Unavailable").await;
        let delivery = TelemetryDelivery::new(url)
            .unwrap()
            .with_retry_delays(vec![Duration::ZERO; 3]);

        let err = delivery.deliver(&record()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::HttpStatus(503)));
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn run_drains_queue_then_exits() {
        let (url, hits) = collector("200 OK").await;
        let delivery = TelemetryDelivery::new(url).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(record()).unwrap();
        tx.send(record()).unwrap();
        drop(tx);

        delivery.run(rx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn error_display_http_status() {
        let err = DeliveryError::HttpStatus(502);
        assert_eq!(err.to_string(), "Telemetry collector returned HTTP 502");
    }
}
