//! Blocking HTTP transport shared by the network sinks
//!
//! Workers are plain OS threads, so the async `reqwest` client is driven
//! through a small private tokio runtime with `block_on`. The runtime and
//! the client's connection pool are shared by all workers.

use super::{SinkError, TransportErrorKind};
use anyhow::Context;
use serde_json::Value as JsonValue;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Runtime threads driving the client; workers block on their own requests
const RUNTIME_THREADS: usize = 2;

/// Largest response body kept in a `Rejected` error
const MAX_ERROR_BODY: usize = 512;

pub struct HttpTransport {
    runtime: Runtime,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(RUNTIME_THREADS)
            .thread_name("indexpulse-http")
            .enable_all()
            .build()
            .context("Failed to build HTTP runtime")?;

        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { runtime, client })
    }

    /// POST a JSON body, succeeding only on a 2xx status
    pub fn post_json(&self, url: &str, body: &JsonValue) -> Result<(), SinkError> {
        self.runtime.block_on(async {
            let response = self
                .client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(from_reqwest)?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            let mut body = response.text().await.unwrap_or_default();
            truncate_at_char_boundary(&mut body, MAX_ERROR_BODY);
            Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            })
        })
    }
}

/// Map a reqwest failure onto the sink error classes
pub fn from_reqwest(err: reqwest::Error) -> SinkError {
    let message = err.to_string();
    if err.is_connect() {
        let kind = if err.is_timeout() {
            TransportErrorKind::ConnectTimeout
        } else {
            TransportErrorKind::ConnectionRefused
        };
        return SinkError::transport(kind, message);
    }
    if err.is_timeout() {
        return SinkError::transport(TransportErrorKind::NoResponse, message);
    }
    if has_socket_cause(&err) {
        return SinkError::transport(TransportErrorKind::Socket, message);
    }
    // Sent on an open connection but closed before any status came back
    if err.is_request() && err.status().is_none() {
        return SinkError::transport(TransportErrorKind::NoResponse, message);
    }
    SinkError::Other(anyhow::Error::new(err))
}

fn has_socket_cause(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

fn truncate_at_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    /// Port with nothing listening on it
    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_refused_connection_is_transient() {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let url = format!("http://127.0.0.1:{}/update", closed_port());

        let err = transport.post_json(&url, &serde_json::json!([])).unwrap_err();
        assert!(err.is_transient(), "{:?}", err);
    }

    #[test]
    fn test_closed_without_response_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/update", listener.local_addr().unwrap());

        // Accept and read the request, then hang up without answering
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
        });

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport.post_json(&url, &serde_json::json!([{"id": "a"}])).unwrap_err();
        server.join().unwrap();

        assert!(err.is_transient(), "{:?}", err);
        assert!(matches!(err, SinkError::Transport { .. }), "{:?}", err);
    }

    #[test]
    fn test_success_status() {
        let (base, server) = test_server::serve(vec![(200, "{}")]);
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();

        transport
            .post_json(&format!("{}/update", base), &serde_json::json!([{"id": "a"}]))
            .unwrap();

        let requests = server.join().unwrap();
        assert_eq!(requests[0].request_line, "POST /update HTTP/1.1");
        assert_eq!(requests[0].body, r#"[{"id":"a"}]"#);
    }

    #[test]
    fn test_error_status_is_rejected() {
        let (base, server) = test_server::serve(vec![(400, "bad document")]);
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();

        let err = transport
            .post_json(&format!("{}/update", base), &serde_json::json!([]))
            .unwrap_err();
        server.join().unwrap();

        assert!(!err.is_transient());
        match err {
            SinkError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad document");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_truncate_at_char_boundary() {
        let mut text = "héllo".to_string();
        truncate_at_char_boundary(&mut text, 2);
        assert_eq!(text, "h");

        let mut short = "ok".to_string();
        truncate_at_char_boundary(&mut short, 10);
        assert_eq!(short, "ok");
    }
}
