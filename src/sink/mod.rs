//! Document sinks
//!
//! A sink transmits one batch of documents to the backend. Two are built
//! in: [`solr::SolrCloudSink`] (clustered update API) and
//! [`pipeline::HttpPipelineSink`] (HTTP ingestion pipeline taking a JSON
//! array). [`mock::MockSink`] records batches in memory for tests.
//!
//! Sinks are shared by every worker through an `Arc`, so they must be
//! `Send + Sync` and handle their own connection pooling.
//!
//! # Failure classes
//!
//! [`SinkError::is_transient`] decides whether the pipeline retries a batch.
//! Only transport-level failures (refused or timed-out connections, a
//! request that got no response, socket errors) are transient; everything
//! else, including HTTP error statuses, is fatal.

pub mod http;
pub mod mock;
pub mod pipeline;
pub mod solr;

use crate::config::{EndpointConfig, EndpointType};
use crate::document::Document;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Transport failure classes that are worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionRefused,
    ConnectTimeout,
    NoResponse,
    Socket,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConnectionRefused => "connection refused",
            Self::ConnectTimeout => "connect timeout",
            Self::NoResponse => "no response",
            Self::Socket => "socket error",
        };
        write!(f, "{}", name)
    }
}

/// Error returned by a sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    #[error("backend rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SinkError {
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Whether the failure is worth retrying
    ///
    /// `Other` errors are classified by their root cause: walking the
    /// source chain, an I/O error of a connection-level kind or a reqwest
    /// connect, timeout or unanswered-request error makes the whole failure
    /// transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Rejected { .. } => false,
            Self::Other(err) => err.chain().any(is_transient_cause),
        }
    }
}

fn is_transient_cause(cause: &(dyn StdError + 'static)) -> bool {
    if let Some(err) = cause.downcast_ref::<io::Error>() {
        return is_transient_io_kind(err.kind());
    }
    if let Some(err) = cause.downcast_ref::<reqwest::Error>() {
        return err.is_connect() || err.is_timeout() || (err.is_request() && err.status().is_none());
    }
    if let Some(err) = cause.downcast_ref::<SinkError>() {
        return err.is_transient();
    }
    false
}

fn is_transient_io_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
    )
}

/// Destination for batches of documents
pub trait DocumentSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Transmit one batch; blocks until the backend answers
    fn send(&self, batch: &[Document]) -> Result<(), SinkError>;

    /// Make everything sent so far visible
    fn commit(&self) -> Result<(), SinkError>;
}

/// Build the sink selected by the endpoint configuration
pub fn create_sink(endpoint: &EndpointConfig) -> crate::Result<Arc<dyn DocumentSink>> {
    let sink: Arc<dyn DocumentSink> = match endpoint.endpoint_type {
        EndpointType::Solrcloud => Arc::new(solr::SolrCloudSink::new(endpoint)?),
        EndpointType::Pipeline => Arc::new(pipeline::HttpPipelineSink::new(endpoint)?),
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_transport_is_transient() {
        let err = SinkError::transport(TransportErrorKind::ConnectionRefused, "refused");
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "transport error (connection refused): refused");
    }

    #[test]
    fn test_rejected_is_fatal() {
        let err = SinkError::Rejected {
            status: 400,
            body: "bad doc".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_root_cause_io_error_is_transient() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let wrapped: anyhow::Result<()> = Err(io_err).context("sending batch");
        let err = SinkError::from(wrapped.unwrap_err().context("worker 3"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_other_io_kind_is_fatal() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = SinkError::Other(anyhow::Error::new(io_err));
        assert!(!err.is_transient());

        let err = SinkError::Other(anyhow::anyhow!("schema mismatch"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_create_pipeline_sink() {
        let endpoint = EndpointConfig::default();
        let sink = create_sink(&endpoint).unwrap();
        assert_eq!(sink.name(), "pipeline");
    }

    #[test]
    fn test_create_solr_sink_requires_urls() {
        let endpoint = EndpointConfig {
            endpoint_type: EndpointType::Solrcloud,
            ..EndpointConfig::default()
        };
        assert!(create_sink(&endpoint).is_err());
    }
}
