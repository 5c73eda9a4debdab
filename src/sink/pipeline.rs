//! HTTP ingestion pipeline sink
//!
//! POSTs each batch as a JSON array to the pipeline endpoint. The pipeline
//! owns commits, so `commit` does nothing.

use super::http::HttpTransport;
use super::{DocumentSink, SinkError};
use crate::config::EndpointConfig;
use crate::document::{batch_to_json, Document};
use tracing::debug;

pub struct HttpPipelineSink {
    url: String,
    transport: HttpTransport,
}

impl HttpPipelineSink {
    pub fn new(endpoint: &EndpointConfig) -> crate::Result<Self> {
        Ok(Self {
            url: endpoint.resolved_pipeline_url(),
            transport: HttpTransport::new(endpoint.request_timeout())?,
        })
    }

    #[cfg(test)]
    fn url(&self) -> &str {
        &self.url
    }
}

impl DocumentSink for HttpPipelineSink {
    fn name(&self) -> &str {
        "pipeline"
    }

    fn send(&self, batch: &[Document]) -> Result<(), SinkError> {
        debug!("Sending {} docs to {}", batch.len(), self.url);
        self.transport.post_json(&self.url, &batch_to_json(batch))
    }

    fn commit(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
