//! Clustered backend sink
//!
//! Batches go to `{node}/solr/{collection}/update` as a JSON array, with
//! nodes picked round-robin so load spreads across the cluster.

use super::http::HttpTransport;
use super::{DocumentSink, SinkError};
use crate::config::{ConfigError, EndpointConfig};
use crate::document::{batch_to_json, Document};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

pub struct SolrCloudSink {
    update_urls: Vec<String>,
    next_node: AtomicUsize,
    transport: HttpTransport,
}

impl SolrCloudSink {
    pub fn new(endpoint: &EndpointConfig) -> crate::Result<Self> {
        let update_urls: Vec<String> = endpoint
            .solr_urls
            .iter()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .map(|base| update_url(base, &endpoint.collection))
            .collect();
        if update_urls.is_empty() {
            return Err(ConfigError::MissingParameter("solr_urls".to_string()).into());
        }

        Ok(Self {
            update_urls,
            next_node: AtomicUsize::new(0),
            transport: HttpTransport::new(endpoint.request_timeout())?,
        })
    }

    /// Update URLs, one per node
    #[cfg(test)]
    fn update_urls(&self) -> &[String] {
        &self.update_urls
    }

    fn pick_node(&self) -> &str {
        let index = self.next_node.fetch_add(1, Ordering::Relaxed) % self.update_urls.len();
        &self.update_urls[index]
    }
}

fn update_url(base: &str, collection: &str) -> String {
    format!("{}/solr/{}/update", base, collection)
}

impl DocumentSink for SolrCloudSink {
    fn name(&self) -> &str {
        "solrcloud"
    }

    fn send(&self, batch: &[Document]) -> Result<(), SinkError> {
        let url = self.pick_node();
        debug!("Sending {} docs to {}", batch.len(), url);
        self.transport.post_json(url, &batch_to_json(batch))
    }

    fn commit(&self) -> Result<(), SinkError> {
        let url = format!("{}?commit=true", self.pick_node());
        self.transport.post_json(&url, &serde_json::json!([]))
    }
}
