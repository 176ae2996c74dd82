//! In-process mock datastore client (spec.md §1.4 ambient test tooling),
//! mirroring the teacher's preference for a fake collaborator over a live
//! service in unit and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::search_router::DatastoreClient;

/// Replies to every `multi_search` call with a canned response keyed by
/// cluster name, and records every request body it received for assertions.
#[derive(Default)]
pub struct MockDatastoreClient {
    responses: HashMap<String, Value>,
    received_bodies: Mutex<Vec<String>>,
}

impl MockDatastoreClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, cluster: impl Into<String>, response: Value) -> Self {
        self.responses.insert(cluster.into(), response);
        self
    }

    pub fn received_bodies(&self) -> Vec<String> {
        self.received_bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatastoreClient for MockDatastoreClient {
    async fn multi_search(
        &self,
        cluster: &str,
        body: String,
        _timeout_ms: Option<u64>,
    ) -> std::io::Result<Value> {
        self.received_bodies.lock().unwrap().push(body);
        Ok(self
            .responses
            .get(cluster)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({"responses": []})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_the_request_body_it_was_sent() {
        let client = MockDatastoreClient::new().with_response("main", serde_json::json!({"responses": []}));
        client.multi_search("main", "line1\nline2\n".to_string(), None).await.unwrap();
        assert_eq!(client.received_bodies(), vec!["line1\nline2\n".to_string()]);
    }
}
