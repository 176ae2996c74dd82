//! `reqwest`-backed implementation of `elastic_graph_core::router::DatastoreClient`
//! (SPEC_FULL.md §0: "`reqwest`/HTTP-client calls are behind a trait so the
//! crate stays testable without a live datastore" — this is the real side of
//! that trait, owned by the gateway binary).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use elastic_graph_core::router::DatastoreClient;
use serde_json::Value;

use crate::config::DatastoreConfig;

/// Trims the `_msearch` response to the fields the router and response
/// model actually read (spec.md §4.G step c, §6), cutting parse work on
/// large result sets.
const RESPONSE_FILTER_PATH: &str = "responses.hits.hits._*,responses.hits.total,responses.status,responses.error,responses._shards,responses.aggregations,responses.took,took";

struct ClusterEndpoint {
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

/// One `reqwest::Client` per process, reused across requests for connection
/// pooling (spec.md §5: "datastore clients are process-wide... they own HTTP
/// connection pools").
pub struct ReqwestDatastoreClient {
    http: reqwest::Client,
    clusters: HashMap<String, ClusterEndpoint>,
}

impl ReqwestDatastoreClient {
    pub fn new(config: &DatastoreConfig) -> Self {
        let clusters = config
            .clusters
            .iter()
            .map(|(name, cluster)| {
                (
                    name.clone(),
                    ClusterEndpoint {
                        base_url: cluster.url.trim_end_matches('/').to_string(),
                        username: cluster.username.clone(),
                        password: cluster.password(),
                    },
                )
            })
            .collect();
        ReqwestDatastoreClient {
            http: reqwest::Client::new(),
            clusters,
        }
    }
}

#[async_trait]
impl DatastoreClient for ReqwestDatastoreClient {
    async fn multi_search(
        &self,
        cluster: &str,
        body: String,
        timeout_ms: Option<u64>,
    ) -> std::io::Result<Value> {
        let endpoint = self.clusters.get(cluster).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no datastore cluster configured under the name `{cluster}`"),
            )
        })?;

        let mut request = self
            .http
            .post(format!("{}/_msearch", endpoint.base_url))
            .query(&[("filter_path", RESPONSE_FILTER_PATH)])
            .header("Content-Type", "application/x-ndjson")
            .body(body);
        if let Some(username) = &endpoint.username {
            request = request.basic_auth(username, endpoint.password.as_deref());
        }
        if let Some(timeout_ms) = timeout_ms {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }

        let response = request
            .send()
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        response
            .json::<Value>()
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
