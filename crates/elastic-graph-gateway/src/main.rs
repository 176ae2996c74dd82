//! Gateway binary entry point: loads configuration, initializes tracing,
//! wires the datastore client and GraphQL engine into a `QueryExecutor`, and
//! serves it over `axum` (spec.md §4.I, §6; SPEC_FULL.md §0, §1.2, §1.3).

use std::sync::Arc;

use elastic_graph_core::executor::HeaderClientResolver;
use elastic_graph_core::schema::SchemaModel;
use elastic_graph_core::schema_element_names::SchemaElementNames;
use elastic_graph_core::QueryExecutor;
use tracing_subscriber::EnvFilter;

use elastic_graph_gateway::config::{GatewayConfiguration, LogFormat};
use elastic_graph_gateway::datastore_client::ReqwestDatastoreClient;
use elastic_graph_gateway::engine::GatewayEngine;
use elastic_graph_gateway::http_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "elastic-graph.yaml".to_string());
    let config = GatewayConfiguration::from_file(&config_path)?;

    init_tracing(&config);

    // A production boot loads the schema model from generated artifacts
    // (spec.md §1 keeps that pipeline out of scope); an empty builder stands
    // in for "no user-defined types registered yet".
    let schema = Arc::new(SchemaModel::builder().build());
    let schema_element_names = Arc::new(SchemaElementNames::snake_case());

    let datastore_client = ReqwestDatastoreClient::new(&config.datastore);
    let search_router = Arc::new(elastic_graph_core::router::SearchRouter::new(datastore_client));

    let engine = GatewayEngine::new(config.datastore.default_page_size, config.datastore.max_page_size);

    let executor = Arc::new(
        QueryExecutor::new(
            Arc::clone(&schema),
            Arc::clone(&schema_element_names),
            Arc::clone(&search_router),
            engine,
            config.http.max_request_timeout_ms,
            config.query.slow_query_threshold_ms,
        )
        .with_client_resolver(HeaderClientResolver::new(config.client_identity.header_name.clone())),
    );

    let app = http_app::build_app(executor);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http.port)).await?;
    tracing::info!(port = config.http.port, "elastic-graph-gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(config: &GatewayConfiguration) {
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
    }
}
