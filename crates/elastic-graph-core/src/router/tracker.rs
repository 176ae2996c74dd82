//! `QueryDetailsTracker` (spec.md §4.I, §5): accumulates the metrics the
//! executor logs at the end of a request. Shared across concurrently
//! executing field resolvers, so every mutation goes through a mutex
//! (spec.md §5: "the tracker is explicitly shared... and must serialize all
//! mutations").

use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct TrackerState {
    datastore_request_count: u64,
    datastore_query_count: u64,
    server_duration_ms: u64,
    client_duration_ms: u64,
    shard_routing_values: BTreeSet<String>,
    search_index_expressions: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct QueryDetailsTracker {
    state: Mutex<TrackerState>,
}

impl QueryDetailsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one multi-search batch sent to a single cluster: the
    /// datastore's own reported duration (`took`, summed across inner
    /// responses) and the caller-observed wall-clock duration, plus which
    /// indices and shard-routing values were touched (spec.md §4.G step 3e).
    pub fn record_batch(
        &self,
        query_count: usize,
        server_duration_ms: u64,
        client_duration_ms: u64,
        search_index_expressions: impl IntoIterator<Item = String>,
        shard_routing_values: impl IntoIterator<Item = String>,
    ) {
        let mut state = self.state.lock().expect("tracker mutex is never poisoned by a panicking holder");
        state.datastore_request_count += 1;
        state.datastore_query_count += query_count as u64;
        state.server_duration_ms += server_duration_ms;
        state.client_duration_ms += client_duration_ms;
        state.search_index_expressions.extend(search_index_expressions);
        state.shard_routing_values.extend(shard_routing_values);
    }

    pub fn datastore_request_count(&self) -> u64 {
        self.state.lock().unwrap().datastore_request_count
    }

    pub fn datastore_query_count(&self) -> u64 {
        self.state.lock().unwrap().datastore_query_count
    }

    /// `overhead_ms` (spec.md §4.I) is the gap between total query duration
    /// and the datastore's own reported time: GraphQL engine overhead plus
    /// network latency not attributable to the datastore itself.
    pub fn overhead_ms(&self, total_duration_ms: u64) -> u64 {
        total_duration_ms.saturating_sub(self.client_duration_ms())
    }

    pub fn server_duration_ms(&self) -> u64 {
        self.state.lock().unwrap().server_duration_ms
    }

    pub fn client_duration_ms(&self) -> u64 {
        self.state.lock().unwrap().client_duration_ms
    }

    pub fn unique_search_index_expressions(&self) -> Vec<String> {
        self.state.lock().unwrap().search_index_expressions.iter().cloned().collect()
    }

    pub fn unique_shard_routing_values(&self) -> Vec<String> {
        self.state.lock().unwrap().shard_routing_values.iter().cloned().collect()
    }

    pub fn unique_shard_routing_values_joined(&self) -> String {
        self.unique_shard_routing_values().join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_duration_is_at_least_server_duration_after_recording() {
        let tracker = QueryDetailsTracker::new();
        tracker.record_batch(2, 40, 55, ["widgets".to_string()], ["shard-a".to_string()]);
        assert!(tracker.client_duration_ms() >= tracker.server_duration_ms());
        assert_eq!(tracker.datastore_request_count(), 1);
        assert_eq!(tracker.datastore_query_count(), 2);
    }

    #[test]
    fn records_accumulate_across_multiple_batches() {
        let tracker = QueryDetailsTracker::new();
        tracker.record_batch(1, 10, 12, ["widgets".to_string()], []);
        tracker.record_batch(1, 5, 7, ["manufacturers".to_string()], []);
        assert_eq!(tracker.datastore_request_count(), 2);
        assert_eq!(tracker.datastore_query_count(), 2);
        assert_eq!(tracker.server_duration_ms(), 15);
        assert_eq!(tracker.unique_search_index_expressions().len(), 2);
    }
}
