//! Datastore search router (spec.md §4.G): multiplexes logical queries onto
//! multi-search calls per cluster, enforcing deadlines and tracking metrics.

pub mod search_router;
pub mod tracker;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use search_router::{DatastoreClient, RoutedQuery, SearchRouter};
pub use tracker::QueryDetailsTracker;
