//! Concrete stage actions and the external service contracts they call.
//!
//! The managed services (schema catalog, batch transform jobs, query
//! engine, object storage) are collaborators: each is an async trait here,
//! with in-memory fakes in [`crate::testing`] and mockall mocks in tests.

mod clients;
mod crawler;
mod query;
mod transform;

pub use clients::{
    CatalogClient, CrawlOutcome, CrawlerSnapshot, CrawlerState, JobClient, JobRunState,
    ObjectStore, QueryClient, QueryRequest, QueryState,
};
pub use crawler::CrawlerAction;
pub use query::{
    render_query_template, QueryAction, CUSTOM_PRESIGNED_URL_TTL, CUSTOM_RESULTS_PREFIX,
    EXECUTION_ID_KEY, PRESIGNED_URL_TTL, RESULTS_PREFIX,
};
pub use transform::{TransformJobAction, TransformTarget, RUN_ID_KEY};

#[cfg(test)]
pub use clients::{MockCatalogClient, MockJobClient, MockObjectStore, MockQueryClient};
