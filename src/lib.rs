// Ledger Feeder - Core Library
// Streams flat ERP ledger exports (document headers + line items) into a
// property graph: one vertex per record, edges for parent/child linkage
// and cross-period clearing references

pub mod errors;
pub mod fields;
pub mod keys;
pub mod loader;
pub mod orient;
pub mod resolver;
pub mod store;
pub mod walker;

// Re-export commonly used types
pub use errors::{FeedError, StoreError};
pub use fields::{project, Coercion, FieldRule, FieldSpec, FieldValue, RawRecord};
pub use keys::{DocumentKey, PositionKey, CLEARING_NONE};
pub use loader::{
    GraphLoader, LoadReport, Progress, EDGE_CHILDREN, EDGE_CLEARING, EDGE_PARENT,
    VERTEX_DOCUMENT, VERTEX_POSITION,
};
pub use orient::{OrientConfig, OrientRest};
pub use resolver::{CacheStats, ResolverCache, DEFAULT_CACHE_SIZE};
pub use store::{Attributes, GraphStore, MemoryGraph, StoredEdge, StoredVertex, VertexId};
pub use walker::{AdmittedLine, PartitionWalker, Shard, Window};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
