// 🗄️ Graph store boundary - the opaque collaborator interface
// The pipeline only needs three semantics: typed vertex creation, typed
// directed edges between known vertices, and exact-match key lookup.
// Statement syntax belongs to the implementation, not to this contract.

use std::collections::HashMap;
use std::fmt;

use crate::errors::StoreError;

/// Attribute payload of a vertex, as sent to the store.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Graph-internal record identifier (OrientDB-style, e.g. `#12:0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexId(pub String);

impl VertexId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// The external graph store, reduced to what the load pipeline needs.
pub trait GraphStore {
    /// Create one vertex of the given type; the store assigns the id.
    fn create_vertex(&mut self, type_tag: &str, attributes: Attributes)
        -> Result<VertexId, StoreError>;

    /// Create one typed directed edge between two known vertices.
    fn create_edge(&mut self, edge_tag: &str, from: &VertexId, to: &VertexId)
        -> Result<(), StoreError>;

    /// Point lookup: all vertices of `type_tag` whose `key` attribute
    /// equals `key`, in store order.
    fn lookup_by_key(&mut self, type_tag: &str, key: &str)
        -> Result<Vec<VertexId>, StoreError>;

    /// Release the connection. Safe to call once at end of run.
    fn close(&mut self) -> Result<(), StoreError>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// A vertex as retained by [`MemoryGraph`].
#[derive(Debug, Clone)]
pub struct StoredVertex {
    pub id: VertexId,
    pub type_tag: String,
    pub attributes: Attributes,
}

/// An edge as retained by [`MemoryGraph`].
#[derive(Debug, Clone)]
pub struct StoredEdge {
    pub edge_tag: String,
    pub from: VertexId,
    pub to: VertexId,
}

/// In-memory [`GraphStore`]: the test double, and the `--dry-run` backend.
///
/// Keeps an inverted index from `(type_tag, key)` to vertex ids so key
/// lookups behave like an indexed store, and counts queries so tests can
/// assert the resolver's memoization.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    vertices: Vec<StoredVertex>,
    edges: Vec<StoredEdge>,
    key_index: HashMap<(String, String), Vec<VertexId>>,
    queries: u64,
}

impl MemoryGraph {
    pub fn new() -> Self {
        MemoryGraph::default()
    }

    pub fn vertices(&self) -> &[StoredVertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[StoredEdge] {
        &self.edges
    }

    /// All edges with the given tag, in creation order.
    pub fn edges_tagged(&self, edge_tag: &str) -> Vec<&StoredEdge> {
        self.edges
            .iter()
            .filter(|e| e.edge_tag == edge_tag)
            .collect()
    }

    pub fn vertex(&self, id: &VertexId) -> Option<&StoredVertex> {
        self.vertices.iter().find(|v| &v.id == id)
    }

    /// Number of key lookups issued against this store.
    pub fn query_count(&self) -> u64 {
        self.queries
    }
}

impl GraphStore for MemoryGraph {
    fn create_vertex(
        &mut self,
        type_tag: &str,
        attributes: Attributes,
    ) -> Result<VertexId, StoreError> {
        let id = VertexId(format!("#0:{}", self.vertices.len()));

        if let Some(serde_json::Value::String(key)) = attributes.get("key") {
            self.key_index
                .entry((type_tag.to_string(), key.clone()))
                .or_default()
                .push(id.clone());
        }

        self.vertices.push(StoredVertex {
            id: id.clone(),
            type_tag: type_tag.to_string(),
            attributes,
        });

        Ok(id)
    }

    fn create_edge(
        &mut self,
        edge_tag: &str,
        from: &VertexId,
        to: &VertexId,
    ) -> Result<(), StoreError> {
        for endpoint in [from, to] {
            if self.vertex(endpoint).is_none() {
                return Err(StoreError::Rejected(format!(
                    "create edge {}: unknown vertex {}",
                    edge_tag, endpoint
                )));
            }
        }

        self.edges.push(StoredEdge {
            edge_tag: edge_tag.to_string(),
            from: from.clone(),
            to: to.clone(),
        });

        Ok(())
    }

    fn lookup_by_key(&mut self, type_tag: &str, key: &str)
        -> Result<Vec<VertexId>, StoreError> {
        self.queries += 1;

        Ok(self
            .key_index
            .get(&(type_tag.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
