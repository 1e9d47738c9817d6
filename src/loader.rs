// ⚙️ Graph loader - the two-pass transform-and-load state machine
// Headers fully before positions; decode/projection/vertex failures are
// fatal, the whole edge phase is tolerant (reported, counted, continue)

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::warn;

use crate::fields::{project, FieldSpec, FieldValue, RawRecord};
use crate::keys::{DocumentKey, PositionKey};
use crate::resolver::{CacheStats, ResolverCache};
use crate::store::{Attributes, GraphStore, VertexId};
use crate::walker::{AdmittedLine, PartitionWalker, Shard, Window};

// ============================================================================
// GRAPH SCHEMA TAGS
// ============================================================================

pub const VERTEX_DOCUMENT: &str = "Document";
pub const VERTEX_POSITION: &str = "Position";

/// Position → its own header
pub const EDGE_PARENT: &str = "EParent";
/// Header → position, inverse of EParent, always created together
pub const EDGE_CHILDREN: &str = "EChildren";
/// Position → header of a different document that cleared it
pub const EDGE_CLEARING: &str = "EClearing";

// ============================================================================
// PROGRESS & REPORT
// ============================================================================

/// Stdout progress cadence: a dot every `dot_every` admitted lines, a
/// running count every `count_every`.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub dot_every: u64,
    pub count_every: u64,
}

impl Progress {
    pub const DOCUMENTS: Progress = Progress {
        dot_every: 1_000,
        count_every: 80_000,
    };

    pub const POSITIONS: Progress = Progress {
        dot_every: 500,
        count_every: 40_000,
    };

    fn tick(&self, admitted: u64) {
        if admitted % self.count_every == 0 {
            println!(" {}", admitted);
        } else if admitted % self.dot_every == 0 {
            print!(".");
            let _ = std::io::stdout().flush();
        }
    }
}

/// Outcome of one load pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadReport {
    /// Lines consumed from the source, admitted or not
    pub lines_read: u64,
    /// Vertices created (one per admitted line)
    pub records_loaded: u64,
    pub edges_created: u64,
    /// Edge commands the store refused; the run continued
    pub edge_failures: u64,
    /// Natural keys that resolved to no vertex; the affected edges were
    /// skipped and the run continued
    pub unresolved_keys: u64,
}

impl LoadReport {
    pub fn summary(&self) -> String {
        format!(
            "records read: {}, loaded: {}, edges created: {}, edge failures: {}, unresolved keys: {}",
            self.lines_read,
            self.records_loaded,
            self.edges_created,
            self.edge_failures,
            self.unresolved_keys
        )
    }
}

#[derive(Debug, Default)]
struct EdgeOutcome {
    created: u64,
    failed: u64,
    unresolved: u64,
}

// ============================================================================
// LOADER
// ============================================================================

/// Orchestrates both load passes against one store connection.
///
/// The resolver cache spans passes, so positions loaded right after their
/// headers resolve without re-querying.
pub struct GraphLoader<'s, S: GraphStore> {
    store: &'s mut S,
    resolver: ResolverCache,
}

impl<'s, S: GraphStore> GraphLoader<'s, S> {
    pub fn new(store: &'s mut S, cache_size: usize) -> Self {
        GraphLoader {
            store,
            resolver: ResolverCache::new(VERTEX_DOCUMENT, cache_size),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.stats()
    }

    /// Header pass: one Document vertex per admitted line, no edges.
    ///
    /// Any failure here aborts the run with the failing line's ordinal and
    /// content - a malformed header signals a systemic upstream problem.
    pub fn load_documents<R: BufRead>(
        &mut self,
        reader: R,
        shard: Shard,
        window: Window,
        progress: Option<Progress>,
    ) -> Result<LoadReport> {
        let spec = FieldSpec::document();
        let mut walker = PartitionWalker::new(reader, shard, window);
        let mut report = LoadReport::default();

        while let Some(item) = walker.next() {
            let line = item.context("failed reading header stream")?;

            self.load_document_line(&line.text, &spec)
                .with_context(|| fatal_line("header", &line))?;
            report.records_loaded += 1;

            if let Some(p) = progress {
                p.tick(walker.lines_admitted());
            }
        }

        report.lines_read = walker.lines_read();
        Ok(report)
    }

    /// Position pass: one Position vertex per admitted line, then the
    /// tolerant edge phase (EParent/EChildren, and EClearing when the
    /// clearing year is not the "0000" sentinel).
    pub fn load_positions<R: BufRead>(
        &mut self,
        reader: R,
        shard: Shard,
        window: Window,
        progress: Option<Progress>,
    ) -> Result<LoadReport> {
        let spec = FieldSpec::position();
        let mut walker = PartitionWalker::new(reader, shard, window);
        let mut report = LoadReport::default();

        while let Some(item) = walker.next() {
            let line = item.context("failed reading position stream")?;

            let outcome = self
                .load_position_line(&line, &spec)
                .with_context(|| fatal_line("position", &line))?;

            report.records_loaded += 1;
            report.edges_created += outcome.created;
            report.edge_failures += outcome.failed;
            report.unresolved_keys += outcome.unresolved;

            if let Some(p) = progress {
                p.tick(walker.lines_admitted());
            }
        }

        report.lines_read = walker.lines_read();
        Ok(report)
    }

    fn load_document_line(&mut self, text: &str, spec: &FieldSpec) -> Result<()> {
        let raw: RawRecord =
            serde_json::from_str(text).context("malformed JSON record")?;

        let key = DocumentKey::from_raw(&raw)?;
        let attrs = to_attributes(project(&raw, spec)?, &key.to_string());

        self.store.create_vertex(VERTEX_DOCUMENT, attrs)?;
        Ok(())
    }

    fn load_position_line(&mut self, line: &AdmittedLine, spec: &FieldSpec) -> Result<EdgeOutcome> {
        let raw: RawRecord =
            serde_json::from_str(&line.text).context("malformed JSON record")?;

        let key = PositionKey::from_raw(&raw)?;
        let attrs = to_attributes(project(&raw, spec)?, &key.to_string());

        let position_id = self.store.create_vertex(VERTEX_POSITION, attrs)?;
        Ok(self.link_position(&position_id, &raw, line.ordinal))
    }

    /// The edge phase. Every failure in here - unresolved parent key
    /// included - is reported, counted and skipped; the run continues.
    fn link_position(
        &mut self,
        position_id: &VertexId,
        raw: &RawRecord,
        ordinal: u64,
    ) -> EdgeOutcome {
        let mut outcome = EdgeOutcome::default();

        match DocumentKey::from_raw(raw) {
            Ok(parent_key) => {
                let parent_key = parent_key.to_string();
                match self.resolver.resolve(&mut *self.store, &parent_key) {
                    Ok(document_id) => {
                        self.try_edge(EDGE_PARENT, position_id, &document_id, ordinal, &mut outcome);
                        self.try_edge(EDGE_CHILDREN, &document_id, position_id, ordinal, &mut outcome);
                    }
                    Err(e) => {
                        outcome.unresolved += 1;
                        warn!(
                            line = ordinal,
                            key = %parent_key,
                            error = %e,
                            "parent document did not resolve; skipping EParent/EChildren"
                        );
                    }
                }
            }
            Err(e) => {
                outcome.failed += 1;
                warn!(line = ordinal, error = %e, "cannot derive parent key; skipping edges");
            }
        }

        match DocumentKey::clearing_from_raw(raw) {
            Ok(None) => {} // "0000": not cleared, no EClearing
            Ok(Some(clearing_key)) => {
                let clearing_key = clearing_key.to_string();
                match self.resolver.resolve(&mut *self.store, &clearing_key) {
                    Ok(clearing_id) => {
                        self.try_edge(EDGE_CLEARING, position_id, &clearing_id, ordinal, &mut outcome);
                    }
                    Err(e) => {
                        outcome.unresolved += 1;
                        warn!(
                            line = ordinal,
                            key = %clearing_key,
                            error = %e,
                            "clearing document did not resolve; skipping EClearing"
                        );
                    }
                }
            }
            Err(e) => {
                outcome.failed += 1;
                warn!(line = ordinal, error = %e, "cannot derive clearing key; skipping EClearing");
            }
        }

        outcome
    }

    fn try_edge(
        &mut self,
        edge_tag: &str,
        from: &VertexId,
        to: &VertexId,
        ordinal: u64,
        outcome: &mut EdgeOutcome,
    ) {
        match self.store.create_edge(edge_tag, from, to) {
            Ok(()) => outcome.created += 1,
            Err(e) => {
                outcome.failed += 1;
                warn!(
                    line = ordinal,
                    edge = edge_tag,
                    from = %from,
                    to = %to,
                    error = %e,
                    "edge creation failed; continuing"
                );
            }
        }
    }
}

fn to_attributes(projected: Vec<(&'static str, FieldValue)>, key: &str) -> Attributes {
    let mut attrs = Attributes::new();
    for (name, value) in &projected {
        attrs.insert(name.to_string(), value.to_json());
    }
    attrs.insert("key".to_string(), serde_json::Value::String(key.to_string()));
    attrs
}

fn fatal_line(stream: &str, line: &AdmittedLine) -> String {
    format!("{} line {}: {}", stream, line.ordinal, line.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::store::MemoryGraph;
    use std::io::Cursor;

    const HEADER_2023_100: &str = r#"{"GJAHR":"2023","BELNR":"100","BLART":"SA","BUDAT":"20230115","BLDAT":"20230114"}"#;
    const HEADER_2022_555: &str = r#"{"GJAHR":"2022","BELNR":"555","BLART":"KR","BUDAT":"20220301","BLDAT":"20220228"}"#;
    const POSITION_UNCLEARED: &str = r#"{"GJAHR":"2023","BELNR":"100","BUZEI":"001","HKONT":"0000400000","SHKZG":"S","DMBTR":"1234.56","AUGGJ":"0000","AUGBL":"000000000"}"#;
    const POSITION_CLEARED: &str = r#"{"GJAHR":"2023","BELNR":"100","BUZEI":"002","HKONT":"0000170000","SHKZG":"H","DMBTR":"1234.56","AUGGJ":"2022","AUGBL":"555"}"#;

    fn load_all(graph: &mut MemoryGraph, headers: &str, positions: &str) -> (LoadReport, LoadReport) {
        let mut loader = GraphLoader::new(graph, 1024);
        let docs = loader
            .load_documents(Cursor::new(headers.to_string()), Shard::default(), Window::default(), None)
            .unwrap();
        let positions = loader
            .load_positions(Cursor::new(positions.to_string()), Shard::default(), Window::default(), None)
            .unwrap();
        (docs, positions)
    }

    #[test]
    fn test_header_pass_creates_document_vertices() {
        let mut graph = MemoryGraph::new();
        let mut loader = GraphLoader::new(&mut graph, 16);

        let report = loader
            .load_documents(
                Cursor::new(format!("{}\n", HEADER_2023_100)),
                Shard::default(),
                Window::default(),
                None,
            )
            .unwrap();
        drop(loader);

        assert_eq!(report.records_loaded, 1);
        assert_eq!(report.lines_read, 1);

        let vertex = &graph.vertices()[0];
        assert_eq!(vertex.type_tag, VERTEX_DOCUMENT);
        assert_eq!(vertex.attributes["key"], serde_json::json!("2023-100"));
        assert_eq!(vertex.attributes["fiscalYear"], serde_json::json!(2023));
        assert_eq!(vertex.attributes["postingDate"], serde_json::json!("2023-01-15"));
        assert_eq!(vertex.attributes["documentDate"], serde_json::json!("2023-01-14"));
    }

    #[test]
    fn test_malformed_header_line_is_fatal_with_context() {
        let mut graph = MemoryGraph::new();
        let mut loader = GraphLoader::new(&mut graph, 16);

        let result = loader.load_documents(
            Cursor::new("this is not json\n".to_string()),
            Shard::default(),
            Window::default(),
            None,
        );

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("header line 0"), "got: {}", message);
    }

    #[test]
    fn test_uncleared_position_gets_exactly_parent_and_children_edges() {
        let mut graph = MemoryGraph::new();
        let (_, report) = load_all(
            &mut graph,
            &format!("{}\n", HEADER_2023_100),
            &format!("{}\n", POSITION_UNCLEARED),
        );

        assert_eq!(report.records_loaded, 1);
        assert_eq!(report.edges_created, 2);
        assert_eq!(report.edge_failures, 0);
        assert_eq!(report.unresolved_keys, 0);

        assert_eq!(graph.edges_tagged(EDGE_PARENT).len(), 1);
        assert_eq!(graph.edges_tagged(EDGE_CHILDREN).len(), 1);
        assert_eq!(graph.edges_tagged(EDGE_CLEARING).len(), 0);

        // EParent runs Position → Document, EChildren the inverse
        let position = &graph.vertices()[1];
        assert_eq!(position.type_tag, VERTEX_POSITION);
        assert_eq!(position.attributes["key"], serde_json::json!("2023-100-001"));
        assert_eq!(
            position.attributes["amountLocalCurrency"],
            serde_json::json!("1234.56")
        );

        let parent = graph.edges_tagged(EDGE_PARENT)[0];
        let children = graph.edges_tagged(EDGE_CHILDREN)[0];
        assert_eq!(parent.from, position.id);
        assert_eq!(parent.to, graph.vertices()[0].id);
        assert_eq!(children.from, graph.vertices()[0].id);
        assert_eq!(children.to, position.id);
    }

    #[test]
    fn test_cleared_position_gets_one_clearing_edge() {
        let mut graph = MemoryGraph::new();
        let (_, report) = load_all(
            &mut graph,
            &format!("{}\n{}\n", HEADER_2023_100, HEADER_2022_555),
            &format!("{}\n", POSITION_CLEARED),
        );

        assert_eq!(report.edges_created, 3);
        assert_eq!(report.unresolved_keys, 0);

        let clearing = graph.edges_tagged(EDGE_CLEARING);
        assert_eq!(clearing.len(), 1);

        // The clearing edge points at the OTHER document, 2022-555
        let position = &graph.vertices()[2];
        let cleared_doc = &graph.vertices()[1];
        assert_eq!(cleared_doc.attributes["key"], serde_json::json!("2022-555"));
        assert_eq!(clearing[0].from, position.id);
        assert_eq!(clearing[0].to, cleared_doc.id);
    }

    #[test]
    fn test_unresolved_parent_is_reported_not_fatal() {
        // No header pass at all: the position's document was never created
        let mut graph = MemoryGraph::new();
        let mut loader = GraphLoader::new(&mut graph, 16);

        let report = loader
            .load_positions(
                Cursor::new(format!("{}\n", POSITION_UNCLEARED)),
                Shard::default(),
                Window::default(),
                None,
            )
            .unwrap();
        drop(loader);

        assert_eq!(report.records_loaded, 1);
        assert_eq!(report.edges_created, 0);
        assert_eq!(report.unresolved_keys, 1);

        // The position vertex itself was still created
        assert_eq!(graph.vertices().len(), 1);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_resolver_cache_spans_positions_of_one_document() {
        let mut graph = MemoryGraph::new();
        let positions = format!(
            "{}\n{}\n",
            POSITION_UNCLEARED,
            POSITION_UNCLEARED.replace("\"001\"", "\"003\"")
        );
        let (_, report) = load_all(&mut graph, &format!("{}\n", HEADER_2023_100), &positions);

        assert_eq!(report.records_loaded, 2);
        assert_eq!(report.edges_created, 4);
        // Both positions share the parent key: one store query, one cache hit
        assert_eq!(graph.query_count(), 1);
    }

    #[test]
    fn test_shard_filter_applies_to_position_stream() {
        let mut graph = MemoryGraph::new();
        let mut loader = GraphLoader::new(&mut graph, 16);
        loader
            .load_documents(
                Cursor::new(format!("{}\n", HEADER_2023_100)),
                Shard::default(),
                Window::default(),
                None,
            )
            .unwrap();

        let positions = format!(
            "{}\n{}\n",
            POSITION_UNCLEARED,
            POSITION_UNCLEARED.replace("\"001\"", "\"002\"")
        );
        let report = loader
            .load_positions(
                Cursor::new(positions),
                Shard::new(1, 2).unwrap(),
                Window::default(),
                None,
            )
            .unwrap();
        drop(loader);

        // Only ordinal 1 admitted
        assert_eq!(report.lines_read, 2);
        assert_eq!(report.records_loaded, 1);
        assert_eq!(graph.vertices()[1].attributes["key"], serde_json::json!("2023-100-002"));
    }

    // Store double whose edge commands always fail, for the tolerant path
    struct EdgeRejectingStore(MemoryGraph);

    impl GraphStore for EdgeRejectingStore {
        fn create_vertex(
            &mut self,
            type_tag: &str,
            attributes: Attributes,
        ) -> Result<VertexId, StoreError> {
            self.0.create_vertex(type_tag, attributes)
        }

        fn create_edge(
            &mut self,
            edge_tag: &str,
            _from: &VertexId,
            _to: &VertexId,
        ) -> Result<(), StoreError> {
            Err(StoreError::Rejected(format!("edge class {} unavailable", edge_tag)))
        }

        fn lookup_by_key(&mut self, type_tag: &str, key: &str)
            -> Result<Vec<VertexId>, StoreError> {
            self.0.lookup_by_key(type_tag, key)
        }

        fn close(&mut self) -> Result<(), StoreError> {
            self.0.close()
        }
    }

    #[test]
    fn test_edge_command_failures_are_counted_and_tolerated() {
        let mut store = EdgeRejectingStore(MemoryGraph::new());
        let mut loader = GraphLoader::new(&mut store, 16);

        loader
            .load_documents(
                Cursor::new(format!("{}\n", HEADER_2023_100)),
                Shard::default(),
                Window::default(),
                None,
            )
            .unwrap();

        let report = loader
            .load_positions(
                Cursor::new(format!("{}\n", POSITION_UNCLEARED)),
                Shard::default(),
                Window::default(),
                None,
            )
            .unwrap();

        // Both EParent and EChildren were refused, line still counted
        assert_eq!(report.records_loaded, 1);
        assert_eq!(report.edges_created, 0);
        assert_eq!(report.edge_failures, 2);
    }

    #[test]
    fn test_malformed_position_vertex_is_fatal() {
        let mut graph = MemoryGraph::new();
        let mut loader = GraphLoader::new(&mut graph, 16);

        // DMBTR is not a decimal: projection fails before vertex creation
        let bad = POSITION_UNCLEARED.replace("1234.56", "12,34");
        let result = loader.load_positions(
            Cursor::new(format!("{}\n", bad)),
            Shard::default(),
            Window::default(),
            None,
        );

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("position line 0"), "got: {}", message);
    }
}
