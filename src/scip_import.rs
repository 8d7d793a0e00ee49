//! SCIP artifact importer
//!
//! Parses the binary index artifact produced by a per-language indexer and
//! populates the graph store with FILE/CLASS/FUNCTION nodes and
//! CONTAINS/CALLS/REFERENCES edges, scoped to one (repo_id, language).
//!
//! Upstream indexers are imperfect: duplicate symbols (decorators, macros,
//! generated init functions) and occurrences of symbols that were never
//! defined in scope are expected. Both are tolerated -- dedup keeps the
//! first-seen symbol, unresolved edges are dropped -- and each case is
//! recorded as a warning, never an import failure.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use protobuf::Message;
use scip::types::symbol_information::Kind;
use scip::types::{Index, Occurrence};
use serde::Serialize;

use crate::error_codes;
use crate::graph::{
    node_id_for, EdgeType, GraphEdge, GraphNode, GraphStore, IndexRecord, NodeType,
};
use crate::language::Language;

/// Cap on recorded warnings; past this they are counted, not stored.
const MAX_WARNINGS: usize = 200;

/// Outcome of one artifact import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub nodes_created: usize,
    pub edges_created: usize,
    pub warnings: Vec<String>,
    /// Warnings beyond the storage cap.
    pub warnings_suppressed: usize,
    /// Set when the import aborted without touching the store.
    pub fatal_error: Option<String>,
    pub file_count: usize,
    pub function_count: usize,
    pub class_count: usize,
}

impl ImportResult {
    fn fatal(message: String) -> Self {
        Self {
            nodes_created: 0,
            edges_created: 0,
            warnings: Vec::new(),
            warnings_suppressed: 0,
            fatal_error: Some(message),
            file_count: 0,
            function_count: 0,
            class_count: 0,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal_error.is_some()
    }
}

struct Warnings {
    stored: Vec<String>,
    suppressed: usize,
}

impl Warnings {
    fn new() -> Self {
        Self {
            stored: Vec::new(),
            suppressed: 0,
        }
    }

    fn push(&mut self, message: String) {
        if self.stored.len() < MAX_WARNINGS {
            self.stored.push(message);
        } else {
            self.suppressed += 1;
        }
    }
}

/// Import a SCIP index artifact into the store.
///
/// Replaces the prior node/edge set for (repo_id, language) atomically: a
/// fatal error (unreadable artifact, store write failure) leaves the prior
/// scope and its IndexRecord untouched.
///
/// # Arguments
/// * `store` - Graph store to populate
/// * `artifact` - Path to the binary SCIP artifact
/// * `repo_id` - Repository scope for every node and edge
/// * `language` - Language scope
/// * `fingerprint` - Source-tree fingerprint recorded for staleness checks
pub fn import_index(
    store: &mut GraphStore,
    artifact: &Path,
    repo_id: &str,
    language: Language,
    fingerprint: &str,
) -> ImportResult {
    let bytes = match std::fs::read(artifact) {
        Ok(bytes) => bytes,
        Err(e) => {
            return ImportResult::fatal(format!(
                "[{}] cannot read artifact {}: {}",
                error_codes::SXT_IMP_001_ARTIFACT_UNREADABLE,
                artifact.display(),
                e
            ))
        }
    };
    let index = match Index::parse_from_bytes(&bytes) {
        Ok(index) => index,
        Err(e) => {
            return ImportResult::fatal(format!(
                "[{}] artifact {} is not valid SCIP protobuf: {}",
                error_codes::SXT_IMP_001_ARTIFACT_UNREADABLE,
                artifact.display(),
                e
            ))
        }
    };

    let mut warnings = Warnings::new();
    let (nodes, edges) = build_graph(&index, repo_id, language, &mut warnings);

    let file_count = count_type(&nodes, NodeType::File);
    let function_count = count_type(&nodes, NodeType::Function);
    let class_count = count_type(&nodes, NodeType::Class);

    let record = IndexRecord {
        repo_id: repo_id.to_string(),
        language: language.as_str().to_string(),
        last_indexed_at: chrono::Utc::now().timestamp(),
        fingerprint: fingerprint.to_string(),
        file_count,
        function_count,
        class_count,
    };

    if let Err(e) = store.replace_scope(repo_id, language.as_str(), &nodes, &edges, &record) {
        return ImportResult::fatal(format!(
            "[{}] graph write failed for {}/{}: {}",
            error_codes::SXT_DB_001_WRITE_FAILED,
            repo_id,
            language,
            e
        ));
    }

    ImportResult {
        nodes_created: nodes.len(),
        edges_created: edges.len(),
        warnings: warnings.stored,
        warnings_suppressed: warnings.suppressed,
        fatal_error: None,
        file_count,
        function_count,
        class_count,
    }
}

fn count_type(nodes: &[GraphNode], node_type: NodeType) -> usize {
    nodes.iter().filter(|n| n.node_type == node_type).count()
}

/// Definition site of a symbol within one document.
struct Definition {
    entity_id: String,
    node_id: String,
    is_function: bool,
    /// 1-indexed inclusive body range when the indexer emitted an
    /// enclosing_range; falls back to the name range.
    start_line: u32,
    end_line: u32,
}

fn build_graph(
    index: &Index,
    repo_id: &str,
    language: Language,
    warnings: &mut Warnings,
) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let lang = language.as_str();
    let mut nodes: Vec<GraphNode> = Vec::new();
    let mut by_entity: HashMap<String, usize> = HashMap::new();

    // Pass 1: file nodes plus symbol nodes, deduplicated first-seen.
    for doc in &index.documents {
        let file_entity = format!("file:{}", doc.relative_path);
        if !by_entity.contains_key(&file_entity) {
            let file_name = Path::new(&doc.relative_path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| doc.relative_path.clone());
            let mut node = GraphNode::new(repo_id, lang, &file_entity, NodeType::File, &file_name);
            node.file_path = Some(doc.relative_path.clone());
            by_entity.insert(file_entity.clone(), nodes.len());
            nodes.push(node);
        }

        let definition_ranges = definition_occurrences(&doc.occurrences);

        for info in &doc.symbols {
            if info.symbol.starts_with("local ") {
                continue;
            }
            let Some(node_type) = classify_kind(info.kind.enum_value_or_default()) else {
                continue;
            };
            if by_entity.contains_key(&info.symbol) {
                warnings.push(format!(
                    "[{}] duplicate symbol in scope, keeping first-seen: {}",
                    error_codes::SXT_IMP_002_DUPLICATE_SYMBOL,
                    info.symbol
                ));
                continue;
            }

            let name = if info.display_name.is_empty() {
                symbol_display_name(&info.symbol)
            } else {
                info.display_name.clone()
            };
            let mut node = GraphNode::new(repo_id, lang, &info.symbol, node_type, &name);
            node.file_path = Some(doc.relative_path.clone());
            if let Some((start, end)) = definition_ranges.get(&info.symbol) {
                node.line_start = Some(*start);
                node.line_end = Some(*end);
            }
            by_entity.insert(info.symbol.clone(), nodes.len());
            nodes.push(node);
        }
    }

    // Pass 2: edges, resolved strictly against the in-scope node set.
    let mut edges: BTreeSet<GraphEdge> = BTreeSet::new();

    for doc in &index.documents {
        let file_entity = format!("file:{}", doc.relative_path);
        let file_node_id = node_id_for(repo_id, &file_entity);
        let enclosing_functions = function_bodies(doc, &by_entity, &nodes);

        // Containment: file -> symbols defined in this document, and
        // enclosing class -> member when the indexer provided it.
        for info in &doc.symbols {
            let Some(&idx) = by_entity.get(&info.symbol) else {
                continue;
            };
            let symbol_node = &nodes[idx];
            // Dedup means a later document can list a symbol owned by an
            // earlier one; only the owning file gets the containment edge.
            if symbol_node.file_path.as_deref() != Some(doc.relative_path.as_str()) {
                continue;
            }
            edges.insert(edge(
                repo_id,
                lang,
                &file_node_id,
                &symbol_node.node_id,
                EdgeType::Contains,
            ));

            if !info.enclosing_symbol.is_empty() {
                match by_entity.get(&info.enclosing_symbol) {
                    Some(&parent_idx) => {
                        edges.insert(edge(
                            repo_id,
                            lang,
                            &nodes[parent_idx].node_id,
                            &symbol_node.node_id,
                            EdgeType::Contains,
                        ));
                    }
                    None => warnings.push(format!(
                        "[{}] dropped CONTAINS edge: enclosing symbol not in scope: {}",
                        error_codes::SXT_IMP_003_UNRESOLVED_EDGE,
                        info.enclosing_symbol
                    )),
                }
            }
        }

        // References and calls from non-definition occurrences.
        for occ in &doc.occurrences {
            if occ.symbol.starts_with("local ") || is_definition(occ) {
                continue;
            }
            let Some(&target_idx) = by_entity.get(&occ.symbol) else {
                warnings.push(format!(
                    "[{}] dropped edge: unresolved occurrence target: {}",
                    error_codes::SXT_IMP_003_UNRESOLVED_EDGE,
                    occ.symbol
                ));
                continue;
            };
            let target = &nodes[target_idx];

            let caller = if target.node_type == NodeType::Function {
                occurrence_line(occ).and_then(|line| {
                    smallest_enclosing_function(&enclosing_functions, line, &target.entity_id)
                })
            } else {
                None
            };

            match caller {
                Some(caller_node_id) => {
                    edges.insert(edge(
                        repo_id,
                        lang,
                        &caller_node_id,
                        &target.node_id,
                        EdgeType::Calls,
                    ));
                }
                None => {
                    edges.insert(edge(
                        repo_id,
                        lang,
                        &file_node_id,
                        &target.node_id,
                        EdgeType::References,
                    ));
                }
            }
        }
    }

    (nodes, edges.into_iter().collect())
}

fn edge(
    repo_id: &str,
    language: &str,
    source: &str,
    target: &str,
    edge_type: EdgeType,
) -> GraphEdge {
    GraphEdge {
        repo_id: repo_id.to_string(),
        language: language.to_string(),
        source_node_id: source.to_string(),
        target_node_id: target.to_string(),
        edge_type,
    }
}

/// Map SCIP symbol kinds onto the graph's node types.
///
/// Anything that is not function-like or type-like (variables, parameters,
/// packages) is deliberately not materialized as a node.
fn classify_kind(kind: Kind) -> Option<NodeType> {
    match kind {
        Kind::Class
        | Kind::Struct
        | Kind::Interface
        | Kind::Enum
        | Kind::Trait
        | Kind::Object => Some(NodeType::Class),
        Kind::Function | Kind::Method | Kind::Constructor | Kind::Macro => {
            Some(NodeType::Function)
        }
        _ => None,
    }
}

fn is_definition(occ: &Occurrence) -> bool {
    occ.symbol_roles & (scip::types::SymbolRole::Definition as i32) != 0
}

/// Map symbol -> 1-indexed definition line range within one document.
///
/// Prefers the indexer's enclosing_range (full body) over the name range.
fn definition_occurrences(occurrences: &[Occurrence]) -> HashMap<String, (u32, u32)> {
    let mut ranges = HashMap::new();
    for occ in occurrences {
        if !is_definition(occ) {
            continue;
        }
        let span = if occ.enclosing_range.is_empty() {
            parse_range(&occ.range)
        } else {
            parse_range(&occ.enclosing_range)
        };
        if let Some((start, end)) = span {
            ranges.entry(occ.symbol.clone()).or_insert((start, end));
        }
    }
    ranges
}

/// Function definitions with body ranges in one document, for attributing
/// call sites to their enclosing function.
fn function_bodies(
    doc: &scip::types::Document,
    by_entity: &HashMap<String, usize>,
    nodes: &[GraphNode],
) -> Vec<Definition> {
    let mut bodies = Vec::new();
    for occ in &doc.occurrences {
        if !is_definition(occ) || occ.enclosing_range.is_empty() {
            continue;
        }
        let Some(&idx) = by_entity.get(&occ.symbol) else {
            continue;
        };
        let node = &nodes[idx];
        let Some((start_line, end_line)) = parse_range(&occ.enclosing_range) else {
            continue;
        };
        bodies.push(Definition {
            entity_id: node.entity_id.clone(),
            node_id: node.node_id.clone(),
            is_function: node.node_type == NodeType::Function,
            start_line,
            end_line,
        });
    }
    bodies
}

/// The innermost function whose body contains `line`, excluding the callee
/// itself (a definition occurrence of a recursive call still counts).
fn smallest_enclosing_function(
    bodies: &[Definition],
    line: u32,
    callee_entity: &str,
) -> Option<String> {
    bodies
        .iter()
        .filter(|d| d.is_function && d.entity_id != callee_entity)
        .filter(|d| d.start_line <= line && line <= d.end_line)
        .min_by_key(|d| d.end_line - d.start_line)
        .map(|d| d.node_id.clone())
}

fn occurrence_line(occ: &Occurrence) -> Option<u32> {
    parse_range(&occ.range).map(|(start, _)| start)
}

/// Decode a SCIP range into a 1-indexed inclusive line span.
///
/// SCIP encodes `[startLine, startChar, endChar]` for single-line ranges and
/// `[startLine, startChar, endLine, endChar]` for multi-line ones, all
/// 0-indexed.
fn parse_range(range: &[i32]) -> Option<(u32, u32)> {
    match range.len() {
        3 => {
            let line = u32::try_from(range[0]).ok()? + 1;
            Some((line, line))
        }
        4 => {
            let start = u32::try_from(range[0]).ok()? + 1;
            let end = u32::try_from(range[2]).ok()? + 1;
            Some((start, end.max(start)))
        }
        _ => None,
    }
}

/// Human-readable name from a SCIP symbol string, for indexers that omit
/// display_name. Takes the trailing descriptor and strips its punctuation.
fn symbol_display_name(symbol: &str) -> String {
    // Class symbols end in '#', so the last split segment can be empty;
    // skip empty segments to land on the identifier itself.
    let last = symbol.split(' ').next_back().unwrap_or(symbol);
    let last = last.rsplit('/').find(|s| !s.is_empty()).unwrap_or(last);
    let last = last.rsplit('#').find(|s| !s.is_empty()).unwrap_or(last);
    let trimmed = last.trim_end_matches('.').trim_end_matches("()");
    let trimmed = trimmed.trim_end_matches('.');
    if trimmed.is_empty() {
        symbol.to_string()
    } else {
        trimmed.to_string()
    }
}
