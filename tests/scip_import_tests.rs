//! SCIP artifact import tests
//!
//! Builds small synthetic SCIP artifacts with the protobuf types directly,
//! then asserts on the nodes, edges, and warnings the importer produces.

use std::path::{Path, PathBuf};

use protobuf::Message;
use scip::types::symbol_information::Kind;
use scip::types::{Document, Index, Occurrence, SymbolInformation, SymbolRole};
use sextant::graph::{EdgeType, GraphStore, NodeType};
use sextant::scip_import::import_index;
use sextant::Language;
use tempfile::TempDir;

fn symbol(name: &str, kind: Kind, display_name: &str) -> SymbolInformation {
    let mut info = SymbolInformation::new();
    info.symbol = name.to_string();
    info.kind = protobuf::EnumOrUnknown::new(kind);
    info.display_name = display_name.to_string();
    info
}

fn definition(sym: &str, range: Vec<i32>, enclosing: Vec<i32>) -> Occurrence {
    let mut occ = Occurrence::new();
    occ.symbol = sym.to_string();
    occ.symbol_roles = SymbolRole::Definition as i32;
    occ.range = range;
    occ.enclosing_range = enclosing;
    occ
}

fn reference(sym: &str, range: Vec<i32>) -> Occurrence {
    let mut occ = Occurrence::new();
    occ.symbol = sym.to_string();
    occ.symbol_roles = 0;
    occ.range = range;
    occ
}

fn write_artifact(dir: &Path, index: &Index) -> PathBuf {
    let path = dir.join("index.scip");
    let bytes = index.write_to_bytes().unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

const MAIN: &str = "scip-python python app 1.0 app/main().";
const HELPER: &str = "scip-python python app 1.0 app/helper().";
const GREETER: &str = "scip-python python app 1.0 app/Greeter#";
const GREET: &str = "scip-python python app 1.0 app/Greeter#greet().";

/// One document: a class with a method, a helper function, and a main
/// function whose body calls the helper.
fn sample_index() -> Index {
    let mut doc = Document::new();
    doc.relative_path = "app.py".to_string();
    doc.symbols.push(symbol(GREETER, Kind::Class, "Greeter"));
    let mut greet = symbol(GREET, Kind::Method, "greet");
    greet.enclosing_symbol = GREETER.to_string();
    doc.symbols.push(greet);
    doc.symbols.push(symbol(HELPER, Kind::Function, "helper"));
    doc.symbols.push(symbol(MAIN, Kind::Function, "main"));

    doc.occurrences.push(definition(GREETER, vec![0, 6, 13], vec![0, 0, 3, 0]));
    doc.occurrences.push(definition(GREET, vec![1, 8, 13], vec![1, 4, 3, 0]));
    doc.occurrences.push(definition(HELPER, vec![5, 4, 10], vec![5, 0, 7, 0]));
    doc.occurrences.push(definition(MAIN, vec![9, 4, 8], vec![9, 0, 12, 0]));
    // Call site of helper inside main's body (line 11, 0-indexed 10).
    doc.occurrences.push(reference(HELPER, vec![10, 4, 10]));

    let mut index = Index::new();
    index.documents.push(doc);
    index
}

#[test]
fn test_import_builds_nodes_and_containment() {
    let dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(&dir.path().join("graph.db")).unwrap();
    let artifact = write_artifact(dir.path(), &sample_index());

    let result = import_index(&mut store, &artifact, "repo-a", Language::Python, "fp-1");
    assert!(result.fatal_error.is_none(), "import should succeed: {:?}", result.fatal_error);
    assert_eq!(result.file_count, 1);
    assert_eq!(result.class_count, 1);
    assert_eq!(result.function_count, 3, "greet, helper and main are functions");
    assert_eq!(result.nodes_created, 5);

    let file = store.find_node("repo-a", "file:app.py").unwrap().unwrap();
    assert_eq!(file.node_type, NodeType::File);

    let edges = store.edges_in_scope("repo-a", "python").unwrap();
    let contains: Vec<_> = edges
        .iter()
        .filter(|e| e.edge_type == EdgeType::Contains)
        .collect();
    // file -> each of the 4 symbols, plus Greeter -> greet.
    assert_eq!(contains.len(), 5, "containment edges: {:?}", contains);

    let greeter = store.find_node("repo-a", GREETER).unwrap().unwrap();
    let greet = store.find_node("repo-a", GREET).unwrap().unwrap();
    assert!(
        contains
            .iter()
            .any(|e| e.source_node_id == greeter.node_id && e.target_node_id == greet.node_id),
        "class must contain its method"
    );
}

#[test]
fn test_call_attributed_to_enclosing_function() {
    let dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(&dir.path().join("graph.db")).unwrap();
    let artifact = write_artifact(dir.path(), &sample_index());

    import_index(&mut store, &artifact, "repo-a", Language::Python, "fp-1");

    let main = store.find_node("repo-a", MAIN).unwrap().unwrap();
    let helper = store.find_node("repo-a", HELPER).unwrap().unwrap();
    let edges = store.edges_in_scope("repo-a", "python").unwrap();
    assert!(
        edges.iter().any(|e| e.edge_type == EdgeType::Calls
            && e.source_node_id == main.node_id
            && e.target_node_id == helper.node_id),
        "helper call inside main's body must become a CALLS edge from main"
    );
}

#[test]
fn test_duplicate_symbol_keeps_first_seen_and_warns() {
    let dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(&dir.path().join("graph.db")).unwrap();

    let mut index = sample_index();
    // A second document re-declares main with a different display name.
    let mut doc = Document::new();
    doc.relative_path = "generated.py".to_string();
    doc.symbols.push(symbol(MAIN, Kind::Function, "main_generated"));
    index.documents.push(doc);

    let artifact = write_artifact(dir.path(), &index);
    let result = import_index(&mut store, &artifact, "repo-a", Language::Python, "fp-1");

    assert!(
        result.warnings.iter().any(|w| w.contains("SXT-IMP-002")),
        "duplicate must be warned about: {:?}",
        result.warnings
    );
    let main = store.find_node("repo-a", MAIN).unwrap().unwrap();
    assert_eq!(main.name, "main", "first-seen declaration wins");
    assert_eq!(
        main.file_path.as_deref(),
        Some("app.py"),
        "first-seen file attribution wins"
    );
}

#[test]
fn test_unresolved_occurrence_dropped_with_warning() {
    let dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(&dir.path().join("graph.db")).unwrap();

    let mut index = sample_index();
    index.documents[0]
        .occurrences
        .push(reference("scip-python python vendored 1.0 ext/mystery().", vec![11, 0, 7]));

    let artifact = write_artifact(dir.path(), &index);
    let result = import_index(&mut store, &artifact, "repo-a", Language::Python, "fp-1");

    assert!(
        result.warnings.iter().any(|w| w.contains("SXT-IMP-003")),
        "unresolved edge must be warned about: {:?}",
        result.warnings
    );
    let edges = store.edges_in_scope("repo-a", "python").unwrap();
    assert!(
        edges.iter().all(|e| !e.target_node_id.contains("mystery")),
        "no edge may point at a node that does not exist"
    );
}

#[test]
fn test_corrupt_artifact_is_fatal_and_preserves_prior_scope() {
    let dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(&dir.path().join("graph.db")).unwrap();

    let artifact = write_artifact(dir.path(), &sample_index());
    let first = import_index(&mut store, &artifact, "repo-a", Language::Python, "fp-1");
    assert!(first.fatal_error.is_none());

    std::fs::write(&artifact, b"this is not protobuf").unwrap();
    let second = import_index(&mut store, &artifact, "repo-a", Language::Python, "fp-2");

    assert!(second.is_fatal(), "corrupt artifact must be fatal");
    assert!(
        second.fatal_error.as_deref().unwrap_or("").contains("SXT-IMP-001"),
        "fatal error carries the artifact error code: {:?}",
        second.fatal_error
    );
    assert_eq!(second.nodes_created, 0);

    let record = store.get_index_record("repo-a", "python").unwrap().unwrap();
    assert_eq!(record.fingerprint, "fp-1", "prior record must survive a failed import");
    assert_eq!(
        store.nodes_in_scope("repo-a", "python").unwrap().len(),
        5,
        "prior nodes must survive a failed import"
    );
}

#[test]
fn test_missing_artifact_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(&dir.path().join("graph.db")).unwrap();

    let result = import_index(
        &mut store,
        &dir.path().join("nope.scip"),
        "repo-a",
        Language::Python,
        "fp-1",
    );
    assert!(result.is_fatal());
    assert!(result
        .fatal_error
        .as_deref()
        .unwrap_or("")
        .contains("SXT-IMP-001"));
}
