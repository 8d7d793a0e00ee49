//! Graph store scoping tests
//!
//! Two repositories indexed into the same database must never bleed into
//! each other, even when their indexers emit byte-identical symbol strings.

use sextant::graph::{
    EdgeType, GraphEdge, GraphNode, GraphStore, IndexRecord, NodeType,
};
use tempfile::TempDir;

fn node(repo_id: &str, entity_id: &str, node_type: NodeType, name: &str) -> GraphNode {
    GraphNode::new(repo_id, "python", entity_id, node_type, name)
}

fn edge(repo_id: &str, source: &GraphNode, target: &GraphNode, edge_type: EdgeType) -> GraphEdge {
    GraphEdge {
        repo_id: repo_id.to_string(),
        language: "python".to_string(),
        source_node_id: source.node_id.clone(),
        target_node_id: target.node_id.clone(),
        edge_type,
    }
}

fn record(repo_id: &str, fingerprint: &str) -> IndexRecord {
    IndexRecord {
        repo_id: repo_id.to_string(),
        language: "python".to_string(),
        last_indexed_at: 1_700_000_000,
        fingerprint: fingerprint.to_string(),
        file_count: 1,
        function_count: 1,
        class_count: 0,
    }
}

/// Populate one repo scope with a file node, a function node, and a
/// CONTAINS edge between them.
fn populate(store: &mut GraphStore, repo_id: &str) {
    let file = node(repo_id, "file:app.py", NodeType::File, "app.py");
    let func = node(repo_id, "sym pkg app/main().", NodeType::Function, "main");
    let contains = edge(repo_id, &file, &func, EdgeType::Contains);
    store
        .replace_scope(
            repo_id,
            "python",
            &[file, func],
            &[contains],
            &record(repo_id, "fp-1"),
        )
        .unwrap();
}

#[test]
fn test_identical_entity_ids_in_two_repos_do_not_collide() {
    let dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(&dir.path().join("graph.db")).unwrap();

    populate(&mut store, "repo-a");
    populate(&mut store, "repo-b");

    let a = store.find_node("repo-a", "sym pkg app/main().").unwrap();
    let b = store.find_node("repo-b", "sym pkg app/main().").unwrap();
    let a = a.expect("repo-a node should exist");
    let b = b.expect("repo-b node should exist");
    assert_ne!(a.node_id, b.node_id, "node ids must be repo-scoped");

    assert_eq!(store.nodes_in_scope("repo-a", "python").unwrap().len(), 2);
    assert_eq!(store.nodes_in_scope("repo-b", "python").unwrap().len(), 2);
}

#[test]
fn test_replace_scope_only_touches_its_own_repo() {
    let dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(&dir.path().join("graph.db")).unwrap();

    populate(&mut store, "repo-a");
    populate(&mut store, "repo-b");

    // Re-import repo-a with a smaller node set.
    let lone = node("repo-a", "file:app.py", NodeType::File, "app.py");
    store
        .replace_scope("repo-a", "python", &[lone], &[], &record("repo-a", "fp-2"))
        .unwrap();

    assert_eq!(
        store.nodes_in_scope("repo-a", "python").unwrap().len(),
        1,
        "repo-a scope should have been replaced"
    );
    assert_eq!(
        store.nodes_in_scope("repo-b", "python").unwrap().len(),
        2,
        "repo-b scope must be untouched by repo-a's re-import"
    );
    assert_eq!(
        store.edges_in_scope("repo-b", "python").unwrap().len(),
        1,
        "repo-b edges must survive repo-a's re-import"
    );

    let a_record = store.get_index_record("repo-a", "python").unwrap().unwrap();
    let b_record = store.get_index_record("repo-b", "python").unwrap().unwrap();
    assert_eq!(a_record.fingerprint, "fp-2");
    assert_eq!(b_record.fingerprint, "fp-1");
}

#[test]
fn test_scope_counts_group_by_node_type() {
    let dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(&dir.path().join("graph.db")).unwrap();

    let file = node("repo-a", "file:app.py", NodeType::File, "app.py");
    let class = node("repo-a", "sym pkg app/App#", NodeType::Class, "App");
    let f1 = node("repo-a", "sym pkg app/App#run().", NodeType::Function, "run");
    let f2 = node("repo-a", "sym pkg app/main().", NodeType::Function, "main");
    store
        .replace_scope(
            "repo-a",
            "python",
            &[file, class, f1, f2],
            &[],
            &record("repo-a", "fp-1"),
        )
        .unwrap();

    let counts = store.scope_counts("repo-a", "python").unwrap();
    assert_eq!(counts.get("FILE"), Some(&1));
    assert_eq!(counts.get("CLASS"), Some(&1));
    assert_eq!(counts.get("FUNCTION"), Some(&2));
}

#[test]
fn test_raw_query_escape_hatch_is_parameterized() {
    let dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(&dir.path().join("graph.db")).unwrap();
    populate(&mut store, "repo-a");

    let rows = store
        .query(
            "SELECT name FROM graph_nodes WHERE repo_id = ?1 AND node_type = ?2",
            &[&"repo-a", &"FUNCTION"],
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    match &rows[0][0] {
        rusqlite::types::Value::Text(name) => assert_eq!(name, "main"),
        other => panic!("expected text value, got {:?}", other),
    }
}
