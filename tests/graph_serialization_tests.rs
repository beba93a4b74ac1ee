//! Integration tests for reference-preserving graph serialization.

mod harness;

use harness::*;
use outpost::prelude::*;
use serde_json::json;

fn with_id(mut agent: Agent) -> Agent {
    agent.set_id(Uuid::new_v4());
    agent
}

#[test]
fn test_round_trip_keeps_single_shared_target() {
    let a = with_id(agent("ws-01"));
    let mut b = task("whoami", &a);
    b.set_id(Uuid::new_v4());
    let mut c = task("hostname", &a);
    c.set_id(Uuid::new_v4());

    let mut graph = EntityGraph::new();
    assert!(graph.insert(&a).unwrap());
    assert!(graph.insert(&b).unwrap());
    assert!(graph.insert(&c).unwrap());
    assert!(!graph.insert(&a).unwrap());

    let document = graph.to_json().unwrap();
    let nodes = document["$values"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    let agent_nodes = nodes.iter().filter(|node| node["$type"] == "agent").count();
    assert_eq!(agent_nodes, 1);

    // The task node holds a reference token, not an inlined agent.
    assert_eq!(
        nodes[1]["value"]["agent"],
        json!({ "$ref": a.id.unwrap().to_string() })
    );

    let text = serde_json::to_string(&document).unwrap();
    let restored = EntityGraph::from_json(serde_json::from_str(&text).unwrap()).unwrap();
    assert_eq!(restored.len(), 3);
    assert_eq!(restored.entities::<Agent>().unwrap(), vec![a.clone()]);

    let tasks = restored.entities::<Task>().unwrap();
    assert_eq!(tasks.len(), 2);
    for restored_task in &tasks {
        assert_eq!(*restored.resolve(&restored_task.agent).unwrap(), a);
    }
}

#[test]
fn test_graph_from_committed_store() {
    let database = Database::new();
    let a = seed_agents(&database, &["ws-01"]).remove(0);

    let store = database.begin();
    let b = store.repository::<Task>().add(task("id", &a)).unwrap();
    store.commit().unwrap();

    let store = database.begin();
    let b = store.repository::<Task>().get_by_id(&b.id.unwrap()).unwrap();
    let target = store.resolve(&b.agent).unwrap();

    let mut graph = EntityGraph::new();
    graph.insert(&b).unwrap();
    graph.insert(target.as_ref()).unwrap();

    let restored = EntityGraph::from_json(graph.to_json().unwrap()).unwrap();
    assert_eq!(restored.get::<Agent>(&a.id.unwrap()).unwrap(), a);
    assert_eq!(restored.get::<Task>(&b.id.unwrap()).unwrap(), b);
}

#[test]
fn test_dangling_reference_resolves_to_not_found() {
    let a = with_id(agent("ws-01"));
    let mut b = task("whoami", &a);
    b.set_id(Uuid::new_v4());

    let mut graph = EntityGraph::new();
    graph.insert(&b).unwrap();

    let restored = EntityGraph::from_json(graph.to_json().unwrap()).unwrap();
    let restored_task = restored.get::<Task>(&b.id.unwrap()).unwrap();
    assert!(restored.resolve(&restored_task.agent).unwrap_err().is_not_found());
}

#[test]
fn test_insert_without_id_fails() {
    let mut graph = EntityGraph::new();
    assert!(graph.insert(&agent("ws-01")).is_err());
    assert!(graph.is_empty());
}

#[test]
fn test_relation_accepts_bare_identifier() {
    let id = Uuid::new_v4();
    let value = json!({ "command": "ls", "agent": id.to_string() });
    let parsed: Task = serde_json::from_value(value).unwrap();
    assert_eq!(parsed.agent.id(), id);

    let written = serde_json::to_value(&parsed).unwrap();
    assert_eq!(written["agent"], json!({ "$ref": id.to_string() }));
}
