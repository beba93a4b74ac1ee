//! Shared test harness for repository and unit-of-work testing
//!
//! Provides two related entity types, `Agent` and `Task` (a task points at
//! the agent that runs it), plus helpers for seeding a database.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod harness;
//! use harness::*;
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod repository_contract;

use outpost::prelude::*;

impl_entity!(Agent, "agent", "agents", {
    hostname: String,
    #[serde(default)]
    sleep_seconds: u32,
});

impl_entity!(Task, "task", "tasks", {
    command: String,
    agent: Relation<Agent>,
});

pub fn agent(hostname: &str) -> Agent {
    Agent::new(hostname.to_string(), 60)
}

pub fn task(command: &str, agent: &Agent) -> Task {
    let relation = Relation::to(agent).expect("agent must have an id");
    Task::new(command.to_string(), relation)
}

/// Add and commit `agents` in one unit of work, returning them with ids
pub fn seed_agents(database: &Database, hostnames: &[&str]) -> Vec<Agent> {
    let store = database.begin();
    let agents = store.repository::<Agent>();
    let added = hostnames
        .iter()
        .map(|hostname| agents.add(agent(hostname)).expect("add agent"))
        .collect();
    store.commit().expect("seed commit");
    added
}

/// Committed agents, in insertion order
pub fn all_agents(database: &Database) -> Vec<Agent> {
    database
        .begin()
        .repository::<Agent>()
        .get_all()
        .expect("get_all")
        .collect::<OutpostResult<Vec<_>>>()
        .expect("deserialize agents")
}
