//! Macro-generated test suite for the `Repository<T>` contract.
//!
//! The `repository_contract_tests!` macro generates a test module that checks
//! the repositories handed out by any `Database` against the contract:
//! staged mutations are invisible until commit, and absent identifiers are
//! reported as `NotFound` without touching the store.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod harness;
//!
//! use harness::*;
//!
//! repository_contract_tests!(Database::new());
//! ```

/// Generate a `Repository<Agent>` conformance suite.
///
/// `$factory` must evaluate to a fresh, empty `Database`. It is re-evaluated
/// for each test.
#[macro_export]
macro_rules! repository_contract_tests {
    ($factory:expr) => {
        mod repository_contract {
            use super::*;
            use outpost::prelude::*;

            #[test]
            fn test_add_then_commit_then_get() {
                let database = $factory;
                let store = database.begin();
                let added = store.repository::<Agent>().add(agent("ws-01")).unwrap();
                let id = added.id.unwrap();
                store.commit().unwrap();

                let fetched = database.begin().repository::<Agent>().get_by_id(&id).unwrap();
                assert_eq!(fetched, added);
            }

            #[test]
            fn test_add_keeps_explicit_id() {
                let database = $factory;
                let id = Uuid::new_v4();
                let store = database.begin();
                let added = store
                    .repository::<Agent>()
                    .add(agent("ws-01").with_id(id))
                    .unwrap();
                assert_eq!(added.id, Some(id));
            }

            #[test]
            fn test_staged_add_is_invisible_before_commit() {
                let database = $factory;
                let store = database.begin();
                let agents = store.repository::<Agent>();
                let added = agents.add(agent("ws-01")).unwrap();

                assert!(agents.get_by_id(&added.id.unwrap()).unwrap_err().is_not_found());
                assert_eq!(agents.get_all().unwrap().len(), 0);
                assert_eq!(store.pending_changes(), 1);
            }

            #[test]
            fn test_get_all_empty() {
                let database = $factory;
                assert!(all_agents(&database).is_empty());
            }

            #[test]
            fn test_get_all_keeps_insertion_order() {
                let database = $factory;
                seed_agents(&database, &["c", "a", "b"]);
                let hostnames: Vec<String> =
                    all_agents(&database).into_iter().map(|a| a.hostname).collect();
                assert_eq!(hostnames, vec!["c", "a", "b"]);
            }

            #[test]
            fn test_get_nonexistent() {
                let database = $factory;
                let err = database
                    .begin()
                    .repository::<Agent>()
                    .get_by_id(&Uuid::new_v4())
                    .unwrap_err();
                assert!(err.is_not_found());
            }

            #[test]
            fn test_add_duplicate_id() {
                let database = $factory;
                let existing = seed_agents(&database, &["ws-01"]).remove(0);

                let store = database.begin();
                let err = store
                    .repository::<Agent>()
                    .add(agent("ws-02").with_id(existing.id.unwrap()))
                    .unwrap_err();
                assert!(matches!(
                    err,
                    OutpostError::Entity(EntityError::AlreadyExists { .. })
                ));
                assert!(!store.has_changes());
            }

            #[test]
            fn test_update_existing() {
                let database = $factory;
                let mut existing = seed_agents(&database, &["ws-01"]).remove(0);

                let store = database.begin();
                existing.sleep_seconds = 5;
                store.repository::<Agent>().update(existing.clone()).unwrap();
                store.commit().unwrap();

                assert_eq!(all_agents(&database), vec![existing]);
            }

            #[test]
            fn test_update_nonexistent_leaves_store_unchanged() {
                let database = $factory;
                let before = seed_agents(&database, &["ws-01"]);

                let store = database.begin();
                let err = store
                    .repository::<Agent>()
                    .update(agent("ghost").with_id(Uuid::new_v4()))
                    .unwrap_err();
                assert!(err.is_not_found());
                assert!(!store.has_changes());
                store.commit().unwrap();

                assert_eq!(all_agents(&database), before);
            }

            #[test]
            fn test_update_without_id() {
                let database = $factory;
                let err = database
                    .begin()
                    .repository::<Agent>()
                    .update(agent("ws-01"))
                    .unwrap_err();
                assert!(matches!(
                    err,
                    OutpostError::Entity(EntityError::MissingIdentifier { .. })
                ));
            }

            #[test]
            fn test_remove_then_get_not_found() {
                let database = $factory;
                let existing = seed_agents(&database, &["ws-01", "ws-02"]);
                let id = existing[0].id.unwrap();

                let store = database.begin();
                store.repository::<Agent>().remove(&id).unwrap();
                store.commit().unwrap();

                let agents = database.begin();
                assert!(agents.repository::<Agent>().get_by_id(&id).unwrap_err().is_not_found());
                assert_eq!(all_agents(&database), vec![existing[1].clone()]);
            }

            #[test]
            fn test_remove_nonexistent() {
                let database = $factory;
                let store = database.begin();
                let err = store.repository::<Agent>().remove(&Uuid::new_v4()).unwrap_err();
                assert!(err.is_not_found());
            }

            #[test]
            fn test_staged_add_then_update_in_same_unit() {
                let database = $factory;
                let store = database.begin();
                let agents = store.repository::<Agent>();
                let mut added = agents.add(agent("ws-01")).unwrap();
                added.sleep_seconds = 1;
                agents.update(added.clone()).unwrap();
                store.commit().unwrap();

                assert_eq!(all_agents(&database), vec![added]);
            }

            #[test]
            fn test_discard_changes() {
                let database = $factory;
                let store = database.begin();
                store.repository::<Agent>().add(agent("ws-01")).unwrap();
                store.discard_changes();

                assert_eq!(store.commit().unwrap().total(), 0);
                assert!(all_agents(&database).is_empty());
            }
        }
    };
}
