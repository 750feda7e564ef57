use std::collections::BTreeMap;

use kvstores::{
    ArrayStore, HashStore, KvStore, KvsEngine, KvsError, RbTreeStore, Request, Status, Target,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn engines(capacity: usize) -> Vec<(&'static str, Box<dyn KvsEngine>)> {
    let array: Box<dyn KvsEngine> = Box::new(ArrayStore::new(capacity));
    let hash: Box<dyn KvsEngine> = Box::new(HashStore::new(capacity, 7));
    let rbtree: Box<dyn KvsEngine> = Box::new(RbTreeStore::new(capacity));
    vec![("array", array), ("hash", hash), ("rbtree", rbtree)]
}

fn random_key(rng: &mut SmallRng, keys: usize) -> String {
    format!("key{}", rng.gen_range(0..keys))
}

// Count must always equal the number of live keys, checked against a model map.
#[test]
fn count_tracks_live_keys() {
    for (name, mut store) in engines(32) {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut model = BTreeMap::new();
        for i in 0..3000 {
            let key = random_key(&mut rng, 48);
            if rng.gen_bool(0.6) {
                let inserted = store.insert(key.clone(), i.to_string()).is_ok();
                if inserted {
                    model.insert(key, i.to_string());
                }
            } else {
                let removed = store.remove(&key).is_ok();
                assert_eq!(removed, model.remove(&key).is_some(), "{}", name);
            }
            assert_eq!(store.len(), model.len(), "{}", name);
            assert!(store.len() <= store.capacity(), "{}", name);
        }
        for (key, value) in &model {
            assert_eq!(store.get(key), Some(value.as_str()), "{}", name);
        }
    }
}

#[test]
fn set_existing_key_leaves_value_unchanged() {
    for (name, mut store) in engines(4) {
        store.insert("a".to_owned(), "1".to_owned()).unwrap();
        let err = store.insert("a".to_owned(), "2".to_owned()).unwrap_err();
        assert!(matches!(err, KvsError::KeyExists), "{}", name);
        assert_eq!(store.get("a"), Some("1"), "{}", name);
        assert_eq!(store.len(), 1, "{}", name);
    }
}

#[test]
fn full_store_rejects_new_keys_without_partial_insert() {
    for (name, mut store) in engines(3) {
        for key in ["a", "b", "c"] {
            store.insert(key.to_owned(), key.to_owned()).unwrap();
        }
        assert!(store.is_full(), "{}", name);
        let err = store.insert("d".to_owned(), "d".to_owned()).unwrap_err();
        assert!(matches!(err, KvsError::StoreFull), "{}", name);
        assert_eq!(store.get("d"), None, "{}", name);
        assert_eq!(store.len(), 3, "{}", name);
        assert_eq!(store.remaining(), 0, "{}", name);
        // an existing key is still reported as EXIST when full
        let err = store.insert("a".to_owned(), "x".to_owned()).unwrap_err();
        assert!(matches!(err, KvsError::KeyExists), "{}", name);
    }
}

#[test]
fn absent_keys_are_idempotent() {
    for (name, mut store) in engines(4) {
        store.insert("present".to_owned(), "1".to_owned()).unwrap();
        for _ in 0..3 {
            assert_eq!(store.get("missing"), None, "{}", name);
            assert!(matches!(store.remove("missing"), Err(KvsError::KeyNotFound)));
            assert!(matches!(
                store.update("missing", "v".to_owned()),
                Err(KvsError::KeyNotFound)
            ));
            assert_eq!(store.len(), 1, "{}", name);
            assert_eq!(store.get("present"), Some("1"), "{}", name);
        }
    }
}

#[test]
fn update_replaces_in_place() {
    for (name, mut store) in engines(2) {
        store.insert("x".to_owned(), "1".to_owned()).unwrap();
        assert_eq!(store.update("x", "9".to_owned()).unwrap(), "1", "{}", name);
        assert_eq!(store.get("x"), Some("9"), "{}", name);
        assert_eq!(store.len(), 1, "{}", name);
    }
}

#[test]
fn clear_keeps_capacity() {
    for (name, mut store) in engines(2) {
        store.insert("a".to_owned(), "1".to_owned()).unwrap();
        store.insert("b".to_owned(), "2".to_owned()).unwrap();
        store.clear();
        assert!(store.is_empty(), "{}", name);
        assert_eq!(store.capacity(), 2, "{}", name);
        assert_eq!(store.iter().count(), 0, "{}", name);
        store.insert("a".to_owned(), "3".to_owned()).unwrap();
        assert_eq!(store.get("a"), Some("3"), "{}", name);
    }
}

fn run(store: &KvStore, target: Target, line: &str) -> (Status, Option<String>) {
    let response = store.execute(&Request::from_line(line).target(target));
    (response.status, response.value)
}

#[test]
fn capacity_two_scenario() {
    let store = KvStore::with_capacity(2).unwrap();
    for target in Target::ALL.iter().copied() {
        assert_eq!(run(&store, target, "SET a 1").0, Status::Ok);
        assert_eq!(store.stats_for(target).count, 1);
        assert_eq!(run(&store, target, "SET b 2").0, Status::Ok);
        assert_eq!(store.stats_for(target).count, 2);
        assert_eq!(run(&store, target, "SET c 3").0, Status::Full);
        assert_eq!(run(&store, target, "DEL a").0, Status::Ok);
        assert_eq!(store.stats_for(target).count, 1);
        assert_eq!(run(&store, target, "SET c 3").0, Status::Ok);
        assert_eq!(store.stats_for(target).count, 2);
        assert_eq!(
            run(&store, target, "GET b"),
            (Status::Ok, Some("2".to_owned()))
        );
        assert_eq!(run(&store, target, "GET a"), (Status::NoExist, None));
    }
}

#[test]
fn update_scenario() {
    let store = KvStore::with_capacity(4).unwrap();
    for target in Target::ALL.iter().copied() {
        assert_eq!(run(&store, target, "UPDATE x 9").0, Status::NoExist);
        assert_eq!(run(&store, target, "SET x 1").0, Status::Ok);
        assert_eq!(run(&store, target, "UPDATE x 9").0, Status::Ok);
        assert_eq!(
            run(&store, target, "GET x"),
            (Status::Ok, Some("9".to_owned()))
        );
        assert_eq!(store.stats_for(target).count, 1);
    }
}

// The same operation sequence must produce the same statuses and values on every structure.
#[test]
fn structures_are_functionally_equivalent() {
    let store = KvStore::with_capacity(16).unwrap();
    let mut rng = SmallRng::seed_from_u64(42);
    for i in 0..2000 {
        let key = random_key(&mut rng, 24);
        let line = match rng.gen_range(0..5) {
            0 | 1 => format!("SET {} v{}", key, i),
            2 => format!("GET {}", key),
            3 => format!("DEL {}", key),
            _ => format!("UPDATE {} u{}", key, i),
        };
        let outcomes: Vec<_> = Target::ALL
            .iter()
            .map(|target| run(&store, *target, &line))
            .collect();
        assert_eq!(outcomes[0], outcomes[1], "array vs hash on {}", line);
        assert_eq!(outcomes[0], outcomes[2], "array vs rbtree on {}", line);
    }
    let stats = store.stats();
    assert_eq!(stats.array, stats.hash);
    assert_eq!(stats.array, stats.rbtree);
    store.validate().unwrap();
}
