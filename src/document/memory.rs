//! In-process document store.
//!
//! `MemoryStore` keeps the whole document tree as one JSON object behind a
//! mutex and delivers subscription callbacks synchronously after each
//! mutation, which gives the read-after-write ordering the ledger store
//! relies on. It backs embedded deployments and every test in this crate.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use super::{DocPath, DocumentStore, StoreError, SubscriptionId, SubtreeCallback, WriteOp};

struct Subscriber {
    id: u64,
    path: DocPath,
    callback: SubtreeCallback,
}

struct State {
    tree: JsonValue,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
}

/// In-process [`DocumentStore`] implementation.
pub struct MemoryStore {
    state: Mutex<State>,
    offline: AtomicBool,
    fail_next_batch: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                tree: JsonValue::Object(Map::new()),
                subscribers: Vec::new(),
                next_subscriber: 0,
            }),
            offline: AtomicBool::new(false),
            fail_next_batch: AtomicBool::new(false),
        }
    }

    /// Simulate an unreachable backend: while set, every operation fails
    /// with [`StoreError::Unreachable`]. Used by failure-path tests.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next [`DocumentStore::write_batch`] call only, leaving the
    /// tree untouched. Used to exercise the committed-mutation /
    /// failed-recalculation path.
    pub fn fail_next_batch(&self) {
        self.fail_next_batch.store(true, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("store is offline".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Collect callbacks whose subscribed subtree overlaps any touched path,
    /// with a snapshot of their current children. Invoked by the caller
    /// after the state lock is released, so callbacks may re-enter the
    /// store.
    fn pending_notifications(
        state: &State,
        touched: &[DocPath],
    ) -> Vec<(SubtreeCallback, BTreeMap<String, JsonValue>)> {
        state
            .subscribers
            .iter()
            .filter(|sub| touched.iter().any(|path| paths_overlap(sub.path.as_str(), path.as_str())))
            .map(|sub| (sub.callback.clone(), children_at(&state.tree, &sub.path)))
            .collect()
    }
}

fn paths_overlap(a: &str, b: &str) -> bool {
    a == b
        || b.strip_prefix(a).is_some_and(|rest| rest.starts_with('/'))
        || a.strip_prefix(b).is_some_and(|rest| rest.starts_with('/'))
}

fn node_at<'a>(tree: &'a JsonValue, path: &DocPath) -> Option<&'a JsonValue> {
    let mut node = tree;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

fn children_at(tree: &JsonValue, path: &DocPath) -> BTreeMap<String, JsonValue> {
    match node_at(tree, path).and_then(JsonValue::as_object) {
        Some(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        None => BTreeMap::new(),
    }
}

fn set_at(tree: &mut JsonValue, path: &DocPath, value: JsonValue) {
    let segments: Vec<&str> = path.segments().collect();
    let mut node = tree;
    for segment in &segments[..segments.len() - 1] {
        if !node.is_object() {
            *node = JsonValue::Object(Map::new());
        }
        let map = match node.as_object_mut() {
            Some(map) => map,
            None => return,
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
    }
    if !node.is_object() {
        *node = JsonValue::Object(Map::new());
    }
    if let Some(map) = node.as_object_mut() {
        map.insert(segments[segments.len() - 1].to_string(), value);
    }
}

fn remove_at(tree: &mut JsonValue, path: &DocPath) {
    let segments: Vec<&str> = path.segments().collect();
    let mut node = tree;
    for segment in &segments[..segments.len() - 1] {
        match node.as_object_mut().and_then(|map| map.get_mut(*segment)) {
            Some(next) => node = next,
            None => return,
        }
    }
    if let Some(map) = node.as_object_mut() {
        map.remove(segments[segments.len() - 1]);
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, path: &DocPath) -> Result<Option<JsonValue>, StoreError> {
        self.check_online()?;
        let state = self.lock();
        Ok(node_at(&state.tree, path).cloned())
    }

    fn read_children(&self, path: &DocPath) -> Result<BTreeMap<String, JsonValue>, StoreError> {
        self.check_online()?;
        let state = self.lock();
        Ok(children_at(&state.tree, path))
    }

    fn push(&self, path: &DocPath, value: JsonValue) -> Result<String, StoreError> {
        self.check_online()?;
        let key = Uuid::new_v4().simple().to_string();
        let child = path.child(&key);
        let notify = {
            let mut state = self.lock();
            set_at(&mut state.tree, &child, value);
            Self::pending_notifications(&state, std::slice::from_ref(&child))
        };
        for (callback, snapshot) in notify {
            callback(&snapshot);
        }
        Ok(key)
    }

    fn write(&self, path: &DocPath, value: JsonValue) -> Result<(), StoreError> {
        self.write_batch(vec![WriteOp::set(path.clone(), value)])
    }

    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        self.check_online()?;
        if self.fail_next_batch.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unreachable(
                "injected batch failure".to_string(),
            ));
        }
        if ops.is_empty() {
            return Ok(());
        }
        let notify = {
            let mut state = self.lock();
            let mut touched = Vec::with_capacity(ops.len());
            for op in ops {
                match op.value {
                    Some(value) => set_at(&mut state.tree, &op.path, value),
                    None => remove_at(&mut state.tree, &op.path),
                }
                touched.push(op.path);
            }
            Self::pending_notifications(&state, &touched)
        };
        for (callback, snapshot) in notify {
            callback(&snapshot);
        }
        Ok(())
    }

    fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        self.write_batch(vec![WriteOp::remove(path.clone())])
    }

    fn subscribe(&self, path: &DocPath, callback: SubtreeCallback) -> SubscriptionId {
        let (id, snapshot) = {
            let mut state = self.lock();
            state.next_subscriber += 1;
            let id = state.next_subscriber;
            state.subscribers.push(Subscriber {
                id,
                path: path.clone(),
                callback: callback.clone(),
            });
            (id, children_at(&state.tree, path))
        };
        callback(&snapshot);
        SubscriptionId(id)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.lock().subscribers.retain(|sub| sub.id != subscription.0);
    }
}
