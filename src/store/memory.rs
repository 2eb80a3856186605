//! Map-backed [`ObjectStore`] used by the test suite.
//!
//! Reads are immediately consistent; eventual consistency comes from the
//! simulated reconciler that writes derived objects some time after a
//! declaration appears.  Every mutation is published on a broadcast feed so
//! that reconciler can react to it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kube::api::DynamicObject;
use tokio::sync::broadcast;

use super::{ObjectKey, ObjectStore};
use crate::error::{Error, Result};

const EVENT_CAPACITY: usize = 256;

/// A change applied to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    Created(ObjectKey),
    Deleted(ObjectKey),
}

struct Inner {
    objects: Mutex<BTreeMap<ObjectKey, DynamicObject>>,
    events: broadcast::Sender<StoreEvent>,
    failing_gets: AtomicU32,
    reject_creates: AtomicBool,
    next_uid: AtomicU64,
}

/// Cheaply cloneable handle; clones share the same objects.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                objects: Mutex::new(BTreeMap::new()),
                events,
                failing_gets: AtomicU32::new(0),
                reject_creates: AtomicBool::new(false),
                next_uid: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribe to creations and deletions from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// Make the next `n` calls to `get` fail with a transient store error.
    pub fn fail_next_gets(&self, n: u32) {
        self.inner.failing_gets.store(n, Ordering::SeqCst);
    }

    /// Reject (or stop rejecting) every `create`.
    pub fn reject_creates(&self, reject: bool) {
        self.inner.reject_creates.store(reject, Ordering::SeqCst);
    }

    /// Insert or replace an object without the create-only checks.  This is
    /// how a simulated reconciler writes the objects it derives.
    pub fn apply(&self, key: &ObjectKey, mut obj: DynamicObject) {
        self.stamp(&mut obj);
        let fresh = self.objects().insert(key.clone(), obj).is_none();
        if fresh {
            self.publish(StoreEvent::Created(key.clone()));
        }
    }

    /// Remove an object if present, publishing a deletion.
    pub fn remove(&self, key: &ObjectKey) -> Option<DynamicObject> {
        let removed = self.objects().remove(key);
        if removed.is_some() {
            self.publish(StoreEvent::Deleted(key.clone()));
        }
        removed
    }

    /// Read an object, bypassing injected faults.
    pub fn lookup(&self, key: &ObjectKey) -> Option<DynamicObject> {
        self.objects().get(key).cloned()
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.objects().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<ObjectKey, DynamicObject>> {
        self.inner
            .objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn stamp(&self, obj: &mut DynamicObject) {
        if obj.metadata.uid.is_none() {
            let uid = self.inner.next_uid.fetch_add(1, Ordering::SeqCst);
            obj.metadata.uid = Some(format!("uid-{uid}"));
        }
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine: nothing is simulating a reconciler.
        let _ = self.inner.events.send(event);
    }

    fn take_get_fault(&self) -> bool {
        self.inner
            .failing_gets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryStore {
    async fn create(&self, key: &ObjectKey, obj: &DynamicObject) -> Result<()> {
        if self.inner.reject_creates.load(Ordering::SeqCst) {
            return Err(Error::store(format!("create of {key} rejected")));
        }
        let mut obj = obj.clone();
        self.stamp(&mut obj);
        {
            let mut objects = self.objects();
            if objects.contains_key(key) {
                return Err(Error::store(format!("{key} already exists")));
            }
            objects.insert(key.clone(), obj);
        }
        self.publish(StoreEvent::Created(key.clone()));
        Ok(())
    }

    async fn get(&self, key: &ObjectKey) -> Result<DynamicObject> {
        if self.take_get_fault() {
            return Err(Error::store(format!("injected fetch failure for {key}")));
        }
        self.objects()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &ObjectKey) -> Result<()> {
        self.remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }
}
