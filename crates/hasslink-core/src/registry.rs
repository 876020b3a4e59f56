// ── Device registry ──
//
// Fixed set of records shared between the sync worker and the UI side.
// Entry locks are held only inside the closures below, never across an
// `.await`.

use dashmap::DashMap;
use tracing::warn;

use crate::model::{DeviceSpec, DeviceSummary, DeviceSyncRecord};

pub struct DeviceRegistry {
    records: DashMap<String, DeviceSyncRecord>,
    /// Configuration order, used for bulk requests and summaries.
    order: Vec<String>,
}

impl DeviceRegistry {
    pub fn new(specs: &[DeviceSpec]) -> Self {
        let records = DashMap::with_capacity(specs.len());
        let mut order = Vec::with_capacity(specs.len());
        for spec in specs {
            if records.contains_key(&spec.entity_id) {
                warn!(entity = %spec.entity_id, "duplicate device ignored");
                continue;
            }
            records.insert(spec.entity_id.clone(), DeviceSyncRecord::new(spec));
            order.push(spec.entity_id.clone());
        }
        Self { records, order }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.records.contains_key(entity_id)
    }

    /// Snapshot of one record.
    pub fn get(&self, entity_id: &str) -> Option<DeviceSyncRecord> {
        self.records.get(entity_id).map(|r| r.value().clone())
    }

    /// Mutate one record under its entry lock.
    pub fn update<R>(
        &self,
        entity_id: &str,
        f: impl FnOnce(&mut DeviceSyncRecord) -> R,
    ) -> Option<R> {
        self.records.get_mut(entity_id).map(|mut r| f(r.value_mut()))
    }

    pub fn entity_ids(&self) -> &[String] {
        &self.order
    }

    pub fn enabled_entity_ids(&self) -> Vec<String> {
        self.filter_ids(|r| r.is_enabled)
    }

    /// Devices carrying an unconfirmed local intent that should be pushed.
    pub fn pending_pushes(&self) -> Vec<String> {
        self.filter_ids(DeviceSyncRecord::needs_push)
    }

    fn filter_ids(&self, pred: impl Fn(&DeviceSyncRecord) -> bool) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.records.get(id.as_str()).is_some_and(|r| pred(r.value())))
            .cloned()
            .collect()
    }

    pub fn summary(&self, entity_id: &str) -> Option<DeviceSummary> {
        self.records.get(entity_id).map(|r| r.summary())
    }

    pub fn summaries(&self) -> Vec<DeviceSummary> {
        self.order
            .iter()
            .filter_map(|id| self.summary(id))
            .collect()
    }

    /// Entity id for a UI key.
    pub fn find_by_key(&self, key: &str) -> Option<String> {
        self.order
            .iter()
            .find(|id| self.records.get(id.as_str()).is_some_and(|r| r.key == key))
            .cloned()
    }

    /// Accept either an entity id or a UI key.
    pub fn resolve(&self, ident: &str) -> Option<String> {
        if self.contains(ident) {
            return Some(ident.to_owned());
        }
        self.find_by_key(ident)
    }
}
