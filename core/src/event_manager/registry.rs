use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::listener::{CallType, ListenerEntry, ListenerFn, ListenerId};
use std::sync::Arc;

/// A listener registration requested off the dispatch thread, waiting to be
/// applied.
pub(crate) struct PendingAdd {
    pub(crate) id: ListenerId,
    pub(crate) listener: Arc<ListenerFn>,
    pub(crate) call_type: CallType,
    pub(crate) event_type: Option<String>,
}

/// The listener registry: `id → {listener, call-type}`, `type → ids`, and the
/// `id → type` back-reference, kept mutually consistent. Mutated only from
/// the dispatch thread.
#[derive(Default)]
pub(crate) struct Registry {
    by_id: BTreeMap<ListenerId, ListenerEntry>,
    by_type: BTreeMap<String, BTreeSet<ListenerId>>,
    id_to_type: HashMap<ListenerId, String>,
    next_id: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocates the next free id: a monotonic counter that skips ids
    /// currently present in the registry, so removed ids can be reused.
    pub(crate) fn alloc_id(&mut self) -> ListenerId {
        loop {
            let candidate = ListenerId::from_raw(self.next_id);
            self.next_id = self.next_id.wrapping_add(1);
            if !self.by_id.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Applies every queued addition.
    pub(crate) fn apply_additions(&mut self, additions: Vec<PendingAdd>) {
        for add in additions {
            self.by_id.insert(
                add.id,
                ListenerEntry {
                    listener: add.listener,
                    call_type: add.call_type,
                },
            );
            if let Some(event_type) = add.event_type {
                self.by_type.entry(event_type.clone()).or_default().insert(add.id);
                self.id_to_type.insert(add.id, event_type);
            }
        }
    }

    /// Applies every queued removal. Unknown ids are silently ignored.
    pub(crate) fn apply_removals(&mut self, removals: Vec<ListenerId>) {
        for id in removals {
            self.by_id.remove(&id);
            if let Some(event_type) = self.id_to_type.remove(&id) {
                if let Some(ids) = self.by_type.get_mut(&event_type) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        self.by_type.remove(&event_type);
                    }
                }
            }
        }
    }

    pub(crate) fn listeners_for_type(&self, event_type: &str) -> Vec<ListenerEntry> {
        self.by_type
            .get(event_type)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect()
    }

    pub(crate) fn listener_for_id(&self, id: ListenerId) -> Option<ListenerEntry> {
        self.by_id.get(&id).cloned()
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.by_id.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<ListenerFn> {
        Arc::new(|_event| {})
    }

    #[test]
    fn alloc_id_skips_present_ids() {
        let mut registry = Registry::new();
        let first = registry.alloc_id();
        registry.apply_additions(vec![PendingAdd {
            id: first,
            listener: noop(),
            call_type: CallType::MainThread,
            event_type: None,
        }]);
        let second = registry.alloc_id();
        assert_ne!(first, second);
    }

    #[test]
    fn alloc_id_reuses_after_removal() {
        let mut registry = Registry::new();
        let first = registry.alloc_id();
        registry.apply_additions(vec![PendingAdd {
            id: first,
            listener: noop(),
            call_type: CallType::MainThread,
            event_type: None,
        }]);
        registry.apply_removals(vec![first]);
        let reused = registry.alloc_id();
        assert_eq!(first, reused);
    }

    #[test]
    fn removal_clears_type_back_reference() {
        let mut registry = Registry::new();
        let id = registry.alloc_id();
        registry.apply_additions(vec![PendingAdd {
            id,
            listener: noop(),
            call_type: CallType::MainThread,
            event_type: Some("letter.a".into()),
        }]);
        assert_eq!(registry.listeners_for_type("letter.a").len(), 1);
        registry.apply_removals(vec![id]);
        assert!(registry.listeners_for_type("letter.a").is_empty());
        assert!(!registry.contains(id));
    }

    #[test]
    fn unknown_removal_is_silently_ignored() {
        let mut registry = Registry::new();
        registry.apply_removals(vec![ListenerId::from_raw(999)]);
    }
}
