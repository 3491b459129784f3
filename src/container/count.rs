use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;
use tracing::warn;

use super::{TagSet, fmt_tag_set};
use crate::error::{Result, TagError};
use crate::events::{self, CallbackId, PendingEvent, TagEventKind, TagListeners};
use crate::indices::{self, TagSetIndices};
use crate::registry::TagRegistry;
use crate::tag::Tag;

/// A reference-counted tag set with change notifications.
///
/// Every `add_tag` increments the tag's explicit count and the implicit count
/// of each tag in its hierarchy chain; `remove_tag` undoes one add. A tag is
/// present while its count is positive, so independent sources can hold the
/// same tag without stepping on each other.
///
/// # Events
///
/// Listeners registered per tag or globally are invoked after the mutating
/// call has finished updating indices and counts. For each tag of a hierarchy
/// chain, root first:
///
/// 1. `NewOrRemoved` when the implicit count went 0 → n or n → 0
/// 2. `AnyCountChange` on every change
///
/// Listeners receive the tag and its new count. They run once the container
/// is consistent, but still inside the `&mut self` call: a container kept in
/// a `RefCell` and mutated through `borrow_mut()` stays borrowed while they
/// run. [`TagHierarchicalContainer`](super::TagHierarchicalContainer)
/// releases its borrows first, so its listeners may read either container.
pub struct TagCountContainer {
    registry: Arc<TagRegistry>,
    indices: TagSetIndices,
    explicit_counts: HashMap<u32, u32>,
    implicit_counts: HashMap<u32, u32>,
    listeners: TagListeners,
}

impl TagCountContainer {
    pub fn new(registry: Arc<TagRegistry>) -> Self {
        Self {
            registry,
            indices: TagSetIndices::default(),
            explicit_counts: HashMap::default(),
            implicit_counts: HashMap::default(),
            listeners: TagListeners::default(),
        }
    }

    // =========================================================================
    // Counts
    // =========================================================================

    /// Implicit count: how many explicit adds cover `tag`. 0 if absent.
    #[inline]
    pub fn tag_count(&self, tag: &Tag) -> u32 {
        tag.runtime_index()
            .and_then(|i| self.implicit_counts.get(&i).copied())
            .unwrap_or(0)
    }

    /// How many times `tag` itself was added. 0 if absent.
    #[inline]
    pub fn explicit_tag_count(&self, tag: &Tag) -> u32 {
        tag.runtime_index()
            .and_then(|i| self.explicit_counts.get(&i).copied())
            .unwrap_or(0)
    }

    /// `(index, explicit count)` for every explicit tag, ascending.
    pub(crate) fn explicit_entries(&self) -> Vec<(u32, u32)> {
        self.indices
            .explicit
            .iter()
            .map(|&i| (i, self.explicit_counts.get(&i).copied().unwrap_or(0)))
            .collect()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    pub fn add_tag(&mut self, tag: &Tag) -> Result<()> {
        let pending = self.add_tag_deferred(tag)?;
        events::fire(pending);
        Ok(())
    }

    /// Remove one count of an explicit tag.
    ///
    /// Returns `Ok(false)` and logs a warning if `tag` has no explicit count.
    pub fn remove_tag(&mut self, tag: &Tag) -> Result<bool> {
        let (removed, pending) = self.remove_tag_deferred(tag)?;
        events::fire(pending);
        Ok(removed)
    }

    /// Add every explicit tag of `other` once. Events fire after all adds.
    pub fn add_tags<S: TagSet + ?Sized>(&mut self, other: &S) {
        events::fire(self.add_tags_deferred(other));
    }

    /// Remove one count of every explicit tag of `other`; missing ones are
    /// warned about and skipped. Returns how many were removed.
    pub fn remove_tags<S: TagSet + ?Sized>(&mut self, other: &S) -> usize {
        let (removed, pending) = self.remove_tags_deferred(other);
        events::fire(pending);
        removed
    }

    /// Drop every tag and count. Each implicit tag reports count 0.
    pub fn clear(&mut self) {
        events::fire(self.clear_deferred());
    }

    // -------------------------------------------------------------------------
    // Deferred halves: update state, hand back the events to fire. Owners that
    // keep the container in a `RefCell` release the borrow before firing.
    // -------------------------------------------------------------------------

    pub(crate) fn add_tag_deferred(&mut self, tag: &Tag) -> Result<Vec<PendingEvent>> {
        let index = self.resolve(tag, "add a tag")?;
        let mut pending = Vec::new();
        self.add_index(index, 1, &mut pending);
        Ok(pending)
    }

    pub(crate) fn remove_tag_deferred(&mut self, tag: &Tag) -> Result<(bool, Vec<PendingEvent>)> {
        let index = self.resolve(tag, "remove a tag")?;
        let mut pending = Vec::new();
        let removed = self.remove_index(index, 1, &mut pending);
        Ok((removed, pending))
    }

    pub(crate) fn add_tags_deferred<S: TagSet + ?Sized>(&mut self, other: &S) -> Vec<PendingEvent> {
        let mut pending = Vec::new();
        for &index in other.explicit_indices() {
            self.add_index(index, 1, &mut pending);
        }
        pending
    }

    pub(crate) fn remove_tags_deferred<S: TagSet + ?Sized>(&mut self, other: &S) -> (usize, Vec<PendingEvent>) {
        let mut pending = Vec::new();
        let removed = other
            .explicit_indices()
            .iter()
            .filter(|&&index| self.remove_index(index, 1, &mut pending))
            .count();
        (removed, pending)
    }

    pub(crate) fn clear_deferred(&mut self) -> Vec<PendingEvent> {
        let mut pending = Vec::new();
        for &index in &self.indices.implicit {
            self.listeners
                .queue(&self.registry, index, 0, true, &mut pending);
        }
        self.indices.clear();
        self.explicit_counts.clear();
        self.implicit_counts.clear();
        pending
    }

    /// Add `(index, times)` entries as one batch.
    pub(crate) fn add_repeated_deferred(&mut self, entries: &[(u32, u32)]) -> Vec<PendingEvent> {
        let mut pending = Vec::new();
        for &(index, times) in entries {
            self.add_index(index, times, &mut pending);
        }
        pending
    }

    /// Remove `(index, times)` entries as one batch.
    pub(crate) fn remove_repeated_deferred(&mut self, entries: &[(u32, u32)]) -> Vec<PendingEvent> {
        let mut pending = Vec::new();
        for &(index, times) in entries {
            self.remove_index(index, times, &mut pending);
        }
        pending
    }

    fn resolve(&self, tag: &Tag, op: &'static str) -> Result<u32> {
        self.registry
            .definition(tag)
            .map(|def| def.runtime_index())
            .map_err(|_| TagError::InvalidTagOperation(op))
    }

    fn add_index(&mut self, index: u32, times: u32, pending: &mut Vec<PendingEvent>) {
        if times == 0 {
            return;
        }
        let Self {
            registry,
            indices,
            explicit_counts,
            implicit_counts,
            listeners,
        } = self;
        let registry: &TagRegistry = registry;
        let Some(def) = registry.definition_at(index) else {
            return;
        };

        let explicit = explicit_counts.entry(index).or_insert(0);
        if *explicit == 0 {
            indices::insert_sorted(&mut indices.explicit, index);
        }
        *explicit += times;

        for &link in def.hierarchy_chain() {
            let count = implicit_counts.entry(link).or_insert(0);
            let entered = *count == 0;
            *count += times;
            if entered {
                indices::insert_sorted(&mut indices.implicit, link);
            }
            listeners.queue(registry, link, *count, entered, pending);
        }
    }

    /// Returns `false` (with a warning) if `index` has no explicit count.
    fn remove_index(&mut self, index: u32, times: u32, pending: &mut Vec<PendingEvent>) -> bool {
        let Self {
            registry,
            indices,
            explicit_counts,
            implicit_counts,
            listeners,
        } = self;
        let registry: &TagRegistry = registry;

        let Some(explicit) = explicit_counts.get_mut(&index).filter(|c| **c > 0) else {
            let tag = registry.tag_at(index).unwrap_or(Tag::NONE);
            warn!("{}", TagError::TagNotExplicitlyPresent(tag.to_string()));
            return false;
        };
        let Some(def) = registry.definition_at(index) else {
            return false;
        };

        let times = times.min(*explicit);
        *explicit -= times;
        if *explicit == 0 {
            explicit_counts.remove(&index);
            indices::remove_sorted(&mut indices.explicit, index);
        }

        for &link in def.hierarchy_chain() {
            let Some(count) = implicit_counts.get_mut(&link) else {
                continue;
            };
            *count = count.saturating_sub(times);
            let left = *count == 0;
            let new_count = *count;
            if left {
                implicit_counts.remove(&link);
                indices::remove_sorted(&mut indices.implicit, link);
            }
            listeners.queue(registry, link, new_count, left, pending);
        }
        true
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Listen to changes of one tag. Fails for [`Tag::NONE`].
    pub fn register_callback<F>(&mut self, tag: &Tag, kind: TagEventKind, callback: F) -> Result<CallbackId>
    where
        F: Fn(&Tag, u32) + 'static,
    {
        let index = self.resolve(tag, "register a callback")?;
        Ok(self.listeners.register(index, kind, Rc::new(callback)))
    }

    /// Listen to changes of every tag.
    pub fn register_global_callback<F>(&mut self, kind: TagEventKind, callback: F) -> CallbackId
    where
        F: Fn(&Tag, u32) + 'static,
    {
        self.listeners.register_global(kind, Rc::new(callback))
    }

    /// Returns `false` if the id is unknown (or already removed).
    pub fn remove_callback(&mut self, id: CallbackId) -> bool {
        self.listeners.remove(id)
    }

    pub fn remove_all_callbacks(&mut self) {
        self.listeners.clear();
    }
}

impl TagSet for TagCountContainer {
    #[inline]
    fn registry(&self) -> &Arc<TagRegistry> {
        &self.registry
    }

    #[inline]
    fn explicit_indices(&self) -> &[u32] {
        &self.indices.explicit
    }

    #[inline]
    fn implicit_indices(&self) -> &[u32] {
        &self.indices.implicit
    }
}

impl fmt::Debug for TagCountContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_tag_set(self, f, |i| {
            let explicit = self.explicit_counts.get(&i).copied().unwrap_or(0);
            let total = self.implicit_counts.get(&i).copied().unwrap_or(0);
            Some(format!("(Explicit: {explicit}, Total: {total})"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TagContainer;
    use std::cell::RefCell;

    fn registry() -> Arc<TagRegistry> {
        Arc::new(TagRegistry::from_names(["Test.A.B.C0", "Test.A.B.C1", "Test.D"]).unwrap())
    }

    type Log = Rc<RefCell<Vec<(String, u32)>>>;

    fn record(log: &Log) -> impl Fn(&Tag, u32) + 'static {
        let log = Rc::clone(log);
        move |tag: &Tag, count: u32| log.borrow_mut().push((tag.to_string(), count))
    }

    #[test]
    fn counts_follow_hierarchy() {
        let reg = registry();
        let mut c = TagCountContainer::new(reg.clone());
        let b = reg.request_tag("Test.A.B");
        let c0 = reg.request_tag("Test.A.B.C0");
        let test = reg.request_tag("Test");

        c.add_tag(&b).unwrap();
        c.add_tag(&c0).unwrap();
        c.add_tag(&c0).unwrap();

        assert_eq!(c.explicit_tag_count(&c0), 2);
        assert_eq!(c.tag_count(&c0), 2);
        assert_eq!(c.explicit_tag_count(&b), 1);
        assert_eq!(c.tag_count(&b), 3);
        assert_eq!(c.tag_count(&test), 3);
        assert_eq!(c.explicit_tag_count(&test), 0);

        assert!(c.remove_tag(&c0).unwrap());
        assert!(c.has_tag_exact(&c0));
        assert!(c.remove_tag(&c0).unwrap());
        assert!(!c.has_tag(&c0));
        assert_eq!(c.tag_count(&test), 1);

        assert!(c.remove_tag(&b).unwrap());
        assert!(c.is_empty());
        assert_eq!(c.len(), 0);
        assert_eq!(c.tag_count(&test), 0);
    }

    #[test]
    fn remove_missing_keeps_state() {
        let reg = registry();
        let mut c = TagCountContainer::new(reg.clone());
        c.add_tag(&reg.request_tag("Test.A.B")).unwrap();

        assert!(!c.remove_tag(&reg.request_tag("Test.A")).unwrap());
        assert_eq!(c.tag_count(&reg.request_tag("Test.A")), 1);
        assert!(c.remove_tag(&Tag::NONE).is_err());
    }

    #[test]
    fn events_fire_on_transitions_and_every_change() {
        let reg = registry();
        let a = reg.request_tag("Test.A");
        let mut c = TagCountContainer::new(reg.clone());
        let any: Log = Rc::default();
        let new: Log = Rc::default();

        let any_id = c.register_callback(&a, TagEventKind::AnyCountChange, record(&any)).unwrap();
        let new_id = c.register_callback(&a, TagEventKind::NewOrRemoved, record(&new)).unwrap();

        c.add_tag(&a).unwrap();
        c.add_tag(&a).unwrap();
        c.remove_tag(&a).unwrap();
        c.remove_tag(&a).unwrap();

        assert_eq!(any.borrow().len(), 4);
        assert_eq!(
            *new.borrow(),
            vec![("Test.A".to_string(), 1), ("Test.A".to_string(), 0)]
        );

        assert!(c.remove_callback(any_id));
        assert!(c.remove_callback(new_id));
        c.add_tag(&a).unwrap();
        c.remove_tag(&a).unwrap();
        assert_eq!(any.borrow().len(), 4);
        assert_eq!(new.borrow().len(), 2);
    }

    #[test]
    fn deferred_mutation_hands_events_back() {
        let reg = registry();
        let d = reg.request_tag("Test.D");
        let mut c = TagCountContainer::new(reg.clone());
        let log: Log = Rc::default();
        c.register_global_callback(TagEventKind::NewOrRemoved, record(&log));

        let pending = c.add_tag_deferred(&d).unwrap();
        assert!(log.borrow().is_empty());
        assert!(c.has_tag_exact(&d));

        events::fire(pending);
        assert_eq!(
            *log.borrow(),
            vec![("Test".to_string(), 1), ("Test.D".to_string(), 1)]
        );
    }

    #[test]
    fn descendant_adds_count_on_ancestor_listeners() {
        let reg = registry();
        let a = reg.request_tag("Test.A");
        let b = reg.request_tag("Test.A.B");
        let mut c = TagCountContainer::new(reg.clone());
        let any: Log = Rc::default();
        let new: Log = Rc::default();
        c.register_callback(&a, TagEventKind::AnyCountChange, record(&any)).unwrap();
        c.register_callback(&a, TagEventKind::NewOrRemoved, record(&new)).unwrap();

        c.add_tag(&a).unwrap();
        c.add_tag(&a).unwrap();
        c.add_tag(&b).unwrap();
        c.remove_tag(&a).unwrap();
        c.remove_tag(&a).unwrap();
        c.remove_tag(&b).unwrap();

        let counts: Vec<u32> = any.borrow().iter().map(|(_, n)| *n).collect();
        assert_eq!(counts, vec![1, 2, 3, 2, 1, 0]);
        assert_eq!(new.borrow().len(), 2);
    }

    #[test]
    fn global_listener_sees_chain_root_first() {
        let reg = registry();
        let mut c = TagCountContainer::new(reg.clone());
        let log: Log = Rc::default();
        c.register_global_callback(TagEventKind::NewOrRemoved, record(&log));

        c.add_tag(&reg.request_tag("Test.A.B")).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                ("Test".to_string(), 1),
                ("Test.A".to_string(), 1),
                ("Test.A.B".to_string(), 1),
            ]
        );
    }

    #[test]
    fn batch_reports_each_transition_once() {
        let reg = registry();
        let d = reg.request_tag("Test.D");
        let c0 = reg.request_tag("Test.A.B.C0");
        let mut c = TagCountContainer::new(reg.clone());

        let transitions = Rc::new(RefCell::new(0usize));
        {
            let seen = Rc::clone(&transitions);
            c.register_callback(&reg.request_tag("Test"), TagEventKind::NewOrRemoved, move |_, _| {
                *seen.borrow_mut() += 1;
            })
            .unwrap();
        }

        let batch = TagContainer::with_tags(reg.clone(), [&c0, &d]).unwrap();
        c.add_tags(&batch);
        assert_eq!(*transitions.borrow(), 1);
        assert_eq!(c.tag_count(&reg.request_tag("Test")), 2);

        assert_eq!(c.remove_tags(&batch), 2);
        assert_eq!(*transitions.borrow(), 2);
        assert!(c.is_empty());
    }

    #[test]
    fn clear_reports_zero_for_every_tag() {
        let reg = registry();
        let mut c = TagCountContainer::new(reg.clone());
        let log: Log = Rc::default();
        c.register_global_callback(TagEventKind::NewOrRemoved, record(&log));

        c.add_tag(&reg.request_tag("Test.D")).unwrap();
        log.borrow_mut().clear();

        c.clear();
        assert_eq!(
            *log.borrow(),
            vec![("Test".to_string(), 0), ("Test.D".to_string(), 0)]
        );
        assert!(c.is_empty());
        assert_eq!(c.tag_count(&reg.request_tag("Test")), 0);
    }

    #[test]
    fn remove_all_callbacks_silences_listeners() {
        let reg = registry();
        let mut c = TagCountContainer::new(reg.clone());
        let log: Log = Rc::default();
        c.register_global_callback(TagEventKind::AnyCountChange, record(&log));
        c.register_callback(&reg.request_tag("Test"), TagEventKind::AnyCountChange, record(&log))
            .unwrap();

        c.remove_all_callbacks();
        c.add_tag(&reg.request_tag("Test.D")).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn debug_lists_counts() {
        let reg = registry();
        let mut c = TagCountContainer::new(reg.clone());
        c.add_tag(&reg.request_tag("Test.D")).unwrap();
        c.add_tag(&reg.request_tag("Test.D")).unwrap();

        assert_eq!(
            format!("{c:?}"),
            "Count (Explicit, Total) = (1, 2)\n  Test (Explicit: 0, Total: 2)\n  Test.D (Explicit: 2, Total: 2)\n"
        );
    }
}
