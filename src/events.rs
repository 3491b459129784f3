//! Change notifications for [`TagCountContainer`](crate::TagCountContainer).
//!
//! Listeners are keyed by `(tag, kind)` or registered globally for every tag.
//! A mutating call never invokes a listener directly: it queues
//! pending events while it updates indices and counts, and the queue is
//! drained once the container is consistent again.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap as HashMap;

use crate::registry::TagRegistry;
use crate::tag::Tag;

/// Which count changes a listener observes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagEventKind {
    /// The tag entered (count 0 → n) or left (count n → 0) the container.
    NewOrRemoved,
    /// Any change of the tag's implicit count.
    AnyCountChange,
}

/// Listener signature: the changed tag and its new implicit count.
///
/// Using `Rc<dyn Fn>` lets queued events hold on to the listener even if it
/// is unregistered by an earlier listener of the same batch.
pub type TagEventCallback = Rc<dyn Fn(&Tag, u32)>;

/// Handle returned by registration, used to unregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

type Handlers = Vec<(CallbackId, TagEventCallback)>;

/// Per-container listener registry.
#[derive(Default, Clone)]
pub(crate) struct TagListeners {
    specific: HashMap<(u32, TagEventKind), Handlers>,
    global_new_or_removed: Handlers,
    global_any_count: Handlers,
    next_id: u64,
}

impl TagListeners {
    fn next_id(&mut self) -> CallbackId {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn register(&mut self, index: u32, kind: TagEventKind, callback: TagEventCallback) -> CallbackId {
        let id = self.next_id();
        self.specific
            .entry((index, kind))
            .or_default()
            .push((id, callback));
        id
    }

    pub(crate) fn register_global(&mut self, kind: TagEventKind, callback: TagEventCallback) -> CallbackId {
        let id = self.next_id();
        self.global_mut(kind).push((id, callback));
        id
    }

    /// Returns `false` if no listener has this id.
    pub(crate) fn remove(&mut self, id: CallbackId) -> bool {
        for handlers in [&mut self.global_new_or_removed, &mut self.global_any_count] {
            if let Some(pos) = handlers.iter().position(|(handler_id, _)| *handler_id == id) {
                handlers.remove(pos);
                return true;
            }
        }

        let mut emptied = None;
        let mut found = false;
        for (key, handlers) in self.specific.iter_mut() {
            if let Some(pos) = handlers.iter().position(|(handler_id, _)| *handler_id == id) {
                handlers.remove(pos);
                found = true;
                if handlers.is_empty() {
                    emptied = Some(*key);
                }
                break;
            }
        }
        if let Some(key) = emptied {
            self.specific.remove(&key);
        }
        found
    }

    pub(crate) fn clear(&mut self) {
        self.specific.clear();
        self.global_new_or_removed.clear();
        self.global_any_count.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.specific.values().map(Vec::len).sum::<usize>()
            + self.global_new_or_removed.len()
            + self.global_any_count.len()
    }

    fn global(&self, kind: TagEventKind) -> &Handlers {
        match kind {
            TagEventKind::NewOrRemoved => &self.global_new_or_removed,
            TagEventKind::AnyCountChange => &self.global_any_count,
        }
    }

    fn global_mut(&mut self, kind: TagEventKind) -> &mut Handlers {
        match kind {
            TagEventKind::NewOrRemoved => &mut self.global_new_or_removed,
            TagEventKind::AnyCountChange => &mut self.global_any_count,
        }
    }

    /// Queue the events for one count change of `index`.
    ///
    /// Order: tag NewOrRemoved, global NewOrRemoved (only if `transitioned`),
    /// then tag AnyCountChange, global AnyCountChange.
    pub(crate) fn queue(
        &self,
        registry: &TagRegistry,
        index: u32,
        count: u32,
        transitioned: bool,
        pending: &mut Vec<PendingEvent>,
    ) {
        if self.len() == 0 {
            return;
        }
        let Some(tag) = registry.tag_at(index) else {
            return;
        };

        let kinds: &[TagEventKind] = if transitioned {
            &[TagEventKind::NewOrRemoved, TagEventKind::AnyCountChange]
        } else {
            &[TagEventKind::AnyCountChange]
        };

        for &kind in kinds {
            let specific = self.specific.get(&(index, kind)).into_iter().flatten();
            for (_, callback) in specific.chain(self.global(kind)) {
                pending.push(PendingEvent {
                    callback: Rc::clone(callback),
                    tag: tag.clone(),
                    count,
                });
            }
        }
    }
}

impl fmt::Debug for TagListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagListeners")
            .field("registered", &self.len())
            .finish()
    }
}

/// A listener invocation captured during a mutation.
pub(crate) struct PendingEvent {
    callback: TagEventCallback,
    tag: Tag,
    count: u32,
}

/// Run queued events in order.
pub(crate) fn fire(pending: Vec<PendingEvent>) {
    for event in pending {
        (event.callback)(&event.tag, event.count);
    }
}
