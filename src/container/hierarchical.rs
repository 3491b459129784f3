use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{TagCountContainer, TagSet};
use crate::error::Result;
use crate::events::{self, CallbackId, TagEventKind};
use crate::registry::TagRegistry;
use crate::tag::Tag;

/// A counting container that mirrors its explicit tags into a parent.
///
/// ```text
///   party (TagCountContainer)            Test.A ×2
///     ├── member 1 (hierarchical)        Test.A
///     └── member 2 (hierarchical)        Test.A
/// ```
///
/// Every add is applied locally and then to the parent, so the parent's
/// counts aggregate all children. Removals are forwarded only for tags the
/// child holds explicitly, which keeps one child from removing another
/// child's contribution.
///
/// The parent is held weakly. If it is dropped, the child carries on alone.
///
/// The local container is shared (`Rc<RefCell<_>>`) so it can in turn serve
/// as another hierarchical container's parent. Forwarding goes one hop only.
///
/// Listeners of both containers run after every borrow has been released, so
/// they may read the local container or the parent.
///
/// # Panics
///
/// Mutations borrow the local and the parent container mutably. Calling one
/// while a `Ref` from [`container`](Self::container) or on the parent is
/// still held panics.
pub struct TagHierarchicalContainer {
    local: Rc<RefCell<TagCountContainer>>,
    parent: Option<Weak<RefCell<TagCountContainer>>>,
}

impl TagHierarchicalContainer {
    pub fn new(registry: Arc<TagRegistry>) -> Self {
        Self {
            local: Rc::new(RefCell::new(TagCountContainer::new(registry))),
            parent: None,
        }
    }

    pub fn with_parent(registry: Arc<TagRegistry>, parent: &Rc<RefCell<TagCountContainer>>) -> Self {
        Self {
            local: Rc::new(RefCell::new(TagCountContainer::new(registry))),
            parent: Some(Rc::downgrade(parent)),
        }
    }

    /// Read access to the local container for queries.
    pub fn container(&self) -> Ref<'_, TagCountContainer> {
        self.local.borrow()
    }

    /// Shared handle to the local container, e.g. to parent another chain.
    pub fn shared(&self) -> Rc<RefCell<TagCountContainer>> {
        Rc::clone(&self.local)
    }

    /// The parent, if set and still alive.
    pub fn parent(&self) -> Option<Rc<RefCell<TagCountContainer>>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Move all local explicit tags (with their counts) from the current
    /// parent to `parent`.
    pub fn set_parent(&mut self, parent: Option<&Rc<RefCell<TagCountContainer>>>) {
        let entries = self.local.borrow().explicit_entries();

        if let Some(old) = self.live_parent() {
            let pending = old.borrow_mut().remove_repeated_deferred(&entries);
            events::fire(pending);
        }
        self.parent = parent.map(Rc::downgrade);
        if let Some(new) = parent {
            let pending = new.borrow_mut().add_repeated_deferred(&entries);
            events::fire(pending);
        }
        debug!(
            explicit = entries.len(),
            attached = parent.is_some(),
            "reassigned tag container parent"
        );
    }

    pub fn add_tag(&mut self, tag: &Tag) -> Result<()> {
        let local = self.local.borrow_mut().add_tag_deferred(tag)?;
        let forwarded = match self.live_parent() {
            Some(parent) => parent.borrow_mut().add_tag_deferred(tag)?,
            None => Vec::new(),
        };
        events::fire(local);
        events::fire(forwarded);
        Ok(())
    }

    /// Remove one count locally and, if that succeeded, from the parent.
    pub fn remove_tag(&mut self, tag: &Tag) -> Result<bool> {
        let (removed, local) = self.local.borrow_mut().remove_tag_deferred(tag)?;
        let mut forwarded = Vec::new();
        if removed {
            if let Some(parent) = self.live_parent() {
                forwarded = parent.borrow_mut().remove_tag_deferred(tag)?.1;
            }
        }
        events::fire(local);
        events::fire(forwarded);
        Ok(removed)
    }

    pub fn add_tags<S: TagSet + ?Sized>(&mut self, other: &S) {
        let local = self.local.borrow_mut().add_tags_deferred(other);
        let forwarded = match self.live_parent() {
            Some(parent) => parent.borrow_mut().add_tags_deferred(other),
            None => Vec::new(),
        };
        events::fire(local);
        events::fire(forwarded);
    }

    /// Remove every explicit tag of `other` locally; only the ones actually
    /// removed are forwarded to the parent.
    pub fn remove_tags<S: TagSet + ?Sized>(&mut self, other: &S) -> usize {
        let entries: Vec<(u32, u32)> = {
            let local = self.local.borrow();
            other
                .explicit_indices()
                .iter()
                .filter(|&&i| local.explicit_indices().binary_search(&i).is_ok())
                .map(|&i| (i, 1))
                .collect()
        };

        let (removed, local) = self.local.borrow_mut().remove_tags_deferred(other);
        let forwarded = match self.live_parent() {
            Some(parent) => parent.borrow_mut().remove_repeated_deferred(&entries),
            None => Vec::new(),
        };
        events::fire(local);
        events::fire(forwarded);
        removed
    }

    /// Clear locally and withdraw every local count from the parent.
    pub fn clear(&mut self) {
        let entries = self.local.borrow().explicit_entries();
        let local = self.local.borrow_mut().clear_deferred();
        let forwarded = match self.live_parent() {
            Some(parent) => parent.borrow_mut().remove_repeated_deferred(&entries),
            None => Vec::new(),
        };
        events::fire(local);
        events::fire(forwarded);
    }

    pub fn register_callback<F>(&mut self, tag: &Tag, kind: TagEventKind, callback: F) -> Result<CallbackId>
    where
        F: Fn(&Tag, u32) + 'static,
    {
        self.local.borrow_mut().register_callback(tag, kind, callback)
    }

    pub fn register_global_callback<F>(&mut self, kind: TagEventKind, callback: F) -> CallbackId
    where
        F: Fn(&Tag, u32) + 'static,
    {
        self.local.borrow_mut().register_global_callback(kind, callback)
    }

    pub fn remove_callback(&mut self, id: CallbackId) -> bool {
        self.local.borrow_mut().remove_callback(id)
    }

    pub fn remove_all_callbacks(&mut self) {
        self.local.borrow_mut().remove_all_callbacks();
    }

    /// Upgrade the parent; forget it if it was dropped.
    fn live_parent(&mut self) -> Option<Rc<RefCell<TagCountContainer>>> {
        let weak = self.parent.as_ref()?;
        match weak.upgrade() {
            Some(parent) => Some(parent),
            None => {
                warn!("parent tag container was dropped; detaching");
                self.parent = None;
                None
            }
        }
    }
}

impl fmt::Debug for TagHierarchicalContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagHierarchicalContainer")
            .field("local", &*self.local.borrow())
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}
