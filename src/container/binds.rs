use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::TagCountContainer;
use crate::error::{Result, TagError};
use crate::events::{CallbackId, TagEventKind};
use crate::tag::Tag;

/// Presence bindings: `Fn(bool)` callbacks that track whether a tag is in a
/// shared [`TagCountContainer`].
///
/// A bound callback is called once right away with the current presence and
/// then every time the tag enters or leaves the container. Dropping a
/// `TagBinds` keeps its callbacks registered; call
/// [`unbind_all`](Self::unbind_all) to remove them.
///
/// ```ignore
/// let mut binds = TagBinds::new(&member.shared());
/// binds.bind(&registry.request_tag("Status.Debuff.Stun"), move |stunned| {
///     input_enabled.set(!stunned);
/// })?;
/// ```
#[derive(Debug)]
pub struct TagBinds {
    container: Weak<RefCell<TagCountContainer>>,
    ids: Vec<CallbackId>,
}

impl TagBinds {
    pub fn new(container: &Rc<RefCell<TagCountContainer>>) -> Self {
        Self {
            container: Rc::downgrade(container),
            ids: Vec::new(),
        }
    }

    /// Bind `on_change` to the presence of `tag`.
    ///
    /// # Errors
    ///
    /// [`TagError::InvalidTagOperation`] for [`Tag::NONE`] or when the
    /// container has been dropped.
    ///
    /// # Panics
    ///
    /// If the container is currently borrowed.
    pub fn bind<F>(&mut self, tag: &Tag, on_change: F) -> Result<()>
    where
        F: Fn(bool) + 'static,
    {
        let container = self
            .container
            .upgrade()
            .ok_or(TagError::InvalidTagOperation("bind to a dropped container"))?;
        let on_change = Rc::new(on_change);

        let listener = Rc::clone(&on_change);
        let id = container.borrow_mut().register_callback(
            tag,
            TagEventKind::NewOrRemoved,
            move |_, count| (*listener)(count > 0),
        )?;
        self.ids.push(id);

        let present = container.borrow().tag_count(tag) > 0;
        (*on_change)(present);
        Ok(())
    }

    /// Remove every callback bound through this instance.
    pub fn unbind_all(&mut self) {
        let Some(container) = self.container.upgrade() else {
            self.ids.clear();
            return;
        };
        let mut container = container.borrow_mut();
        for id in self.ids.drain(..) {
            container.remove_callback(id);
        }
    }

    /// Number of active bindings.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TagRegistry;
    use crate::{TagHierarchicalContainer, TagSet};
    use std::sync::Arc;

    fn registry() -> Arc<TagRegistry> {
        Arc::new(TagRegistry::from_names(["Test.A.B", "Test.D"]).unwrap())
    }

    fn recorder(log: &Rc<RefCell<Vec<bool>>>) -> impl Fn(bool) + 'static {
        let log = Rc::clone(log);
        move |present| log.borrow_mut().push(present)
    }

    #[test]
    fn bind_reports_now_and_on_transitions() {
        let reg = registry();
        let container = Rc::new(RefCell::new(TagCountContainer::new(reg.clone())));
        let a = reg.request_tag("Test.A");
        let b = reg.request_tag("Test.A.B");
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut binds = TagBinds::new(&container);
        binds.bind(&a, recorder(&log)).unwrap();
        assert_eq!(*log.borrow(), vec![false]);

        container.borrow_mut().add_tag(&b).unwrap();
        container.borrow_mut().add_tag(&a).unwrap();
        container.borrow_mut().remove_tag(&b).unwrap();
        assert_eq!(*log.borrow(), vec![false, true]);

        container.borrow_mut().remove_tag(&a).unwrap();
        assert_eq!(*log.borrow(), vec![false, true, false]);
    }

    #[test]
    fn bind_to_present_tag_starts_true() {
        let reg = registry();
        let container = Rc::new(RefCell::new(TagCountContainer::new(reg.clone())));
        container.borrow_mut().add_tag(&reg.request_tag("Test.D")).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut binds = TagBinds::new(&container);
        binds.bind(&reg.request_tag("Test"), recorder(&log)).unwrap();
        assert_eq!(*log.borrow(), vec![true]);
        assert!(binds.bind(&Tag::NONE, recorder(&log)).is_err());
        assert_eq!(binds.len(), 1);
    }

    #[test]
    fn unbind_all_silences_bindings() {
        let reg = registry();
        let container = Rc::new(RefCell::new(TagCountContainer::new(reg.clone())));
        let d = reg.request_tag("Test.D");
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut binds = TagBinds::new(&container);
        binds.bind(&d, recorder(&log)).unwrap();
        binds.bind(&reg.request_tag("Test"), recorder(&log)).unwrap();
        binds.unbind_all();
        assert!(binds.is_empty());

        container.borrow_mut().add_tag(&d).unwrap();
        assert_eq!(*log.borrow(), vec![false, false]);
    }

    #[test]
    fn bindings_on_a_hierarchical_container_can_read_it() {
        let reg = registry();
        let mut member = TagHierarchicalContainer::new(reg.clone());
        let shared = member.shared();
        let d = reg.request_tag("Test.D");
        let seen = Rc::new(RefCell::new(Vec::new()));

        let mut binds = TagBinds::new(&shared);
        {
            let weak = Rc::downgrade(&shared);
            let seen = Rc::clone(&seen);
            binds
                .bind(&d, move |present| {
                    let container = weak.upgrade().unwrap();
                    let len = match container.try_borrow() {
                        Ok(c) => Some(c.len()),
                        Err(_) => None,
                    };
                    seen.borrow_mut().push((present, len));
                })
                .unwrap();
        }

        member.add_tag(&d).unwrap();
        member.clear();
        assert_eq!(
            *seen.borrow(),
            vec![(false, Some(0)), (true, Some(2)), (false, Some(0))]
        );
    }

    #[test]
    fn dropped_container_cannot_be_bound() {
        let reg = registry();
        let container = Rc::new(RefCell::new(TagCountContainer::new(reg.clone())));
        let mut binds = TagBinds::new(&container);
        drop(container);

        assert!(binds.bind(&reg.request_tag("Test.D"), |_| {}).is_err());
        binds.unbind_all();
    }
}
