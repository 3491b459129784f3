//! The tag handle: a name plus its runtime index.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::definition::{TagDefinition, TagFlags};
use crate::error::Result;
use crate::registry::TagRegistry;

/// Runtime index carried by [`Tag::NONE`].
pub const NONE_INDEX: u32 = u32::MAX;

/// A handle to a registered tag.
///
/// Handles are cheap to clone and compare by runtime index only. Derived
/// data (parents, children, description, flags) is resolved against the
/// [`TagRegistry`] that issued the handle; asking for it on [`Tag::NONE`]
/// fails with [`TagError::InvalidTagOperation`](crate::TagError::InvalidTagOperation).
#[derive(Clone)]
pub struct Tag {
    name: Option<Arc<str>>,
    index: u32,
}

impl Tag {
    /// The "no tag" handle.
    pub const NONE: Tag = Tag {
        name: None,
        index: NONE_INDEX,
    };

    #[inline]
    pub(crate) fn new(name: Arc<str>, index: u32) -> Self {
        Self {
            name: Some(name),
            index,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.index == NONE_INDEX
    }

    /// Full dotted name.
    pub fn name(&self) -> Result<&str> {
        self.name
            .as_deref()
            .ok_or(crate::TagError::InvalidTagOperation("read the name"))
    }

    /// Runtime index, `None` for [`Tag::NONE`].
    #[inline]
    pub fn runtime_index(&self) -> Option<u32> {
        (!self.is_none()).then_some(self.index)
    }

    /// Runtime index including the sentinel. Never matches a stored index.
    #[inline]
    pub(crate) fn raw_index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn definition<'r>(&self, registry: &'r TagRegistry) -> Result<&'r TagDefinition> {
        registry.definition(self)
    }

    pub fn label<'r>(&self, registry: &'r TagRegistry) -> Result<&'r str> {
        Ok(self.definition(registry)?.label())
    }

    pub fn description<'r>(&self, registry: &'r TagRegistry) -> Result<&'r str> {
        Ok(self.definition(registry)?.description())
    }

    pub fn flags(&self, registry: &TagRegistry) -> Result<TagFlags> {
        Ok(self.definition(registry)?.flags())
    }

    pub fn hierarchy_level(&self, registry: &TagRegistry) -> Result<usize> {
        Ok(self.definition(registry)?.hierarchy_level())
    }

    /// Immediate parent, or [`Tag::NONE`] for a root tag.
    pub fn parent(&self, registry: &TagRegistry) -> Result<Tag> {
        let def = self.definition(registry)?;
        Ok(def
            .parent_index()
            .and_then(|i| registry.tag_at(i))
            .unwrap_or(Tag::NONE))
    }

    /// Ancestors, root first. `"A.B.C"` → `[A, A.B]`.
    pub fn parent_tags(&self, registry: &TagRegistry) -> Result<Vec<Tag>> {
        Ok(registry.tags_at(self.definition(registry)?.parent_chain()))
    }

    /// All descendants in ascending index order.
    pub fn child_tags(&self, registry: &TagRegistry) -> Result<Vec<Tag>> {
        Ok(registry.tags_at(self.definition(registry)?.descendants()))
    }

    /// Ancestors plus self, root first.
    pub fn hierarchy_tags(&self, registry: &TagRegistry) -> Result<Vec<Tag>> {
        Ok(registry.tags_at(self.definition(registry)?.hierarchy_chain()))
    }

    /// Strict ancestor test: `Test.A` is a child of `Test`, but not of itself.
    pub fn is_child_of(&self, ancestor: &Tag, registry: &TagRegistry) -> Result<bool> {
        Ok(self.definition(registry)?.is_child_of(ancestor.index))
    }

    /// Strict descendant test.
    pub fn is_parent_of(&self, descendant: &Tag, registry: &TagRegistry) -> Result<bool> {
        Ok(self.definition(registry)?.is_parent_of(descendant.index))
    }
}

impl Default for Tag {
    fn default() -> Self {
        Self::NONE
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Tag {}

/// Compares against the tag's name; [`Tag::NONE`] equals no string.
impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.name.as_deref() == Some(other)
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_deref().unwrap_or("<None>"))
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Tag({name}#{})", self.index),
            None => f.write_str("Tag(<None>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TagRegistry;
    use crate::TagError;

    fn registry() -> TagRegistry {
        TagRegistry::from_names([
            "Test.A.B",
            "Test.Parent.FirstChild",
            "Test.Parent.SecondChild.Grandson",
        ])
        .unwrap()
    }

    #[test]
    fn none_handle_rejects_derived_queries() {
        let reg = registry();
        let none = Tag::NONE;

        assert!(none.is_none());
        assert_eq!(none.runtime_index(), None);
        assert_eq!(none.to_string(), "<None>");
        assert!(matches!(none.name(), Err(TagError::InvalidTagOperation(_))));
        assert!(matches!(none.parent(&reg), Err(TagError::InvalidTagOperation(_))));
        assert!(none.child_tags(&reg).is_err());
        assert!(none.description(&reg).is_err());
        assert_eq!(none, Tag::default());
    }

    #[test]
    fn comparison() {
        let reg = registry();
        let a0 = reg.request_tag("Test.A");
        let a1 = reg.request_tag("Test.A");
        let b = reg.request_tag("Test.A.B");

        assert_eq!(a0, a1);
        assert_ne!(a0, b);
        assert!(a0 == "Test.A");
        assert!(a0 < b);
    }

    #[test]
    fn parent_and_child_relations() {
        let reg = registry();
        let test = reg.request_tag("Test");
        let a = reg.request_tag("Test.A");
        let b = reg.request_tag("Test.A.B");

        assert!(test.is_parent_of(&a, &reg).unwrap());
        assert!(test.is_parent_of(&b, &reg).unwrap());
        assert!(a.is_parent_of(&b, &reg).unwrap());
        assert!(!b.is_parent_of(&b, &reg).unwrap());
        assert!(!b.is_parent_of(&a, &reg).unwrap());

        assert!(a.is_child_of(&test, &reg).unwrap());
        assert!(b.is_child_of(&test, &reg).unwrap());
        assert!(b.is_child_of(&a, &reg).unwrap());
        assert!(!b.is_child_of(&b, &reg).unwrap());
        assert!(!test.is_child_of(&b, &reg).unwrap());
    }

    #[test]
    fn derived_tag_lists() {
        let reg = registry();
        let test = reg.request_tag("Test");
        let parent = reg.request_tag("Test.Parent");
        let first = reg.request_tag("Test.Parent.FirstChild");
        let second = reg.request_tag("Test.Parent.SecondChild");
        let grandson = reg.request_tag("Test.Parent.SecondChild.Grandson");

        assert_eq!(first.parent_tags(&reg).unwrap(), vec![test.clone(), parent.clone()]);
        assert_eq!(
            grandson.parent_tags(&reg).unwrap(),
            vec![test.clone(), parent.clone(), second.clone()]
        );
        assert_eq!(
            parent.child_tags(&reg).unwrap(),
            vec![first.clone(), second.clone(), grandson.clone()]
        );
        assert_eq!(second.child_tags(&reg).unwrap(), vec![grandson.clone()]);
        assert!(grandson.child_tags(&reg).unwrap().is_empty());
        assert_eq!(
            grandson.hierarchy_tags(&reg).unwrap(),
            vec![test.clone(), parent.clone(), second.clone(), grandson.clone()]
        );
        assert_eq!(test.hierarchy_tags(&reg).unwrap(), vec![test.clone()]);

        assert_eq!(grandson.parent(&reg).unwrap(), second);
        assert!(test.parent(&reg).unwrap().is_none());
        assert_eq!(grandson.label(&reg).unwrap(), "Grandson");
        assert_eq!(grandson.hierarchy_level(&reg).unwrap(), 4);
    }
}
