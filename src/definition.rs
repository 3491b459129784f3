//! Declarations fed into the registry builder, and the immutable
//! definitions it produces.

use std::sync::Arc;

bitflags::bitflags! {
    /// Per-tag flags. Flags of a declared tag propagate to the ancestors
    /// synthesized for it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TagFlags: u32 {
        /// Tag pickers should not offer this tag.
        const HIDE_IN_EDITOR = 1 << 0;
    }
}

impl TagFlags {
    /// Parse a flag from its display name (`"HideInEditor"`), falling back to
    /// the constant name (`"HIDE_IN_EDITOR"`) understood by
    /// [`from_name`](Self::from_name).
    pub fn from_display_name(name: &str) -> Option<Self> {
        match name {
            "HideInEditor" => Some(Self::HIDE_IN_EDITOR),
            "None" => Some(Self::empty()),
            _ => Self::from_name(name),
        }
    }
}

/// One `(name, description, flags)` tuple handed to the registry builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagDeclaration {
    pub name: String,
    pub description: String,
    pub flags: TagFlags,
}

impl TagDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>, flags: TagFlags) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            flags,
        }
    }

    /// Declaration with no description and no flags.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, String::new(), TagFlags::empty())
    }
}

/// A registered tag. Owned by [`TagRegistry`](crate::TagRegistry) and
/// addressed by its runtime index.
///
/// All index lists are ascending. Because runtime indices follow the
/// case-insensitive name order, ancestors always have smaller indices than
/// their descendants, and a tag's descendants form the block of indices
/// directly after it. The one exception is names that differ only in case:
/// `["A.b", "a"]` sorts as `A, a, A.b`, so `a` sits between `A` and its
/// child. The lists stored here stay exact; only container scans that stop
/// at the first non-descendant miss such children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagDefinition {
    pub(crate) name: Arc<str>,
    pub(crate) description: String,
    pub(crate) flags: TagFlags,
    pub(crate) runtime_index: u32,
    pub(crate) hierarchy_level: usize,
    pub(crate) parent: Option<u32>,
    /// Immediate children.
    pub(crate) children: Vec<u32>,
    /// Every descendant, not only immediate children.
    pub(crate) descendants: Vec<u32>,
    /// Root → immediate parent.
    pub(crate) parent_chain: Vec<u32>,
    /// `parent_chain` + self.
    pub(crate) hierarchy_chain: Vec<u32>,
    /// True if the builder created this tag as a missing ancestor.
    pub(crate) synthesized: bool,
}

impl TagDefinition {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The last label of the name.
    #[inline]
    pub fn label(&self) -> &str {
        crate::name::label(&self.name)
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn flags(&self) -> TagFlags {
        self.flags
    }

    #[inline]
    pub fn runtime_index(&self) -> u32 {
        self.runtime_index
    }

    /// Number of labels: `"A"` is 1, `"A.B"` is 2.
    #[inline]
    pub fn hierarchy_level(&self) -> usize {
        self.hierarchy_level
    }

    #[inline]
    pub fn parent_index(&self) -> Option<u32> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[u32] {
        &self.children
    }

    #[inline]
    pub fn descendants(&self) -> &[u32] {
        &self.descendants
    }

    #[inline]
    pub fn parent_chain(&self) -> &[u32] {
        &self.parent_chain
    }

    #[inline]
    pub fn hierarchy_chain(&self) -> &[u32] {
        &self.hierarchy_chain
    }

    #[inline]
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    /// Strict: true if `ancestor` is one of this tag's ancestors.
    pub fn is_child_of(&self, ancestor: u32) -> bool {
        if ancestor >= self.runtime_index {
            return false;
        }
        match self.parent_chain.first() {
            Some(&root) if ancestor < root => false,
            Some(_) => self.parent_chain.binary_search(&ancestor).is_ok(),
            None => false,
        }
    }

    /// Strict: true if `descendant` is one of this tag's descendants.
    pub fn is_parent_of(&self, descendant: u32) -> bool {
        if descendant <= self.runtime_index {
            return false;
        }
        match self.descendants.last() {
            Some(&last) if descendant > last => false,
            Some(_) => self.descendants.binary_search(&descendant).is_ok(),
            None => false,
        }
    }
}
