//! Tag containers.
//!
//! Every container keeps two ascending index lists:
//!
//! ```text
//! explicit: tags added directly          [Test.A.B.C0, Test.D]
//! implicit: explicit + all ancestors     [Test, Test.A, Test.A.B, Test.A.B.C0, Test.D]
//! ```
//!
//! The read-only query surface lives on the [`TagSet`] trait so plain,
//! counting and hierarchical containers can be mixed freely in queries.
//!
//! Containers hold a shared handle to the [`TagRegistry`] that issued their
//! tags. Mixing containers built from different registries in one query is
//! not detected and gives meaningless results.

mod binds;
mod count;
mod hierarchical;
mod plain;

pub use binds::TagBinds;
pub use count::TagCountContainer;
pub use hierarchical::TagHierarchicalContainer;
pub use plain::TagContainer;

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::error::{Result, TagError};
use crate::indices;
use crate::registry::TagRegistry;
use crate::tag::Tag;

/// Read-only queries shared by all containers.
pub trait TagSet {
    fn registry(&self) -> &Arc<TagRegistry>;

    /// Directly added tags, ascending runtime index.
    fn explicit_indices(&self) -> &[u32];

    /// Explicit tags plus all their ancestors, ascending runtime index.
    fn implicit_indices(&self) -> &[u32];

    #[inline]
    fn is_empty(&self) -> bool {
        self.explicit_indices().is_empty()
    }

    /// Number of implicit tags.
    #[inline]
    fn len(&self) -> usize {
        self.implicit_indices().len()
    }

    /// Number of explicit tags.
    #[inline]
    fn explicit_len(&self) -> usize {
        self.explicit_indices().len()
    }

    /// Implicit tags in ascending index order.
    fn tags(&self) -> TagIter<'_> {
        TagIter::new(self.registry(), self.implicit_indices())
    }

    /// Explicit tags in ascending index order.
    fn explicit_tags(&self) -> TagIter<'_> {
        TagIter::new(self.registry(), self.explicit_indices())
    }

    /// True if `tag` or one of its descendants was added. False for [`Tag::NONE`].
    fn has_tag(&self, tag: &Tag) -> bool {
        tag.runtime_index()
            .is_some_and(|i| indices::contains_sorted(self.implicit_indices(), i))
    }

    /// True if `tag` itself was added.
    fn has_tag_exact(&self, tag: &Tag) -> bool {
        tag.runtime_index()
            .is_some_and(|i| indices::contains_sorted(self.explicit_indices(), i))
    }

    /// True if any explicit tag of `other` is in this set's closure.
    /// False for an empty `other`.
    fn has_any<S: TagSet + ?Sized>(&self, other: &S) -> bool
    where
        Self: Sized,
    {
        indices::has_any(self.implicit_indices(), other.explicit_indices())
    }

    fn has_any_exact<S: TagSet + ?Sized>(&self, other: &S) -> bool
    where
        Self: Sized,
    {
        indices::has_any(self.explicit_indices(), other.explicit_indices())
    }

    /// True if every explicit tag of `other` is in this set's closure.
    /// Vacuously true for an empty `other`.
    fn has_all<S: TagSet + ?Sized>(&self, other: &S) -> bool
    where
        Self: Sized,
    {
        indices::has_all(self.implicit_indices(), other.explicit_indices())
    }

    fn has_all_exact<S: TagSet + ?Sized>(&self, other: &S) -> bool
    where
        Self: Sized,
    {
        indices::has_all(self.explicit_indices(), other.explicit_indices())
    }

    /// Append the ancestors of `tag` present in the closure, nearest first.
    fn collect_parent_tags(&self, tag: &Tag, out: &mut Vec<Tag>) -> Result<()> {
        collect_with(self, tag, out, self.implicit_indices(), indices::scan_parents)
    }

    /// Append the descendants of `tag` present in the closure, ascending.
    fn collect_child_tags(&self, tag: &Tag, out: &mut Vec<Tag>) -> Result<()> {
        collect_with(self, tag, out, self.implicit_indices(), indices::scan_children)
    }

    /// Like [`collect_parent_tags`](Self::collect_parent_tags) over explicit tags only.
    fn collect_explicit_parent_tags(&self, tag: &Tag, out: &mut Vec<Tag>) -> Result<()> {
        collect_with(self, tag, out, self.explicit_indices(), indices::scan_parents)
    }

    /// Like [`collect_child_tags`](Self::collect_child_tags) over explicit tags only.
    fn collect_explicit_child_tags(&self, tag: &Tag, out: &mut Vec<Tag>) -> Result<()> {
        collect_with(self, tag, out, self.explicit_indices(), indices::scan_children)
    }
}

fn collect_with<S: TagSet + ?Sized>(
    set: &S,
    tag: &Tag,
    out: &mut Vec<Tag>,
    source: &[u32],
    scan: fn(&[u32], u32, &TagRegistry, &mut Vec<u32>),
) -> Result<()> {
    let registry = set.registry();
    let def = registry.definition(tag).map_err(|_| TagError::InvalidTagOperation("query relatives"))?;
    let mut found = Vec::new();
    scan(source, def.runtime_index(), registry, &mut found);
    out.extend(found.into_iter().filter_map(|i| registry.tag_at(i)));
    Ok(())
}

/// True if every explicit tag of `other` is in the closure of `a` or of `b`.
pub fn has_all_in_either<A, B, S>(a: &A, b: &B, other: &S) -> bool
where
    A: TagSet + ?Sized,
    B: TagSet + ?Sized,
    S: TagSet + ?Sized,
{
    indices::has_all_in_either(a.implicit_indices(), b.implicit_indices(), other.explicit_indices())
}

/// True if every explicit tag of `other` is explicit in `a` or in `b`.
pub fn has_all_exact_in_either<A, B, S>(a: &A, b: &B, other: &S) -> bool
where
    A: TagSet + ?Sized,
    B: TagSet + ?Sized,
    S: TagSet + ?Sized,
{
    indices::has_all_in_either(a.explicit_indices(), b.explicit_indices(), other.explicit_indices())
}

// =============================================================================
// Iteration
// =============================================================================

/// Borrowing iterator over a container's tags.
#[derive(Clone)]
pub struct TagIter<'a> {
    registry: &'a TagRegistry,
    inner: std::slice::Iter<'a, u32>,
}

impl<'a> TagIter<'a> {
    fn new(registry: &'a TagRegistry, indices: &'a [u32]) -> Self {
        Self {
            registry,
            inner: indices.iter(),
        }
    }
}

impl Iterator for TagIter<'_> {
    type Item = Tag;

    #[inline]
    fn next(&mut self) -> Option<Tag> {
        self.inner
            .next()
            .map(|&i| self.registry.tag_at(i).unwrap_or(Tag::NONE))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for TagIter<'_> {
    #[inline]
    fn next_back(&mut self) -> Option<Tag> {
        self.inner
            .next_back()
            .map(|&i| self.registry.tag_at(i).unwrap_or(Tag::NONE))
    }
}

impl ExactSizeIterator for TagIter<'_> {}
impl FusedIterator for TagIter<'_> {}

// =============================================================================
// Debug view
// =============================================================================

/// Shared `Debug` body: a header line then one line per implicit tag.
pub(crate) fn fmt_tag_set<S, F>(set: &S, f: &mut fmt::Formatter<'_>, detail: F) -> fmt::Result
where
    S: TagSet + ?Sized,
    F: Fn(u32) -> Option<String>,
{
    writeln!(
        f,
        "Count (Explicit, Total) = ({}, {})",
        set.explicit_len(),
        set.len()
    )?;
    for tag in set.tags() {
        match tag.runtime_index().and_then(&detail) {
            Some(detail) => writeln!(f, "  {tag} {detail}")?,
            None => writeln!(f, "  {tag}")?,
        }
    }
    Ok(())
}
