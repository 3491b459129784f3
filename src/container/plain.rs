use std::fmt;
use std::sync::Arc;

use tracing::warn;

use super::{TagSet, fmt_tag_set};
use crate::error::{Result, TagError};
use crate::indices::TagSetIndices;
use crate::registry::TagRegistry;
use crate::tag::Tag;

/// A plain tag set: explicit tags plus their closure.
///
/// Adding a tag twice is a no-op; removing it once takes it out.
///
/// ```ignore
/// let mut tags = TagContainer::new(registry.clone());
/// tags.add_tag(&registry.request_tag("Status.Debuff.Slow"))?;
///
/// assert!(tags.has_tag(&registry.request_tag("Status")));
/// assert!(!tags.has_tag_exact(&registry.request_tag("Status")));
/// ```
#[derive(Clone)]
pub struct TagContainer {
    registry: Arc<TagRegistry>,
    pub(crate) indices: TagSetIndices,
}

impl TagContainer {
    pub fn new(registry: Arc<TagRegistry>) -> Self {
        Self {
            registry,
            indices: TagSetIndices::default(),
        }
    }

    /// Snapshot of any other set (explicit and implicit lists copied as-is).
    pub fn from_set<S: TagSet + ?Sized>(set: &S) -> Self {
        Self {
            registry: Arc::clone(set.registry()),
            indices: TagSetIndices {
                explicit: set.explicit_indices().to_vec(),
                implicit: set.implicit_indices().to_vec(),
            },
        }
    }

    /// Container holding `tags`. Fails on the first [`Tag::NONE`] or foreign handle.
    pub fn with_tags<'a>(
        registry: Arc<TagRegistry>,
        tags: impl IntoIterator<Item = &'a Tag>,
    ) -> Result<Self> {
        let mut container = Self::new(registry);
        for tag in tags {
            container.add_tag(tag)?;
        }
        Ok(container)
    }

    /// Add `tag` and its ancestors.
    pub fn add_tag(&mut self, tag: &Tag) -> Result<()> {
        let index = self
            .registry
            .definition(tag)
            .map_err(|_| TagError::InvalidTagOperation("add a tag"))?
            .runtime_index();
        self.indices.add(index, &self.registry);
        Ok(())
    }

    /// Remove an explicit tag.
    ///
    /// Returns `Ok(false)` and logs a warning if `tag` was not added explicitly.
    pub fn remove_tag(&mut self, tag: &Tag) -> Result<bool> {
        let index = self
            .registry
            .definition(tag)
            .map_err(|_| TagError::InvalidTagOperation("remove a tag"))?
            .runtime_index();
        if !self.indices.remove_explicit(index) {
            warn!("{}", TagError::TagNotExplicitlyPresent(tag.to_string()));
            return Ok(false);
        }
        self.indices.rebuild_implicit(&self.registry);
        Ok(true)
    }

    /// Add every explicit tag of `other`.
    pub fn add_tags<S: TagSet + ?Sized>(&mut self, other: &S) {
        for &index in other.explicit_indices() {
            self.indices.add(index, &self.registry);
        }
    }

    /// Remove every explicit tag of `other`; missing ones are warned about
    /// and skipped. Returns how many were removed.
    pub fn remove_tags<S: TagSet + ?Sized>(&mut self, other: &S) -> usize {
        let mut removed = 0;
        for &index in other.explicit_indices() {
            if self.indices.remove_explicit(index) {
                removed += 1;
            } else {
                let name = self.registry.tag_at(index).unwrap_or(Tag::NONE);
                warn!("{}", TagError::TagNotExplicitlyPresent(name.to_string()));
            }
        }
        if removed > 0 {
            self.indices.rebuild_implicit(&self.registry);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Tags present in both sets, merged list by list.
    ///
    /// The result's implicit list is the intersection of the two implicit
    /// lists, which need not be the closure of its explicit list. Use it for
    /// queries only, not as a base for further `add_tag` calls.
    pub fn intersection<A, B>(a: &A, b: &B) -> Self
    where
        A: TagSet + ?Sized,
        B: TagSet + ?Sized,
    {
        Self {
            registry: Arc::clone(a.registry()),
            indices: TagSetIndices::intersection(&snapshot(a), &snapshot(b)),
        }
    }

    /// Tags present in either set, merged list by list. Query-only, as with
    /// [`intersection`](Self::intersection).
    pub fn union<A, B>(a: &A, b: &B) -> Self
    where
        A: TagSet + ?Sized,
        B: TagSet + ?Sized,
    {
        Self {
            registry: Arc::clone(a.registry()),
            indices: TagSetIndices::union(&snapshot(a), &snapshot(b)),
        }
    }
}

fn snapshot<S: TagSet + ?Sized>(set: &S) -> TagSetIndices {
    TagSetIndices {
        explicit: set.explicit_indices().to_vec(),
        implicit: set.implicit_indices().to_vec(),
    }
}

impl TagSet for TagContainer {
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

/// Equal if both hold the same explicit and implicit tags.
impl PartialEq for TagContainer {
    fn eq(&self, other: &Self) -> bool {
        self.indices == other.indices
    }
}

impl Eq for TagContainer {}

impl fmt::Debug for TagContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_tag_set(self, f, |i| {
            self.indices
                .explicit
                .binary_search(&i)
                .is_ok()
                .then(|| "(Explicit)".to_string())
        })
    }
}
