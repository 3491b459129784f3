//! Required / forbidden tag filters.

use std::sync::Arc;

use crate::container::{TagContainer, TagSet, has_all_in_either};
use crate::error::Result;
use crate::registry::TagRegistry;
use crate::tag::Tag;

/// A filter over tag sets: every required tag must be present (ancestors
/// satisfied implicitly) and no forbidden tag may be present.
///
/// ```ignore
/// let mut stunned_only = TagRequirements::new(registry.clone());
/// stunned_only.require(&registry.request_tag("Status.Debuff.Stun"))?;
/// stunned_only.forbid(&registry.request_tag("Status.Immune"))?;
///
/// if stunned_only.matches(&actor_tags) { /* ... */ }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRequirements {
    pub required: TagContainer,
    pub forbidden: TagContainer,
}

impl TagRequirements {
    pub fn new(registry: Arc<TagRegistry>) -> Self {
        Self {
            required: TagContainer::new(Arc::clone(&registry)),
            forbidden: TagContainer::new(registry),
        }
    }

    pub fn require(&mut self, tag: &Tag) -> Result<&mut Self> {
        self.required.add_tag(tag)?;
        Ok(self)
    }

    pub fn forbid(&mut self, tag: &Tag) -> Result<&mut Self> {
        self.forbidden.add_tag(tag)?;
        Ok(self)
    }

    /// True if there is nothing to check.
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.forbidden.is_empty()
    }

    pub fn matches<S: TagSet + ?Sized>(&self, tags: &S) -> bool {
        !indices_any(tags, &self.forbidden) && indices_all(tags, &self.required)
    }

    /// Check against a static and a dynamic set together: a required tag may
    /// come from either, a forbidden tag in either fails.
    pub fn matches_split<A, B>(&self, static_tags: &A, dynamic_tags: &B) -> bool
    where
        A: TagSet + ?Sized,
        B: TagSet + ?Sized,
    {
        !indices_any(static_tags, &self.forbidden)
            && !indices_any(dynamic_tags, &self.forbidden)
            && has_all_in_either(static_tags, dynamic_tags, &self.required)
    }
}

// `TagSet::has_any`/`has_all` need a sized receiver.
fn indices_any<S: TagSet + ?Sized>(tags: &S, other: &TagContainer) -> bool {
    crate::indices::has_any(tags.implicit_indices(), other.explicit_indices())
}

fn indices_all<S: TagSet + ?Sized>(tags: &S, other: &TagContainer) -> bool {
    crate::indices::has_all(tags.implicit_indices(), other.explicit_indices())
}
