//! # Hierarchical Gameplay Tags (gameplay-tags)
//!
//! Dot-separated tag names (`Status.Debuff.Slow`) organised into an immutable
//! hierarchy, plus tag-set containers with fast membership, ancestor /
//! descendant queries and set algebra.
//!
//! ## Design
//!
//! The registry sorts every tag (declared and synthesized ancestors)
//! case-insensitively and uses the sorted position as its runtime index:
//!
//! ```text
//! 0 Status
//! 1 Status.Buff
//! 2 Status.Buff.Haste
//! 3 Status.Debuff          ← ancestors precede descendants,
//! 4 Status.Debuff.Slow       and a tag's descendants form the
//! 5 Status.Debuff.Stun       block of indices right after it
//! ```
//!
//! Names that differ only in case (`A.b` next to `a`) break the block rule;
//! declare tag names with one consistent casing.
//!
//! Containers store sorted index lists, so membership is a binary search and
//! set operations are linear merges:
//!
//! ```ignore
//! use std::sync::Arc;
//! use gameplay_tags::{TagContainer, TagRegistry, TagSet};
//!
//! let registry = Arc::new(TagRegistry::from_names(["Status.Debuff.Slow", "Status.Buff.Haste"])?);
//!
//! let mut tags = TagContainer::new(registry.clone());
//! tags.add_tag(&registry.request_tag("Status.Debuff.Slow"))?;
//!
//! assert!(tags.has_tag(&registry.request_tag("Status.Debuff")));    // implicit
//! assert!(!tags.has_tag_exact(&registry.request_tag("Status.Debuff")));
//! ```
//!
//! Three containers share the [`TagSet`] query surface:
//!
//! - [`TagContainer`] — plain set
//! - [`TagCountContainer`] — reference counted, with change events
//! - [`TagHierarchicalContainer`] — counting container mirrored into a parent
//!
//! [`TagBinds`] turns a counting container's events into `Fn(bool)` presence
//! callbacks.

pub mod container;
pub mod definition;
pub mod error;
pub mod events;
mod indices;
pub mod name;
pub mod persist;
pub mod registry;
pub mod requirements;
pub mod tag;

#[cfg(feature = "bevy")]
pub mod bevy;

pub use container::{
    TagBinds, TagContainer, TagCountContainer, TagHierarchicalContainer, TagIter, TagSet, has_all_exact_in_either,
    has_all_in_either,
};
pub use definition::{TagDeclaration, TagDefinition, TagFlags};
pub use error::{Result, TagError};
pub use events::{CallbackId, TagEventCallback, TagEventKind};
pub use name::{is_valid_name, validate_name};
pub use persist::TagNameList;
pub use registry::{TagManager, TagRegistry, TagRegistryBuilder};
pub use requirements::TagRequirements;
pub use tag::{NONE_INDEX, Tag};

pub use gameplay_tags_macro::gameplay_tags;
