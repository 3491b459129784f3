//! Persistence as ordered tag-name lists.
//!
//! Runtime indices are not stable across registry builds, so containers are
//! saved as the names of their explicit tags, ascending index order:
//!
//! ```json
//! ["Status.Debuff.Slow", "Test.D"]
//! ```
//!
//! Loading resolves each name against the current registry. Unknown names
//! are dropped with a warning, duplicates collapse into one explicit tag.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::container::{TagContainer, TagSet};
use crate::error::TagError;
use crate::registry::TagRegistry;
use crate::tag::Tag;

/// The persisted form of a container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagNameList(pub Vec<String>);

impl TagNameList {
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for TagNameList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl TagContainer {
    /// Explicit tag names, ascending index order.
    pub fn to_name_list(&self) -> TagNameList {
        self.explicit_tags()
            .filter_map(|tag| tag.name().ok().map(str::to_string))
            .collect()
    }

    /// Rebuild a container from names. Never fails: unknown names are
    /// skipped with a warning.
    pub fn from_name_list(registry: Arc<TagRegistry>, names: &TagNameList) -> Self {
        let mut container = Self::new(Arc::clone(&registry));
        for name in names.names() {
            if let Some(index) = registry.tag_from_name(name).and_then(|tag| tag.runtime_index()) {
                container.indices.add(index, &registry);
            }
        }
        container
    }

    /// Deserialize a name list and resolve it against `registry`.
    pub fn deserialize_in<'de, D>(registry: Arc<TagRegistry>, deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let names = TagNameList::deserialize(deserializer)?;
        Ok(Self::from_name_list(registry, &names))
    }
}

impl Serialize for TagContainer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_name_list().serialize(serializer)
    }
}

impl TagRegistry {
    /// Persisted form of one tag. `None` for [`Tag::NONE`].
    pub fn tag_to_name(&self, tag: &Tag) -> Option<String> {
        self.definition(tag).ok().map(|def| def.name().to_string())
    }

    /// Resolve a persisted name; unknown names log a warning and give `None`.
    pub fn tag_from_name(&self, name: &str) -> Option<Tag> {
        let tag = self.try_request_tag(name);
        if tag.is_none() {
            warn!("{}; dropping it", TagError::UnknownTag(name.to_string()));
        }
        tag
    }
}
