//! Tag registry — builds the immutable tag graph from flat declarations.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;
use tracing::{debug, trace, warn};

use crate::definition::{TagDeclaration, TagDefinition, TagFlags};
use crate::error::{Result, TagError};
use crate::name::{compare_names, hierarchy_level, hierarchy_names, parent_name, validate_name};
use crate::tag::Tag;

/// Collects tag declarations and builds a [`TagRegistry`] from them.
///
/// Registration never fails; names are validated by [`build`](Self::build),
/// which fails as a whole on the first invalid name.
#[derive(Clone, Debug, Default)]
pub struct TagRegistryBuilder {
    declarations: Vec<TagDeclaration>,
}

impl TagRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one declaration. Later declarations of the same name are ignored.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        flags: TagFlags,
    ) -> &mut Self {
        self.declarations
            .push(TagDeclaration::new(name, description, flags));
        self
    }

    pub fn register_declaration(&mut self, declaration: TagDeclaration) -> &mut Self {
        self.declarations.push(declaration);
        self
    }

    pub fn register_all(&mut self, declarations: impl IntoIterator<Item = TagDeclaration>) -> &mut Self {
        self.declarations.extend(declarations);
        self
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Build the tag graph.
    ///
    /// 1. Validate every name.
    /// 2. Drop duplicates (first registration wins).
    /// 3. Synthesize missing ancestors, inheriting descendant flags.
    /// 4. Sort case-insensitively and assign runtime indices.
    /// 5. Link parents, children and hierarchy chains.
    pub fn build(&self) -> Result<TagRegistry> {
        // 1. Validate
        for decl in &self.declarations {
            validate_name(&decl.name)?;
        }

        // 2. Deduplicate
        let mut drafts: Vec<Draft> = Vec::with_capacity(self.declarations.len());
        let mut by_name: HashMap<String, usize> = HashMap::default();
        for decl in &self.declarations {
            if by_name.contains_key(&decl.name) {
                continue;
            }
            by_name.insert(decl.name.clone(), drafts.len());
            drafts.push(Draft {
                name: decl.name.clone(),
                description: decl.description.clone(),
                flags: decl.flags,
                synthesized: false,
            });
        }
        let declared = drafts.len();

        // 3. Synthesize missing ancestors
        for i in 0..declared {
            let name = drafts[i].name.clone();
            let mut flags = drafts[i].flags;
            let mut ancestors = hierarchy_names(&name);
            ancestors.pop();

            for ancestor in ancestors.into_iter().rev() {
                if let Some(&existing) = by_name.get(ancestor) {
                    if drafts[existing].synthesized {
                        drafts[existing].flags |= flags;
                    }
                    flags |= drafts[existing].flags;
                    continue;
                }
                trace!(tag = ancestor, from = %name, "synthesizing ancestor tag");
                by_name.insert(ancestor.to_string(), drafts.len());
                drafts.push(Draft {
                    name: ancestor.to_string(),
                    description: String::new(),
                    flags,
                    synthesized: true,
                });
            }
        }

        // 4. Sort and assign indices
        drafts.sort_by(|a, b| compare_names(&a.name, &b.name).then_with(|| a.name.cmp(&b.name)));

        let registry = TagRegistry::link(drafts);
        debug!(
            declared,
            synthesized = registry.len() - declared,
            total = registry.len(),
            "built tag registry"
        );
        Ok(registry)
    }
}

/// A definition before indices are known.
struct Draft {
    name: String,
    description: String,
    flags: TagFlags,
    synthesized: bool,
}

/// The immutable tag graph.
///
/// Provides:
/// - Runtime index → definition lookup (O(1))
/// - Name → tag lookup (hashed)
/// - Ancestor / descendant relations precomputed per tag
///
/// Built once and then shared read-only, usually behind an `Arc`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRegistry {
    definitions: Vec<TagDefinition>,
    tags: Vec<Tag>,
    name_to_idx: HashMap<Arc<str>, u32>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl TagRegistry {
    /// A registry with no tags.
    pub fn empty() -> Self {
        Self {
            definitions: Vec::new(),
            tags: Vec::new(),
            name_to_idx: HashMap::default(),
        }
    }

    pub fn builder() -> TagRegistryBuilder {
        TagRegistryBuilder::new()
    }

    /// Build from declarations in one go.
    pub fn from_declarations(declarations: impl IntoIterator<Item = TagDeclaration>) -> Result<Self> {
        let mut builder = TagRegistryBuilder::new();
        builder.register_all(declarations);
        builder.build()
    }

    /// Build from bare names (no description, no flags).
    pub fn from_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self> {
        Self::from_declarations(names.into_iter().map(TagDeclaration::named))
    }

    /// Steps 4 and 5 of the build: `drafts` must already be sorted.
    fn link(drafts: Vec<Draft>) -> Self {
        let name_to_idx: HashMap<Arc<str>, u32> = drafts
            .iter()
            .enumerate()
            .map(|(i, d)| (Arc::<str>::from(d.name.as_str()), i as u32))
            .collect();

        let mut definitions: Vec<TagDefinition> = Vec::with_capacity(drafts.len());
        for (i, draft) in drafts.into_iter().enumerate() {
            let index = i as u32;
            let parent = parent_name(&draft.name).and_then(|p| name_to_idx.get(p).copied());

            // Parents sort before children, so the parent's chain is complete.
            let parent_chain = match parent {
                Some(p) => definitions[p as usize].hierarchy_chain.clone(),
                None => Vec::new(),
            };
            let mut hierarchy_chain = parent_chain.clone();
            hierarchy_chain.push(index);

            if let Some(p) = parent {
                definitions[p as usize].children.push(index);
            }
            for &ancestor in &parent_chain {
                definitions[ancestor as usize].descendants.push(index);
            }

            let name: Arc<str> = match name_to_idx.get_key_value(draft.name.as_str()) {
                Some((key, _)) => Arc::clone(key),
                None => Arc::from(draft.name.as_str()),
            };

            definitions.push(TagDefinition {
                hierarchy_level: hierarchy_level(&name),
                name,
                description: draft.description,
                flags: draft.flags,
                runtime_index: index,
                parent,
                children: Vec::new(),
                descendants: Vec::new(),
                parent_chain,
                hierarchy_chain,
                synthesized: draft.synthesized,
            });
        }

        let tags = definitions
            .iter()
            .map(|d| Tag::new(Arc::clone(&d.name), d.runtime_index))
            .collect();

        Self {
            definitions,
            tags,
            name_to_idx,
        }
    }

    /// Total number of registered tags (declared and synthesized).
    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All tags in runtime index order. Never contains [`Tag::NONE`].
    #[inline]
    pub fn all_tags(&self) -> &[Tag] {
        &self.tags
    }

    /// All definitions in runtime index order.
    #[inline]
    pub fn definitions(&self) -> &[TagDefinition] {
        &self.definitions
    }

    /// Name → tag, or [`Tag::NONE`] if the name is not registered.
    pub fn request_tag(&self, name: &str) -> Tag {
        self.try_request_tag(name).unwrap_or(Tag::NONE)
    }

    /// Name → tag.
    #[inline]
    pub fn try_request_tag(&self, name: &str) -> Option<Tag> {
        self.name_to_idx
            .get(name)
            .map(|&i| self.tags[i as usize].clone())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_idx.contains_key(name)
    }

    /// Definition behind a handle. Fails for [`Tag::NONE`] and for handles
    /// whose index this registry does not know.
    pub fn definition(&self, tag: &Tag) -> Result<&TagDefinition> {
        self.definition_at(tag.raw_index())
            .ok_or(TagError::InvalidTagOperation("resolve the definition"))
    }

    #[inline]
    pub fn definition_at(&self, index: u32) -> Option<&TagDefinition> {
        self.definitions.get(index as usize)
    }

    #[inline]
    pub fn tag_at(&self, index: u32) -> Option<Tag> {
        self.tags.get(index as usize).cloned()
    }

    pub(crate) fn tags_at(&self, indices: &[u32]) -> Vec<Tag> {
        indices.iter().filter_map(|&i| self.tag_at(i)).collect()
    }

    /// Check if `candidate` equals `ancestor` or lies below it.
    ///
    /// ```text
    /// registry.is_descendant_of(Status.Debuff.Slow, Status) → true
    /// registry.is_descendant_of(Status, Status)             → true
    /// registry.is_descendant_of(Status, Status.Debuff)      → false
    /// ```
    pub fn is_descendant_of(&self, candidate: &Tag, ancestor: &Tag) -> Result<bool> {
        let def = self.definition(candidate)?;
        self.definition(ancestor)?;
        Ok(candidate == ancestor || def.is_child_of(ancestor.raw_index()))
    }

    /// Same as [`is_descendant_of`](Self::is_descendant_of) by name.
    ///
    /// Returns `None` if either name is not registered.
    pub fn is_descendant_of_name(&self, candidate: &str, ancestor: &str) -> Option<bool> {
        let candidate = self.try_request_tag(candidate)?;
        let ancestor = self.try_request_tag(ancestor)?;
        self.is_descendant_of(&candidate, &ancestor).ok()
    }
}

/// Lazily built, process-wide tag registry.
///
/// Declarations are queued with [`declare`](Self::declare); the first call to
/// [`registry`](Self::registry) builds the graph exactly once. Later calls
/// return the same `Arc` (or the same build error), and declarations queued
/// after the build are ignored.
#[derive(Debug, Default)]
pub struct TagManager {
    pending: Mutex<Vec<TagDeclaration>>,
    built: OnceLock<Result<Arc<TagRegistry>>>,
}

impl TagManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_declarations(declarations: impl IntoIterator<Item = TagDeclaration>) -> Self {
        let manager = Self::new();
        manager.declare_all(declarations);
        manager
    }

    /// Queue a declaration for the (future) build.
    pub fn declare(&self, declaration: TagDeclaration) {
        self.declare_all(std::iter::once(declaration));
    }

    pub fn declare_all(&self, declarations: impl IntoIterator<Item = TagDeclaration>) {
        if self.is_built() {
            warn!("tag registry already built; ignoring late declarations");
            return;
        }
        self.pending.lock().extend(declarations);
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        self.built.get().is_some()
    }

    /// The registry, building it on first access.
    pub fn registry(&self) -> Result<Arc<TagRegistry>> {
        self.built
            .get_or_init(|| {
                let declarations = std::mem::take(&mut *self.pending.lock());
                TagRegistry::from_declarations(declarations).map(Arc::new)
            })
            .clone()
    }

    /// Shorthand for `registry()?.request_tag(name)`.
    pub fn request_tag(&self, name: &str) -> Result<Tag> {
        Ok(self.registry()?.request_tag(name))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[&str] = &["Test.A.B.C0", "Test.A.B.C1", "Test.D", "Movement.Idle"];

    fn names(reg: &TagRegistry) -> Vec<&str> {
        reg.definitions().iter().map(|d| d.name()).collect()
    }

    #[test]
    fn build_synthesizes_and_sorts() {
        let reg = TagRegistry::from_names(SAMPLE.iter().copied()).unwrap();

        assert_eq!(
            names(&reg),
            vec![
                "Movement",
                "Movement.Idle",
                "Test",
                "Test.A",
                "Test.A.B",
                "Test.A.B.C0",
                "Test.A.B.C1",
                "Test.D",
            ]
        );

        for (i, def) in reg.definitions().iter().enumerate() {
            assert_eq!(def.runtime_index(), i as u32);
        }

        assert!(reg.definitions()[0].is_synthesized());
        assert!(!reg.definitions()[1].is_synthesized());
    }

    #[test]
    fn sort_is_case_insensitive() {
        let reg = TagRegistry::from_names(["b", "A", "a_x", "C"]).unwrap();
        assert_eq!(names(&reg), vec!["A", "a_x", "b", "C"]);
    }

    #[test]
    fn links_parents_children_and_chains() {
        let reg = TagRegistry::from_names(SAMPLE.iter().copied()).unwrap();
        let idx = |name: &str| reg.request_tag(name).runtime_index().unwrap();

        let test = reg.definition_at(idx("Test")).unwrap();
        assert_eq!(test.parent_index(), None);
        assert_eq!(test.children(), &[idx("Test.A"), idx("Test.D")]);
        assert_eq!(test.descendants().len(), 5);

        let c0 = reg.definition_at(idx("Test.A.B.C0")).unwrap();
        assert_eq!(c0.parent_index(), Some(idx("Test.A.B")));
        assert_eq!(c0.parent_chain(), &[idx("Test"), idx("Test.A"), idx("Test.A.B")]);
        assert_eq!(
            c0.hierarchy_chain(),
            &[idx("Test"), idx("Test.A"), idx("Test.A.B"), idx("Test.A.B.C0")]
        );
        assert_eq!(c0.hierarchy_level(), 4);
        assert_eq!(c0.label(), "C0");
    }

    #[test]
    fn descendants_are_contiguous_after_ancestor() {
        let reg = TagRegistry::from_names(["A.B.C", "A.D", "A0", "AB.X"]).unwrap();
        for def in reg.definitions() {
            let start = def.runtime_index() + 1;
            let expected: Vec<u32> = (start..start + def.descendants().len() as u32).collect();
            assert_eq!(def.descendants(), expected.as_slice(), "tag {}", def.name());
        }
    }

    #[test]
    fn case_variants_split_the_descendant_block() {
        let reg = TagRegistry::from_names(["A.b", "a"]).unwrap();
        assert_eq!(names(&reg), vec!["A", "a", "A.b"]);

        let upper = reg.request_tag("A");
        let child = reg.request_tag("A.b");
        assert_eq!(upper.child_tags(&reg).unwrap(), vec![child.clone()]);
        assert!(child.is_child_of(&upper, &reg).unwrap());
        assert!(reg.request_tag("a").child_tags(&reg).unwrap().is_empty());
    }

    #[test]
    fn duplicates_first_registration_wins() {
        let mut builder = TagRegistry::builder();
        builder
            .register("A.B", "first", TagFlags::empty())
            .register("A.B", "second", TagFlags::HIDE_IN_EDITOR);
        let reg = builder.build().unwrap();

        assert_eq!(reg.len(), 2);
        let def = reg.definition(&reg.request_tag("A.B")).unwrap();
        assert_eq!(def.description(), "first");
        assert_eq!(def.flags(), TagFlags::empty());
    }

    #[test]
    fn declared_ancestor_keeps_its_description() {
        let reg = TagRegistry::from_declarations([
            TagDeclaration::new("Status.Debuff.Slow", "slowed", TagFlags::empty()),
            TagDeclaration::new("Status", "status effects", TagFlags::empty()),
        ])
        .unwrap();

        assert_eq!(reg.request_tag("Status").description(&reg).unwrap(), "status effects");
        assert_eq!(reg.request_tag("Status.Debuff").description(&reg).unwrap(), "");
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn hide_in_editor_propagates_to_synthesized_ancestors() {
        let reg = TagRegistry::from_declarations([
            TagDeclaration::new("Debug.Internal.Overlay", "", TagFlags::HIDE_IN_EDITOR),
            TagDeclaration::named("Visible.Leaf"),
        ])
        .unwrap();

        let flags = |name| reg.request_tag(name).flags(&reg).unwrap();
        assert_eq!(flags("Debug"), TagFlags::HIDE_IN_EDITOR);
        assert_eq!(flags("Debug.Internal"), TagFlags::HIDE_IN_EDITOR);
        assert_eq!(flags("Visible"), TagFlags::empty());
    }

    #[test]
    fn build_fails_on_first_invalid_name() {
        let err = TagRegistry::from_names(["Good.Name", "Bad..Name", "Also$Bad"]).unwrap_err();
        assert_eq!(
            err,
            TagError::InvalidTagName {
                name: "Bad..Name".into(),
                position: 4
            }
        );
    }

    #[test]
    fn empty_build_returns_empty_registry() {
        let reg = TagRegistry::builder().build().unwrap();
        assert!(reg.is_empty());
        assert!(reg.all_tags().is_empty());
        assert!(reg.request_tag("Anything").is_none());
    }

    #[test]
    fn lookup_by_name() {
        let reg = TagRegistry::from_names(SAMPLE.iter().copied()).unwrap();

        let tag = reg.request_tag("Test.A.B");
        assert_eq!(tag.name().unwrap(), "Test.A.B");
        assert!(reg.contains("Test.A"));
        assert!(!reg.contains("test.a"));
        assert!(reg.try_request_tag("Missing").is_none());
        assert!(reg.request_tag("Missing").is_none());
        assert!(reg.definition(&Tag::NONE).is_err());
    }

    #[test]
    fn descendant_checks() {
        let reg = TagRegistry::from_names(SAMPLE.iter().copied()).unwrap();

        assert_eq!(reg.is_descendant_of_name("Test.A.B.C0", "Test"), Some(true));
        assert_eq!(reg.is_descendant_of_name("Test", "Test"), Some(true));
        assert_eq!(reg.is_descendant_of_name("Test", "Test.A"), Some(false));
        assert_eq!(reg.is_descendant_of_name("Movement.Idle", "Test"), Some(false));
        assert_eq!(reg.is_descendant_of_name("Unknown", "Test"), None);
    }

    #[test]
    fn manager_builds_once() {
        let manager = TagManager::with_declarations([TagDeclaration::named("A.B")]);
        assert!(!manager.is_built());

        let first = manager.registry().unwrap();
        assert!(manager.is_built());

        manager.declare(TagDeclaration::named("Late.Tag"));
        let second = manager.registry().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!second.contains("Late.Tag"));
        assert!(!manager.request_tag("A").unwrap().is_none());
    }

    #[test]
    fn manager_caches_build_error() {
        let manager = TagManager::with_declarations([TagDeclaration::named("Bad.")]);
        assert!(manager.registry().is_err());
        assert!(manager.registry().is_err());
    }
}
