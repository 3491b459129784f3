//! Bevy integration for gameplay tags.
//!
//! Provides:
//! - `GameplayTagsPlugin` — builds the registry once and inserts it as a Resource
//! - `TagContainerComponent` — plain tag container as an entity component
//!
//! # Example
//!
//! ```ignore
//! use bevy::prelude::*;
//! use gameplay_tags::bevy::*;
//! use gameplay_tags::gameplay_tags;
//!
//! gameplay_tags! {
//!     pub mod Tags {
//!         Movement { Idle; Running; }
//!         Combat { Attack; Block; }
//!     }
//! }
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(GameplayTagsPlugin::from_declarations(Tags::declarations()))
//!         .add_systems(Startup, spawn_entities)
//!         .run();
//! }
//!
//! fn spawn_entities(mut commands: Commands, registry: Res<SharedTagRegistry>) {
//!     let mut tags = TagContainerComponent::new(registry.0.clone());
//!     tags.add_tag(&registry.request_tag(Tags::Movement::Idle::NAME)).ok();
//!     commands.spawn(tags);
//! }
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use bevy::prelude::*;

use crate::{TagContainer, TagDeclaration, TagRegistry};

// =============================================================================
// Plugin
// =============================================================================

/// Bevy plugin for the gameplay tag system.
///
/// ```ignore
/// App::new().add_plugins(GameplayTagsPlugin::from_declarations(Tags::declarations()))
/// ```
#[derive(Default)]
pub struct GameplayTagsPlugin {
    declarations: Vec<TagDeclaration>,
}

impl GameplayTagsPlugin {
    /// Plugin with no declarations; the registry will be empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugin from declarations (from `gameplay_tags!` or a `tags.toml`).
    pub fn from_declarations(declarations: Vec<TagDeclaration>) -> Self {
        Self { declarations }
    }

    /// Builder method: queue more declarations.
    pub fn with_declarations(mut self, declarations: impl IntoIterator<Item = TagDeclaration>) -> Self {
        self.declarations.extend(declarations);
        self
    }
}

impl Plugin for GameplayTagsPlugin {
    fn build(&self, app: &mut App) {
        let registry = match TagRegistry::from_declarations(self.declarations.iter().cloned()) {
            Ok(registry) => registry,
            Err(err) => {
                tracing::error!(%err, "failed to build tag registry; using an empty one");
                TagRegistry::empty()
            }
        };

        app.insert_resource(SharedTagRegistry(Arc::new(registry)));
    }
}

// =============================================================================
// Resource
// =============================================================================

/// The process-wide registry, shared with every container built from it.
#[derive(Resource, Clone, Debug)]
pub struct SharedTagRegistry(pub Arc<TagRegistry>);

impl Deref for SharedTagRegistry {
    type Target = TagRegistry;

    fn deref(&self) -> &TagRegistry {
        &self.0
    }
}

// =============================================================================
// Component
// =============================================================================

/// A [`TagContainer`] attached to an entity.
///
/// ```ignore
/// fn stunned(query: Query<&TagContainerComponent>, registry: Res<SharedTagRegistry>) {
///     let stun = registry.request_tag("Status.Debuff.Stun");
///     for tags in query.iter() {
///         if tags.has_tag(&stun) {
///             // ...
///         }
///     }
/// }
/// ```
#[derive(Component, Clone, Debug, PartialEq, Eq)]
pub struct TagContainerComponent(pub TagContainer);

impl TagContainerComponent {
    #[inline]
    pub fn new(registry: Arc<TagRegistry>) -> Self {
        Self(TagContainer::new(registry))
    }
}

impl Deref for TagContainerComponent {
    type Target = TagContainer;

    fn deref(&self) -> &TagContainer {
        &self.0
    }
}

impl DerefMut for TagContainerComponent {
    fn deref_mut(&mut self) -> &mut TagContainer {
        &mut self.0
    }
}

// =============================================================================
// Tests
// =============================================================================
