//! `tags.toml` declaration source for gameplay-tags.
//!
//! This crate parses a TOML file into tag declarations ready for a
//! [`TagRegistryBuilder`](gameplay_tags::TagRegistryBuilder). It never builds
//! or mutates a registry on its own beyond the [`load_registry`] shortcut.
//!
//! # Format
//!
//! ```toml
//! [[tag]]
//! name = "Status.Debuff.Slow"
//! description = "Movement speed reduced"
//!
//! [[tag]]
//! name = "Debug.Overlay"
//! flags = ["HideInEditor"]
//!
//! # Shorthand for tags without description or flags
//! [tags]
//! names = ["Status.Buff.Haste", "Item.Weapon.Sword"]
//! ```
//!
//! Missing ancestors (`Status`, `Status.Debuff`, ...) do not need to be
//! listed; the registry synthesizes them.
//!
//! # Usage
//!
//! ```ignore
//! let config = gameplay_tags_config::TagsConfig::from_file("assets/tags.toml")?;
//! let registry = TagRegistry::from_declarations(config.into_declarations())?;
//! ```

mod toml_parser;

pub use toml_parser::{TagsConfig, TagsConfigError};

use std::path::Path;

use gameplay_tags::TagRegistry;
use tracing::debug;

/// Read `tags.toml` and build a registry from it.
///
/// # Errors
///
/// Returns an error if:
/// - the file cannot be read or parsed
/// - a tag name or flag is invalid
pub fn load_registry(config_path: impl AsRef<Path>) -> Result<TagRegistry, TagsConfigError> {
    let config_path = config_path.as_ref();
    let config = TagsConfig::from_file(config_path)?;
    debug!(
        path = %config_path.display(),
        declared = config.len(),
        "loaded tag config"
    );
    Ok(TagRegistry::from_declarations(config.into_declarations())?)
}
