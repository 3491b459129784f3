//! TOML configuration parser for tags.toml.

use std::path::{Path, PathBuf};

use gameplay_tags::{validate_name, TagDeclaration, TagError, TagFlags};
use rustc_hash::FxHashSet as HashSet;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Parsed tags configuration: declarations in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagsConfig {
    entries: Vec<TagDeclaration>,
}

/// Raw TOML structure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTagsConfig {
    /// `[[tag]]` tables with description and flags
    #[serde(default)]
    tag: Vec<RawTag>,
    /// `[tags] names = [...]` shorthand
    tags: Option<RawTags>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTag {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    flags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTags {
    names: Vec<String>,
}

impl TagsConfig {
    /// Parse from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TagsConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TagsConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse from a TOML string.
    ///
    /// `[[tag]]` entries come first, then `[tags].names`. A name seen twice
    /// keeps its first entry.
    pub fn from_str(content: &str) -> Result<Self, TagsConfigError> {
        let raw: RawTagsConfig = toml::from_str(content)?;

        let shorthand = raw.tags.map(|t| t.names).unwrap_or_default();
        let mut seen: HashSet<String> = HashSet::default();
        let mut entries = Vec::with_capacity(raw.tag.len() + shorthand.len());

        let detailed = raw.tag.into_iter().map(|t| (t.name, t.description, t.flags));
        let plain = shorthand
            .into_iter()
            .map(|name| (name, String::new(), Vec::new()));

        for (name, description, flag_names) in detailed.chain(plain) {
            validate_name(&name)?;
            let flags = parse_flags(&name, &flag_names)?;

            if !seen.insert(name.clone()) {
                warn!(tag = %name, "duplicate tag in config; keeping the first entry");
                continue;
            }
            entries.push(TagDeclaration::new(name, description, flags));
        }

        Ok(Self { entries })
    }

    /// Get all entries, file order.
    pub fn entries(&self) -> impl Iterator<Item = &TagDeclaration> {
        self.entries.iter()
    }

    /// Declarations for a registry builder.
    pub fn declarations(&self) -> Vec<TagDeclaration> {
        self.entries.clone()
    }

    pub fn into_declarations(self) -> Vec<TagDeclaration> {
        self.entries
    }

    /// Get entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_flags(tag: &str, names: &[String]) -> Result<TagFlags, TagsConfigError> {
    names.iter().try_fold(TagFlags::empty(), |acc, name| {
        TagFlags::from_display_name(name)
            .map(|flag| acc | flag)
            .ok_or_else(|| {
                TagsConfigError::Validation(format!("unknown flag '{name}' on tag '{tag}'"))
            })
    })
}

/// Errors during config parsing.
#[derive(Debug, Error)]
pub enum TagsConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl From<TagError> for TagsConfigError {
    fn from(err: TagError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_detailed_entries() {
        let toml = r#"
[[tag]]
name = "Status.Debuff.Slow"
description = "Movement speed reduced"

[[tag]]
name = "Debug.Overlay"
flags = ["HideInEditor"]
"#;
        let config = TagsConfig::from_str(toml).unwrap();
        let entries: Vec<_> = config.entries().collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Status.Debuff.Slow");
        assert_eq!(entries[0].description, "Movement speed reduced");
        assert_eq!(entries[0].flags, TagFlags::empty());
        assert_eq!(entries[1].flags, TagFlags::HIDE_IN_EDITOR);
    }

    #[test]
    fn shorthand_names_follow_detailed_entries() {
        let toml = r#"
[tags]
names = ["Item.Weapon.Sword", "Skill.Combat"]

[[tag]]
name = "Item.Weapon.Axe"
"#;
        let config = TagsConfig::from_str(toml).unwrap();
        let names: Vec<_> = config.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Item.Weapon.Axe", "Item.Weapon.Sword", "Skill.Combat"]);
    }

    #[test]
    fn ancestors_are_left_to_the_registry() {
        let config = TagsConfig::from_str("[tags]\nnames = [\"A.B.C.D\"]\n").unwrap();
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn duplicates_keep_first() {
        let toml = r#"
[[tag]]
name = "A.B"
description = "first"

[tags]
names = ["A.B"]
"#;
        let config = TagsConfig::from_str(toml).unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.declarations()[0].description, "first");
    }

    #[test]
    fn empty_config() {
        let config = TagsConfig::from_str("").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn rejects_invalid_names() {
        let cases = ["", ".A", "A.", "A..B", "A.B-C", "A.B C", "$@"];

        for case in cases {
            let toml = format!("[tags]\nnames = [\"{case}\"]\n");
            assert!(
                matches!(TagsConfig::from_str(&toml), Err(TagsConfigError::Validation(_))),
                "Should reject: {case:?}"
            );
        }
    }

    #[test]
    fn accepts_grammar_names() {
        let toml = r#"
[tags]
names = ["_Private.Item", "CamelCase.snake_case", "With123Numbers", "A._1", "1.2"]
"#;
        assert_eq!(TagsConfig::from_str(toml).unwrap().len(), 5);
    }

    #[test]
    fn flags_accept_both_spellings() {
        let toml = r#"
[[tag]]
name = "A"
flags = ["HIDE_IN_EDITOR"]

[[tag]]
name = "B"
flags = ["None", "HideInEditor"]
"#;
        let config = TagsConfig::from_str(toml).unwrap();
        assert!(config.entries().all(|e| e.flags == TagFlags::HIDE_IN_EDITOR));
    }

    #[test]
    fn rejects_unknown_flag() {
        let toml = r#"
[[tag]]
name = "A"
flags = ["Invisible"]
"#;
        let err = TagsConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("Invisible"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            TagsConfig::from_str("[[tag]]\ndescription = \"no name\"\n"),
            Err(TagsConfigError::Parse(_))
        ));
        assert!(matches!(
            TagsConfig::from_str("paths = [\"A\"]\n"),
            Err(TagsConfigError::Parse(_))
        ));
    }
}
