//! Declaring tags and querying a plain container.
//!
//! This example shows how to:
//! - Declare a tag hierarchy with the `gameplay_tags!` macro
//! - Build a registry from the declarations
//! - Add tags to a container and query explicit vs implicit membership

use std::sync::Arc;

use gameplay_tags::*;

gameplay_tags! {
    pub mod GameTags {
        Movement {
            Idle;
            Running;
        }
        Combat {
            Attack {
                Melee;
                Ranged;
            }
            Block;
        }
        #[description = "Timed effects"]
        Status {
            Buff;
            Debuff { Slow; #[hide_in_editor] Stun; }
        }
    }
}

fn main() {
    println!("=== Basic Container Example ===\n");

    // 1. Build the registry; missing ancestors are synthesized
    let registry = Arc::new(TagRegistry::from_declarations(GameTags::declarations()).unwrap());
    println!("Registered {} tags:", registry.len());
    for tag in registry.all_tags() {
        let level = tag.hierarchy_level(&registry).unwrap();
        println!("  {:>2} {}{}", tag.runtime_index().unwrap(), "  ".repeat(level - 1), tag);
    }
    println!();

    // 2. Add tags
    let melee = registry.request_tag(GameTags::Combat::Attack::Melee::NAME);
    let slow = registry.request_tag(GameTags::Status::Debuff::Slow::NAME);

    let mut tags = TagContainer::new(registry.clone());
    tags.add_tag(&melee).unwrap();
    tags.add_tag(&slow).unwrap();
    println!("{tags:?}");

    // 3. Explicit vs implicit
    let combat = registry.request_tag(GameTags::Combat::NAME);
    println!("has_tag(Combat)       = {}", tags.has_tag(&combat));
    println!("has_tag_exact(Combat) = {}", tags.has_tag_exact(&combat));
    println!();

    // 4. Set queries
    let wanted = TagContainer::with_tags(registry.clone(), [&combat, &slow]).unwrap();
    println!("has_all({{Combat, Status.Debuff.Slow}})       = {}", tags.has_all(&wanted));
    println!("has_all_exact({{Combat, Status.Debuff.Slow}}) = {}", tags.has_all_exact(&wanted));

    // 5. Persist as names
    let saved = tags.to_name_list();
    println!("\nSaved names: {:?}", saved.names());

    tags.remove_tag(&melee).unwrap();
    println!("After removing Melee, has_tag(Combat) = {}", tags.has_tag(&combat));
}
