//! Counting containers, change events and a party/member hierarchy.
//!
//! This example shows how to:
//! - Count tags from independent sources
//! - Listen to tag changes per tag and globally
//! - Mirror member tags into a shared party container
//! - Bind a `Fn(bool)` to a tag's presence

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use gameplay_tags::*;

fn main() {
    println!("=== Tag Events Example ===\n");

    let registry = Arc::new(
        TagRegistry::from_names(["Status.Debuff.Slow", "Status.Debuff.Stun", "Status.Buff.Haste"]).unwrap(),
    );
    let slow = registry.request_tag("Status.Debuff.Slow");
    let stun = registry.request_tag("Status.Debuff.Stun");
    let debuff = registry.request_tag("Status.Debuff");

    // 1. Counting: two sources apply Slow
    let mut unit = TagCountContainer::new(registry.clone());
    unit.register_callback(&debuff, TagEventKind::NewOrRemoved, |tag, count| {
        println!("  [{tag}] {}", if count > 0 { "applied" } else { "cleared" });
    })
    .unwrap();
    unit.register_global_callback(TagEventKind::AnyCountChange, |tag, count| {
        println!("  {tag} -> {count}");
    });

    println!("Slow from two sources:");
    unit.add_tag(&slow).unwrap();
    unit.add_tag(&slow).unwrap();
    println!("Stun:");
    unit.add_tag(&stun).unwrap();
    println!("Clear:");
    unit.clear();
    println!();

    // 2. Party aggregates its members
    let party = Rc::new(RefCell::new(TagCountContainer::new(registry.clone())));
    let mut first = TagHierarchicalContainer::with_parent(registry.clone(), &party);
    let mut second = TagHierarchicalContainer::with_parent(registry.clone(), &party);

    let mut binds = TagBinds::new(&party);
    binds
        .bind(&stun, |stunned| println!("  party has a stunned member: {stunned}"))
        .unwrap();

    first.add_tag(&stun).unwrap();
    second.add_tag(&stun).unwrap();
    println!("party Stun count = {}", party.borrow().tag_count(&stun));

    first.remove_tag(&stun).unwrap();
    second.clear();
    println!("party is empty = {}", party.borrow().is_empty());

    binds.unbind_all();
}
