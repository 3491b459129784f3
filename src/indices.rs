//! Sorted index sets — the storage behind every container.
//!
//! All slices handled here are ascending and duplicate-free. Membership is a
//! binary search; set algebra is a single two-pointer merge.

use crate::registry::TagRegistry;

/// Explicit tags plus their closure (explicit tags and all ancestors).
///
/// Invariant: `explicit ⊆ implicit`, and `implicit` is the union of the
/// hierarchy chains of `explicit`. Results of [`intersection`](Self::intersection)
/// and [`union`](Self::union) are the one exception (see there).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TagSetIndices {
    pub(crate) explicit: Vec<u32>,
    pub(crate) implicit: Vec<u32>,
}

impl TagSetIndices {
    pub(crate) fn clear(&mut self) {
        self.explicit.clear();
        self.implicit.clear();
    }

    /// Add one explicit index and its closure. Returns `false` if it was
    /// already explicit.
    pub(crate) fn add(&mut self, index: u32, registry: &TagRegistry) -> bool {
        if !insert_sorted(&mut self.explicit, index) {
            return false;
        }
        if let Some(def) = registry.definition_at(index) {
            // Leaf upward; an ancestor already present implies all above it are too.
            for &link in def.hierarchy_chain().iter().rev() {
                if !insert_sorted(&mut self.implicit, link) {
                    break;
                }
            }
        }
        true
    }

    /// Drop one explicit index without touching `implicit`. Callers rebuild
    /// the closure afterwards.
    #[inline]
    pub(crate) fn remove_explicit(&mut self, index: u32) -> bool {
        remove_sorted(&mut self.explicit, index)
    }

    /// Recompute `implicit` from `explicit`.
    pub(crate) fn rebuild_implicit(&mut self, registry: &TagRegistry) {
        self.implicit.clear();
        for &index in &self.explicit {
            if let Some(def) = registry.definition_at(index) {
                for &link in def.hierarchy_chain().iter().rev() {
                    if !insert_sorted(&mut self.implicit, link) {
                        break;
                    }
                }
            }
        }
    }

    /// Independent merge of both lists.
    ///
    /// The resulting `implicit` is not guaranteed to be the closure of the
    /// resulting `explicit`; such sets are for queries only.
    pub(crate) fn intersection(a: &Self, b: &Self) -> Self {
        Self {
            explicit: intersect(&a.explicit, &b.explicit),
            implicit: intersect(&a.implicit, &b.implicit),
        }
    }

    /// Independent merge of both lists. Same caveat as `intersection`.
    pub(crate) fn union(a: &Self, b: &Self) -> Self {
        Self {
            explicit: unite(&a.explicit, &b.explicit),
            implicit: unite(&a.implicit, &b.implicit),
        }
    }
}

// =============================================================================
// Slice helpers
// =============================================================================

/// Insert keeping the order. Returns `false` if already present.
#[inline]
pub(crate) fn insert_sorted(set: &mut Vec<u32>, index: u32) -> bool {
    match set.binary_search(&index) {
        Ok(_) => false,
        Err(pos) => {
            set.insert(pos, index);
            true
        }
    }
}

/// Returns `false` if absent.
#[inline]
pub(crate) fn remove_sorted(set: &mut Vec<u32>, index: u32) -> bool {
    match set.binary_search(&index) {
        Ok(pos) => {
            set.remove(pos);
            true
        }
        Err(_) => false,
    }
}

#[inline]
pub(crate) fn contains_sorted(set: &[u32], index: u32) -> bool {
    set.binary_search(&index).is_ok()
}

pub(crate) fn intersect(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

pub(crate) fn unite(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// True if the two sets share at least one index.
pub(crate) fn has_any(set: &[u32], other: &[u32]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < set.len() && j < other.len() {
        match set[i].cmp(&other[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => return true,
        }
    }
    false
}

/// True if every index of `other` is in `set`. Vacuously true for an empty `other`.
pub(crate) fn has_all(set: &[u32], other: &[u32]) -> bool {
    let mut i = 0;
    for &wanted in other {
        while i < set.len() && set[i] < wanted {
            i += 1;
        }
        if i == set.len() || set[i] != wanted {
            return false;
        }
    }
    true
}

/// True if every index of `other` is in `a` or in `b`.
pub(crate) fn has_all_in_either(a: &[u32], b: &[u32], other: &[u32]) -> bool {
    other
        .iter()
        .all(|&wanted| contains_sorted(a, wanted) || contains_sorted(b, wanted))
}

/// Ancestors of `index` found in `set`, nearest first.
///
/// Starts at `index`'s insertion point and walks down. Ancestors need not be
/// adjacent: earlier siblings and their subtrees (`C0` before `C1`) sit in
/// between. Such indices are skipped; the scan ends once it passes the root
/// of the chain, below which no ancestor can sit.
pub(crate) fn scan_parents(set: &[u32], index: u32, registry: &TagRegistry, out: &mut Vec<u32>) {
    let Some(def) = registry.definition_at(index) else {
        return;
    };
    let Some(&root) = def.parent_chain().first() else {
        return;
    };
    let start = set.partition_point(|&i| i < index);
    for &candidate in set[..start].iter().rev() {
        if candidate < root {
            break;
        }
        if def.is_child_of(candidate) {
            out.push(candidate);
        }
    }
}

/// Descendants of `index` found in `set`, ascending.
///
/// Descendants occupy the block of indices directly after `index`, so the
/// scan stops at the first non-descendant.
pub(crate) fn scan_children(set: &[u32], index: u32, registry: &TagRegistry, out: &mut Vec<u32>) {
    let Some(def) = registry.definition_at(index) else {
        return;
    };
    let start = set.partition_point(|&i| i <= index);
    for &candidate in &set[start..] {
        if !def.is_parent_of(candidate) {
            break;
        }
        out.push(candidate);
    }
}

// =============================================================================
// Tests
// =============================================================================
