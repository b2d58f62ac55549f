// src/watch/registry.rs

//! The mapping from kernel watch descriptor to the [`Watch`](super::Watch) bindings registered
//! against it, plus the insertion-ordered list used to find every descriptor belonging to a
//! subtree during a rebuild.
//!
//! A single kernel descriptor can carry more than one binding: when two rules name the same
//! `target`, the kernel deduplicates the registration to one descriptor, but each rule still
//! needs its own command/regex/lookat context for dispatch (see the dispatcher's tie-break rule).
//! The registry keeps one small `Vec` of bindings per descriptor instead of merging them, so each
//! rule's context survives independently; `len`/`is_empty` still count descriptors, not
//! bindings, to match the "one descriptor, one kernel registration" invariant.

use std::collections::HashMap;

use super::source::Descriptor;
use super::Watch;

/// Owns every live [`Watch`] binding, keyed by the kernel descriptor that identifies it in
/// inbound events.
///
/// Descriptors are kernel-assigned and may be reused once freed; the registry never assumes they
/// are monotonic, only that they are unique among currently-live watches.
#[derive(Debug, Default)]
pub struct Registry<D: Descriptor> {
    by_descriptor: HashMap<D, Vec<Watch<D>>>,
    order: Vec<D>,
}

impl<D: Descriptor> Registry<D> {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_descriptor: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Add a binding for `watch.descriptor`, alongside any other rule already bound to the same
    /// descriptor.
    pub fn insert(&mut self, watch: Watch<D>) {
        let descriptor = watch.descriptor.clone();
        if !self.by_descriptor.contains_key(&descriptor) {
            self.order.push(descriptor.clone());
        }
        self.by_descriptor
            .entry(descriptor)
            .or_insert_with(Vec::new)
            .push(watch);
    }

    /// The bindings registered against `descriptor`, in the order they were installed. Empty if
    /// the descriptor is not (or no longer) registered.
    #[must_use]
    pub fn bindings(&self, descriptor: &D) -> &[Watch<D>] {
        self.by_descriptor
            .get(descriptor)
            .map_or(&[], Vec::as_slice)
    }

    /// The first binding registered against `descriptor`, used where any one binding's shared
    /// fields (path, effective mask, root) suffice.
    #[must_use]
    pub fn get(&self, descriptor: &D) -> Option<&Watch<D>> {
        self.bindings(descriptor).first()
    }

    /// Set every binding at `descriptor`'s `effective_mask` to `mask`, reflecting a kernel
    /// registration that grew to satisfy a newly-added rule on the same path.
    pub fn set_effective_mask(&mut self, descriptor: &D, mask: inotify::WatchMask) {
        if let Some(bindings) = self.by_descriptor.get_mut(descriptor) {
            for watch in bindings {
                watch.effective_mask = mask;
            }
        }
    }

    /// Remove every binding at `descriptor`, returning them if any were present.
    pub fn remove(&mut self, descriptor: &D) -> Vec<Watch<D>> {
        let removed = self.by_descriptor.remove(descriptor).unwrap_or_default();
        if !removed.is_empty() {
            self.order.retain(|d| d != descriptor);
        }
        removed
    }

    /// Every descriptor whose bindings' `root` equals `root`, in insertion order.
    ///
    /// Used by subtree rebuild to find every descriptor that needs tearing down.
    pub fn descriptors_for_root(&self, root: &D) -> Vec<D> {
        self.order
            .iter()
            .filter(|d| {
                self.by_descriptor
                    .get(*d)
                    .and_then(|bindings| bindings.first())
                    .map_or(false, |watch| &watch.root == root)
            })
            .cloned()
            .collect()
    }

    /// Iterate every binding currently registered, in insertion order of their descriptor.
    pub fn iter(&self) -> impl Iterator<Item = &Watch<D>> {
        self.order
            .iter()
            .filter_map(move |d| self.by_descriptor.get(d))
            .flat_map(|bindings| bindings.iter())
    }

    /// The number of distinct descriptors currently registered (not the number of bindings).
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_descriptor.len()
    }

    /// Whether the registry holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_descriptor.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use inotify::WatchMask;
    use regex::Regex;

    use crate::rule::LookAt;

    use super::*;

    fn watch(descriptor: u32, root: u32, path: &str, events: WatchMask) -> Watch<u32> {
        Watch {
            descriptor,
            path: PathBuf::from(path),
            effective_mask: events,
            root,
            events,
            command: "echo $ENTRY".to_string(),
            lookat: LookAt::Files,
            regex: Regex::new(".*").unwrap(),
            depth: 1,
            description: None,
        }
    }

    #[test]
    fn insert_and_lookup_is_bijective() {
        let mut registry = Registry::new();
        registry.insert(watch(1, 1, "/a", WatchMask::CREATE));
        registry.insert(watch(2, 1, "/a/b", WatchMask::CREATE));

        assert_eq!(registry.get(&1).unwrap().path, PathBuf::from("/a"));
        assert_eq!(registry.get(&2).unwrap().path, PathBuf::from("/a/b"));
        assert!(registry.get(&3).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_drops_from_order_and_map() {
        let mut registry = Registry::new();
        registry.insert(watch(1, 1, "/a", WatchMask::CREATE));
        registry.insert(watch(2, 1, "/a/b", WatchMask::CREATE));

        let removed = registry.remove(&1);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].path, PathBuf::from("/a"));
        assert!(registry.get(&1).is_none());
        assert_eq!(registry.iter().count(), 1);
    }

    #[test]
    fn descriptors_for_root_only_returns_subtree_members() {
        let mut registry = Registry::new();
        registry.insert(watch(1, 1, "/a", WatchMask::CREATE));
        registry.insert(watch(2, 1, "/a/b", WatchMask::CREATE));
        registry.insert(watch(3, 3, "/other", WatchMask::CREATE));

        let mut found = registry.descriptors_for_root(&1);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn iter_preserves_insertion_order() {
        let mut registry = Registry::new();
        registry.insert(watch(5, 5, "/a", WatchMask::CREATE));
        registry.insert(watch(2, 5, "/a/b", WatchMask::CREATE));
        registry.insert(watch(9, 5, "/a/c", WatchMask::CREATE));

        let descriptors: Vec<_> = registry.iter().map(|w| w.descriptor).collect();
        assert_eq!(descriptors, vec![5, 2, 9]);
    }

    #[test]
    fn two_rules_on_same_descriptor_keep_separate_bindings() {
        let mut registry = Registry::new();
        registry.insert(watch(1, 1, "/a", WatchMask::CREATE));
        registry.insert(watch(1, 1, "/a", WatchMask::DELETE));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.bindings(&1).len(), 2);

        registry.set_effective_mask(&1, WatchMask::CREATE | WatchMask::DELETE);
        for binding in registry.bindings(&1) {
            assert!(binding.effective_mask.contains(WatchMask::CREATE));
            assert!(binding.effective_mask.contains(WatchMask::DELETE));
        }
    }
}
