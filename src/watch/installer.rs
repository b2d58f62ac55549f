// src/watch/installer.rs

//! Registers kernel watches for a [`Rule`]'s target and, when the rule is recursive, for its
//! directory descendants up to `depth` levels deep.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, warn};

use crate::rule::{system_mask, Rule};

use super::source::{Descriptor, EventSource};
use super::{Registry, Watch};

/// Install watches for `rule`, rooted at `rule.target`, into `registry` via `source`.
///
/// Returns the descriptor of the (possibly pre-existing) root watch. A second rule naming the
/// same `target` as an already-installed watch has its events OR-ed into that watch's
/// `effective_mask` rather than creating a duplicate registration, matching the kernel's own
/// per-path deduplication.
///
/// # Errors
///
/// Propagates any `io::Error` from registering the root watch — this is a fatal, caller-visible
/// failure. Failures registering descendant watches are logged and do not abort installation of
/// the rest of the subtree.
pub fn install<S: EventSource>(
    source: &mut S,
    registry: &mut Registry<S::Descriptor>,
    rule: &Rule,
) -> io::Result<S::Descriptor> {
    let system = if rule.depth > 0 {
        system_mask()
    } else {
        inotify::WatchMask::empty()
    };
    let wanted_mask = rule.events | system;

    let previous_mask = existing_mask(registry, &rule.target);
    let effective_mask = wanted_mask | previous_mask;

    let descriptor = source.add_watch(&rule.target, effective_mask)?;

    // If this descriptor already carries bindings from an earlier rule on the same path, its
    // root identity is established by whichever binding was installed first; this rule's
    // binding joins it rather than replacing it, so both rules' contexts survive for dispatch.
    let root_key = registry
        .get(&descriptor)
        .map_or_else(|| descriptor.clone(), |existing| existing.root.clone());

    let root = Watch::root_from_rule(rule, descriptor.clone(), effective_mask);
    let root = Watch { root: root_key, ..root };
    debug!(
        "installed root watch {:?} for {:?} (mask {:?}){}",
        root.descriptor,
        root.path,
        root.effective_mask,
        root.description_suffix()
    );
    registry.insert(root.clone());
    registry.set_effective_mask(&descriptor, effective_mask);

    if rule.depth > 0 {
        install_descendants(source, registry, &root, &rule.target, 1, rule.depth);
    }

    Ok(descriptor)
}

/// Re-walk `root`'s subtree and reinstall descendant watches from scratch.
///
/// Used by a subtree rebuild: the root watch's own kernel registration is left untouched (it is
/// reused as-is, matching the teacher source's behaviour of never re-registering the root on
/// rebuild), only its descendants are rediscovered.
pub fn reinstall_descendants<S: EventSource>(
    source: &mut S,
    registry: &mut Registry<S::Descriptor>,
    root: &Watch<S::Descriptor>,
) {
    if root.depth > 0 {
        install_descendants(source, registry, root, &root.path, 1, root.depth);
    }
}

fn existing_mask<D: Descriptor>(registry: &Registry<D>, target: &Path) -> inotify::WatchMask {
    registry
        .iter()
        .find(|watch| watch.path == target)
        .map_or_else(inotify::WatchMask::empty, |watch| watch.effective_mask)
}

/// Walk directories under `dir`, skipping symlinks, installing a watch for each descendant up to
/// `max_depth` levels below the subtree root.
fn install_descendants<S: EventSource>(
    source: &mut S,
    registry: &mut Registry<S::Descriptor>,
    root: &Watch<S::Descriptor>,
    dir: &Path,
    current_depth: u8,
    max_depth: u8,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("failed to list {:?} while installing watches: {}", dir, err);
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("failed to read a directory entry under {:?}: {}", dir, err);
                continue;
            }
        };

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!("failed to stat {:?}: {}", entry.path(), err);
                continue;
            }
        };

        // Symlinks are not followed when installing watches.
        if !file_type.is_dir() || file_type.is_symlink() {
            continue;
        }

        let path = entry.path();
        match source.add_watch(&path, root.effective_mask) {
            Ok(descriptor) => {
                let watch = root.descendant(path.clone(), descriptor);
                debug!(
                    "installed descendant watch {:?} for {:?}{}",
                    watch.descriptor,
                    watch.path,
                    watch.description_suffix()
                );
                registry.insert(watch);

                if current_depth < max_depth {
                    install_descendants(source, registry, root, &path, current_depth + 1, max_depth);
                }
            }
            Err(err) => {
                warn!("failed to watch descendant {:?}: {}", path, err);
            }
        }
    }
}
