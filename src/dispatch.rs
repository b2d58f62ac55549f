// src/dispatch.rs

//! The event dispatch loop: reads kernel change-notification batches, matches each record
//! against the watch registry, runs the filter pipeline, and either spawns a worker or schedules
//! a subtree rebuild.

use std::fs;
use std::io;

use inotify::{EventMask, WatchMask};
use log::{debug, trace, warn};

use crate::expand::expand;
use crate::rule::system_mask;
use crate::spawn;
use crate::watch::source::{Event, EventSource};
use crate::watch::{installer, Registry, Watch};

/// Drives dispatch for a single kernel event source and the registry of watches installed
/// against it.
pub struct Dispatcher<S: EventSource> {
    source: S,
    registry: Registry<S::Descriptor>,
}

impl<S: EventSource> Dispatcher<S> {
    /// Build a dispatcher around an already-initialised source and a registry already populated
    /// with the rules' watches.
    #[must_use]
    pub fn new(source: S, registry: Registry<S::Descriptor>) -> Self {
        Self { source, registry }
    }

    /// The registry of watches currently installed, for introspection (and tests).
    #[must_use]
    pub fn registry(&self) -> &Registry<S::Descriptor> {
        &self.registry
    }

    /// Block for the next batch of kernel events and process every record in it.
    ///
    /// This is the dispatcher's only blocking point; everything else in a call is
    /// lookup/filter/handoff work bounded by the size of the batch.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from reading the kernel event source (for example an
    /// `inotify` read failure once the source's file descriptor has been closed).
    pub fn run_once(&mut self) -> io::Result<()> {
        let events = self.source.read_events_blocking()?;
        for event in events {
            self.handle_event(&event);
        }
        Ok(())
    }

    /// Tear down every watch and close the event source. Called once, from shutdown.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` encountered while deregistering a watch from the kernel.
    pub fn shutdown(mut self) -> io::Result<()> {
        let descriptors: Vec<_> = self.registry.iter().map(|w| w.descriptor.clone()).collect();
        let mut deduped = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if !deduped.contains(&descriptor) {
                deduped.push(descriptor);
            }
        }
        for descriptor in deduped {
            if let Err(err) = self.source.remove_watch(&descriptor) {
                warn!("failed to remove watch {:?} during shutdown: {}", descriptor, err);
            }
            self.registry.remove(&descriptor);
        }
        Ok(())
    }

    fn handle_event(&mut self, event: &S::Event) {
        if event.mask().contains(EventMask::Q_OVERFLOW) {
            warn!("kernel event queue overflowed; some events were lost");
            return;
        }

        let descriptor = event.descriptor().clone();

        // 1. Lookup. A miss means the kernel reported on a descriptor being torn down.
        let bindings = self.registry.bindings(&descriptor);
        if bindings.is_empty() {
            trace!("event on unregistered descriptor {:?}, dropping", descriptor);
            return;
        }

        // 2. Mask match + tie-break: the first binding whose events cover the record wins: a
        // second binding is never attempted for the same record.
        let matched = match bindings.iter().find(|watch| mask_intersects(watch.events, event.mask())) {
            Some(watch) => watch.clone(),
            None => {
                trace!(
                    "no rule on descriptor {:?} wants event mask {:?}",
                    descriptor,
                    event.mask()
                );
                return;
            }
        };

        // 3. Self-events short-circuit regex and stat filtering; the offending name is the
        // watch's own path.
        let is_self_event = event.mask().intersects(EventMask::DELETE_SELF | EventMask::MOVE_SELF);
        let name = if is_self_event {
            matched.path.to_string_lossy().into_owned()
        } else {
            event
                .name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        if !is_self_event && !self.passes_filters(&matched, &name, event.mask()) {
            return;
        }

        // 6. Rebuild trigger: decided before spawn handoff, acted on after (see step 8).
        let needs_rebuild = matched.depth > 0 && mask_intersects(system_mask(), event.mask());

        // 7. Spawn: a value copy of the watch and the offending name are already captured above;
        // expansion and the spawn handoff itself never touch the registry.
        debug!(
            "dispatching event {:?} on {:?} (name {:?}) to rule command `{}`{}",
            event.mask(),
            matched.path,
            name,
            matched.command,
            matched.description_suffix()
        );
        let expanded = expand(&matched.command, &matched.path, &name);
        spawn::spawn(expanded);

        // 8. Rebuild, deferred: runs after the spawn handoff, before the next record.
        if needs_rebuild {
            self.rebuild(&matched);
        }
    }

    /// Steps 4–5: the leaf-name regex filter and the file-type filter.
    fn passes_filters(&self, watch: &Watch<S::Descriptor>, name: &str, event_mask: EventMask) -> bool {
        if !watch.regex.is_match(name) {
            trace!("{:?} doesn't match regex for watch {:?}", name, watch.descriptor);
            return false;
        }

        let full_path = watch.path.join(name);
        match fs::metadata(&full_path) {
            Ok(metadata) => {
                if !watch.lookat.matches(&metadata.file_type()) {
                    trace!(
                        "watch {:?} isn't interested in {:?}'s file type, skipping",
                        watch.descriptor,
                        full_path
                    );
                    return false;
                }
                true
            }
            Err(err) => {
                let is_deletion = event_mask.intersects(EventMask::DELETE | EventMask::DELETE_SELF);
                if !is_deletion && watch.uses_entry_variable() {
                    warn!("stat {:?}: {}", full_path, err);
                    false
                } else {
                    // A deletion legitimately leaves no object to stat, and a command that
                    // doesn't reference `$ENTRY` has no use for the type filter either way:
                    // proceed to spawn without it.
                    true
                }
            }
        }
    }

    /// Step 8: tear down every descendant watch of `matched`'s subtree and reinstall them fresh.
    /// The root watch's own kernel registration is left untouched.
    fn rebuild(&mut self, matched: &Watch<S::Descriptor>) {
        let root_key = matched.root.clone();

        let descendants: Vec<_> = self
            .registry
            .descriptors_for_root(&root_key)
            .into_iter()
            .filter(|descriptor| *descriptor != root_key)
            .collect();

        for descriptor in descendants {
            if let Err(err) = self.source.remove_watch(&descriptor) {
                warn!("failed to remove watch {:?} during rebuild: {}", descriptor, err);
            }
            self.registry.remove(&descriptor);
        }

        let roots: Vec<_> = self.registry.bindings(&root_key).to_vec();
        for root in roots {
            installer::reinstall_descendants(&mut self.source, &mut self.registry, &root);
        }
    }
}

fn mask_intersects(watch_mask: WatchMask, event_mask: EventMask) -> bool {
    watch_mask.bits() & event_mask.bits() != 0
}
