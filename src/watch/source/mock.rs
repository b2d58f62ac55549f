// src/watch/source/mock.rs

//! An in-memory [`EventSource`] used to drive the dispatcher's tests without a real kernel.

use std::collections::{HashMap, VecDeque};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use inotify::{EventMask, WatchMask};

use super::{Descriptor, Event, EventSource};

impl Descriptor for u32 {}

/// A queued event for [`MockSource`].
#[derive(Debug, Clone)]
pub struct MockEvent {
    descriptor: u32,
    mask: EventMask,
    name: Option<OsString>,
}

impl Event<u32> for MockEvent {
    fn descriptor(&self) -> &u32 {
        &self.descriptor
    }

    fn mask(&self) -> EventMask {
        self.mask
    }

    fn name(&self) -> Option<&OsStr> {
        self.name.as_deref()
    }
}

/// An [`EventSource`] that watches nothing real, for exercising the dispatch pipeline.
///
/// Tests drive it by calling [`MockSource::push_event`] to enqueue a record, then letting the
/// dispatcher call [`EventSource::read_events_blocking`] as usual.
#[derive(Default)]
pub struct MockSource {
    next_id: u32,
    watched_paths: HashMap<u32, PathBuf>,
    pending: VecDeque<MockEvent>,
}

impl MockSource {
    /// Enqueue an event as if the kernel had reported it for `descriptor`.
    pub fn push_event(&mut self, descriptor: u32, mask: EventMask, name: Option<&str>) {
        self.pending.push_back(MockEvent {
            descriptor,
            mask,
            name: name.map(OsString::from),
        });
    }

    /// The descriptor that was assigned to `path`, if it has been watched.
    #[must_use]
    pub fn descriptor_for(&self, path: &Path) -> Option<u32> {
        self.watched_paths
            .iter()
            .find(|(_, watched)| watched.as_path() == path)
            .map(|(descriptor, _)| *descriptor)
    }

    /// All paths currently registered, for assertions in tests.
    #[must_use]
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths.values().cloned().collect()
    }
}

impl EventSource for MockSource {
    type Descriptor = u32;
    type Event = MockEvent;

    fn init() -> io::Result<Self> {
        Ok(Self::default())
    }

    fn add_watch(&mut self, path: &Path, _mask: WatchMask) -> io::Result<Self::Descriptor> {
        if let Some(existing) = self.descriptor_for(path) {
            return Ok(existing);
        }
        self.next_id += 1;
        let descriptor = self.next_id;
        self.watched_paths.insert(descriptor, path.to_path_buf());
        Ok(descriptor)
    }

    fn remove_watch(&mut self, descriptor: &Self::Descriptor) -> io::Result<()> {
        self.watched_paths.remove(descriptor);
        Ok(())
    }

    fn read_events_blocking(&mut self) -> io::Result<Vec<Self::Event>> {
        if self.pending.is_empty() {
            panic!("MockSource::read_events_blocking called with no events queued");
        }
        Ok(self.pending.drain(..).collect())
    }
}
