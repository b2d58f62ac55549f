// src/watch/source/inotify_source.rs

//! [`EventSource`] implementation backed by the `inotify` crate.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::Path;

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};

use super::{Descriptor, Event, EventSource};

const BUFFER_SIZE: usize = 4096;

impl Descriptor for WatchDescriptor {}

/// One inbound `inotify` event, detached from the read buffer it was parsed out of.
#[derive(Debug, Clone)]
pub struct InotifyEvent {
    descriptor: WatchDescriptor,
    mask: EventMask,
    name: Option<OsString>,
}

impl Event<WatchDescriptor> for InotifyEvent {
    fn descriptor(&self) -> &WatchDescriptor {
        &self.descriptor
    }

    fn mask(&self) -> EventMask {
        self.mask
    }

    fn name(&self) -> Option<&OsStr> {
        self.name.as_deref()
    }
}

impl<S: AsRef<OsStr>> From<inotify::Event<S>> for InotifyEvent {
    fn from(event: inotify::Event<S>) -> Self {
        Self {
            descriptor: event.wd,
            mask: event.mask,
            name: event.name.map(|name| name.as_ref().to_os_string()),
        }
    }
}

/// An [`EventSource`] backed by a real `inotify` file descriptor.
pub struct InotifySource {
    inner: Inotify,
    buffer: [u8; BUFFER_SIZE],
}

impl EventSource for InotifySource {
    type Descriptor = WatchDescriptor;
    type Event = InotifyEvent;

    fn init() -> io::Result<Self> {
        let inner = Inotify::init()?;
        Ok(Self {
            inner,
            buffer: [0; BUFFER_SIZE],
        })
    }

    /// Register a kernel watch for `path`.
    ///
    /// `IN_DONT_FOLLOW` is added unconditionally so that a symlink left in a watched directory
    /// does not cause the kernel to silently follow through to its target.
    fn add_watch(&mut self, path: &Path, mask: WatchMask) -> io::Result<Self::Descriptor> {
        self.inner.add_watch(path, mask | WatchMask::DONT_FOLLOW)
    }

    fn remove_watch(&mut self, descriptor: &Self::Descriptor) -> io::Result<()> {
        self.inner.rm_watch(descriptor.clone())
    }

    fn read_events_blocking(&mut self) -> io::Result<Vec<Self::Event>> {
        let events = self.inner.read_events_blocking(&mut self.buffer)?;
        Ok(events.map(InotifyEvent::from).collect())
    }
}
