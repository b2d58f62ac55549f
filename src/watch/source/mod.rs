// src/watch/source/mod.rs

//! A narrow, platform-agnostic view of a kernel change-notification source.
//!
//! The [`EventSource`] trait lets the [`Dispatcher`](crate::dispatch::Dispatcher) be driven by
//! either the real `inotify` crate or, in tests, an in-memory [`mock`] that needs no kernel
//! cooperation at all. This mirrors how the teacher's own log collector is generic over its
//! `Watcher` trait rather than calling `inotify` directly.

pub mod inotify_source;

#[cfg(test)]
pub mod mock;

use std::ffi::OsStr;
use std::fmt::Debug;
use std::hash::Hash;
use std::io;
use std::path::Path;

use inotify::{EventMask, WatchMask};

/// A kernel-assigned handle identifying a single watch registration.
///
/// `inotify::WatchDescriptor` satisfies this directly; the in-memory mock source uses a bare
/// `u32` counter.
pub trait Descriptor: Clone + Debug + Eq + Hash {}

/// One inbound change-notification record.
pub trait Event<D: Descriptor>: Debug {
    /// The descriptor this record was reported against.
    fn descriptor(&self) -> &D;

    /// The kernel event mask for this record.
    fn mask(&self) -> EventMask;

    /// The offending leaf name, if any (absent for self-events, and for some system events).
    fn name(&self) -> Option<&OsStr>;
}

/// A source of kernel change-notification events.
pub trait EventSource: Sized {
    /// The type used to identify a watch registration.
    type Descriptor: Descriptor;

    /// The type of event records this source produces.
    type Event: Event<Self::Descriptor>;

    /// Open the event source (e.g. `inotify_init1`).
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from opening the source.
    fn init() -> io::Result<Self>;

    /// Register a watch for `path` with the given mask.
    ///
    /// If `path` is already watched, implementations should behave like the kernel does for
    /// `inotify`: merge the mask into the existing registration and return its descriptor.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from registering the watch.
    fn add_watch(&mut self, path: &Path, mask: WatchMask) -> io::Result<Self::Descriptor>;

    /// Deregister a watch.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from deregistering the watch.
    fn remove_watch(&mut self, descriptor: &Self::Descriptor) -> io::Result<()>;

    /// Block until at least one event is available, then return every event ready to read.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from reading events.
    fn read_events_blocking(&mut self) -> io::Result<Vec<Self::Event>>;
}
