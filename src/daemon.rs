// src/daemon.rs

//! Process lifecycle: initialise the kernel event source, install every rule's watches, run the
//! dispatch loop until a termination signal arrives, then tear everything down in order.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info};
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::dispatch::Dispatcher;
use crate::rule::Rule;
use crate::watch::installer;
use crate::watch::source::inotify_source::InotifySource;
use crate::watch::source::EventSource;
use crate::watch::Registry;

/// Initialise the kernel event source, install watches for every rule, then run the dispatch
/// loop until `SIGINT`/`SIGTERM` arrives.
///
/// # Errors
///
/// Returns an `io::Error` if the event source cannot be opened, if installing the root watch for
/// any rule fails, or if reading from the event source fails for a reason other than signal
/// interruption.
pub fn run(rules: Vec<Rule>) -> io::Result<()> {
    let mut source = InotifySource::init()?;
    let mut registry = Registry::new();

    for (index, rule) in rules.iter().enumerate() {
        match installer::install(&mut source, &mut registry, rule) {
            Ok(descriptor) => {
                debug!("rule #{} installed as root watch {:?}", index + 1, descriptor);
            }
            Err(err) => {
                error!("rule #{}: failed to install root watch: {}", index + 1, err);
                return Err(err);
            }
        }
    }

    let terminate = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        // SAFETY requirements are those of `signal_hook::flag::register`: only async-signal-safe
        // work (an atomic store) happens in the handler it installs.
        signal_hook::flag::register(signal, Arc::clone(&terminate))?;
    }

    info!("listening for events ({} rule(s) installed)", rules.len());
    let mut dispatcher = Dispatcher::new(source, registry);

    while !terminate.load(Ordering::Relaxed) {
        match dispatcher.run_once() {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }

    info!("termination signal received, shutting down");
    dispatcher.shutdown()?;
    Ok(())
}
