// src/watch/mod.rs

//! The watch graph: one [`Watch`] per (rule, installed path) pair, kept in a [`Registry`] keyed
//! by kernel watch descriptor, and maintained by the [`installer`].

pub mod installer;
pub mod registry;
pub mod source;

use std::path::PathBuf;

use inotify::WatchMask;
use regex::Regex;

use crate::rule::{LookAt, Rule};
use source::Descriptor;

pub use registry::Registry;

/// One kernel watch registration, carrying everything the dispatcher needs to filter and react
/// to events reported against it.
///
/// Cloning a `Watch` produces an independent value — this is relied upon by the worker spawner,
/// which receives a value copy so that a concurrent subtree rebuild can never mutate or free a
/// `Watch` a worker is still using (see the concurrency notes on value-copy handoff).
#[derive(Debug, Clone)]
pub struct Watch<D: Descriptor> {
    /// The kernel-assigned descriptor for this watch.
    pub descriptor: D,

    /// The absolute path this watch is attached to.
    pub path: PathBuf,

    /// The mask actually registered with the kernel for this watch (rule events, plus the
    /// system mask when part of a `depth > 0` subtree).
    pub effective_mask: WatchMask,

    /// The descriptor of the subtree root this watch belongs to. Equal to `descriptor` when this
    /// watch IS the root.
    pub root: D,

    /// The rule's own requested events (without the system mask), used for the dispatcher's
    /// mask-match step.
    pub events: WatchMask,

    /// The shell-command template to expand and spawn.
    pub command: String,

    /// The file-system object class this watch's events may concern.
    pub lookat: LookAt,

    /// This watch's own compiled copy of the rule's leaf-name filter.
    pub regex: Regex,

    /// The rule's configured recursion depth (replicated for cheap access during dispatch).
    pub depth: u8,

    /// The rule's optional description, for log lines.
    pub description: Option<String>,
}

impl<D: Descriptor> Watch<D> {
    /// Whether this watch's command template references `$ENTRY`.
    #[must_use]
    pub fn uses_entry_variable(&self) -> bool {
        self.command.contains("$ENTRY")
    }

    /// A bracketed `" [description]"` suffix for log lines, or an empty string when the rule this
    /// watch came from has no `description`.
    #[must_use]
    pub fn description_suffix(&self) -> String {
        self.description
            .as_deref()
            .map_or_else(String::new, |description| format!(" [{}]", description))
    }

    /// Build the root watch for `rule`, given the descriptor the kernel assigned it.
    #[must_use]
    pub fn root_from_rule(rule: &Rule, descriptor: D, effective_mask: WatchMask) -> Self {
        Self {
            descriptor: descriptor.clone(),
            path: rule.target.clone(),
            effective_mask,
            root: descriptor,
            events: rule.events,
            command: rule.command.clone(),
            lookat: rule.lookat,
            regex: rule.regex.clone(),
            depth: rule.depth,
            description: rule.description.clone(),
        }
    }

    /// Build a descendant watch, cloning this watch's rule-derived fields and overriding the
    /// path and descriptor.
    #[must_use]
    pub fn descendant(&self, path: PathBuf, descriptor: D) -> Self {
        Self {
            descriptor,
            path,
            effective_mask: self.effective_mask,
            root: self.root.clone(),
            events: self.events,
            command: self.command.clone(),
            lookat: self.lookat,
            regex: self.regex.clone(),
            depth: self.depth,
            description: self.description.clone(),
        }
    }
}
