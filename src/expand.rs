// src/expand.rs

//! Rewrites a rule's command template by substituting `$ENTRY`/`$ENTRY_RELATIVE` with the
//! offending path, token by token.

use std::path::Path;

/// Expand `template` against the watched `path` and the offending leaf `name`, producing a
/// string suitable for `/bin/sh -c`.
///
/// Substitution is whitespace-token by whitespace-token, left to right:
/// - every occurrence of `$ENTRY_RELATIVE` in a token is replaced with `name`;
/// - every occurrence of `$ENTRY` is then replaced with `path/name`.
///
/// `$ENTRY_RELATIVE` is substituted first so that it is never partially consumed as a `$ENTRY`
/// match (the longer token name would otherwise never be reachable, since `$ENTRY` is a prefix of
/// it). Characters are copied without mutation; the source this is based on corrupts its input by
/// incrementing pointers while copying, which is a bug and is not reproduced here.
#[must_use]
pub fn expand(template: &str, path: &Path, name: &str) -> String {
    let entry = join_path(path, name);

    template
        .split_whitespace()
        .map(|token| token.replace("$ENTRY_RELATIVE", name).replace("$ENTRY", &entry))
        .collect::<Vec<_>>()
        .join(" ")
        + " "
}

fn join_path(path: &Path, name: &str) -> String {
    format!("{}/{}", path.display(), name)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::expand;

    #[test]
    fn expands_entry() {
        let expanded = expand("cp $ENTRY /tgt", Path::new("/a"), "b.log");
        assert_eq!(expanded, "cp /a/b.log /tgt ");
    }

    #[test]
    fn expands_entry_relative() {
        let expanded = expand("touch $ENTRY_RELATIVE", Path::new("/a"), "b.log");
        assert_eq!(expanded, "touch b.log ");
    }

    #[test]
    fn entry_relative_does_not_leave_a_dangling_entry_match() {
        let expanded = expand("echo $ENTRY_RELATIVE $ENTRY", Path::new("/a"), "b.log");
        assert_eq!(expanded, "echo b.log /a/b.log ");
    }

    #[test]
    fn multiple_tokens_with_no_substitution_are_untouched() {
        let expanded = expand("echo hello world", Path::new("/a"), "b.log");
        assert_eq!(expanded, "echo hello world ");
    }

    #[test]
    fn self_event_uses_watch_path_as_name() {
        // Self-events pass `Watch.path` itself as `name` per the dispatcher's short-circuit.
        let expanded = expand("echo $ENTRY", Path::new("/a/b"), "/a/b");
        assert_eq!(expanded, "echo /a/b//a/b ");
    }

    #[test]
    fn repeated_tokens_are_each_substituted() {
        let expanded = expand("cat $ENTRY $ENTRY", Path::new("/a"), "b.log");
        assert_eq!(expanded, "cat /a/b.log /a/b.log ");
    }
}
