// src/rule/loader.rs

//! Parses a rule file into a sequence of validated [`Rule`]s.
//!
//! Two dialects are supported and autodetected from the file's content: a block dialect of
//! `{ KEY = VALUE ... }` stanzas, and a structured dialect of a single top-level JSON array of
//! objects. A single invocation sees only one dialect: whichever the first non-comment,
//! non-whitespace byte of the file implies.

use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::error::config_error;

use super::{parse_events, LookAt, Rule, MAX_DEPTH};

/// Load and validate all rules in the file at `path`.
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be read, or if any rule fails validation. On
/// failure, no `Rule`s are returned — loading is all-or-nothing.
pub fn load_rules_from_file(path: &Path) -> io::Result<Vec<Rule>> {
    let content = std::fs::read_to_string(path)?;
    load_rules(&content)
}

/// Parse rule-file content, autodetecting the dialect.
///
/// # Errors
///
/// Returns an `io::Error` identifying the offending rule's index if any rule is invalid.
pub fn load_rules(content: &str) -> io::Result<Vec<Rule>> {
    if is_structured_dialect(content) {
        load_structured(content)
    } else {
        load_block(content)
    }
}

fn is_structured_dialect(content: &str) -> bool {
    content
        .lines()
        .map(str::trim_start)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map_or(false, |line| line.starts_with('['))
}

/// One rule in the structured (JSON) dialect, before validation.
#[derive(Debug, Deserialize)]
struct RawRule {
    target: String,
    watches: String,
    spawn: String,
    lookat: String,
    regex: String,
    depth: u8,
    #[serde(default)]
    description: Option<String>,
}

fn load_structured(content: &str) -> io::Result<Vec<Rule>> {
    let raw_rules: Vec<RawRule> = serde_json::from_str(content)
        .map_err(|err| config_error(None, format!("invalid rule file: {}", err)))?;

    let mut rules = Vec::with_capacity(raw_rules.len());
    for (index, raw) in raw_rules.into_iter().enumerate() {
        let rule = build_rule(
            raw.target,
            &raw.watches,
            raw.spawn,
            &raw.lookat,
            &raw.regex,
            raw.depth,
            raw.description,
        )
        .map_err(|message| config_error(Some(index), message))?;
        rules.push(rule);
    }
    Ok(rules)
}

fn load_block(content: &str) -> io::Result<Vec<Rule>> {
    let uncommented = strip_comments(content);
    let blocks = split_blocks(&uncommented);

    let mut rules = Vec::with_capacity(blocks.len());
    for (index, block) in blocks.iter().enumerate() {
        let fields = BlockFields::parse(block);
        let rule = fields
            .into_rule()
            .map_err(|message| config_error(Some(index), message))?;
        rules.push(rule);
    }
    Ok(rules)
}

fn strip_comments(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split `{ ... }` stanzas out of block-dialect content. Braces do not nest in practice, but we
/// track depth defensively so stray braces in a value don't desynchronise later blocks.
fn split_blocks(content: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut depth = 0u32;
    let mut current = String::new();

    for ch in content.chars() {
        match ch {
            '{' => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    blocks.push(std::mem::take(&mut current));
                    continue;
                }
            }
            _ => {}
        }
        if depth >= 1 {
            current.push(ch);
        }
    }

    blocks
}

#[derive(Debug, Default)]
struct BlockFields {
    target: Option<String>,
    watches: Option<String>,
    spawn: Option<String>,
    lookat: Option<String>,
    regex: Option<String>,
    depth: Option<String>,
}

impl BlockFields {
    fn parse(block: &str) -> Self {
        let mut fields = Self::default();
        for line in block.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = match line.split_once('=') {
                Some(pair) => pair,
                None => continue,
            };
            let key = key.trim().to_ascii_uppercase();
            // Values are used strictly as data: never interpolated as a format string.
            let value = value.trim().to_string();
            match key.as_str() {
                "TARGET" => fields.target = Some(value),
                "WATCHES" => fields.watches = Some(value),
                "SPAWN" => fields.spawn = Some(value),
                "LOOKAT" => fields.lookat = Some(value),
                "ACCEPT_REGEX" => fields.regex = Some(value),
                "RECURSIVE_DEPTH" => fields.depth = Some(value),
                _ => {}
            }
        }
        fields
    }

    fn into_rule(self) -> Result<Rule, String> {
        let target = self.target.ok_or("missing TARGET")?;
        let watches = self.watches.ok_or("missing WATCHES")?;
        let spawn = self.spawn.ok_or("missing SPAWN")?;
        let lookat = self.lookat.ok_or("missing LOOKAT")?;
        let regex = self.regex.ok_or("missing ACCEPT_REGEX")?;
        let depth = parse_recursive_depth(self.depth.as_deref().unwrap_or("NO"))?;

        build_rule(target, &watches, spawn, &lookat, &regex, depth, None)
    }
}

fn parse_recursive_depth(value: &str) -> Result<u8, String> {
    match value.to_ascii_uppercase().as_str() {
        "NO" => Ok(0),
        "YES" => Ok(MAX_DEPTH),
        other => other
            .parse::<u8>()
            .map_err(|_| format!("invalid RECURSIVE_DEPTH `{}`", other))
            .and_then(|depth| {
                if depth > MAX_DEPTH {
                    Err(format!(
                        "RECURSIVE_DEPTH {} exceeds maximum {}",
                        depth, MAX_DEPTH
                    ))
                } else {
                    Ok(depth)
                }
            }),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_rule(
    target: String,
    watches: &str,
    spawn: String,
    lookat: &str,
    regex_src: &str,
    depth: u8,
    description: Option<String>,
) -> Result<Rule, String> {
    if target.trim().is_empty() {
        return Err("TARGET must not be empty".to_string());
    }
    if spawn.trim().is_empty() {
        return Err("SPAWN must not be empty".to_string());
    }
    if depth > MAX_DEPTH {
        return Err(format!(
            "RECURSIVE_DEPTH {} exceeds maximum {}",
            depth, MAX_DEPTH
        ));
    }

    let events = parse_events(watches)?;
    let lookat = LookAt::parse(lookat).map_err(|bad| format!("unknown LOOKAT value `{}`", bad))?;
    let regex = Regex::new(regex_src)
        .map_err(|err| format!("invalid ACCEPT_REGEX `{}`: {}", regex_src, err))?;

    Ok(Rule {
        target: PathBuf::from(target),
        events,
        command: spawn,
        lookat,
        regex,
        depth,
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_RULE: &str = r#"
# a comment before the rule
{
  TARGET = /tmp/T
  WATCHES = CREATE MOVED_TO CLOSE_WRITE
  SPAWN = /usr/local/bin/react $ENTRY
  LOOKAT = FILES
  ACCEPT_REGEX = .*\.log$
  RECURSIVE_DEPTH = 2
}
"#;

    #[test]
    fn loads_single_block_rule() {
        let rules = load_rules(BLOCK_RULE).unwrap();
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.target, PathBuf::from("/tmp/T"));
        assert_eq!(rule.command, "/usr/local/bin/react $ENTRY");
        assert_eq!(rule.lookat, LookAt::Files);
        assert_eq!(rule.depth, 2);
        assert!(rule.regex.is_match("x.log"));
        assert!(!rule.regex.is_match("x.txt"));
    }

    #[test]
    fn loads_multiple_block_rules() {
        let content = format!("{}\n{}", BLOCK_RULE, BLOCK_RULE);
        let rules = load_rules(&content).unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn block_depth_shorthand() {
        let content = r#"
{
  TARGET = /tmp/T
  WATCHES = CREATE
  SPAWN = touch $ENTRY_RELATIVE
  LOOKAT = DIRS
  ACCEPT_REGEX = .*
  RECURSIVE_DEPTH = YES
}
"#;
        let rules = load_rules(content).unwrap();
        assert_eq!(rules[0].depth, MAX_DEPTH);
    }

    #[test]
    fn rejects_invalid_rule_with_index() {
        let bad = r#"
{
  TARGET = /tmp/T
  WATCHES = BOGUS
  SPAWN = echo hi
  LOOKAT = FILES
  ACCEPT_REGEX = .*
  RECURSIVE_DEPTH = 0
}
"#;
        let err = load_rules(bad).unwrap_err();
        assert!(err.to_string().contains("rule #1"));
    }

    #[test]
    fn rejects_invalid_rule_without_producing_any_rules() {
        let content = format!("{}\n{}", BLOCK_RULE, "{ TARGET = /tmp/T }");
        assert!(load_rules(&content).is_err());
    }

    const STRUCTURED_RULES: &str = r#"
[
  {
    "target": "/tmp/T",
    "watches": "CREATE MOVED_TO CLOSE_WRITE",
    "spawn": "/usr/local/bin/react $ENTRY",
    "lookat": "files",
    "regex": ".*\\.log$",
    "depth": 2,
    "description": "react to log files"
  }
]
"#;

    #[test]
    fn loads_structured_rules() {
        let rules = load_rules(STRUCTURED_RULES).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].description.as_deref(), Some("react to log files"));
    }

    #[test]
    fn structured_rejects_bad_regex() {
        let content = STRUCTURED_RULES.replace(r".*\\.log$", "(unclosed");
        assert!(load_rules(&content).is_err());
    }
}
