//! Parsing of the runtime's tabular `list` / `ps` output.
//!
//! The first non-blank line is treated as a header when it contains a known
//! column name. Each remaining row is split on whitespace; the first token is
//! the model name. Rows whose name was already seen are dropped.

use std::collections::HashSet;

use crate::domain::{ModelDescriptor, RunningModelDescriptor};

const HEADER_TOKENS: &[&str] = &["NAME", "ID", "SIZE", "MODIFIED", "PROCESSOR", "UNTIL"];

fn is_header(line: &str) -> bool {
    line.split_whitespace()
        .any(|token| HEADER_TOKENS.contains(&token))
}

/// Data rows as token lists, header and blank lines removed, names unique.
fn rows(output: &str) -> Vec<Vec<&str>> {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty()).peekable();
    if lines.peek().is_some_and(|first| is_header(first)) {
        lines.next();
    }

    let mut seen = HashSet::new();
    lines
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .filter(|tokens| tokens.first().is_some_and(|name| seen.insert(*name)))
        .collect()
}

/// Rows of `<cli> list`.
///
/// The second token lands in `modified_at`; size and digest stay empty since
/// the columns are not reliably aligned across runtime versions.
pub fn parse_model_list(output: &str) -> Vec<ModelDescriptor> {
    rows(output)
        .into_iter()
        .map(|tokens| {
            let mut model = ModelDescriptor::named(tokens[0]);
            model.modified_at = tokens.get(1).map(ToString::to_string).unwrap_or_default();
            model
        })
        .collect()
}

/// Rows of `<cli> ps`.
pub fn parse_running_list(output: &str) -> Vec<RunningModelDescriptor> {
    rows(output)
        .into_iter()
        .map(|tokens| {
            let mut model = RunningModelDescriptor::named(tokens[0]);
            model.instance_id = tokens.get(1).map(ToString::to_string);
            model
        })
        .collect()
}
