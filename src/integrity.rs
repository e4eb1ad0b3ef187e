//! Load-time repair and authoring diagnostics.
//!
//! A graph coming back from persistence may have been written by an older
//! editor or edited by hand. [`sanitize`] drops or clears whatever would
//! violate the connection and condition invariants and reports each repair.
//! [`lint`] only reports; it flags graphs that are structurally valid but
//! cannot be a complete conversation.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::warn;

use crate::model::{BlockType, Graph};

/// One repair made by [`sanitize`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    #[error("dropped connection '{connection}': block '{block}' does not exist")]
    DanglingConnection { connection: String, block: String },

    #[error("dropped connection '{connection}': block '{block}' connects to itself")]
    SelfLoop { connection: String, block: String },

    #[error("dropped connection '{connection}': output of '{block}' is already connected")]
    DuplicateOutput { connection: String, block: String },

    #[error("dropped connection '{connection}': input of '{block}' is already connected")]
    DuplicateInput { connection: String, block: String },

    #[error("dropped connection '{connection}': {block_type} block '{block}' has no such output")]
    InvalidOutput {
        connection: String,
        block: String,
        block_type: BlockType,
    },

    #[error("dropped connection '{connection}': start block '{block}' accepts no input")]
    InputIntoStart { connection: String, block: String },

    #[error("dropped duplicate block id '{block}'")]
    DuplicateBlock { block: String },

    #[error("condition '{block}' referenced '{target}', which is not an option block; reference cleared")]
    BadConditionReference { block: String, target: String },

    #[error("condition '{block}' selected '{value}' without referencing an option block; selection cleared")]
    SelectionWithoutReference { block: String, value: String },

    #[error("condition '{block}' selected '{value}', which is not an option of '{target}'; selection cleared")]
    StaleSelection {
        block: String,
        target: String,
        value: String,
    },

    #[error("option block '{block}' listed '{label}' more than once; duplicate removed")]
    DuplicateOption { block: String, label: String },
}

/// Repair `graph` in place so that every invariant of the model holds.
///
/// Blocks are never removed except for exact duplicate ids (the first wins).
/// Connections are checked in order, so when two edges compete for the same
/// input or output slot the earlier one is kept.
pub fn sanitize(graph: &mut Graph) -> Vec<IntegrityWarning> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    graph.blocks.retain(|b| {
        if seen.insert(b.id.clone()) {
            true
        } else {
            warnings.push(IntegrityWarning::DuplicateBlock { block: b.id.clone() });
            false
        }
    });

    // Duplicate labels would make condition matching ambiguous; keep the first.
    // Later option slots shift down, so connection indices must follow.
    let mut option_shifts: IndexMap<String, Vec<Option<usize>>> = IndexMap::new();
    for block in graph.blocks.iter_mut().filter(|b| b.block_type == BlockType::Option) {
        let mut kept: IndexSet<String> = IndexSet::new();
        let mut map = Vec::with_capacity(block.options.len());
        for label in block.options.drain(..) {
            if kept.contains(&label) {
                warnings.push(IntegrityWarning::DuplicateOption {
                    block: block.id.clone(),
                    label,
                });
                map.push(None);
            } else {
                map.push(Some(kept.len()));
                kept.insert(label);
            }
        }
        block.options = kept.into_iter().collect();
        if map.iter().enumerate().any(|(i, m)| *m != Some(i)) {
            option_shifts.insert(block.id.clone(), map);
        }
    }

    let types: IndexMap<String, (BlockType, usize)> = graph
        .blocks
        .iter()
        .map(|b| (b.id.clone(), (b.block_type, b.options.len())))
        .collect();

    let mut outputs = HashSet::new();
    let mut inputs = HashSet::new();
    graph.connections.retain_mut(|c| {
        let missing = [&c.from, &c.to].into_iter().find(|id| !types.contains_key(*id));
        if let Some(id) = missing {
            warnings.push(IntegrityWarning::DanglingConnection {
                connection: c.id.clone(),
                block: id.clone(),
            });
            return false;
        }
        if c.from == c.to {
            warnings.push(IntegrityWarning::SelfLoop {
                connection: c.id.clone(),
                block: c.from.clone(),
            });
            return false;
        }

        let (from_type, option_count) = types[&c.from];
        if from_type == BlockType::Option {
            if let (Some(map), Some(i)) = (option_shifts.get(&c.from), c.from_option_index) {
                c.from_option_index = map.get(i).copied().flatten();
            }
        } else if from_type.has_generic_output() {
            c.from_option_index = None;
        }
        let valid_output = match (from_type, c.from_option_index) {
            (BlockType::Option, Some(i)) => i < option_count,
            (BlockType::Option, None) => false,
            (t, _) => t.has_generic_output(),
        };
        if !valid_output {
            warnings.push(IntegrityWarning::InvalidOutput {
                connection: c.id.clone(),
                block: c.from.clone(),
                block_type: from_type,
            });
            return false;
        }
        if !types[&c.to].0.accepts_input() {
            warnings.push(IntegrityWarning::InputIntoStart {
                connection: c.id.clone(),
                block: c.to.clone(),
            });
            return false;
        }
        if !outputs.insert((c.from.clone(), c.from_option_index)) {
            warnings.push(IntegrityWarning::DuplicateOutput {
                connection: c.id.clone(),
                block: c.from.clone(),
            });
            return false;
        }
        if !inputs.insert(c.to.clone()) {
            warnings.push(IntegrityWarning::DuplicateInput {
                connection: c.id.clone(),
                block: c.to.clone(),
            });
            return false;
        }
        true
    });

    let option_lists: IndexMap<String, Vec<String>> = graph
        .blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Option)
        .map(|b| (b.id.clone(), b.options.clone()))
        .collect();
    for block in graph.blocks.iter_mut() {
        if block.block_type != BlockType::Condition {
            continue;
        }
        let Some(target) = block.condition_id.clone() else {
            if let Some(value) = block.selected_condition.take() {
                warnings.push(IntegrityWarning::SelectionWithoutReference {
                    block: block.id.clone(),
                    value,
                });
            }
            continue;
        };
        let Some(options) = option_lists.get(&target) else {
            warnings.push(IntegrityWarning::BadConditionReference {
                block: block.id.clone(),
                target,
            });
            block.condition_id = None;
            block.selected_condition = None;
            continue;
        };
        if let Some(value) = block.selected_condition.as_ref().filter(|v| !options.contains(v)) {
            warnings.push(IntegrityWarning::StaleSelection {
                block: block.id.clone(),
                target,
                value: value.clone(),
            });
            block.selected_condition = None;
        }
    }

    for w in &warnings {
        warn!("{w}");
    }
    warnings
}

/// How serious a [`LintIssue`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// An authoring problem that [`sanitize`] does not fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub severity: Severity,
    /// Block the issue is about, if any.
    pub block: Option<String>,
    pub message: String,
}

impl LintIssue {
    fn error(block: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            block: block.map(str::to_string),
            message: message.into(),
        }
    }

    fn warning(block: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            block: block.map(str::to_string),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for LintIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.block {
            Some(b) => write!(f, "{level}: [{b}] {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}

/// Report structural problems of an otherwise valid graph.
///
/// Errors: no start block, more than one start block, no end block reachable
/// from the start. Warnings: blocks not reachable from the start, outputs that
/// are left open.
pub fn lint(graph: &Graph) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    let starts: Vec<_> = graph
        .blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Start)
        .collect();

    match starts.as_slice() {
        [] => issues.push(LintIssue::error(None, "workflow has no start block")),
        [_] => {}
        [_, rest @ ..] => {
            for extra in rest {
                issues.push(LintIssue::error(Some(extra.id.as_str()), "workflow has more than one start block"));
            }
        }
    }

    if let Some(start) = starts.first() {
        let reachable = reachable_from(graph, &start.id);
        let reaches_end = reachable.iter().any(|id| {
            graph
                .block(id)
                .is_some_and(|b| b.block_type == BlockType::End)
        });
        if !reaches_end {
            issues.push(LintIssue::error(Some(start.id.as_str()), "no end block is reachable from the start"));
        }
        for block in &graph.blocks {
            if !reachable.contains(&block.id) {
                issues.push(LintIssue::warning(Some(block.id.as_str()), "block is not reachable from the start"));
            }
        }
    }

    for block in &graph.blocks {
        if block.block_type.has_generic_output() && !crate::graph::has_output(graph, &block.id) {
            issues.push(LintIssue::warning(Some(block.id.as_str()), "output is not connected"));
        }
        if block.block_type == BlockType::Option {
            if block.options.is_empty() {
                issues.push(LintIssue::warning(Some(block.id.as_str()), "option block has no options"));
            }
            for (i, label) in block.options.iter().enumerate() {
                if !crate::graph::is_option_connected(graph, &block.id, i) {
                    issues.push(LintIssue::warning(
                        Some(block.id.as_str()),
                        format!("option '{label}' is not connected"),
                    ));
                }
            }
        }
        if block.block_type == BlockType::Condition && block.selected_condition.is_none() {
            issues.push(LintIssue::warning(Some(block.id.as_str()), "condition has no selected value"));
        }
    }
    issues
}

/// Block ids reachable from `start` by following connections, in visit order.
pub fn reachable_from(graph: &Graph, start: &str) -> IndexSet<String> {
    let mut seen = IndexSet::new();
    let mut stack = vec![start.to_string()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        for c in graph.outgoing(&id) {
            if !seen.contains(&c.to) {
                stack.push(c.to.clone());
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Connection, Position};

    fn block(id: &str, t: BlockType) -> Block {
        Block::with_id(id, t, id, Position::default())
    }

    #[test]
    fn drops_dangling_and_duplicate_connections() {
        let mut g = Graph::new();
        g.blocks.push(block("s", BlockType::Start));
        g.blocks.push(block("m", BlockType::Message));
        g.blocks.push(block("e", BlockType::End));
        g.connections.push(Connection::new("s", "m", None));
        g.connections.push(Connection::new("s", "e", None));
        g.connections.push(Connection::new("m", "ghost", None));
        g.connections.push(Connection::new("m", "m", None));
        g.connections.push(Connection::new("e", "m", None));
        g.connections.push(Connection::new("m", "s", None));

        let warnings = sanitize(&mut g);
        assert_eq!(g.connections.len(), 1);
        assert_eq!(g.connections[0].to, "m");
        assert_eq!(warnings.len(), 5);
        assert!(matches!(warnings[0], IntegrityWarning::DuplicateOutput { .. }));
        assert!(matches!(warnings[1], IntegrityWarning::DanglingConnection { ref block, .. } if block == "ghost"));
        assert!(matches!(warnings[2], IntegrityWarning::SelfLoop { .. }));
        assert!(matches!(warnings[3], IntegrityWarning::InvalidOutput { .. }));
        assert!(matches!(warnings[4], IntegrityWarning::InputIntoStart { .. }));
    }

    #[test]
    fn second_input_dropped() {
        let mut g = Graph::new();
        g.blocks.push(block("a", BlockType::Message));
        g.blocks.push(block("b", BlockType::Message));
        g.blocks.push(block("e", BlockType::End));
        g.connections.push(Connection::new("a", "e", None));
        g.connections.push(Connection::new("b", "e", None));
        let warnings = sanitize(&mut g);
        assert_eq!(g.connections.len(), 1);
        assert!(matches!(warnings[0], IntegrityWarning::DuplicateInput { .. }));
    }

    #[test]
    fn option_indices_checked_and_shifted() {
        let mut g = Graph::new();
        g.blocks.push(block("o", BlockType::Option).with_options(["A", "A", "B"]));
        g.blocks.push(block("e1", BlockType::End));
        g.blocks.push(block("e2", BlockType::End));
        g.blocks.push(block("e3", BlockType::End));
        g.connections.push(Connection::new("o", "e1", Some(2)));
        g.connections.push(Connection::new("o", "e2", Some(5)));
        g.connections.push(Connection::new("o", "e3", None));

        let warnings = sanitize(&mut g);
        assert_eq!(g.block("o").unwrap().options, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(g.connections.len(), 1);
        assert_eq!(g.connections[0].from_option_index, Some(1));
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn condition_references_repaired() {
        let mut g = Graph::new();
        g.blocks.push(block("o", BlockType::Option).with_options(["Yes"]));
        g.blocks.push(block("m", BlockType::Message));
        let mut c1 = block("c1", BlockType::Condition);
        c1.condition_id = Some("m".into());
        c1.selected_condition = Some("Yes".into());
        let mut c2 = block("c2", BlockType::Condition);
        c2.condition_id = Some("o".into());
        c2.selected_condition = Some("Maybe".into());
        let mut c3 = block("c3", BlockType::Condition);
        c3.condition_id = Some("o".into());
        c3.selected_condition = Some("Yes".into());
        g.blocks.extend([c1, c2, c3]);

        let warnings = sanitize(&mut g);
        assert_eq!(warnings.len(), 2);
        assert_eq!(g.block("c1").unwrap().condition_id, None);
        assert_eq!(g.block("c2").unwrap().condition_id.as_deref(), Some("o"));
        assert_eq!(g.block("c2").unwrap().selected_condition, None);
        assert_eq!(g.block("c3").unwrap().selected_condition.as_deref(), Some("Yes"));
    }

    #[test]
    fn selection_without_reference_cleared() {
        let mut g = Graph::new();
        let mut c = block("c", BlockType::Condition);
        c.selected_condition = Some("Yes".into());
        g.blocks.push(c);

        let warnings = sanitize(&mut g);
        assert_eq!(
            warnings,
            vec![IntegrityWarning::SelectionWithoutReference {
                block: "c".into(),
                value: "Yes".into(),
            }]
        );
        assert_eq!(
            warnings[0].to_string(),
            "condition 'c' selected 'Yes' without referencing an option block; selection cleared"
        );
        assert_eq!(g.block("c").unwrap().selected_condition, None);
    }

    #[test]
    fn clean_graph_untouched() {
        let mut g = Graph::new();
        g.blocks.push(block("s", BlockType::Start));
        g.blocks.push(block("e", BlockType::End));
        g.connections.push(Connection::new("s", "e", None));
        let before = g.clone();
        assert!(sanitize(&mut g).is_empty());
        assert_eq!(g, before);
    }

    #[test]
    fn lint_reports_structure() {
        let mut g = Graph::new();
        assert_eq!(lint(&g)[0].message, "workflow has no start block");

        g.blocks.push(block("s", BlockType::Start));
        g.blocks.push(block("m", BlockType::Message));
        g.blocks.push(block("e", BlockType::End));
        g.connections.push(Connection::new("s", "m", None));
        let issues = lint(&g);
        assert!(issues.iter().any(|i| i.severity == Severity::Error
            && i.message == "no end block is reachable from the start"));
        assert!(issues.iter().any(|i| i.block.as_deref() == Some("e")
            && i.message == "block is not reachable from the start"));

        g.connections.push(Connection::new("m", "e", None));
        assert!(lint(&g).iter().all(|i| i.severity == Severity::Warning));
        assert!(lint(&g).is_empty());
    }

    #[test]
    fn lint_multiple_starts() {
        let mut g = Graph::new();
        g.blocks.push(block("s1", BlockType::Start));
        g.blocks.push(block("s2", BlockType::Start));
        let issues = lint(&g);
        assert!(issues
            .iter()
            .any(|i| i.block.as_deref() == Some("s2") && i.message.contains("more than one")));
    }
}
