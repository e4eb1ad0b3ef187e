//! Graph queries and mutations.
//!
//! Queries are pure reads over a [`Graph`]. Mutations take `&mut Graph` and
//! leave it consistent on return: the option/condition cascade and the
//! `fromOptionIndex` bookkeeping run in the same call that changes an option
//! list, never later.

use crate::error::GraphError;
use crate::model::{Block, BlockType, Connection, Graph, Position};
use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Queries
// ────────────────────────────────────────────────────────────────────────────

/// True if the block already has its single incoming connection.
pub fn has_input(graph: &Graph, block_id: &str) -> bool {
    graph.connections.iter().any(|c| c.to == block_id)
}

/// True if the block's generic (non-option) output is wired.
pub fn has_output(graph: &Graph, block_id: &str) -> bool {
    graph.connections.iter().any(|c| c.starts_at(block_id, None))
}

/// True if option slot `option_index` of the block is wired.
pub fn is_option_connected(graph: &Graph, block_id: &str, option_index: usize) -> bool {
    graph
        .connections
        .iter()
        .any(|c| c.starts_at(block_id, Some(option_index)))
}

/// The selectable values of a condition block: the current options of the
/// option block its `condition_id` points at. Empty when unresolved.
pub fn available_condition_options<'g>(graph: &'g Graph, condition: &Block) -> &'g [String] {
    condition
        .condition_id
        .as_deref()
        .and_then(|id| graph.block(id))
        .filter(|b| b.block_type == BlockType::Option)
        .map(|b| b.options.as_slice())
        .unwrap_or(&[])
}

/// Condition blocks that point at `option_block_id`.
pub fn conditions_referencing<'a>(
    graph: &'a Graph,
    option_block_id: &'a str,
) -> impl Iterator<Item = &'a Block> {
    graph.blocks.iter().filter(move |b| {
        b.block_type == BlockType::Condition && b.condition_id.as_deref() == Some(option_block_id)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Block updates
// ────────────────────────────────────────────────────────────────────────────

/// A partial update of one block. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub message: Option<String>,
    pub position: Option<Position>,
    pub options: Option<Vec<String>>,
    /// `Some(None)` clears the selection.
    pub selected_condition: Option<Option<String>>,
}

impl BlockUpdate {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn description(text: impl Into<String>) -> Self {
        Self {
            description: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn options(options: Vec<String>) -> Self {
        Self {
            options: Some(options),
            ..Default::default()
        }
    }

    pub fn selected_condition(value: Option<String>) -> Self {
        Self {
            selected_condition: Some(value),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How the entries of an option list moved between two versions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionRemap {
    /// For each old index, the new index of the same entry (`None` = removed).
    pub index_map: Vec<Option<usize>>,
    /// `(old, new)` labels of entries renamed in place.
    pub renamed: Vec<(String, String)>,
    /// Labels of entries that no longer exist.
    pub removed: Vec<String>,
}

impl OptionRemap {
    /// Entries matched by label keep their identity, even if they moved.
    /// When the list length is unchanged, remaining unmatched entries are
    /// renames at the same index. Anything else unmatched was removed.
    pub fn between(old: &[String], new: &[String]) -> Self {
        let mut index_map: Vec<Option<usize>> = vec![None; old.len()];
        let mut claimed = vec![false; new.len()];
        for (i, label) in old.iter().enumerate() {
            if let Some(j) = new.iter().enumerate().position(|(j, n)| n == label && !claimed[j]) {
                index_map[i] = Some(j);
                claimed[j] = true;
            }
        }

        let mut renamed = Vec::new();
        if old.len() == new.len() {
            for i in 0..old.len() {
                if index_map[i].is_none() && !claimed[i] {
                    index_map[i] = Some(i);
                    claimed[i] = true;
                    renamed.push((old[i].clone(), new[i].clone()));
                }
            }
        }

        let removed = old
            .iter()
            .zip(&index_map)
            .filter(|(_, m)| m.is_none())
            .map(|(l, _)| l.clone())
            .collect();

        Self {
            index_map,
            renamed,
            removed,
        }
    }

    /// New index of old slot `i`, if it survived.
    pub fn map(&self, i: usize) -> Option<usize> {
        self.index_map.get(i).copied().flatten()
    }
}

fn first_duplicate(options: &[String]) -> Option<&String> {
    options
        .iter()
        .enumerate()
        .find(|(i, o)| options[..*i].contains(o))
        .map(|(_, o)| o)
}

/// Apply a partial update to block `id`.
///
/// Every field is validated before anything is written, so a rejected update
/// leaves the graph untouched. An `options` change on an option block renames
/// or clears dependent condition selections and remaps or drops the
/// connections originating at its option slots.
pub fn apply_block_update(graph: &mut Graph, id: &str, update: BlockUpdate) -> Result<(), GraphError> {
    let idx = graph
        .blocks
        .iter()
        .position(|b| b.id == id)
        .ok_or_else(|| GraphError::UnknownBlock(id.to_string()))?;
    let block_type = graph.blocks[idx].block_type;
    let not_applicable = |field: &'static str| GraphError::FieldNotApplicable {
        block_id: id.to_string(),
        block_type,
        field,
    };

    if update.message.is_some() && !block_type.has_message() {
        return Err(not_applicable("message"));
    }
    if let Some(options) = &update.options {
        if !block_type.has_option_outputs() {
            return Err(not_applicable("options"));
        }
        if let Some(dup) = first_duplicate(options) {
            return Err(GraphError::DuplicateOption {
                block_id: id.to_string(),
                label: dup.clone(),
            });
        }
    }
    if let Some(selected) = &update.selected_condition {
        if block_type != BlockType::Condition {
            return Err(not_applicable("selectedCondition"));
        }
        if let Some(value) = selected {
            let available = available_condition_options(graph, &graph.blocks[idx]);
            if !available.contains(value) {
                return Err(GraphError::UnknownOption {
                    block_id: id.to_string(),
                    label: value.clone(),
                });
            }
        }
    }

    let block = &mut graph.blocks[idx];
    if let Some(name) = update.name {
        block.name = name;
    }
    if let Some(description) = update.description {
        block.description = description;
    }
    if let Some(message) = update.message {
        block.message = message;
    }
    if let Some(position) = update.position {
        block.position = position;
    }
    if let Some(selected) = update.selected_condition {
        block.selected_condition = selected;
    }
    let remap = update.options.map(|new| {
        let old = std::mem::replace(&mut block.options, new);
        OptionRemap::between(&old, &block.options)
    });

    if let Some(remap) = remap {
        cascade_option_remap(graph, id, &remap);
    }
    Ok(())
}

fn cascade_option_remap(graph: &mut Graph, option_block_id: &str, remap: &OptionRemap) {
    for cond in graph.blocks.iter_mut().filter(|b| {
        b.block_type == BlockType::Condition && b.condition_id.as_deref() == Some(option_block_id)
    }) {
        let Some(selected) = cond.selected_condition.as_ref() else {
            continue;
        };
        if let Some((_, new)) = remap.renamed.iter().find(|(old, _)| old == selected) {
            debug!(condition = %cond.id, from = %selected, to = %new, "renamed condition selection");
            cond.selected_condition = Some(new.clone());
        } else if remap.removed.contains(selected) {
            debug!(condition = %cond.id, value = %selected, "cleared condition selection");
            cond.selected_condition = None;
        }
    }

    let mut dropped = Vec::new();
    graph.connections.retain_mut(|c| {
        if c.from != option_block_id {
            return true;
        }
        let Some(i) = c.from_option_index else {
            return true;
        };
        match remap.map(i) {
            Some(j) => {
                c.from_option_index = Some(j);
                true
            }
            None => {
                dropped.push(c.clone());
                false
            }
        }
    });
    for conn in &dropped {
        debug!(connection = %conn.id, "dropped connection of removed option");
        release_condition(graph, conn);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Structural mutations
// ────────────────────────────────────────────────────────────────────────────

/// Insert a block. The caller enforces the single-start rule.
pub fn add_block(graph: &mut Graph, block: Block) {
    graph.blocks.push(block);
}

/// Remove block `id`, every connection touching it, and the references of
/// any condition block that pointed at it.
pub fn delete_block(graph: &mut Graph, id: &str) -> Result<Block, GraphError> {
    let idx = graph
        .blocks
        .iter()
        .position(|b| b.id == id)
        .ok_or_else(|| GraphError::UnknownBlock(id.to_string()))?;
    let removed = graph.blocks.remove(idx);

    let mut dropped = Vec::new();
    graph.connections.retain(|c| {
        let touches = c.from == id || c.to == id;
        if touches {
            dropped.push(c.clone());
        }
        !touches
    });
    for conn in &dropped {
        release_condition(graph, conn);
    }

    for cond in graph
        .blocks
        .iter_mut()
        .filter(|b| b.block_type == BlockType::Condition && b.condition_id.as_deref() == Some(id))
    {
        cond.condition_id = None;
        cond.selected_condition = None;
    }

    debug!(block = %id, connections = dropped.len(), "deleted block");
    Ok(removed)
}

/// Append an accepted connection. Wiring an option block into a condition
/// block makes the condition select from that option block.
pub fn connect(graph: &mut Graph, connection: Connection) {
    let from_is_option = graph
        .block(&connection.from)
        .is_some_and(|b| b.block_type == BlockType::Option);
    if from_is_option {
        if let Some(cond) = graph
            .block_mut(&connection.to)
            .filter(|b| b.block_type == BlockType::Condition)
        {
            cond.condition_id = Some(connection.from.clone());
            cond.selected_condition = None;
        }
    }
    debug!(
        connection = %connection.id,
        from = %connection.from,
        to = %connection.to,
        option = ?connection.from_option_index,
        "connected"
    );
    graph.connections.push(connection);
}

/// Remove one connection.
pub fn disconnect(graph: &mut Graph, connection_id: &str) -> Result<Connection, GraphError> {
    let idx = graph
        .connections
        .iter()
        .position(|c| c.id == connection_id)
        .ok_or_else(|| GraphError::UnknownConnection(connection_id.to_string()))?;
    let removed = graph.connections.remove(idx);
    release_condition(graph, &removed);
    Ok(removed)
}

/// A removed edge that fed a condition from its option block releases the
/// condition's reference, unless another edge still wires them.
fn release_condition(graph: &mut Graph, removed: &Connection) {
    let still_wired = graph
        .connections
        .iter()
        .any(|c| c.from == removed.from && c.to == removed.to);
    if still_wired {
        return;
    }
    if let Some(cond) = graph.block_mut(&removed.to).filter(|b| {
        b.block_type == BlockType::Condition && b.condition_id.as_deref() == Some(removed.from.as_str())
    }) {
        cond.condition_id = None;
        cond.selected_condition = None;
    }
}
