//! Per-block presentation and inline editing.
//!
//! [`BlockView::derive`] turns one block plus the graph facts it depends on
//! into everything a renderer has to show: which handles are visible, which
//! fields are editable, what the condition select offers. [`BlockEditor`]
//! holds the block's staged, not yet committed edit. Neither touches the
//! graph; both report what the user wants as a [`BlockIntent`].

use crate::error::EditRejected;
use crate::graph::{self, BlockUpdate};
use crate::model::{Block, BlockType, Graph, Handle, HandleKind};

use super::palette::{BlockColors, BlockStyle};
use super::viewport::ScreenPos;

/// Where a mouse-down landed on a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Plain block surface; starts a drag.
    Surface,
    /// A text field or select.
    Field,
    /// An input or output dot.
    Handle,
    Button,
}

impl PointerTarget {
    pub fn starts_drag(self) -> bool {
        self == PointerTarget::Surface
    }
}

/// What a block asks its owner to do.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockIntent {
    Update(String, BlockUpdate),
    Delete(String),
    ConnectionClick(Handle),
    MouseDown {
        block_id: String,
        target: PointerTarget,
        pointer: ScreenPos,
    },
}

/// Everything a block view reads from above.
#[derive(Debug, Clone, Copy)]
pub struct BlockProps<'a> {
    pub block: &'a Block,
    pub graph: &'a Graph,
    pub is_selected: bool,
    pub colors: &'a BlockColors,
    /// The handle armed by the first click of a pending connection.
    pub pending: Option<&'a Handle>,
    pub is_being_dragged: bool,
}

/// One option entry of an option block.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionRow {
    pub index: usize,
    pub label: String,
    pub connected: bool,
    /// Output dot visible (the option is not wired yet).
    pub show_handle: bool,
    pub armed: bool,
}

/// The single-select of a condition block.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSelect {
    pub choices: Vec<String>,
    pub selected: Option<String>,
    /// False until an option block feeds this condition.
    pub enabled: bool,
}

/// Derived display state of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockView {
    pub id: String,
    pub block_type: BlockType,
    pub name: String,
    pub description: String,
    /// `Some` for block kinds that carry a message.
    pub message: Option<String>,
    pub style: BlockStyle,
    pub show_input: bool,
    pub show_output: bool,
    pub input_armed: bool,
    pub output_armed: bool,
    pub options: Vec<OptionRow>,
    pub condition: Option<ConditionSelect>,
    pub deletable: bool,
    pub is_selected: bool,
    /// Some handle of this block is armed for a connection.
    pub is_armed: bool,
    pub is_being_dragged: bool,
}

impl BlockView {
    pub fn derive(props: BlockProps<'_>) -> Self {
        let BlockProps {
            block,
            graph,
            is_selected,
            colors,
            pending,
            is_being_dragged,
        } = props;
        let id = block.id.as_str();
        let t = block.block_type;
        let armed = |kind: HandleKind, index: Option<usize>| {
            pending.is_some_and(|h| h.block_id == id && h.kind == kind && h.option_index == index)
        };

        let options = if t == BlockType::Option {
            block
                .options
                .iter()
                .enumerate()
                .map(|(i, label)| {
                    let connected = graph::is_option_connected(graph, id, i);
                    OptionRow {
                        index: i,
                        label: label.clone(),
                        connected,
                        show_handle: !connected,
                        armed: armed(HandleKind::Output, Some(i)),
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        let condition = (t == BlockType::Condition).then(|| ConditionSelect {
            choices: graph::available_condition_options(graph, block).to_vec(),
            selected: block.selected_condition.clone(),
            enabled: block.condition_id.is_some(),
        });

        Self {
            id: block.id.clone(),
            block_type: t,
            name: block.name.clone(),
            description: block.description.clone(),
            message: t.has_message().then(|| block.message.clone()),
            style: colors.style(t),
            show_input: t.accepts_input() && !graph::has_input(graph, id),
            show_output: t.has_generic_output() && !graph::has_output(graph, id),
            input_armed: armed(HandleKind::Input, None),
            output_armed: armed(HandleKind::Output, None),
            options,
            condition,
            deletable: t != BlockType::Start,
            is_selected,
            is_armed: pending.is_some_and(|h| h.block_id == id),
            is_being_dragged,
        }
    }

    /// Intent for a click on the input dot.
    pub fn click_input(&self) -> BlockIntent {
        BlockIntent::ConnectionClick(Handle::input(&self.id))
    }

    /// Intent for a click on the generic output dot.
    pub fn click_output(&self) -> BlockIntent {
        BlockIntent::ConnectionClick(Handle::output(&self.id))
    }

    /// Intent for a click on option `index`'s output dot.
    pub fn click_option(&self, index: usize) -> BlockIntent {
        BlockIntent::ConnectionClick(Handle::option(&self.id, index))
    }

    /// Intent for the delete button; `None` where there is no button.
    pub fn click_delete(&self) -> Option<BlockIntent> {
        self.deletable.then(|| BlockIntent::Delete(self.id.clone()))
    }

    /// Intent for picking a value in the condition select.
    pub fn select_condition(&self, value: Option<String>) -> Option<BlockIntent> {
        let select = self.condition.as_ref().filter(|c| c.enabled)?;
        if value.as_ref().is_some_and(|v| !select.choices.contains(v)) {
            return None;
        }
        Some(BlockIntent::Update(self.id.clone(), BlockUpdate::selected_condition(value)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Staged inline edits
// ────────────────────────────────────────────────────────────────────────────

/// The field currently being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftField {
    Description,
    Message,
    /// Rename of an existing option.
    Option(usize),
    /// A new option to append.
    NewOption,
}

/// Keys the inline editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Enter,
    Escape,
}

/// Local transient edit state of one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockEditor {
    draft: Option<(DraftField, String)>,
}

impl BlockEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn field(&self) -> Option<&DraftField> {
        self.draft.as_ref().map(|(f, _)| f)
    }

    pub fn is_editing_field(&self, field: &DraftField) -> bool {
        self.field() == Some(field)
    }

    /// Staged text; renderers bind their text box to this.
    pub fn text_mut(&mut self) -> Option<&mut String> {
        self.draft.as_mut().map(|(_, t)| t)
    }

    pub fn text(&self) -> Option<&str> {
        self.draft.as_ref().map(|(_, t)| t.as_str())
    }

    /// Open `field` for editing, seeded with the block's current value.
    /// Any other open draft is discarded.
    pub fn begin(&mut self, block: &Block, field: DraftField) -> Result<(), EditRejected> {
        let seed = match &field {
            DraftField::Description => block.description.clone(),
            DraftField::Message => block.message.clone(),
            DraftField::Option(i) => block
                .options
                .get(*i)
                .cloned()
                .ok_or(EditRejected::NoSuchOption(*i))?,
            DraftField::NewOption => String::new(),
        };
        self.draft = Some((field, seed));
        Ok(())
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        if let Some((_, t)) = &mut self.draft {
            *t = text.into();
        }
    }

    /// Discard the staged edit.
    pub fn cancel(&mut self) {
        self.draft = None;
    }

    /// Turn the staged edit into an update of `block`.
    ///
    /// On success the draft is closed. On rejection the draft stays open so
    /// the user can fix it. An option edit that changes nothing closes the
    /// draft and yields no intent.
    pub fn commit(&mut self, block: &Block) -> Result<Option<BlockIntent>, EditRejected> {
        let (field, text) = self.draft.as_ref().ok_or(EditRejected::NothingStaged)?;
        let update = match field {
            DraftField::Description => Some(BlockUpdate::description(text.clone())),
            DraftField::Message => Some(BlockUpdate::message(text.clone())),
            DraftField::Option(i) => {
                let label = text.trim();
                let current = block.options.get(*i).ok_or(EditRejected::NoSuchOption(*i))?;
                if label.is_empty() {
                    return Err(EditRejected::EmptyOption);
                }
                if label == current {
                    None
                } else if block.options.iter().enumerate().any(|(j, o)| j != *i && o == label) {
                    return Err(EditRejected::DuplicateOption(label.to_string()));
                } else {
                    let mut options = block.options.clone();
                    options[*i] = label.to_string();
                    Some(BlockUpdate::options(options))
                }
            }
            DraftField::NewOption => {
                let label = text.trim();
                if label.is_empty() {
                    // Nothing typed: just close the draft.
                    None
                } else if block.options.iter().any(|o| o == label) {
                    return Err(EditRejected::DuplicateOption(label.to_string()));
                } else {
                    let mut options = block.options.clone();
                    options.push(label.to_string());
                    Some(BlockUpdate::options(options))
                }
            }
        };
        self.draft = None;
        Ok(update.map(|u| BlockIntent::Update(block.id.clone(), u)))
    }

    /// Enter commits, Escape cancels.
    pub fn handle_key(&mut self, key: EditKey, block: &Block) -> Result<Option<BlockIntent>, EditRejected> {
        match key {
            EditKey::Enter => self.commit(block),
            EditKey::Escape => {
                self.cancel();
                Ok(None)
            }
        }
    }

    /// Remove option `index` immediately. A draft editing that option, or
    /// one after it, is closed since its index no longer matches.
    pub fn delete_option(&mut self, block: &Block, index: usize) -> Result<BlockIntent, EditRejected> {
        if index >= block.options.len() {
            return Err(EditRejected::NoSuchOption(index));
        }
        if matches!(self.field(), Some(DraftField::Option(i)) if *i >= index) {
            self.draft = None;
        }
        let mut options = block.options.clone();
        options.remove(index);
        Ok(BlockIntent::Update(block.id.clone(), BlockUpdate::options(options)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Connection, Position};

    fn graph() -> Graph {
        let p = Position::default();
        let mut g = Graph::new();
        g.blocks.push(Block::with_id("s", BlockType::Start, "Start", p).with_message("Hi"));
        g.blocks.push(Block::with_id("o", BlockType::Option, "Ask", p).with_options(["Yes", "No"]));
        g.blocks.push(Block::with_id("c", BlockType::Condition, "Cond", p));
        g.blocks.push(Block::with_id("e", BlockType::End, "End", p));
        g.connections.push(Connection::new("s", "o", None));
        g.connections.push(Connection::new("o", "e", Some(1)));
        g
    }

    fn view(g: &Graph, id: &str, pending: Option<&Handle>) -> BlockView {
        let colors = BlockColors::default();
        BlockView::derive(BlockProps {
            block: g.block(id).unwrap(),
            graph: g,
            is_selected: false,
            colors: &colors,
            pending,
            is_being_dragged: false,
        })
    }

    #[test]
    fn handle_visibility() {
        let g = graph();
        let s = view(&g, "s", None);
        assert!(!s.show_input);
        assert!(!s.show_output);
        assert!(!s.deletable);
        assert_eq!(s.message.as_deref(), Some("Hi"));

        let o = view(&g, "o", None);
        assert!(!o.show_input);
        assert!(!o.show_output);
        assert!(o.message.is_none());
        assert_eq!(o.options.len(), 2);
        assert!(o.options[0].show_handle);
        assert!(!o.options[1].show_handle);

        let e = view(&g, "e", None);
        assert!(!e.show_input);
        assert!(!e.show_output);

        let c = view(&g, "c", None);
        assert!(c.show_input);
        assert!(c.show_output);
    }

    #[test]
    fn condition_select_follows_reference() {
        let mut g = graph();
        let c = view(&g, "c", None);
        let select = c.condition.as_ref().unwrap();
        assert!(!select.enabled);
        assert!(select.choices.is_empty());
        assert_eq!(c.select_condition(Some("Yes".into())), None);

        g.block_mut("c").unwrap().condition_id = Some("o".into());
        let c = view(&g, "c", None);
        assert_eq!(c.condition.as_ref().unwrap().choices, vec!["Yes".to_string(), "No".to_string()]);
        assert!(matches!(c.select_condition(Some("No".into())), Some(BlockIntent::Update(..))));
        assert_eq!(c.select_condition(Some("Maybe".into())), None);
    }

    #[test]
    fn armed_state() {
        let g = graph();
        let pending = Handle::option("o", 0);
        let o = view(&g, "o", Some(&pending));
        assert!(o.is_armed);
        assert!(o.options[0].armed);
        assert!(!o.options[1].armed);
        assert!(!view(&g, "c", Some(&pending)).is_armed);
    }

    #[test]
    fn commit_and_cancel() {
        let g = graph();
        let s = g.block("s").unwrap();
        let mut ed = BlockEditor::new();
        ed.begin(s, DraftField::Message).unwrap();
        assert_eq!(ed.text(), Some("Hi"));
        ed.set_text("Hello there");
        let intent = ed.handle_key(EditKey::Enter, s).unwrap().unwrap();
        assert_eq!(intent, BlockIntent::Update("s".into(), BlockUpdate::message("Hello there")));
        assert!(!ed.is_editing());

        ed.begin(s, DraftField::Description).unwrap();
        ed.set_text("ignored");
        assert_eq!(ed.handle_key(EditKey::Escape, s), Ok(None));
        assert!(!ed.is_editing());
        assert_eq!(ed.commit(s), Err(EditRejected::NothingStaged));
    }

    #[test]
    fn option_edits() {
        let g = graph();
        let o = g.block("o").unwrap();
        let mut ed = BlockEditor::new();

        ed.begin(o, DraftField::NewOption).unwrap();
        ed.set_text(" No ");
        assert_eq!(ed.commit(o), Err(EditRejected::DuplicateOption("No".into())));
        assert!(ed.is_editing());
        ed.set_text("Maybe");
        assert_eq!(
            ed.commit(o).unwrap(),
            Some(BlockIntent::Update(
                "o".into(),
                BlockUpdate::options(vec!["Yes".into(), "No".into(), "Maybe".into()])
            ))
        );

        ed.begin(o, DraftField::Option(0)).unwrap();
        ed.set_text("   ");
        assert_eq!(ed.commit(o), Err(EditRejected::EmptyOption));
        ed.set_text("Yes");
        assert_eq!(ed.commit(o), Ok(None));

        ed.begin(o, DraftField::Option(0)).unwrap();
        ed.set_text("Yep");
        assert_eq!(
            ed.commit(o).unwrap(),
            Some(BlockIntent::Update("o".into(), BlockUpdate::options(vec!["Yep".into(), "No".into()])))
        );
        assert_eq!(ed.begin(o, DraftField::Option(9)), Err(EditRejected::NoSuchOption(9)));
    }

    #[test]
    fn delete_option_closes_shifted_draft() {
        let g = graph();
        let o = g.block("o").unwrap();
        let mut ed = BlockEditor::new();
        ed.begin(o, DraftField::Option(1)).unwrap();
        let intent = ed.delete_option(o, 0).unwrap();
        assert_eq!(intent, BlockIntent::Update("o".into(), BlockUpdate::options(vec!["No".into()])));
        assert!(!ed.is_editing());
        assert_eq!(ed.delete_option(o, 5), Err(EditRejected::NoSuchOption(5)));
    }
}
