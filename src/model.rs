use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// WorkflowDoc – file wrapper
// ────────────────────────────────────────────────────────────────────────────

/// A named workflow as stored by [`crate::store::FsStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDoc {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub graph: Graph,
}

impl WorkflowDoc {
    /// Save the document as pretty-printed JSON.
    pub fn save_to_json<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Load a document from a JSON file.
    pub fn load_from_json<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let doc: WorkflowDoc = serde_json::from_reader(reader)?;
        Ok(doc)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Graph
// ────────────────────────────────────────────────────────────────────────────

/// The full conversation graph: every block plus the global connection set.
///
/// `connections` is the source of truth for wiring. Blocks never cache their
/// own edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Connections where `block_id` is either endpoint.
    pub fn connections_of<'a>(&'a self, block_id: &'a str) -> impl Iterator<Item = &'a Connection> {
        self.connections
            .iter()
            .filter(move |c| c.from == block_id || c.to == block_id)
    }

    /// The single incoming connection of a block, if wired.
    pub fn incoming(&self, block_id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.to == block_id)
    }

    /// Outgoing connections of a block (one for generic outputs, one per wired option).
    pub fn outgoing<'a>(&'a self, block_id: &'a str) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| c.from == block_id)
    }

    /// The first start block, if any.
    pub fn start_block(&self) -> Option<&Block> {
        self.blocks.iter().find(|b| b.block_type == BlockType::Start)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Block
// ────────────────────────────────────────────────────────────────────────────

/// Closed set of block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
    Start,
    Message,
    Option,
    Condition,
    UserResponse,
    End,
}

impl BlockType {
    pub const ALL: [BlockType; 6] = [
        BlockType::Start,
        BlockType::Message,
        BlockType::Option,
        BlockType::Condition,
        BlockType::UserResponse,
        BlockType::End,
    ];

    /// Wire name as used in the JSON format.
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Start => "start",
            BlockType::Message => "message",
            BlockType::Option => "option",
            BlockType::Condition => "condition",
            BlockType::UserResponse => "userResponse",
            BlockType::End => "end",
        }
    }

    /// Whether the block accepts an incoming connection.
    pub fn accepts_input(self) -> bool {
        self != BlockType::Start
    }

    /// Whether the block has a single, non-indexed output handle.
    pub fn has_generic_output(self) -> bool {
        matches!(
            self,
            BlockType::Start | BlockType::Message | BlockType::Condition | BlockType::UserResponse
        )
    }

    /// Whether the block outputs through indexed option slots.
    pub fn has_option_outputs(self) -> bool {
        self == BlockType::Option
    }

    /// Whether `message` carries meaning for this block kind.
    pub fn has_message(self) -> bool {
        matches!(self, BlockType::Start | BlockType::Message | BlockType::End)
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in canvas coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A node in the conversation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Chatbot utterance; meaningful only for start, message and end blocks.
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub position: Position,
    /// Display strings of an option block. Each entry is an output slot.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// For condition blocks: id of the option block whose options are selectable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<String>,
    /// For condition blocks: one entry of the referenced block's options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_condition: Option<String>,
}

impl Block {
    /// Create a block with a fresh UUID.
    pub fn new(block_type: BlockType, name: impl Into<String>, position: Position) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), block_type, name, position)
    }

    pub fn with_id(
        id: impl Into<String>,
        block_type: BlockType,
        name: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            block_type,
            name: name.into(),
            description: String::new(),
            message: String::new(),
            position,
            options: Vec::new(),
            condition_id: None,
            selected_condition: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Connection
// ────────────────────────────────────────────────────────────────────────────

/// Handle side of a connection endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandleKind {
    Input,
    Output,
}

impl Default for HandleKind {
    fn default() -> Self {
        Self::Output
    }
}

fn default_to_type() -> HandleKind {
    HandleKind::Input
}

/// A directed edge from an output (or indexed option output) to an input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub from_type: HandleKind,
    #[serde(default = "default_to_type")]
    pub to_type: HandleKind,
    /// Present only when `from` is an option block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_option_index: Option<usize>,
}

impl Connection {
    /// Create an output→input edge with a fresh UUID.
    pub fn new(from: impl Into<String>, to: impl Into<String>, from_option_index: Option<usize>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: from.into(),
            to: to.into(),
            from_type: HandleKind::Output,
            to_type: HandleKind::Input,
            from_option_index,
        }
    }

    /// Whether this edge originates at the given output slot.
    pub fn starts_at(&self, block_id: &str, option_index: Option<usize>) -> bool {
        self.from == block_id && self.from_option_index == option_index
    }
}

/// A clickable connection point on a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    pub block_id: String,
    pub kind: HandleKind,
    /// Option slot for option-block outputs.
    pub option_index: Option<usize>,
}

impl Handle {
    pub fn input(block_id: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            kind: HandleKind::Input,
            option_index: None,
        }
    }

    pub fn output(block_id: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            kind: HandleKind::Output,
            option_index: None,
        }
    }

    pub fn option(block_id: impl Into<String>, index: usize) -> Self {
        Self {
            block_id: block_id.into(),
            kind: HandleKind::Output,
            option_index: Some(index),
        }
    }
}
