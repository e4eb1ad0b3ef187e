use crate::model::BlockType;
use thiserror::Error;

/// Errors from graph mutations that refuse to run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Block '{0}' not found")]
    UnknownBlock(String),

    #[error("Connection '{0}' not found")]
    UnknownConnection(String),

    #[error("Option '{label}' appears more than once in block '{block_id}'")]
    DuplicateOption { block_id: String, label: String },

    #[error("Field '{field}' does not apply to {block_type} block '{block_id}'")]
    FieldNotApplicable {
        block_id: String,
        block_type: BlockType,
        field: &'static str,
    },

    #[error("'{label}' is not an option of the block referenced by condition '{block_id}'")]
    UnknownOption { block_id: String, label: String },

    #[error("A workflow may contain only one start block")]
    SecondStart,

    #[error("The start block cannot be deleted")]
    StartNotDeletable,
}

/// Why a candidate connection was refused.
///
/// The `Display` text is the user-facing reason shown in the editor notice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectRejection {
    #[error("connect an output to an input")]
    SameKind,

    #[error("a block cannot connect to itself")]
    SelfLoop,

    #[error("output already connected")]
    OutputConnected,

    #[error("input already connected")]
    InputConnected,

    #[error("start blocks accept no input")]
    IntoStart,

    #[error("{0} blocks have no output")]
    NoOutput(BlockType),

    #[error("option {index} does not exist on this block")]
    OptionOutOfRange { index: usize },

    #[error("option blocks connect from a specific option")]
    MissingOptionIndex,

    #[error("block '{0}' not found")]
    UnknownBlock(String),
}

/// Failures of a staged inline edit; the draft stays open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditRejected {
    #[error("option '{0}' already exists")]
    DuplicateOption(String),

    #[error("option text cannot be empty")]
    EmptyOption,

    #[error("no edit in progress")]
    NothingStaged,

    #[error("option {0} does not exist")]
    NoSuchOption(usize),
}
