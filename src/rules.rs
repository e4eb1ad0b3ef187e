//! Connection legality.
//!
//! [`can_connect`] is called once two handles have been picked. It never
//! touches the graph; on success it hands back a fresh [`Connection`] for the
//! caller to append with [`crate::graph::connect`].

use crate::error::ConnectRejection;
use crate::graph::{has_input, has_output, is_option_connected};
use crate::model::{BlockType, Connection, Graph, Handle, HandleKind};

/// Decide whether handles `a` and `b` may be wired together.
///
/// The two handles may be given in either order; the output side becomes
/// `from`. Rules are checked in a fixed order so the first failing rule
/// determines the reason reported to the user.
pub fn can_connect(graph: &Graph, a: &Handle, b: &Handle) -> Result<Connection, ConnectRejection> {
    let (from, to) = match (a.kind, b.kind) {
        (HandleKind::Output, HandleKind::Input) => (a, b),
        (HandleKind::Input, HandleKind::Output) => (b, a),
        _ => return Err(ConnectRejection::SameKind),
    };

    if from.block_id == to.block_id {
        return Err(ConnectRejection::SelfLoop);
    }

    let source = graph
        .block(&from.block_id)
        .ok_or_else(|| ConnectRejection::UnknownBlock(from.block_id.clone()))?;
    let target = graph
        .block(&to.block_id)
        .ok_or_else(|| ConnectRejection::UnknownBlock(to.block_id.clone()))?;

    // Resolve the output slot before the occupancy check so a generic handle
    // on an option block is not mistaken for a free output.
    let option_index = match (source.block_type, from.option_index) {
        (BlockType::Option, Some(i)) if i < source.options.len() => Some(i),
        (BlockType::Option, Some(i)) => return Err(ConnectRejection::OptionOutOfRange { index: i }),
        (BlockType::Option, None) => return Err(ConnectRejection::MissingOptionIndex),
        (_, _) => None,
    };

    // A block without a generic output has no slot that could be taken.
    let output_taken = match option_index {
        Some(i) => is_option_connected(graph, &source.id, i),
        None => source.block_type.has_generic_output() && has_output(graph, &source.id),
    };
    if output_taken {
        return Err(ConnectRejection::OutputConnected);
    }

    if has_input(graph, &target.id) {
        return Err(ConnectRejection::InputConnected);
    }

    if !target.block_type.accepts_input() {
        return Err(ConnectRejection::IntoStart);
    }
    if option_index.is_none() && !source.block_type.has_generic_output() {
        return Err(ConnectRejection::NoOutput(source.block_type));
    }

    Ok(Connection::new(&source.id, &target.id, option_index))
}
