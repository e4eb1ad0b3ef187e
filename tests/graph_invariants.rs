use std::collections::HashSet;
use std::time::Instant;

use chatflow::config::EditorConfig;
use chatflow::editor::EditorState;
use chatflow::graph;
use chatflow::model::{Block, BlockType, Graph, Handle, Position};

fn block(id: &str, t: BlockType) -> Block {
    Block::with_id(id, t, id, Position::default())
}

fn editor() -> EditorState {
    let mut g = Graph::new();
    g.blocks.push(block("s", BlockType::Start));
    g.blocks.push(block("m1", BlockType::Message));
    g.blocks.push(block("m2", BlockType::Message));
    g.blocks.push(block("u", BlockType::UserResponse));
    g.blocks.push(block("o", BlockType::Option).with_options(["A", "B"]));
    g.blocks.push(block("e", BlockType::End));
    EditorState::new(g, EditorConfig::default())
}

fn all_handles(g: &Graph) -> Vec<Handle> {
    let mut hs = Vec::new();
    for b in &g.blocks {
        hs.push(Handle::input(&b.id));
        hs.push(Handle::output(&b.id));
        for i in 0..=b.options.len() {
            hs.push(Handle::option(&b.id, i));
        }
    }
    hs
}

fn assert_invariants(g: &Graph) {
    let mut inputs = HashSet::new();
    let mut outputs = HashSet::new();
    for c in &g.connections {
        assert_ne!(c.from, c.to, "self-loop {c:?}");
        assert!(inputs.insert(c.to.clone()), "second input into {}", c.to);
        assert!(
            outputs.insert((c.from.clone(), c.from_option_index)),
            "second edge from {}/{:?}",
            c.from,
            c.from_option_index
        );
        let from = g.block(&c.from).expect("dangling from");
        let to = g.block(&c.to).expect("dangling to");
        assert_ne!(to.block_type, BlockType::Start);
        match c.from_option_index {
            Some(i) => assert!(from.block_type == BlockType::Option && i < from.options.len()),
            None => assert!(from.block_type.has_generic_output()),
        }
    }
}

#[test]
fn every_click_pair_keeps_the_invariants() {
    let now = Instant::now();
    let mut st = editor();
    let handles = all_handles(st.graph());
    for a in &handles {
        for b in &handles {
            st.on_connection_click(a.clone(), now);
            st.on_connection_click(b.clone(), now);
            assert_eq!(st.pending(), None);
            assert_invariants(st.graph());
        }
    }
    // Every input except the start's gets filled; one option slot is left
    // without a free input.
    assert_eq!(st.graph().connections.len(), 5);
    for id in ["m1", "m2", "u", "o", "e"] {
        assert!(graph::has_input(st.graph(), id), "{id} has no input");
    }
    assert!(graph::has_output(st.graph(), "s"));
    assert!(graph::is_option_connected(st.graph(), "o", 0));
    assert!(!graph::is_option_connected(st.graph(), "o", 1));
}

#[test]
fn deleting_removes_exactly_the_touching_connections() {
    let now = Instant::now();
    let mut st = editor();
    for (a, b) in [
        (Handle::output("s"), Handle::input("m1")),
        (Handle::output("m1"), Handle::input("m2")),
        (Handle::output("m2"), Handle::input("u")),
        (Handle::output("u"), Handle::input("e")),
    ] {
        st.on_connection_click(a, now);
        st.on_connection_click(b, now);
    }
    assert_eq!(st.graph().connections.len(), 4);
    let untouched: Vec<_> = st
        .graph()
        .connections
        .iter()
        .filter(|c| c.from != "m2" && c.to != "m2")
        .cloned()
        .collect();

    st.on_delete("m2", now);
    assert!(st.graph().block("m2").is_none());
    assert_eq!(st.graph().connections, untouched);
    assert_invariants(st.graph());
}
