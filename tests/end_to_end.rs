use std::time::Instant;

use chatflow::config::EditorConfig;
use chatflow::editor::{BlockIntent, EditorState};
use chatflow::graph::BlockUpdate;
use chatflow::model::{Block, BlockType, Graph, Handle, Position};

#[test]
fn build_and_tear_down_a_branching_workflow() {
    let now = Instant::now();
    let p = Position::default();
    let mut g = Graph::new();
    g.blocks.push(Block::with_id("S", BlockType::Start, "Start", p));
    g.blocks.push(Block::with_id("M", BlockType::Message, "Message", p));
    g.blocks.push(Block::with_id("O", BlockType::Option, "Choice", p).with_options(["Yes", "No"]));
    g.blocks.push(Block::with_id("E1", BlockType::End, "End yes", p));
    g.blocks.push(Block::with_id("E2", BlockType::End, "End no", p));
    let mut cond = Block::with_id("C", BlockType::Condition, "Check", p);
    cond.condition_id = Some("O".into());
    g.blocks.push(cond);
    let mut st = EditorState::new(g, EditorConfig::default());
    assert!(st.load_warnings.is_empty());

    let click = |st: &mut EditorState, h: Handle| st.dispatch(BlockIntent::ConnectionClick(h), now);

    click(&mut st, Handle::output("S"));
    click(&mut st, Handle::input("O"));
    assert_eq!(st.graph().connections.len(), 1);

    // A second input into O is refused.
    click(&mut st, Handle::output("M"));
    click(&mut st, Handle::input("O"));
    assert_eq!(st.graph().connections.len(), 1);
    assert_eq!(st.current_notice(now), Some("input already connected"));
    assert_eq!(st.pending(), None);

    click(&mut st, Handle::option("O", 0));
    click(&mut st, Handle::input("E1"));
    click(&mut st, Handle::input("E2"));
    click(&mut st, Handle::option("O", 1));
    assert_eq!(st.graph().connections.len(), 3);

    st.dispatch(
        BlockIntent::Update("C".into(), BlockUpdate::selected_condition(Some("No".into()))),
        now,
    );
    assert_eq!(st.graph().block("C").unwrap().selected_condition.as_deref(), Some("No"));

    st.dispatch(BlockIntent::Delete("M".into()), now);
    st.dispatch(BlockIntent::Delete("O".into()), now);
    assert!(st.graph().connections.is_empty());
    let c = st.graph().block("C").unwrap();
    assert_eq!(c.condition_id, None);
    assert_eq!(c.selected_condition, None);

    st.dispatch(BlockIntent::Delete("C".into()), now);
    let ids: Vec<&str> = st.graph().blocks.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, ["S", "E1", "E2"]);
    assert!(st.dirty);
}
