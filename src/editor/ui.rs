//! Editor UI: the interactive egui canvas.
//!
//! This module paints the workflow and feeds pointer and keyboard input into
//! [`EditorState`]. It never mutates the graph directly:
//!
//! - Blocks with inline description, message and option editing
//! - Handle dots for the two-click connection protocol
//! - Block dragging through the drag engine (one commit per drag)
//! - Palette side panel, pan with drag on empty space, zoom with scroll
//! - Keyboard shortcuts (Ctrl+S, Delete, Escape)

#![cfg(feature = "egui")]

use std::collections::HashMap;
use std::time::Instant;

use eframe::egui::{self, Align2, Color32, FontId, Key, Pos2, Rect, RichText, Sense, Stroke, Vec2};

use crate::color::Rgb;
use crate::model::{Block, BlockType};
use crate::store::FsStore;

use super::block_view::{BlockEditor, BlockIntent, BlockView, DraftField, EditKey};
use super::palette::get_palette;
use super::state::{EditorState, PointerMode};
use super::viewport::ScreenPos;

const BLOCK_WIDTH: f32 = 220.0;
const HEADER_HEIGHT: f32 = 28.0;
const ROW_HEIGHT: f32 = 24.0;
const PADDING: f32 = 8.0;
const HANDLE_RADIUS: f32 = 6.0;

fn to_color(c: Rgb) -> Color32 {
    Color32::from_rgb(c.0, c.1, c.2)
}

fn to_pos(s: ScreenPos) -> Pos2 {
    Pos2::new(s.x, s.y)
}

fn to_screen_pos(p: Pos2) -> ScreenPos {
    ScreenPos::new(p.x, p.y)
}

fn contrast_color(bg: Color32) -> Color32 {
    let l = 0.2126 * bg.r() as f32 + 0.7152 * bg.g() as f32 + 0.0722 * bg.b() as f32;
    if l > 150.0 { Color32::from_rgb(25, 35, 45) } else { Color32::WHITE }
}

// ────────────────────────────────────────────────────────────────────────────
// Block layout
// ────────────────────────────────────────────────────────────────────────────

/// What one row of a block body holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Description,
    Message,
    Option(usize),
    AddOption,
    Condition,
}

/// Screen geometry of one block.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    pub body: Rect,
    pub header: Rect,
    pub delete_button: Option<Rect>,
    pub rows: Vec<(RowKind, Rect)>,
    /// Anchor of the input dot, for block kinds with an input.
    pub input: Option<Pos2>,
    /// Anchor of the generic output dot.
    pub output: Option<Pos2>,
    pub option_outputs: Vec<(usize, Pos2)>,
    pub zoom: f32,
}

impl BlockLayout {
    pub fn compute(view: &BlockView, top_left: Pos2, zoom: f32) -> Self {
        let w = BLOCK_WIDTH * zoom;
        let pad = PADDING * zoom;
        let header = Rect::from_min_size(top_left, Vec2::new(w, HEADER_HEIGHT * zoom));

        let mut kinds = vec![RowKind::Description];
        if view.message.is_some() {
            kinds.push(RowKind::Message);
        }
        kinds.extend(view.options.iter().map(|o| RowKind::Option(o.index)));
        if view.block_type == BlockType::Option {
            kinds.push(RowKind::AddOption);
        }
        if view.condition.is_some() {
            kinds.push(RowKind::Condition);
        }

        let mut y = header.bottom() + pad / 2.0;
        let rows: Vec<(RowKind, Rect)> = kinds
            .into_iter()
            .map(|k| {
                let r = Rect::from_min_size(Pos2::new(top_left.x + pad, y), Vec2::new(w - 2.0 * pad, ROW_HEIGHT * zoom));
                y += ROW_HEIGHT * zoom;
                (k, r)
            })
            .collect();
        let body = Rect::from_min_max(top_left, Pos2::new(top_left.x + w, y + pad / 2.0));

        let delete_button = view.deletable.then(|| {
            Rect::from_center_size(
                Pos2::new(header.right() - 14.0 * zoom, header.center().y),
                Vec2::splat(18.0 * zoom),
            )
        });
        let input = view
            .block_type
            .accepts_input()
            .then(|| Pos2::new(body.left(), header.center().y));
        let output = view
            .block_type
            .has_generic_output()
            .then(|| Pos2::new(body.right(), header.center().y));
        let option_outputs = rows
            .iter()
            .filter_map(|(k, r)| match k {
                RowKind::Option(i) => Some((*i, Pos2::new(body.right(), r.center().y))),
                _ => None,
            })
            .collect();

        Self {
            body,
            header,
            delete_button,
            rows,
            input,
            output,
            option_outputs,
            zoom,
        }
    }

    /// Anchor of option `index`'s output dot.
    pub fn option_anchor(&self, index: usize) -> Option<Pos2> {
        self.option_outputs.iter().find(|(i, _)| *i == index).map(|(_, p)| *p)
    }

    /// Classify a pointer position on this block.
    pub fn target_at(&self, p: Pos2) -> super::PointerTarget {
        use super::PointerTarget;
        let reach = HANDLE_RADIUS * self.zoom * 1.5;
        let near = |a: &Pos2| a.distance(p) <= reach;
        if self.input.as_ref().is_some_and(near)
            || self.output.as_ref().is_some_and(near)
            || self.option_outputs.iter().any(|(_, a)| near(a))
        {
            PointerTarget::Handle
        } else if self.delete_button.is_some_and(|r| r.contains(p)) {
            PointerTarget::Button
        } else if self.rows.iter().any(|(_, r)| r.contains(p)) {
            PointerTarget::Field
        } else {
            PointerTarget::Surface
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// App
// ────────────────────────────────────────────────────────────────────────────

/// The editor window: controller state plus the store it saves to.
pub struct EditorApp {
    pub state: EditorState,
    pub store: Option<FsStore>,
    pub palette_query: String,
}

impl EditorApp {
    pub fn new(state: EditorState, store: Option<FsStore>) -> Self {
        Self {
            state,
            store,
            palette_query: String::new(),
        }
    }

    fn save(&mut self, now: Instant) {
        let Some(store) = self.store.as_mut() else {
            self.state.show_notice("No store to save to", now);
            return;
        };
        match self.state.save_to(store) {
            Ok(()) => self.state.show_notice("Saved", now),
            Err(e) => self.state.show_notice(format!("Save failed: {e:#}"), now),
        }
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| editor_update(self, ui));
    }
}

/// Render the full editor inside `ui`, called each frame.
pub fn editor_update(app: &mut EditorApp, ui: &mut egui::Ui) {
    let now = Instant::now();
    top_bar(app, ui, now);
    palette_panel(app, ui, now);
    handle_keyboard_shortcuts(app, ui, now);
    egui::CentralPanel::default().show_inside(ui, |ui| canvas(&mut app.state, ui, now));
    if app.state.notice.is_some() {
        ui.ctx().request_repaint_after(std::time::Duration::from_millis(250));
    }
}

fn top_bar(app: &mut EditorApp, ui: &mut egui::Ui, now: Instant) {
    egui::TopBottomPanel::top("workflow_top").show_inside(ui, |ui| {
        ui.horizontal(|ui| {
            let title = app.state.workflow_id.clone().unwrap_or_else(|| "<unsaved>".to_string());
            ui.label(RichText::new(title).strong());
            ui.separator();
            if ui.add_enabled(app.store.is_some(), egui::Button::new("💾 Save")).clicked() {
                app.save(now);
            }
            ui.separator();
            if ui.small_button("−").clicked() {
                let center = to_screen_pos(ui.ctx().screen_rect().center());
                app.state.viewport.zoom_at(center, 0.9);
            }
            if ui.small_button("+").clicked() {
                let center = to_screen_pos(ui.ctx().screen_rect().center());
                app.state.viewport.zoom_at(center, 1.1);
            }
            if ui.small_button("Reset").clicked() {
                app.state.viewport.reset();
            }
            ui.label(format!("{}%", (app.state.viewport.zoom * 100.0).round() as i32));
            ui.separator();
            ui.checkbox(&mut app.state.config.snap_to_grid, "Snap");
            if !app.state.load_warnings.is_empty() {
                ui.separator();
                let n = app.state.load_warnings.len();
                ui.colored_label(Color32::from_rgb(230, 140, 40), format!("⚠ {n} repaired on load"))
                    .on_hover_text(
                        app.state
                            .load_warnings
                            .iter()
                            .map(|w| w.to_string())
                            .collect::<Vec<_>>()
                            .join("\n"),
                    );
            }

            if app.state.dirty {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.colored_label(Color32::from_rgb(255, 200, 80), "● Modified");
                });
            }
            if let Some(msg) = app.state.current_notice(now).map(str::to_string) {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.colored_label(Color32::from_rgb(255, 200, 80), msg);
                });
            }
        });
    });
}

fn palette_panel(app: &mut EditorApp, ui: &mut egui::Ui, now: Instant) {
    egui::SidePanel::left("workflow_palette").resizable(false).show_inside(ui, |ui| {
        ui.label(RichText::new("Add block").strong());
        ui.text_edit_singleline(&mut app.palette_query);
        ui.separator();
        let has_start = app.state.graph().start_block().is_some();
        for entry in get_palette().iter().filter(|e| e.matches_query(&app.palette_query)) {
            let enabled = entry.block_type != BlockType::Start || !has_start;
            let style = app.state.colors.style(entry.block_type);
            let button = egui::Button::new(RichText::new(entry.display_name).color(to_color(style.accent)));
            if ui.add_enabled(enabled, button).on_hover_text(entry.description).clicked() {
                let center = app.state.viewport.to_canvas(to_screen_pos(ui.ctx().screen_rect().center()));
                app.state.insert_block_or_notify(entry.block_type, center, now);
            }
        }
    });
}

// ────────────────────────────────────────────────────────────────────────────
// Canvas
// ────────────────────────────────────────────────────────────────────────────

fn canvas(state: &mut EditorState, ui: &mut egui::Ui, now: Instant) {
    let avail = ui.available_rect_before_wrap();
    state.viewport.origin = ScreenPos::new(avail.left(), avail.top());
    let canvas_resp = ui.interact(avail, ui.id().with("workflow_canvas"), Sense::click_and_drag());

    let scroll_y = ui.input(|i| i.raw_scroll_delta.y);
    if scroll_y.abs() > 0.0 && canvas_resp.hovered() {
        let anchor = canvas_resp.hover_pos().unwrap_or(avail.center());
        state.viewport.zoom_at(to_screen_pos(anchor), (1.0 + scroll_y * 0.001).max(0.1));
    }
    if state.config.snap_to_grid {
        draw_grid(ui, state, &avail);
    }

    // Every block in the graph is mounted; removed blocks lose their handle.
    state.prune_unmounted();
    let views = state.block_views();
    let zoom = state.viewport.zoom;
    let mut layouts: HashMap<String, BlockLayout> = HashMap::new();
    for v in &views {
        state.handles.get_or_register(&v.id);
        if let Some(pos) = state.screen_position(&v.id) {
            layouts.insert(v.id.clone(), BlockLayout::compute(v, to_pos(pos), zoom));
        }
    }

    let mut intents: Vec<BlockIntent> = Vec::new();
    let mut notices: Vec<String> = Vec::new();

    if let Some(conn_id) = draw_connections(ui, state, &layouts) {
        state.disconnect(&conn_id, now);
    }

    // Dragged block last, so it paints on top.
    let mut order: Vec<&BlockView> = views.iter().collect();
    order.sort_by_key(|v| v.is_being_dragged);
    for v in order {
        let Some(layout) = layouts.get(&v.id) else { continue };
        let Some(block) = state.graph().block(&v.id).cloned() else { continue };
        let mut editor = state.editors.remove(&v.id).unwrap_or_default();
        let clicked = draw_block(ui, v, &block, layout, &mut editor, &mut intents, &mut notices);
        state.editors.insert(v.id.clone(), editor);
        if clicked {
            state.selected_block = Some(v.id.clone());
        }
    }

    if let Some(pending) = state.pending().cloned() {
        let anchor = layouts.get(&pending.block_id).and_then(|l| match (pending.kind, pending.option_index) {
            (crate::model::HandleKind::Input, _) => l.input,
            (_, Some(i)) => l.option_anchor(i),
            (_, None) => l.output,
        });
        if let (Some(a), Some(p)) = (anchor, ui.input(|i| i.pointer.hover_pos())) {
            ui.painter()
                .line_segment([a, p], Stroke::new(2.0, Color32::from_rgb(100, 200, 100)));
        }
    }

    for intent in intents {
        state.dispatch(intent, now);
    }
    for msg in notices {
        state.show_notice(msg, now);
    }

    if state.pointer_mode == PointerMode::Idle && canvas_resp.drag_started() {
        if let Some(p) = canvas_resp.interact_pointer_pos() {
            state.on_canvas_mouse_down(to_screen_pos(p));
        }
    }
    if state.pointer_mode != PointerMode::Idle {
        if let Some(p) = ui.input(|i| i.pointer.latest_pos()) {
            let p = to_screen_pos(p);
            state.on_pointer_move(p);
            if ui.input(|i| i.pointer.any_released()) {
                state.on_pointer_up(p);
            }
        }
    }
    if canvas_resp.clicked() {
        state.selected_block = None;
        state.cancel_pending();
    }
}

/// Paint one block and collect what the user did with it. Returns true if
/// the block body was clicked.
fn draw_block(
    ui: &mut egui::Ui,
    v: &BlockView,
    block: &Block,
    l: &BlockLayout,
    editor: &mut BlockEditor,
    intents: &mut Vec<BlockIntent>,
    notices: &mut Vec<String>,
) -> bool {
    let zoom = l.zoom;
    let accent = to_color(v.style.accent);
    let painter = ui.painter().clone();

    let body_resp = ui.interact(l.body, ui.id().with(("block", &v.id)), Sense::click_and_drag());
    if body_resp.drag_started() {
        if let Some(p) = body_resp.interact_pointer_pos() {
            intents.push(BlockIntent::MouseDown {
                block_id: v.id.clone(),
                target: l.target_at(p),
                pointer: to_screen_pos(p),
            });
        }
    }

    painter.rect_filled(l.body, 6.0, to_color(v.style.background));
    painter.rect_filled(l.header, 6.0, accent);
    let border = if v.is_selected {
        Stroke::new(2.5, Color32::from_rgb(0, 120, 255))
    } else if v.is_armed {
        Stroke::new(2.0, accent)
    } else {
        Stroke::new(1.0, to_color(v.style.border))
    };
    painter.rect_stroke(l.body, 6.0, border, egui::StrokeKind::Outside);
    painter.text(
        Pos2::new(l.header.left() + PADDING * zoom, l.header.center().y),
        Align2::LEFT_CENTER,
        &v.name,
        FontId::proportional(14.0 * zoom),
        contrast_color(accent),
    );

    if let Some(r) = l.delete_button {
        if ui.put(r, egui::Button::new("✕").small()).clicked() {
            intents.extend(v.click_delete());
        }
    }

    let text_font = FontId::proportional(12.0 * zoom);
    let text_color = Color32::from_rgb(40, 40, 40);
    let hint_color = Color32::from_rgb(150, 150, 150);
    let draft_id = ui.id().with(("draft", &v.id));

    for (kind, rect) in &l.rows {
        let field = match kind {
            RowKind::Description => Some(DraftField::Description),
            RowKind::Message => Some(DraftField::Message),
            RowKind::Option(i) => Some(DraftField::Option(*i)),
            RowKind::AddOption => Some(DraftField::NewOption),
            RowKind::Condition => None,
        };

        if let Some(field) = field {
            if editor.is_editing_field(&field) {
                if let Some(key) = draft_row(ui, *rect, editor, draft_id, zoom) {
                    match editor.handle_key(key, block) {
                        Ok(intent) => intents.extend(intent),
                        Err(e) => notices.push(e.to_string()),
                    }
                }
                continue;
            }

            let (text, placeholder) = match kind {
                RowKind::Description => (v.description.clone(), "Add description…"),
                RowKind::Message => (v.message.clone().unwrap_or_default(), "Add message…"),
                RowKind::Option(i) => (
                    v.options.iter().find(|o| o.index == *i).map(|o| o.label.clone()).unwrap_or_default(),
                    "",
                ),
                _ => (String::new(), "+ Add option"),
            };
            let label_rect = match kind {
                RowKind::Option(_) => Rect::from_min_max(rect.min, Pos2::new(rect.right() - 22.0 * zoom, rect.bottom())),
                _ => *rect,
            };
            let (shown, color) = if text.is_empty() { (placeholder.to_string(), hint_color) } else { (text, text_color) };
            painter.text(
                Pos2::new(label_rect.left(), label_rect.center().y),
                Align2::LEFT_CENTER,
                shown.replace('\n', " "),
                text_font.clone(),
                color,
            );
            let resp = ui.interact(label_rect, ui.id().with(("row", &v.id, format!("{kind:?}"))), Sense::click());
            if resp.clicked() {
                match editor.begin(block, field) {
                    Ok(()) => ui.memory_mut(|m| m.request_focus(draft_id)),
                    Err(e) => notices.push(e.to_string()),
                }
            }

            if let RowKind::Option(i) = kind {
                let del = Rect::from_min_max(Pos2::new(rect.right() - 20.0 * zoom, rect.top()), rect.max);
                if ui.put(del, egui::Button::new("🗑").small()).clicked() {
                    match editor.delete_option(block, *i) {
                        Ok(intent) => intents.push(intent),
                        Err(e) => notices.push(e.to_string()),
                    }
                }
            }
        } else if let Some(select) = &v.condition {
            let mut chosen: Option<Option<String>> = None;
            let selected_text = select
                .selected
                .clone()
                .unwrap_or_else(|| if select.enabled { "Select option…".into() } else { "Connect an option block".into() });
            let width = rect.width();
            ui.put(*rect, |ui: &mut egui::Ui| {
                ui.add_enabled_ui(select.enabled, |ui| {
                    egui::ComboBox::from_id_salt(("condition", &v.id))
                        .selected_text(selected_text)
                        .width(width)
                        .show_ui(ui, |ui| {
                            for choice in &select.choices {
                                let is_sel = select.selected.as_deref() == Some(choice.as_str());
                                if ui.selectable_label(is_sel, choice).clicked() {
                                    chosen = Some(Some(choice.clone()));
                                }
                            }
                            if select.selected.is_some() && ui.selectable_label(false, "— clear —").clicked() {
                                chosen = Some(None);
                            }
                        });
                })
                .response
            });
            if let Some(value) = chosen {
                intents.extend(v.select_condition(value));
            }
        }
    }

    draw_handles(ui, v, l, intents);
    body_resp.clicked()
}

/// Text box plus confirm button for the open draft. Returns the key the
/// user ended the edit with.
fn draft_row(ui: &mut egui::Ui, rect: Rect, editor: &mut BlockEditor, id: egui::Id, zoom: f32) -> Option<EditKey> {
    let text_rect = Rect::from_min_max(rect.min, Pos2::new(rect.right() - 24.0 * zoom, rect.bottom()));
    let ok_rect = Rect::from_min_max(Pos2::new(rect.right() - 22.0 * zoom, rect.top()), rect.max);
    let mut key = None;
    if let Some(text) = editor.text_mut() {
        let resp = ui.put(text_rect, egui::TextEdit::singleline(text).id(id));
        if resp.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            key = Some(EditKey::Enter);
        }
        if (resp.has_focus() || resp.lost_focus()) && ui.input(|i| i.key_pressed(Key::Escape)) {
            key = Some(EditKey::Escape);
        }
    }
    if ui.put(ok_rect, egui::Button::new("✔").small()).clicked() {
        key = Some(EditKey::Enter);
    }
    key
}

fn draw_handles(ui: &mut egui::Ui, v: &BlockView, l: &BlockLayout, intents: &mut Vec<BlockIntent>) {
    let r = HANDLE_RADIUS * l.zoom;
    let accent = to_color(v.style.accent);
    let mut dot = |ui: &mut egui::Ui, salt: String, at: Pos2, armed: bool, intent: BlockIntent| {
        let painter = ui.painter();
        painter.circle_filled(at, r, if armed { accent } else { Color32::WHITE });
        painter.circle_stroke(at, r, Stroke::new(2.0, accent));
        if armed {
            painter.circle_stroke(at, r * 1.8, Stroke::new(1.5, accent));
        }
        let hit = Rect::from_center_size(at, Vec2::splat(r * 3.0));
        if ui.interact(hit, ui.id().with(("handle", &v.id, salt)), Sense::click()).clicked() {
            intents.push(intent);
        }
    };

    if let (true, Some(at)) = (v.show_input, l.input) {
        dot(ui, "in".into(), at, v.input_armed, v.click_input());
    }
    if let (true, Some(at)) = (v.show_output, l.output) {
        dot(ui, "out".into(), at, v.output_armed, v.click_output());
    }
    for row in v.options.iter().filter(|o| o.show_handle) {
        if let Some(at) = l.option_anchor(row.index) {
            dot(ui, format!("opt{}", row.index), at, row.armed, v.click_option(row.index));
        }
    }
}

/// Draw every connection. Returns the id of a connection the user asked to
/// remove.
fn draw_connections(ui: &mut egui::Ui, state: &EditorState, layouts: &HashMap<String, BlockLayout>) -> Option<String> {
    let mut remove = None;
    let color = Color32::from_rgb(120, 130, 150);
    let stroke = Stroke::new(2.0, color);
    for c in &state.graph().connections {
        let from = layouts.get(&c.from).and_then(|l| match c.from_option_index {
            Some(i) => l.option_anchor(i),
            None => l.output,
        });
        let to = layouts.get(&c.to).and_then(|l| l.input);
        let (Some(a), Some(b)) = (from, to) else { continue };

        // Orthogonal elbow: out horizontally, across, in horizontally.
        let mid_x = (a.x + b.x) / 2.0;
        let pts = [a, Pos2::new(mid_x, a.y), Pos2::new(mid_x, b.y), b];
        let painter = ui.painter();
        for seg in pts.windows(2).take(2) {
            painter.line_segment([seg[0], seg[1]], stroke);
        }
        draw_arrow_with_trim(painter, pts[2], pts[3], color, stroke);

        let mid = Pos2::new(mid_x, (a.y + b.y) / 2.0);
        let resp = ui.interact(
            Rect::from_center_size(mid, Vec2::splat(12.0)),
            ui.id().with(("conn", &c.id)),
            Sense::click(),
        );
        if resp.hovered() {
            ui.painter().circle_filled(mid, 5.0, color);
        }
        resp.context_menu(|ui| {
            if ui.button("Remove connection").clicked() {
                remove = Some(c.id.clone());
                ui.close();
            }
        });
    }
    remove
}

fn draw_grid(ui: &mut egui::Ui, state: &EditorState, avail: &Rect) {
    let vp = &state.viewport;
    let grid = state.config.grid_size * 5.0;
    let tl = vp.to_canvas(to_screen_pos(avail.left_top()));
    let br = vp.to_canvas(to_screen_pos(avail.right_bottom()));
    let stroke = Stroke::new(0.5, Color32::from_rgba_unmultiplied(100, 100, 100, 30));

    let mut x = (tl.x / grid).floor() * grid;
    while x <= br.x {
        let p = to_pos(vp.to_screen(crate::model::Position::new(x, 0.0)));
        ui.painter().line_segment([Pos2::new(p.x, avail.top()), Pos2::new(p.x, avail.bottom())], stroke);
        x += grid;
    }
    let mut y = (tl.y / grid).floor() * grid;
    while y <= br.y {
        let p = to_pos(vp.to_screen(crate::model::Position::new(0.0, y)));
        ui.painter().line_segment([Pos2::new(avail.left(), p.y), Pos2::new(avail.right(), p.y)], stroke);
        y += grid;
    }
}

fn draw_arrow_with_trim(painter: &egui::Painter, tail: Pos2, tip: Pos2, color: Color32, stroke: Stroke) {
    let size = 8.0_f32;
    let dir = Vec2::new(tip.x - tail.x, tip.y - tail.y);
    let len = (dir.x * dir.x + dir.y * dir.y).sqrt().max(1e-3);
    let ux = dir.x / len;
    let uy = dir.y / len;
    let inset = HANDLE_RADIUS;
    let tip_adj = Pos2::new(tip.x - ux * inset, tip.y - uy * inset);
    painter.line_segment([tail, tip_adj], stroke);

    let px = -uy;
    let py = ux;
    let base = Pos2::new(tip_adj.x - ux * size, tip_adj.y - uy * size);
    let left = Pos2::new(base.x + px * (size * 0.6), base.y + py * (size * 0.6));
    let right = Pos2::new(base.x - px * (size * 0.6), base.y - py * (size * 0.6));
    painter.add(egui::Shape::convex_polygon(vec![tip_adj, left, right], color, Stroke::NONE));
}

// ────────────────────────────────────────────────────────────────────────────
// Keyboard shortcuts
// ────────────────────────────────────────────────────────────────────────────

fn handle_keyboard_shortcuts(app: &mut EditorApp, ui: &mut egui::Ui, now: Instant) {
    let typing = ui.ctx().wants_keyboard_input();
    let (ctrl, s, delete, escape) = ui.input(|i| {
        (
            i.modifiers.command,
            i.key_pressed(Key::S),
            i.key_pressed(Key::Delete),
            i.key_pressed(Key::Escape),
        )
    });
    // Ctrl+S: Save
    if ctrl && s {
        app.save(now);
    }
    if typing {
        return;
    }
    // Delete: delete the selected block
    if delete {
        if let Some(id) = app.state.selected_block.clone() {
            app.state.on_delete(&id, now);
        }
    }
    // Escape: cancel a pending connection, then clear selection
    if escape {
        if app.state.pending().is_some() {
            app.state.cancel_pending();
        } else {
            app.state.selected_block = None;
        }
    }
}
