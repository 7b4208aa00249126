//! Test harness around a [`CanvasEditor`] with a small known workflow.
//!
//! The canvas element sits at the screen origin and starts with the identity
//! viewport, so screen and world coordinates coincide until a test pans or
//! zooms. Grid snapping is off unless a test turns it on.
//!
//! ```text
//!   trigger (100,100 150x100) --out->in--> http (400,100 150x100)
//!                                          set  (400,300 150x100)
//! ```
//!
//! Port anchors (world):
//! - trigger.out (250, 150), type any
//! - http.in (400, 150), type object; http.out (550, 150), type object
//! - set.in (400, 350), type string; set.out (550, 350)

#![allow(dead_code)]

use super::{init_tracing, ActionTracker};
use workflow_canvas::{
    CanvasEditor, ConnectionId, EditorConfig, EditorEvent, InteractionState, Key, Modifiers,
    NewConnection, NewNode, NodeId, NodePort, PointerButton, PointerEvent, Position, Rect,
};

pub const NODE_W: f32 = 150.0;
pub const NODE_H: f32 = 100.0;

pub const TRIGGER_OUT: Position = Position::new(250.0, 150.0);
pub const HTTP_IN: Position = Position::new(400.0, 150.0);
pub const HTTP_OUT: Position = Position::new(550.0, 150.0);
pub const SET_IN: Position = Position::new(400.0, 350.0);
pub const SET_OUT: Position = Position::new(550.0, 350.0);

pub struct EditorHarness {
    pub editor: CanvasEditor,
    pub tracker: ActionTracker,
    /// The connection trigger.out -> http.in.
    pub link: ConnectionId,
}

impl EditorHarness {
    pub fn new() -> Self {
        let mut config = EditorConfig::default();
        config.snap_to_grid = false;
        Self::with_config(config)
    }

    pub fn with_config(config: EditorConfig) -> Self {
        init_tracing();
        let tracker = ActionTracker::new();
        let mut editor = CanvasEditor::new(config).with_actions(tracker.clone());
        editor.set_canvas_rect(Rect::new(0.0, 0.0, 800.0, 600.0));

        let graph = editor.graph_mut();
        graph
            .add_node(
                NewNode::new("webhook", "Trigger", Position::new(100.0, 100.0))
                    .with_id("trigger")
                    .with_size(NODE_W, NODE_H)
                    .with_output(NodePort::output("out", "Main")),
            )
            .unwrap();
        graph
            .add_node(
                NewNode::new("http-request", "HTTP", Position::new(400.0, 100.0))
                    .with_id("http")
                    .with_size(NODE_W, NODE_H)
                    .with_input(NodePort::input("in", "Main").with_data_type("object"))
                    .with_output(NodePort::output("out", "Response").with_data_type("object")),
            )
            .unwrap();
        graph
            .add_node(
                NewNode::new("set", "Set", Position::new(400.0, 300.0))
                    .with_id("set")
                    .with_size(NODE_W, NODE_H)
                    .with_input(NodePort::input("in", "Text").with_data_type("string"))
                    .with_output(NodePort::output("out", "Main")),
            )
            .unwrap();
        let link = graph
            .add_connection(NewConnection::between("trigger", "out", "http", "in"))
            .unwrap();

        Self { editor, tracker, link }
    }

    // === Pointer helpers (screen coordinates) ===

    pub fn press(&mut self, at: Position) {
        self.editor.pointer_down(PointerEvent::new(at.x, at.y));
    }

    pub fn press_with(&mut self, at: Position, modifiers: Modifiers) {
        self.editor
            .pointer_down(PointerEvent::new(at.x, at.y).with_modifiers(modifiers));
    }

    pub fn press_button(&mut self, at: Position, button: PointerButton) {
        self.editor
            .pointer_down(PointerEvent::new(at.x, at.y).with_button(button));
    }

    pub fn move_to(&mut self, at: Position) {
        self.editor.pointer_move(PointerEvent::new(at.x, at.y));
    }

    pub fn release(&mut self, at: Position) {
        self.editor.pointer_up(PointerEvent::new(at.x, at.y));
    }

    pub fn click(&mut self, at: Position) {
        self.press(at);
        self.release(at);
    }

    pub fn click_with(&mut self, at: Position, modifiers: Modifiers) {
        self.press_with(at, modifiers);
        self.editor
            .pointer_up(PointerEvent::new(at.x, at.y).with_modifiers(modifiers));
    }

    /// Press, move in a few steps, release.
    pub fn drag(&mut self, from: Position, to: Position) {
        self.drag_with(from, to, Modifiers::NONE);
    }

    pub fn drag_with(&mut self, from: Position, to: Position, modifiers: Modifiers) {
        self.press_with(from, modifiers);
        for i in 1..=4 {
            let t = i as f32 / 4.0;
            self.move_to(from + (to - from) * t);
        }
        self.editor
            .pointer_up(PointerEvent::new(to.x, to.y).with_modifiers(modifiers));
    }

    // === Keyboard ===

    pub fn key(&mut self, key: Key) -> bool {
        self.editor.key_down(key, Modifiers::NONE)
    }

    pub fn key_with(&mut self, key: Key, modifiers: Modifiers) -> bool {
        self.editor.key_down(key, modifiers)
    }

    // === Queries ===

    pub fn node_pos(&self, id: &str) -> Position {
        self.editor
            .graph()
            .get_node(&NodeId::from(id))
            .map(|n| n.position)
            .unwrap_or_else(|| panic!("node {} missing", id))
    }

    pub fn connection_count(&self) -> usize {
        self.editor.graph().connection_count()
    }

    pub fn selected(&self) -> Vec<String> {
        self.editor
            .selection()
            .sorted_ids()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.editor.interaction(), InteractionState::Idle)
    }

    pub fn events(&mut self) -> Vec<EditorEvent> {
        self.editor.take_events()
    }
}

impl Default for EditorHarness {
    fn default() -> Self {
        Self::new()
    }
}
