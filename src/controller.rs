//! High-level controller for Slint applications.
//!
//! [`EditorController`] shares one [`CanvasEditor`] between the many UI
//! callbacks of a window, and turns graph changes into the page shell's
//! `on_nodes_change` / `on_connections_change` notifications.
//!
//! # Example
//!
//! ```ignore
//! use workflow_canvas::{EditorConfig, EditorController, PointerButton};
//!
//! slint::include_modules!();
//!
//! fn main() {
//!     let window = MainWindow::new().unwrap();
//!     let ctrl = EditorController::new(EditorConfig::default());
//!
//!     window.on_pointer_down(ctrl.pointer_down_callback());
//!     window.on_pointer_move(ctrl.pointer_move_callback());
//!     window.on_pointer_up(ctrl.pointer_up_callback());
//!     window.on_key_pressed(ctrl.key_pressed_callback());
//!     window.on_palette_drop(ctrl.drop_callback());
//!     window.on_compute_connection_path(ctrl.compute_connection_path_callback());
//!
//!     window.on_node_size_changed({
//!         let ctrl = ctrl.clone();
//!         move |id, w, h| ctrl.handle_node_size(&id, w, h)
//!     });
//!
//!     ctrl.on_nodes_change(|nodes| save_nodes(nodes));
//!     window.run().unwrap();
//! }
//! ```

use crate::config::EditorConfig;
use crate::editor::{CanvasEditor, EditorEvent, PointerButton, PointerEvent};
use crate::grid::generate_grid_commands;
use crate::keymap::{Key, Modifiers};
use crate::model::{Connection, ConnectionId, Node, NodeId, PortId};
use crate::render::RenderFrame;
use crate::viewport::{Position, Rect, Viewport};
use slint::{SharedString, VecModel};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type NodesCallback = Box<dyn Fn(&[Node])>;
type ConnectionsCallback = Box<dyn Fn(&[Connection])>;

/// Shared handle to a [`CanvasEditor`] with callback implementations.
///
/// Clone this controller to share it across callbacks. Not `Send`: it lives
/// on the UI thread with the window it serves.
#[derive(Clone)]
pub struct EditorController {
    editor: Rc<RefCell<CanvasEditor>>,
    nodes_dirty: Rc<Cell<bool>>,
    connections_dirty: Rc<Cell<bool>>,
    nodes_callbacks: Rc<RefCell<Vec<NodesCallback>>>,
    connections_callbacks: Rc<RefCell<Vec<ConnectionsCallback>>>,
}

impl Default for EditorController {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorController {
    pub fn new(config: EditorConfig) -> Self {
        Self::from_editor(CanvasEditor::new(config))
    }

    /// Wrap an existing editor.
    pub fn from_editor(mut editor: CanvasEditor) -> Self {
        let nodes_dirty = Rc::new(Cell::new(false));
        let connections_dirty = Rc::new(Cell::new(false));
        {
            let nodes_dirty = nodes_dirty.clone();
            let connections_dirty = connections_dirty.clone();
            editor.graph_mut().subscribe(move |change| {
                if change.touches_nodes() {
                    nodes_dirty.set(true);
                }
                if change.touches_connections() {
                    connections_dirty.set(true);
                }
            });
        }
        Self {
            editor: Rc::new(RefCell::new(editor)),
            nodes_dirty,
            connections_dirty,
            nodes_callbacks: Rc::new(RefCell::new(Vec::new())),
            connections_callbacks: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Get access to the shared editor.
    pub fn editor(&self) -> Rc<RefCell<CanvasEditor>> {
        self.editor.clone()
    }

    /// Run `f` against the editor, then deliver any change notifications.
    pub fn update<R>(&self, f: impl FnOnce(&mut CanvasEditor) -> R) -> R {
        let result = f(&mut self.editor.borrow_mut());
        self.flush_changes();
        result
    }

    // === Change notifications ===

    /// Called with every node after any mutation that affected nodes.
    pub fn on_nodes_change<F: Fn(&[Node]) + 'static>(&self, callback: F) {
        self.nodes_callbacks.borrow_mut().push(Box::new(callback));
    }

    /// Called with every connection after any mutation that affected connections.
    pub fn on_connections_change<F: Fn(&[Connection]) + 'static>(&self, callback: F) {
        self.connections_callbacks.borrow_mut().push(Box::new(callback));
    }

    /// Deliver pending notifications. The editor is not borrowed while the
    /// callbacks run, so they may call back into the controller.
    pub fn flush_changes(&self) {
        if self.nodes_dirty.replace(false) {
            let nodes: Vec<Node> = self.editor.borrow().graph().nodes().cloned().collect();
            for callback in self.nodes_callbacks.borrow().iter() {
                callback(&nodes);
            }
        }
        if self.connections_dirty.replace(false) {
            let connections: Vec<Connection> =
                self.editor.borrow().graph().connections().cloned().collect();
            for callback in self.connections_callbacks.borrow().iter() {
                callback(&connections);
            }
        }
    }

    // === Callback factories ===

    /// Returns a callback for `pointer-down(x, y, button, modifiers)`.
    pub fn pointer_down_callback(&self) -> impl Fn(f32, f32, PointerButton, Modifiers) {
        let ctrl = self.clone();
        move |x, y, button, modifiers| {
            ctrl.update(|e| {
                e.pointer_down(PointerEvent::new(x, y).with_button(button).with_modifiers(modifiers))
            })
        }
    }

    /// Returns a callback for `pointer-move(x, y, modifiers)`.
    pub fn pointer_move_callback(&self) -> impl Fn(f32, f32, Modifiers) {
        let ctrl = self.clone();
        move |x, y, modifiers| {
            ctrl.update(|e| e.pointer_move(PointerEvent::new(x, y).with_modifiers(modifiers)))
        }
    }

    /// Returns a callback for `pointer-up(x, y, button)`.
    pub fn pointer_up_callback(&self) -> impl Fn(f32, f32, PointerButton) {
        let ctrl = self.clone();
        move |x, y, button| ctrl.update(|e| e.pointer_up(PointerEvent::new(x, y).with_button(button)))
    }

    /// Returns a callback for `key-pressed(text, modifiers) -> bool`.
    ///
    /// `text` is the Slint `KeyEvent.text`.
    pub fn key_pressed_callback(&self) -> impl Fn(SharedString, Modifiers) -> bool {
        let ctrl = self.clone();
        move |text, modifiers| match Key::from_slint_text(&text) {
            Some(key) => ctrl.update(|e| e.key_down(key, modifiers)),
            None => false,
        }
    }

    /// Returns a callback for `palette-drop(payload, x, y) -> string`.
    ///
    /// Yields the new node id, or an empty string when the drop was refused.
    pub fn drop_callback(&self) -> impl Fn(SharedString, f32, f32) -> SharedString {
        let ctrl = self.clone();
        move |payload, x, y| {
            ctrl.update(|e| e.drop_payload(&payload, Position::new(x, y)))
                .map(|id| SharedString::from(id.as_str()))
                .unwrap_or_default()
        }
    }

    /// Returns a callback for `compute-connection-path(id) -> string`.
    pub fn compute_connection_path_callback(&self) -> impl Fn(SharedString) -> SharedString {
        let editor = self.editor.clone();
        move |id| {
            editor
                .borrow()
                .connection_path(&ConnectionId::from(id.as_str()))
                .unwrap_or_default()
                .into()
        }
    }

    // === Direct handlers ===

    /// Handle a node size report. The UI measures in screen pixels; the cache
    /// stores world units so it survives zoom changes.
    pub fn handle_node_size(&self, id: &str, width: f32, height: f32) {
        let mut editor = self.editor.borrow_mut();
        let vp = editor.viewport();
        editor.geometry_mut().handle_node_size_report(
            NodeId::from(id),
            vp.screen_to_world_len(width),
            vp.screen_to_world_len(height),
        );
    }

    /// Handle a port position report, relative to the node's top-left corner
    /// in screen pixels.
    pub fn handle_port_position(&self, node: &str, port: &str, rel_x: f32, rel_y: f32) {
        let mut editor = self.editor.borrow_mut();
        let vp = editor.viewport();
        editor.geometry_mut().handle_port_report(
            NodeId::from(node),
            PortId::from(port),
            vp.screen_to_world_len(rel_x),
            vp.screen_to_world_len(rel_y),
        );
    }

    /// The canvas element moved or was resized.
    pub fn set_canvas_rect(&self, x: f32, y: f32, width: f32, height: f32) {
        self.editor.borrow_mut().set_canvas_rect(Rect::new(x, y, width, height));
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.editor.borrow_mut().set_viewport(viewport);
    }

    pub fn viewport(&self) -> Viewport {
        self.editor.borrow().viewport()
    }

    /// Generate grid commands for the current viewport.
    pub fn generate_grid(&self) -> SharedString {
        let editor = self.editor.borrow();
        let rect = editor.canvas_rect();
        generate_grid_commands(rect.width, rect.height, &editor.viewport(), editor.config().grid_size).into()
    }

    pub fn render(&self) -> RenderFrame {
        self.editor.borrow().render()
    }

    pub fn take_events(&self) -> Vec<EditorEvent> {
        self.editor.borrow_mut().take_events()
    }

    /// Sync the selected node ids into a Slint model.
    pub fn sync_selection(&self, model: &VecModel<SharedString>) {
        self.editor.borrow().selection().sync_to_model(model);
    }
}
