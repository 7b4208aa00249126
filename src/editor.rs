//! The canvas editor: input handling on top of the graph store.
//!
//! [`CanvasEditor`] owns the graph, the selection, the interaction state,
//! the viewport and the geometry cache. The UI forwards raw pointer,
//! keyboard, wheel and drop events to it and renders whatever
//! [`CanvasEditor::render`] returns.
//!
//! Hit testing order on a press is port, then node, then connection, then
//! the empty canvas.

use crate::config::{CanvasDragMode, EditorConfig};
use crate::error::{ConnectionRejected, GraphError};
use crate::graph::GraphStore;
use crate::grid::snap_to_grid;
use crate::hit_test::{find_connection_at, find_node_at, find_port_at, nodes_in_selection_box};
use crate::interaction::{
    ConnectionDraft, ContextMenu, ContextMenuTarget, DropTarget, InteractionMachine,
    InteractionState, Marquee, NodeDrag,
};
use crate::keymap::{EditorCommand, Key, Modifiers};
use crate::minimap::{center_on, MinimapProjection};
use crate::model::{ConnectionId, DropPayload, GraphDocument, NewConnection, NodeId, PortKind};
use crate::render::{build_frame, Hover, RenderContext, RenderFrame};
use crate::selection::SelectionManager;
use crate::state::{GeometryCache, PortRef};
use crate::validation::{ConnectionCandidate, ValidationResult};
use crate::viewport::{
    canvas_to_screen, fit_to_view, pan_canvas, screen_to_canvas, zoom_to_point, Position, Rect,
    Viewport,
};
use tracing::{debug, warn};

/// Imperative actions the editor asks its host to perform.
///
/// Passed in explicitly so several editors (and tests) stay isolated from
/// each other. Every method defaults to doing nothing.
pub trait EditorActions {
    /// A node was double-clicked or "open" was chosen from its menu.
    fn open_node_editor(&self, _node: &NodeId) {}
    /// "Insert node" was chosen on a connection.
    fn open_node_panel_for_connection(&self, _connection: &ConnectionId) {}
    /// Label editing started on a connection.
    fn edit_connection_label(&self, _connection: &ConnectionId) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// A pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerEvent {
    pub position: Position,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: Position::new(x, y),
            ..Default::default()
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Entries of a context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMenuAction {
    /// Node: open its editor.
    Open,
    /// Node or connection.
    Delete,
    /// Connection.
    EditLabel,
    /// Connection: ask the host for the node palette.
    InsertNode,
    /// Canvas.
    SelectAll,
    /// Canvas.
    FitToView,
}

/// Things that happened during input handling, for UI feedback.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    NodeCreated(NodeId),
    NodesMoved(Vec<NodeId>),
    ConnectionCreated(ConnectionId),
    /// A connection attempt failed; the graph is unchanged.
    ConnectionRejected(ConnectionRejected),
    LabelChanged(ConnectionId),
    Deleted {
        nodes: Vec<NodeId>,
        connections: Vec<ConnectionId>,
    },
    SelectionChanged,
}

pub struct CanvasEditor {
    graph: GraphStore,
    selection: SelectionManager,
    interaction: InteractionMachine,
    geometry: GeometryCache,
    viewport: Viewport,
    /// Bounds of the canvas element in screen space.
    canvas_rect: Rect,
    config: EditorConfig,
    hover: Option<Hover>,
    actions: Option<Box<dyn EditorActions>>,
    events: Vec<EditorEvent>,
}

impl Default for CanvasEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl CanvasEditor {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_graph(GraphStore::new(), config)
    }

    pub fn with_graph(graph: GraphStore, config: EditorConfig) -> Self {
        Self {
            graph,
            selection: SelectionManager::new(),
            interaction: InteractionMachine::new(),
            geometry: GeometryCache::new(),
            viewport: Viewport::default().clamped(&config.zoom),
            canvas_rect: Rect::new(0.0, 0.0, 800.0, 600.0),
            config,
            hover: None,
            actions: None,
            events: Vec::new(),
        }
    }

    pub fn with_actions<A: EditorActions + 'static>(mut self, actions: A) -> Self {
        self.set_actions(actions);
        self
    }

    pub fn set_actions<A: EditorActions + 'static>(&mut self, actions: A) {
        self.actions = Some(Box::new(actions));
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// Direct access for programmatic edits. Selection entries for removed
    /// nodes are pruned on the next delete or render-affecting input.
    pub fn graph_mut(&mut self) -> &mut GraphStore {
        &mut self.graph
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn interaction(&self) -> &InteractionState {
        self.interaction.state()
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.interaction.context_menu()
    }

    pub fn geometry(&self) -> &GeometryCache {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut GeometryCache {
        &mut self.geometry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn hover(&self) -> Option<&Hover> {
        self.hover.as_ref()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Replace the viewport; the zoom is clamped to the configured limits.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport.clamped(&self.config.zoom);
    }

    pub fn canvas_rect(&self) -> Rect {
        self.canvas_rect
    }

    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = rect;
    }

    /// Drain the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------------

    /// Replace the graph, resetting selection, interaction and cached geometry.
    pub fn load_document(&mut self, doc: GraphDocument) -> Result<(), GraphError> {
        let viewport = self.graph.load_document(doc)?;
        if let Some(viewport) = viewport {
            self.set_viewport(viewport);
        }
        self.selection.clear();
        self.interaction.reset_to_idle();
        self.interaction.close_context_menu();
        self.geometry.clear();
        self.hover = None;
        Ok(())
    }

    pub fn to_document(&self) -> GraphDocument {
        self.graph.to_document(Some(self.viewport))
    }

    // ------------------------------------------------------------------------
    // Hit testing
    // ------------------------------------------------------------------------

    pub fn to_world(&self, screen: Position) -> Position {
        screen_to_canvas(screen, &self.viewport, &self.canvas_rect)
    }

    pub fn to_screen(&self, world: Position) -> Position {
        canvas_to_screen(world, &self.viewport, &self.canvas_rect)
    }

    fn port_at(&self, world: Position) -> Option<PortRef> {
        let radius = self.viewport.screen_to_world_len(self.config.port_hit_radius);
        find_port_at(
            world,
            self.geometry.port_geometries(&self.graph, self.config.default_node_size),
            radius,
        )
    }

    /// What lies under a screen point: port, then node, then connection.
    pub fn target_at(&self, screen: Position) -> Option<Hover> {
        let world = self.to_world(screen);
        let default_size = self.config.default_node_size;

        if let Some(port) = self.port_at(world) {
            return Some(Hover::Port(port));
        }
        if let Some(node) = find_node_at(world, self.geometry.node_geometries(&self.graph, default_size)) {
            return Some(Hover::Node(node));
        }
        find_connection_at(
            world,
            self.geometry
                .connection_geometries(&self.graph, default_size, self.config.connection_style),
            self.viewport.screen_to_world_len(self.config.connection_hover_distance),
            self.config.bezier_min_offset,
            self.config.hit_samples,
        )
        .map(Hover::Connection)
    }

    // ------------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------------

    pub fn pointer_down(&mut self, event: PointerEvent) {
        if let InteractionState::EditingConnectionLabel { .. } = self.interaction.state() {
            // Clicking away commits the label like losing focus would
            self.commit_label();
        }
        if !self.interaction.is_idle() {
            debug!(state = self.interaction.state().name(), "pointer down ignored");
            return;
        }

        let menu_was_open = self.interaction.close_context_menu().is_some();
        if menu_was_open && event.button != PointerButton::Secondary {
            return;
        }

        self.selection.retain_existing(&self.graph);
        let target = self.target_at(event.position);

        match event.button {
            PointerButton::Middle => self.start_panning(event.position),
            PointerButton::Secondary => self.open_menu_for(target, event.position),
            PointerButton::Primary => match target {
                Some(Hover::Port(port)) => self.start_connection(port, event.position),
                Some(Hover::Node(id)) => self.start_node_drag(id, event),
                Some(Hover::Connection(id)) => {
                    self.selection.select_connection(&id);
                    self.events.push(EditorEvent::SelectionChanged);
                }
                None => self.press_canvas(event),
            },
        }
    }

    fn start_panning(&mut self, start: Position) {
        self.interaction.transition_to(InteractionState::PanningCanvas {
            start,
            origin: self.viewport,
        });
    }

    fn open_menu_for(&mut self, target: Option<Hover>, position: Position) {
        let target = match target {
            Some(Hover::Node(id)) => ContextMenuTarget::Node(id),
            Some(Hover::Port(port)) => ContextMenuTarget::Node(port.node),
            Some(Hover::Connection(id)) => ContextMenuTarget::Connection(id),
            None => ContextMenuTarget::Canvas,
        };
        match &target {
            ContextMenuTarget::Node(id) if !self.selection.contains(id) => {
                self.selection.select_only(id);
                self.events.push(EditorEvent::SelectionChanged);
            }
            ContextMenuTarget::Connection(id) => {
                self.selection.select_connection(id);
                self.events.push(EditorEvent::SelectionChanged);
            }
            _ => {}
        }
        self.interaction.open_context_menu(ContextMenu { target, position });
    }

    fn start_connection(&mut self, port: PortRef, screen: Position) {
        self.interaction
            .transition_to(InteractionState::DrawingConnection(ConnectionDraft {
                source_node: port.node,
                source_port: port.port,
                from_kind: port.kind,
                pointer: self.to_world(screen),
                target: None,
            }));
    }

    fn start_node_drag(&mut self, id: NodeId, event: PointerEvent) {
        let Some(node) = self.graph.get_node(&id) else {
            return;
        };
        let node_screen = self.to_screen(node.position);
        let pressed_locked = node.is_locked;

        let mut collapse_on_release = false;
        if event.modifiers.multi_select() {
            self.selection.handle_interaction(&id, true);
            if !self.selection.contains(&id) {
                // Toggled off: nothing to drag
                self.events.push(EditorEvent::SelectionChanged);
                return;
            }
        } else if self.selection.contains(&id) && self.selection.len() > 1 {
            collapse_on_release = true;
        } else {
            self.selection.select_only(&id);
        }
        self.events.push(EditorEvent::SelectionChanged);

        if pressed_locked {
            // A locked node selects but never anchors a drag
            debug!(node = %id, "pressed node is locked, no drag");
            return;
        }

        let origins = self
            .selection
            .sorted_ids()
            .into_iter()
            .filter_map(|sid| {
                let n = self.graph.get_node(&sid)?;
                (!n.is_locked).then_some((sid, n.position))
            })
            .collect();

        self.interaction
            .transition_to(InteractionState::DraggingNode(NodeDrag {
                node_id: id,
                grab_offset: event.position - node_screen,
                origins,
                press_screen: event.position,
                moved: false,
                collapse_on_release,
            }));
    }

    /// Empty canvas press. A plain marquee replaces the selection only on
    /// release, so cancelling it leaves the selection as it was.
    fn press_canvas(&mut self, event: PointerEvent) {
        let additive = event.modifiers.multi_select();
        let marquee = self.config.canvas_drag == CanvasDragMode::Marquee || event.modifiers.shift;
        if !marquee {
            if !additive && !self.selection.is_empty() {
                self.selection.clear();
                self.events.push(EditorEvent::SelectionChanged);
            }
            self.start_panning(event.position);
            return;
        }

        let world = self.to_world(event.position);
        self.interaction
            .transition_to(InteractionState::MarqueeSelecting(Marquee {
                start: world,
                current: world,
                additive,
                base: self.selection.sorted_ids(),
                preview: Vec::new(),
                last_hit_test_at: None,
            }));
    }

    pub fn pointer_move(&mut self, event: PointerEvent) {
        let world = self.to_world(event.position);

        if let InteractionState::DrawingConnection(draft) = self.interaction.state() {
            let target = self.drop_target(draft, world);
            if let InteractionState::DrawingConnection(draft) = self.interaction.state_mut() {
                draft.pointer = world;
                draft.target = target;
            }
            return;
        }

        if self.interaction.is_idle() {
            self.hover = self.target_at(event.position);
            return;
        }

        let default_size = self.config.default_node_size;
        match self.interaction.state_mut() {
            InteractionState::DraggingNode(drag) => {
                if event.position != drag.press_screen {
                    drag.moved = true;
                }
                if !drag.moved {
                    return;
                }
                let mut target = screen_to_canvas(
                    event.position - drag.grab_offset,
                    &self.viewport,
                    &self.canvas_rect,
                );
                if self.config.snap_to_grid {
                    target = snap_to_grid(target, self.config.grid_size);
                }
                let anchor = drag
                    .origin_of(&drag.node_id)
                    .or_else(|| self.graph.get_node(&drag.node_id).map(|n| n.position));
                let Some(anchor) = anchor else {
                    return;
                };
                let delta = target - anchor;
                for (id, origin) in &drag.origins {
                    self.graph.move_node(id, *origin + delta);
                }
            }
            InteractionState::MarqueeSelecting(marquee) => {
                marquee.current = world;
                let due = marquee.last_hit_test_at.map_or(true, |last| {
                    last.distance_to(event.position) >= self.config.marquee_throttle_px
                });
                if due {
                    marquee.preview = nodes_in_selection_box(
                        &marquee.rect(),
                        self.geometry.node_geometries(&self.graph, default_size),
                    );
                    marquee.last_hit_test_at = Some(event.position);
                }
            }
            InteractionState::PanningCanvas { start, origin } => {
                let delta = event.position - *start;
                self.viewport = pan_canvas(delta.x, delta.y, origin);
            }
            _ => {}
        }
    }

    /// The pointer left the canvas element.
    pub fn pointer_leave(&mut self) {
        self.hover = None;
    }

    pub fn pointer_up(&mut self, event: PointerEvent) {
        if matches!(
            self.interaction.state(),
            InteractionState::Idle | InteractionState::EditingConnectionLabel { .. }
        ) {
            return;
        }
        let world = self.to_world(event.position);

        match self.interaction.take() {
            InteractionState::DraggingNode(drag) => {
                if drag.moved {
                    let ids = drag.origins.into_iter().map(|(id, _)| id).collect();
                    self.events.push(EditorEvent::NodesMoved(ids));
                } else if drag.collapse_on_release {
                    self.selection.select_only(&drag.node_id);
                    self.events.push(EditorEvent::SelectionChanged);
                }
            }
            InteractionState::DrawingConnection(draft) => self.finish_connection(&draft, world),
            InteractionState::MarqueeSelecting(mut marquee) => {
                marquee.current = world;
                let hits = nodes_in_selection_box(
                    &marquee.rect(),
                    self.geometry
                        .node_geometries(&self.graph, self.config.default_node_size),
                );
                if marquee.additive {
                    self.selection.replace_selection(marquee.base.into_iter().chain(hits));
                } else {
                    self.selection.replace_selection(hits);
                }
                self.events.push(EditorEvent::SelectionChanged);
            }
            InteractionState::PanningCanvas { .. } => {}
            InteractionState::Idle | InteractionState::EditingConnectionLabel { .. } => {}
        }
        self.hover = self.target_at(event.position);
    }

    /// Port under `world` that a draft would connect to, with its verdict.
    fn drop_target(&self, draft: &ConnectionDraft, world: Position) -> Option<DropTarget> {
        let port = self.port_at(world)?;
        if port.node == draft.source_node && port.port == draft.source_port && port.kind == draft.from_kind {
            return None;
        }
        let validity = self.graph.validate(&candidate_for(draft, &port));
        Some(DropTarget { port, validity })
    }

    fn finish_connection(&mut self, draft: &ConnectionDraft, world: Position) {
        let Some(target) = self.drop_target(draft, world) else {
            debug!("connection draft dropped outside a port");
            return;
        };
        if let ValidationResult::Invalid(reason) = target.validity {
            debug!(reason = reason.code(), "connection draft rejected");
            self.events.push(EditorEvent::ConnectionRejected(reason));
            return;
        }

        let candidate = candidate_for(draft, &target.port);
        let request = NewConnection {
            source: candidate.source,
            source_port: candidate.source_port,
            target: candidate.target,
            target_port: candidate.target_port,
            ..Default::default()
        };
        match self.graph.add_connection(request) {
            Ok(id) => self.events.push(EditorEvent::ConnectionCreated(id)),
            Err(reason) => self.events.push(EditorEvent::ConnectionRejected(reason)),
        }
    }

    /// Double-click: nodes open their editor, connections start label editing.
    pub fn double_click(&mut self, screen: Position) {
        if !self.interaction.is_idle() {
            return;
        }
        match self.target_at(screen) {
            Some(Hover::Node(id)) => {
                if let Some(actions) = &self.actions {
                    actions.open_node_editor(&id);
                }
            }
            Some(Hover::Connection(id)) => self.begin_label_edit(&id),
            _ => {}
        }
    }

    /// Scroll wheel: zoom around the pointer. Negative `delta_y` zooms in.
    pub fn wheel(&mut self, screen: Position, delta_y: f32) {
        if delta_y == 0.0 || !self.interaction.is_idle() {
            return;
        }
        let factor = if delta_y < 0.0 {
            self.config.wheel_zoom_factor
        } else {
            1.0 / self.config.wheel_zoom_factor
        };
        self.viewport = zoom_to_point(screen, factor, &self.viewport, &self.canvas_rect, &self.config.zoom);
    }

    // ------------------------------------------------------------------------
    // Connection labels
    // ------------------------------------------------------------------------

    pub fn begin_label_edit(&mut self, id: &ConnectionId) {
        let Some(conn) = self.graph.get_connection(id) else {
            return;
        };
        let original = conn.label.clone();
        self.selection.select_connection(id);
        self.interaction
            .transition_to(InteractionState::EditingConnectionLabel {
                connection_id: id.clone(),
                draft: original.clone().unwrap_or_default(),
                original,
            });
        if let Some(actions) = &self.actions {
            actions.edit_connection_label(id);
        }
    }

    /// Replace the label draft with the text field's current contents.
    pub fn label_input(&mut self, text: &str) {
        if let InteractionState::EditingConnectionLabel { draft, .. } = self.interaction.state_mut() {
            draft.clear();
            draft.push_str(text);
        }
    }

    pub fn commit_label(&mut self) {
        if !matches!(self.interaction.state(), InteractionState::EditingConnectionLabel { .. }) {
            return;
        }
        if let InteractionState::EditingConnectionLabel {
            connection_id,
            draft,
            original,
        } = self.interaction.take()
        {
            let label = Some(draft).filter(|d| !d.is_empty());
            if label != original && self.graph.set_connection_label(&connection_id, label) {
                self.events.push(EditorEvent::LabelChanged(connection_id));
            }
        }
    }

    // ------------------------------------------------------------------------
    // Keyboard and commands
    // ------------------------------------------------------------------------

    /// Handle a key press. Returns true when the key was consumed.
    pub fn key_down(&mut self, key: Key, modifiers: Modifiers) -> bool {
        if let InteractionState::EditingConnectionLabel { .. } = self.interaction.state() {
            return match key {
                Key::Escape => {
                    self.cancel();
                    true
                }
                Key::Enter => {
                    self.commit_label();
                    true
                }
                // Text goes to the label field
                _ => false,
            };
        }
        match self.config.keymap.resolve(&key, &modifiers) {
            Some(command) => {
                self.execute(command);
                true
            }
            None => false,
        }
    }

    pub fn execute(&mut self, command: EditorCommand) {
        debug!(?command, "editor command");
        match command {
            EditorCommand::ZoomIn => self.zoom_in(),
            EditorCommand::ZoomOut => self.zoom_out(),
            EditorCommand::FitToView => self.fit_to_view(),
            EditorCommand::DeleteSelected => self.delete_selected(),
            EditorCommand::Cancel => self.cancel(),
            EditorCommand::SelectAll => self.select_all(),
        }
    }

    /// Abandon the current interaction without committing it.
    ///
    /// A node drag puts the nodes back, a pan restores the viewport, a
    /// marquee leaves the selection as it was, label editing discards the
    /// draft. With nothing in progress, the context
    /// menu closes, or failing that the selection is cleared.
    pub fn cancel(&mut self) {
        let menu_closed = self.interaction.close_context_menu().is_some();
        match self.interaction.take() {
            InteractionState::DraggingNode(drag) => {
                for (id, origin) in &drag.origins {
                    self.graph.move_node(id, *origin);
                }
            }
            InteractionState::PanningCanvas { origin, .. } => self.viewport = origin,
            InteractionState::Idle if !menu_closed && !self.selection.is_empty() => {
                self.selection.clear();
                self.events.push(EditorEvent::SelectionChanged);
            }
            _ => {}
        }
    }

    fn zoom_by(&mut self, factor: f32) {
        let anchor = self.canvas_rect.center();
        self.viewport = zoom_to_point(anchor, factor, &self.viewport, &self.canvas_rect, &self.config.zoom);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / self.config.zoom_step);
    }

    /// Frame every visible node; identity viewport for an empty graph.
    pub fn fit_to_view(&mut self) {
        let bounds = Rect::bounding(
            self.geometry
                .node_geometries(&self.graph, self.config.default_node_size)
                .into_iter()
                .map(|g| g.rect),
        );
        self.viewport = fit_to_view(bounds, &self.canvas_rect, self.config.fit_padding, &self.config.zoom);
    }

    /// Remove the selected nodes (with their connections) or the selected
    /// connection. Ignored while an interaction is in progress.
    pub fn delete_selected(&mut self) {
        if !self.interaction.is_idle() {
            return;
        }
        self.selection.retain_existing(&self.graph);

        let mut nodes = Vec::new();
        let mut connections = Vec::new();
        for id in self.selection.sorted_ids() {
            if let Some(removed) = self.graph.remove_node(&id) {
                self.geometry.forget_node(&id);
                connections.extend(removed.connections.into_iter().map(|c| c.id));
                nodes.push(id);
            }
        }
        if let Some(id) = self.selection.selected_connection().cloned() {
            if self.graph.remove_connection(&id).is_some() {
                connections.push(id);
            }
        }
        if nodes.is_empty() && connections.is_empty() {
            return;
        }
        self.selection.clear();
        self.hover = None;
        self.events.push(EditorEvent::Deleted { nodes, connections });
    }

    pub fn select_all(&mut self) {
        let ids: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|n| !n.is_hidden)
            .map(|n| n.id.clone())
            .collect();
        self.selection.replace_selection(ids);
        self.events.push(EditorEvent::SelectionChanged);
    }

    // ------------------------------------------------------------------------
    // Context menu
    // ------------------------------------------------------------------------

    /// Run a context menu entry and close the menu.
    ///
    /// Returns false when no menu is open or the action does not apply to
    /// its target.
    pub fn context_menu_action(&mut self, action: ContextMenuAction) -> bool {
        let Some(menu) = self.interaction.close_context_menu() else {
            return false;
        };
        match (menu.target, action) {
            (ContextMenuTarget::Node(id), ContextMenuAction::Open) => {
                if let Some(actions) = &self.actions {
                    actions.open_node_editor(&id);
                }
            }
            (ContextMenuTarget::Node(id), ContextMenuAction::Delete) => {
                if !self.selection.contains(&id) {
                    self.selection.select_only(&id);
                }
                self.delete_selected();
            }
            (ContextMenuTarget::Connection(id), ContextMenuAction::Delete) => {
                self.selection.select_connection(&id);
                self.delete_selected();
            }
            (ContextMenuTarget::Connection(id), ContextMenuAction::EditLabel) => {
                self.begin_label_edit(&id);
            }
            (ContextMenuTarget::Connection(id), ContextMenuAction::InsertNode) => {
                if let Some(actions) = &self.actions {
                    actions.open_node_panel_for_connection(&id);
                }
            }
            (ContextMenuTarget::Canvas, ContextMenuAction::SelectAll) => self.select_all(),
            (ContextMenuTarget::Canvas, ContextMenuAction::FitToView) => self.fit_to_view(),
            (target, action) => {
                debug!(?target, ?action, "context menu action does not apply");
                return false;
            }
        }
        true
    }

    // ------------------------------------------------------------------------
    // Palette drops and minimap
    // ------------------------------------------------------------------------

    /// Create a node from a palette drag-and-drop payload dropped at `screen`.
    ///
    /// The node's top-left corner lands on the drop point (snapped when
    /// snapping is on). The new node becomes the selection.
    pub fn drop_payload(&mut self, json: &str, screen: Position) -> Result<NodeId, GraphError> {
        let payload = DropPayload::from_json(json).map_err(|e| {
            warn!(error = %e, "unreadable drop payload");
            e
        })?;
        let DropPayload::Node { node: definition } = payload;

        let mut position = self.to_world(screen);
        if self.config.snap_to_grid {
            position = snap_to_grid(position, self.config.grid_size);
        }
        let new_node = definition.instantiate(position)?;
        let id = self.graph.add_node(new_node)?.id.clone();

        self.selection.select_only(&id);
        self.events.push(EditorEvent::NodeCreated(id.clone()));
        self.events.push(EditorEvent::SelectionChanged);
        Ok(id)
    }

    /// Centre the canvas on the world point under a minimap click.
    ///
    /// `local` is relative to the minimap's top-left corner. Returns false
    /// for an empty graph or while a gesture is in progress.
    pub fn minimap_click(&mut self, local: Position) -> bool {
        if !self.interaction.is_idle() {
            return false;
        }
        let Some(bounds) = Rect::bounding(
            self.geometry
                .node_geometries(&self.graph, self.config.default_node_size)
                .into_iter()
                .map(|g| g.rect),
        ) else {
            return false;
        };
        let projection = MinimapProjection::new(bounds, &self.config.minimap);
        self.viewport = center_on(projection.to_world(local), &self.viewport, &self.canvas_rect);
        true
    }

    /// Arrange the graph in layers along its connections.
    #[cfg(feature = "layout")]
    pub fn tidy_up(&mut self, config: &crate::layout::LayoutConfig) -> Vec<NodeId> {
        let moved = crate::layout::tidy_up(
            &mut self.graph,
            &self.geometry,
            self.config.default_node_size,
            config,
        );
        if !moved.is_empty() {
            self.events.push(EditorEvent::NodesMoved(moved.clone()));
        }
        moved
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Path commands of one connection, local to the canvas element.
    pub fn connection_path(&self, id: &ConnectionId) -> Option<String> {
        let conn = self.graph.get_connection(id)?;
        let (start, end) =
            self.geometry
                .connection_endpoints(conn, &self.graph, self.config.default_node_size)?;
        let local = Rect::new(0.0, 0.0, self.canvas_rect.width, self.canvas_rect.height);
        let style = conn.style_or(self.config.connection_style);
        Some(style.path_commands(
            canvas_to_screen(start, &self.viewport, &local),
            canvas_to_screen(end, &self.viewport, &local),
            self.viewport.zoom,
            self.config.bezier_min_offset,
        ))
    }

    pub fn render(&self) -> RenderFrame {
        build_frame(&RenderContext {
            graph: &self.graph,
            selection: &self.selection,
            interaction: &self.interaction,
            geometry: &self.geometry,
            viewport: &self.viewport,
            canvas_rect: &self.canvas_rect,
            config: &self.config,
            hover: self.hover.as_ref(),
        })
    }
}

/// Output-to-input candidate for a draft ending on `port`.
fn candidate_for(draft: &ConnectionDraft, port: &PortRef) -> ConnectionCandidate {
    match draft.from_kind {
        PortKind::Output => ConnectionCandidate::new(
            draft.source_node.clone(),
            draft.source_port.clone(),
            port.node.clone(),
            port.port.clone(),
        ),
        PortKind::Input => ConnectionCandidate::new(
            port.node.clone(),
            port.port.clone(),
            draft.source_node.clone(),
            draft.source_port.clone(),
        ),
    }
}
