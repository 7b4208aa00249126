//! Canvas interaction state.
//!
//! Exactly one interaction mode is active at a time. The editor owns an
//! [`InteractionMachine`] and moves it between modes in response to pointer
//! and keyboard input; the state values carry whatever the mode needs to
//! finish or undo itself.

use crate::model::{ConnectionId, NodeId, PortId, PortKind};
use crate::state::PortRef;
use crate::validation::ValidationResult;
use crate::viewport::{Position, Rect, Viewport};

/// A node drag in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDrag {
    /// The node under the pointer when the drag started.
    pub node_id: NodeId,
    /// Pointer minus node origin, in screen pixels.
    pub grab_offset: Position,
    /// Pre-drag world positions of every node that moves with the drag.
    pub origins: Vec<(NodeId, Position)>,
    pub press_screen: Position,
    pub moved: bool,
    /// Pointer-up without movement collapses a group selection to `node_id`.
    pub collapse_on_release: bool,
}

impl NodeDrag {
    pub fn origin_of(&self, id: &NodeId) -> Option<Position> {
        self.origins
            .iter()
            .find(|(n, _)| n == id)
            .map(|(_, p)| *p)
    }
}

/// The port currently under the pointer while drawing a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTarget {
    pub port: PortRef,
    pub validity: ValidationResult,
}

/// A connection being drawn from a port toward the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDraft {
    pub source_node: NodeId,
    pub source_port: Option<PortId>,
    /// Kind of the port the drag started on. Drafts started on an input are
    /// reversed before validation.
    pub from_kind: PortKind,
    /// Pointer in world space.
    pub pointer: Position,
    pub target: Option<DropTarget>,
}

impl ConnectionDraft {
    /// True while hovering a port the draft cannot connect to.
    pub fn over_invalid_target(&self) -> bool {
        self.target
            .as_ref()
            .is_some_and(|t| !t.validity.is_valid())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marquee {
    /// World space.
    pub start: Position,
    /// World space.
    pub current: Position,
    /// Union with `base` instead of replacing it.
    pub additive: bool,
    /// Selection before the marquee started.
    pub base: Vec<NodeId>,
    /// Nodes intersecting the box as of the last (throttled) recomputation.
    pub preview: Vec<NodeId>,
    /// Screen pointer at the last recomputation.
    pub last_hit_test_at: Option<Position>,
}

impl Marquee {
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.start, self.current)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    DraggingNode(NodeDrag),
    DrawingConnection(ConnectionDraft),
    MarqueeSelecting(Marquee),
    PanningCanvas {
        /// Screen position of the press.
        start: Position,
        origin: Viewport,
    },
    EditingConnectionLabel {
        connection_id: ConnectionId,
        draft: String,
        original: Option<String>,
    },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::DraggingNode(_) => "dragging-node",
            InteractionState::DrawingConnection(_) => "drawing-connection",
            InteractionState::MarqueeSelecting(_) => "marquee-selecting",
            InteractionState::PanningCanvas { .. } => "panning-canvas",
            InteractionState::EditingConnectionLabel { .. } => "editing-connection-label",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMenuKind {
    Node,
    Connection,
    Canvas,
}

/// What a context menu was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextMenuTarget {
    Node(NodeId),
    Connection(ConnectionId),
    Canvas,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    pub target: ContextMenuTarget,
    /// Screen position the menu is anchored at.
    pub position: Position,
}

impl ContextMenu {
    pub fn kind(&self) -> ContextMenuKind {
        match self.target {
            ContextMenuTarget::Node(_) => ContextMenuKind::Node,
            ContextMenuTarget::Connection(_) => ContextMenuKind::Connection,
            ContextMenuTarget::Canvas => ContextMenuKind::Canvas,
        }
    }
}

/// Holder of the active [`InteractionState`] and the open context menu.
#[derive(Debug, Default)]
pub struct InteractionMachine {
    state: InteractionState,
    context_menu: Option<ContextMenu>,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut InteractionState {
        &mut self.state
    }

    /// Returns true if no interaction is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    pub fn transition_to(&mut self, state: InteractionState) {
        tracing::debug!(from = self.state.name(), to = state.name(), "interaction transition");
        self.state = state;
    }

    /// Take the current state, leaving `Idle` behind.
    pub fn take(&mut self) -> InteractionState {
        let state = std::mem::take(&mut self.state);
        if !matches!(state, InteractionState::Idle) {
            tracing::debug!(from = state.name(), to = "idle", "interaction transition");
        }
        state
    }

    pub fn reset_to_idle(&mut self) {
        self.transition_to(InteractionState::Idle);
    }

    /// Open a menu, replacing any other.
    pub fn open_context_menu(&mut self, menu: ContextMenu) {
        tracing::debug!(kind = ?menu.kind(), "context menu opened");
        self.context_menu = Some(menu);
    }

    pub fn close_context_menu(&mut self) -> Option<ContextMenu> {
        self.context_menu.take()
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.context_menu.as_ref()
    }
}
