//! # Workflow Canvas
//!
//! The graph-editing engine behind a workflow editor canvas: nodes with typed
//! ports on an infinite, pannable and zoomable canvas, connected by bezier,
//! straight or step routes.
//!
//! ## Features
//!
//! - **Graph store** - id-indexed nodes and connections with an adjacency
//!   index, cascade deletes and change notifications
//! - **Connection validation** - composable rules (self-connection, port
//!   direction, data types, duplicates, input cardinality)
//! - **Interaction state machine** - node drag with grid snapping, connection
//!   drawing with live validity, marquee selection, panning, label editing,
//!   context menus, Escape to cancel
//! - **Coordinate transforms** - screen/world mapping, zoom toward the
//!   cursor, fit to view
//! - **Render lists** - per-frame screen-space views for a Slint UI, including
//!   the minimap
//!
//! ## Rust Helpers
//!
//! - [`generate_bezier_path`] - SVG path for a connection
//! - [`generate_grid_commands`] - SVG path for the background grid
//! - [`find_port_at`], [`find_node_at`], [`find_connection_at`] - world-space hit testing
//! - [`GeometryCache`] - measured node sizes and port anchors
//! - [`SelectionManager`] - selection state with O(1) lookups
//! - [`GraphStore`] - the canonical graph
//! - [`CanvasEditor`] - input handling and rendering
//! - [`EditorController`] - shared handle with Slint callback factories
//!
//! ## Quick Start
//!
//! ```ignore
//! use workflow_canvas::{CanvasEditor, EditorConfig, NewConnection, NewNode, NodePort, Position};
//!
//! let mut editor = CanvasEditor::new(EditorConfig::default());
//! let graph = editor.graph_mut();
//! graph.add_node(NewNode::new("webhook", "Webhook", Position::new(0.0, 0.0))
//!     .with_id("hook")
//!     .with_output(NodePort::output("main", "Main")))?;
//! graph.add_node(NewNode::new("set", "Set", Position::new(300.0, 0.0))
//!     .with_id("set")
//!     .with_input(NodePort::input("main", "Main")))?;
//! graph.add_connection(NewConnection::between("hook", "main", "set", "main"))?;
//!
//! let frame = editor.render();
//! ```

pub mod config;
pub mod controller;
pub mod editor;
pub mod error;
pub mod graph;
pub mod grid;
pub mod interaction;
pub mod keymap;
#[cfg(feature = "layout")]
pub mod layout;
pub mod minimap;
pub mod model;
pub mod path;
pub mod render;
pub mod selection;
pub mod state;
pub mod validation;
pub mod viewport;

pub use config::{CanvasDragMode, EditorConfig, MinimapConfig, Rgb, Theme};
pub use controller::EditorController;
pub use editor::{
    CanvasEditor, ContextMenuAction, EditorActions, EditorEvent, PointerButton, PointerEvent,
};
pub use error::{ConnectionRejected, GraphError};
pub use graph::{GraphChange, GraphStore, RemovedNode};
pub use grid::{generate_grid_commands, snap_to_grid};
pub use hit_test::{
    find_connection_at, find_node_at, find_port_at, nodes_in_selection_box, ConnectionGeometry,
    NodeGeometry, PortGeometry, SimpleConnectionGeometry, SimpleNodeGeometry, SimplePortGeometry,
};
pub use interaction::{ContextMenu, ContextMenuKind, ContextMenuTarget, InteractionState};
pub use keymap::{EditorCommand, Key, KeyBinding, Keymap, Modifiers};
pub use model::{
    Connection, ConnectionId, ConnectionStyle, DataType, DropPayload, GraphDocument,
    NewConnection, NewNode, Node, NodeData, NodeDefinition, NodeId, NodePort, NodeUpdate,
    ParameterDefinition, PortDefinition, PortId, PortKind,
};
pub use path::{generate_bezier_path, generate_step_path, generate_straight_path, path_midpoint};
pub use render::{sync_model, sync_model_with, Hover, RenderFrame, VisualState};
pub use selection::SelectionManager;
pub use state::{GeometryCache, PortRef};
pub use validation::{
    can_connect, check_port_pair, default_validator, CompositeValidator, ConnectionCandidate,
    ConnectionValidator, ValidationResult,
};
pub use viewport::{
    canvas_to_screen, fit_to_view, pan_canvas, screen_to_canvas, zoom_to_point, Position, Rect,
    Size, Viewport, ZoomLimits,
};
