//! Per-frame render lists.
//!
//! Everything here is rebuilt from world coordinates and the current viewport
//! on every call; no screen-space value survives a viewport change. Positions
//! in a [`RenderFrame`] are local to the canvas element (its top-left corner is
//! `(0, 0)`), which is what a Slint `Path` placed inside the canvas expects.

use crate::config::EditorConfig;
use crate::graph::GraphStore;
use crate::grid::generate_grid_commands;
use crate::interaction::{ContextMenu, InteractionMachine, InteractionState};
use crate::minimap::{project_minimap, MinimapView};
use crate::model::{ConnectionId, ConnectionStyle, NodeId, PortKind};
use crate::path::path_midpoint;
use crate::selection::SelectionManager;
use crate::state::{GeometryCache, PortRef};
use crate::viewport::{canvas_to_screen, rect_to_screen, Position, Rect, Viewport};
use slint::{Color, Model, SharedString, VecModel};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualState {
    #[default]
    Default,
    Hovered,
    Selected,
    /// A port the connection being drawn cannot attach to.
    InvalidTarget,
}

/// Whatever the pointer is currently over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hover {
    Node(NodeId),
    Port(PortRef),
    Connection(ConnectionId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub id: NodeId,
    pub title: SharedString,
    pub rect: Rect,
    pub state: VisualState,
    pub border: Color,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortView {
    pub port: PortRef,
    pub position: Position,
    pub state: VisualState,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionView {
    pub id: ConnectionId,
    pub path: SharedString,
    /// Midpoint of the drawn curve, for the inline overlay controls.
    pub midpoint: Position,
    pub label: Option<SharedString>,
    pub state: VisualState,
    pub color: Color,
}

/// The live path while drawing a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewView {
    pub path: SharedString,
    pub invalid: bool,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderFrame {
    pub viewport: Viewport,
    /// Paint order.
    pub nodes: Vec<NodeView>,
    pub ports: Vec<PortView>,
    pub connections: Vec<ConnectionView>,
    pub preview: Option<PreviewView>,
    pub marquee: Option<Rect>,
    pub context_menu: Option<ContextMenu>,
    pub grid: SharedString,
    pub minimap: MinimapView,
    /// Draft text while a connection label is being edited.
    pub label_draft: Option<(ConnectionId, SharedString)>,
}

/// Borrowed editor state a frame is built from.
pub struct RenderContext<'a> {
    pub graph: &'a GraphStore,
    pub selection: &'a SelectionManager,
    pub interaction: &'a InteractionMachine,
    pub geometry: &'a GeometryCache,
    pub viewport: &'a Viewport,
    pub canvas_rect: &'a Rect,
    pub config: &'a EditorConfig,
    pub hover: Option<&'a Hover>,
}

impl RenderContext<'_> {
    fn local_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.canvas_rect.width, self.canvas_rect.height)
    }

    fn to_local(&self, world: Position) -> Position {
        canvas_to_screen(world, self.viewport, &self.local_rect())
    }

    fn screen_path(&self, style: ConnectionStyle, start: Position, end: Position) -> (SharedString, Position) {
        let (a, b) = (self.to_local(start), self.to_local(end));
        let zoom = self.viewport.zoom;
        let offset = self.config.bezier_min_offset;
        (
            style.path_commands(a, b, zoom, offset).into(),
            path_midpoint(style, a, b, zoom, offset),
        )
    }
}

/// Build the complete frame.
pub fn build_frame(ctx: &RenderContext<'_>) -> RenderFrame {
    let default_size = ctx.config.default_node_size;
    let theme = &ctx.config.theme;
    let local = ctx.local_rect();

    // Mid-marquee, nodes show the selection the release would produce
    let marquee_selection: Option<HashSet<&NodeId>> = match ctx.interaction.state() {
        InteractionState::MarqueeSelecting(m) => {
            let base: &[NodeId] = if m.additive { &m.base } else { &[] };
            Some(base.iter().chain(&m.preview).collect())
        }
        _ => None,
    };
    let is_selected = |id: &NodeId| match &marquee_selection {
        Some(ids) => ids.contains(id),
        None => ctx.selection.contains(id),
    };

    let nodes = ctx
        .graph
        .nodes_by_z()
        .into_iter()
        .filter(|n| !n.is_hidden)
        .map(|node| {
            let state = if is_selected(&node.id) {
                VisualState::Selected
            } else if ctx.hover == Some(&Hover::Node(node.id.clone())) {
                VisualState::Hovered
            } else {
                VisualState::Default
            };
            let border = match state {
                VisualState::Selected => theme.node_selected,
                VisualState::Hovered => theme.node_hovered,
                _ => theme.node_border,
            };
            NodeView {
                id: node.id.clone(),
                title: node.data.name.as_str().into(),
                rect: rect_to_screen(&ctx.geometry.node_rect(node, default_size), ctx.viewport, &local),
                state,
                border: border.to_color(),
                locked: node.is_locked,
            }
        })
        .collect();

    let draft = match ctx.interaction.state() {
        InteractionState::DrawingConnection(draft) => Some(draft),
        _ => None,
    };

    let ports = ctx
        .geometry
        .port_geometries(ctx.graph, default_size)
        .into_iter()
        .map(|geom| {
            let over = draft.and_then(|d| d.target.as_ref()).filter(|t| t.port == geom.id);
            let state = match over {
                Some(t) if !t.validity.is_valid() => VisualState::InvalidTarget,
                Some(_) => VisualState::Hovered,
                None if ctx.hover == Some(&Hover::Port(geom.id.clone())) => VisualState::Hovered,
                None => VisualState::Default,
            };
            let color = match state {
                VisualState::InvalidTarget => theme.error,
                VisualState::Hovered => theme.connection_hovered,
                _ => theme.port,
            };
            PortView {
                position: ctx.to_local(geom.position),
                port: geom.id,
                state,
                color: color.to_color(),
            }
        })
        .collect();

    let connections = ctx
        .geometry
        .connection_geometries(ctx.graph, default_size, ctx.config.connection_style)
        .into_iter()
        .map(|geom| {
            let state = if marquee_selection.is_none()
                && ctx.selection.selected_connection() == Some(&geom.id)
            {
                VisualState::Selected
            } else if ctx.hover == Some(&Hover::Connection(geom.id.clone())) {
                VisualState::Hovered
            } else {
                VisualState::Default
            };
            let color = match state {
                VisualState::Selected => theme.connection_selected,
                VisualState::Hovered => theme.connection_hovered,
                _ => theme.connection,
            };
            let (path, midpoint) = ctx.screen_path(geom.style, geom.start, geom.end);
            let label = ctx
                .graph
                .get_connection(&geom.id)
                .and_then(|c| c.label.as_deref())
                .map(SharedString::from);
            ConnectionView {
                id: geom.id,
                path,
                midpoint,
                label,
                state,
                color: color.to_color(),
            }
        })
        .collect();

    let preview = draft.and_then(|draft| {
        let node = ctx.graph.get_node(&draft.source_node)?;
        let anchor = ctx.geometry.port_anchor(
            node,
            draft.source_port.as_ref(),
            draft.from_kind,
            default_size,
        )?;
        // Always drawn output -> input so the curve bends the right way
        let (start, end) = match draft.from_kind {
            PortKind::Output => (anchor, draft.pointer),
            PortKind::Input => (draft.pointer, anchor),
        };
        let invalid = draft.over_invalid_target();
        let (path, _) = ctx.screen_path(ctx.config.connection_style, start, end);
        let color = if invalid { theme.error } else { theme.connection_hovered };
        Some(PreviewView {
            path,
            invalid,
            color: color.to_color(),
        })
    });

    let (marquee, label_draft) = match ctx.interaction.state() {
        InteractionState::MarqueeSelecting(m) => (Some(rect_to_screen(&m.rect(), ctx.viewport, &local)), None),
        InteractionState::EditingConnectionLabel {
            connection_id,
            draft,
            ..
        } => (None, Some((connection_id.clone(), SharedString::from(draft.as_str())))),
        _ => (None, None),
    };

    let minimap = project_minimap(
        ctx.geometry
            .node_geometries(ctx.graph, default_size)
            .into_iter()
            .map(|g| (g.id, g.rect)),
        ctx.viewport,
        ctx.canvas_rect,
        &ctx.config.minimap,
    );

    RenderFrame {
        viewport: *ctx.viewport,
        nodes,
        ports,
        connections,
        preview,
        marquee,
        context_menu: ctx.interaction.context_menu().cloned(),
        grid: generate_grid_commands(
            ctx.canvas_rect.width,
            ctx.canvas_rect.height,
            ctx.viewport,
            ctx.config.grid_size,
        )
        .into(),
        minimap,
        label_draft,
    }
}

/// Keep a Slint model in step with `rows`, converting each with `make_row`.
///
/// Existing rows are overwritten in place, missing ones pushed, and surplus
/// ones removed from the end, so the UI keeps item identity where it can.
pub fn sync_model_with<R, T, F>(model: &VecModel<T>, rows: &[R], make_row: F)
where
    T: Clone + 'static,
    F: Fn(&R) -> T,
{
    for (i, row) in rows.iter().enumerate() {
        let item = make_row(row);
        if i < model.row_count() {
            model.set_row_data(i, item);
        } else {
            model.push(item);
        }
    }
    while model.row_count() > rows.len() {
        model.remove(model.row_count() - 1);
    }
}

pub fn sync_model<T: Clone + 'static>(model: &VecModel<T>, rows: &[T]) {
    sync_model_with(model, rows, T::clone);
}
