//! Sugiyama layered layout ("tidy up").
//!
//! Lays the workflow out in layers along its connections using the
//! `rust-sugiyama` crate. That crate works in `f64` with dense `u32` vertex
//! indices, so node ids are mapped to indices on the way in and back on the
//! way out.
//!
//! Requires the `layout` feature to be enabled.

use std::collections::{HashMap, HashSet};

use crate::graph::GraphStore;
use crate::model::NodeId;
use crate::state::GeometryCache;
use crate::viewport::{Position, Rect, Size};

/// Layout direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum Direction {
    TopToBottom,
    /// Layers flow left to right, the usual reading order of a workflow.
    #[default]
    LeftToRight,
}

#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct LayoutConfig {
    /// Minimum spacing between vertices (0 keeps the `rust-sugiyama` default).
    pub vertex_spacing: f64,
    /// Minimum edge length between layers (0 keeps the `rust-sugiyama` default).
    pub minimum_length: u32,
    pub dummy_vertices: bool,
    pub direction: Direction,
}

impl LayoutConfig {
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_vertex_spacing(mut self, spacing: f64) -> Self {
        self.vertex_spacing = spacing;
        self
    }
}

/// A laid-out node: its new top-left corner in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePosition {
    pub id: NodeId,
    pub position: Position,
}

/// Compute layered positions.
///
/// `edges` are `(source, target)` node pairs; edges naming a node missing
/// from `sizes` are skipped. Duplicate ids in `sizes` keep the first entry.
pub fn sugiyama_layout(
    edges: &[(NodeId, NodeId)],
    sizes: &[(NodeId, Size)],
    config: &LayoutConfig,
) -> Vec<NodePosition> {
    if sizes.is_empty() {
        return Vec::new();
    }

    let horizontal = config.direction == Direction::LeftToRight;

    let mut id_to_idx: HashMap<&NodeId, u32> = HashMap::new();
    let mut idx_to_id: Vec<&NodeId> = Vec::with_capacity(sizes.len());
    let mut vertices: Vec<(u32, (f64, f64))> = Vec::with_capacity(sizes.len());

    for (id, size) in sizes {
        if let std::collections::hash_map::Entry::Vacant(e) = id_to_idx.entry(id) {
            let idx = idx_to_id.len() as u32;
            e.insert(idx);
            idx_to_id.push(id);
            // Horizontal layouts run the algorithm on the transposed graph
            let (w, h) = (size.width as f64, size.height as f64);
            vertices.push((idx, if horizontal { (h, w) } else { (w, h) }));
        }
    }

    let mapped_edges: Vec<(u32, u32)> = edges
        .iter()
        .filter_map(|(src, dst)| Some((*id_to_idx.get(src)?, *id_to_idx.get(dst)?)))
        .collect();

    let mut sg_config = rust_sugiyama::configure::Config {
        dummy_vertices: config.dummy_vertices,
        ..Default::default()
    };
    if config.vertex_spacing > 0.0 {
        sg_config.vertex_spacing = config.vertex_spacing;
    }
    if config.minimum_length > 0 {
        sg_config.minimum_length = config.minimum_length;
    }

    let subgraphs = rust_sugiyama::from_vertices_and_edges(&vertices, &mapped_edges, &sg_config);

    let mut results = Vec::with_capacity(idx_to_id.len());
    for (layout, _width, _height) in &subgraphs {
        for &(idx, (x, y)) in layout {
            if let Some(&id) = idx_to_id.get(idx) {
                let (px, py) = if horizontal { (y, x) } else { (x, y) };
                results.push(NodePosition {
                    id: id.clone(),
                    position: Position::new(px as f32, py as f32),
                });
            }
        }
    }

    results
}

/// Compute a layout for every visible node of `graph`.
///
/// Node sizes come from `geometry` (falling back to the node's own size and
/// then `default_size`). Connections collapse to one edge per node pair and
/// self-loops are dropped. The result is translated so its top-left corner
/// coincides with the top-left corner of the graph before layout.
pub fn layout_graph(
    graph: &GraphStore,
    geometry: &GeometryCache,
    default_size: Size,
    config: &LayoutConfig,
) -> Vec<NodePosition> {
    let nodes: Vec<_> = graph.nodes().filter(|n| !n.is_hidden).collect();
    let sizes: Vec<(NodeId, Size)> = nodes
        .iter()
        .map(|n| (n.id.clone(), geometry.node_size(n, default_size)))
        .collect();

    let edges: Vec<(NodeId, NodeId)> = graph
        .connections()
        .filter(|c| c.source != c.target)
        .map(|c| (c.source.clone(), c.target.clone()))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let mut positions = sugiyama_layout(&edges, &sizes, config);

    let before = Rect::bounding(nodes.iter().map(|n| geometry.node_rect(n, default_size)));
    let min_x = positions.iter().map(|p| p.position.x).fold(f32::INFINITY, f32::min);
    let min_y = positions.iter().map(|p| p.position.y).fold(f32::INFINITY, f32::min);
    if let (Some(before), true) = (before, min_x.is_finite() && min_y.is_finite()) {
        let shift = before.origin() - Position::new(min_x, min_y);
        for p in &mut positions {
            p.position = p.position + shift;
        }
    }
    positions
}

/// Lay the graph out and move its unlocked nodes into place.
///
/// Returns the ids of the nodes that moved.
pub fn tidy_up(
    graph: &mut GraphStore,
    geometry: &GeometryCache,
    default_size: Size,
    config: &LayoutConfig,
) -> Vec<NodeId> {
    let positions = layout_graph(graph, geometry, default_size, config);
    let mut moved = Vec::new();
    for NodePosition { id, position } in positions {
        let unlocked = graph.get_node(&id).is_some_and(|n| !n.is_locked && n.position != position);
        if unlocked && graph.move_node(&id, position) {
            moved.push(id);
        }
    }
    tracing::debug!(moved = moved.len(), "tidy up");
    moved
}
