use crate::graph::GraphStore;
use crate::hit_test::{SimpleConnectionGeometry, SimpleNodeGeometry, SimplePortGeometry};
use crate::model::{Connection, ConnectionId, ConnectionStyle, Node, NodeId, PortId, PortKind};
use crate::viewport::{Position, Rect, Size};
use std::collections::HashMap;

/// A port endpoint: a named port, or the node-level handle when `port` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node: NodeId,
    pub port: Option<PortId>,
    pub kind: PortKind,
}

/// Helper struct to manage spatial state of the editor (node sizes and port anchors)
///
/// The UI reports measured node sizes and port offsets (relative to the node
/// origin, in world units). Anything not reported falls back to the node's
/// own size or the default size, and to an evenly spaced port layout:
/// inputs on the left edge, outputs on the right.
#[derive(Debug, Default, Clone)]
pub struct GeometryCache {
    pub node_sizes: HashMap<NodeId, Size>,
    pub port_offsets: HashMap<(NodeId, PortId), Position>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard handler for node size reports from Slint
    pub fn handle_node_size_report(&mut self, node: NodeId, width: f32, height: f32) {
        self.node_sizes.insert(node, Size::new(width, height));
    }

    /// Standard handler for port position reports from Slint
    pub fn handle_port_report(&mut self, node: NodeId, port: PortId, rel_x: f32, rel_y: f32) {
        self.port_offsets.insert((node, port), Position::new(rel_x, rel_y));
    }

    /// Drop everything cached for a node.
    pub fn forget_node(&mut self, node: &NodeId) {
        self.node_sizes.remove(node);
        self.port_offsets.retain(|(n, _), _| n != node);
    }

    pub fn clear(&mut self) {
        self.node_sizes.clear();
        self.port_offsets.clear();
    }

    /// Effective size: reported, then the node's own, then `default`.
    pub fn node_size(&self, node: &Node, default: Size) -> Size {
        self.node_sizes
            .get(&node.id)
            .copied()
            .or(node.size)
            .unwrap_or(default)
    }

    pub fn node_rect(&self, node: &Node, default: Size) -> Rect {
        Rect::from_origin_size(node.position, self.node_size(node, default))
    }

    /// Offset of a port relative to the node origin.
    ///
    /// `None` refers to the node-level handle: the left edge centre for
    /// inputs, the right edge centre for outputs. Returns `None` when the
    /// named port does not exist on the node.
    pub fn port_offset(
        &self,
        node: &Node,
        port: Option<&PortId>,
        kind: PortKind,
        default: Size,
    ) -> Option<Position> {
        let size = self.node_size(node, default);
        let Some(port) = port else {
            let x = match kind {
                PortKind::Input => 0.0,
                PortKind::Output => size.width,
            };
            return Some(Position::new(x, size.height / 2.0));
        };

        if let Some(offset) = self.port_offsets.get(&(node.id.clone(), port.clone())) {
            return Some(*offset);
        }

        let (kind, index, count) = node.port_slot(port)?;
        let x = match kind {
            PortKind::Input => 0.0,
            PortKind::Output => size.width,
        };
        let y = size.height * (index + 1) as f32 / (count + 1) as f32;
        Some(Position::new(x, y))
    }

    /// World-space anchor of a port.
    pub fn port_anchor(
        &self,
        node: &Node,
        port: Option<&PortId>,
        kind: PortKind,
        default: Size,
    ) -> Option<Position> {
        self.port_offset(node, port, kind, default)
            .map(|offset| node.position + offset)
    }

    /// World-space endpoints of a connection.
    pub fn connection_endpoints(
        &self,
        conn: &Connection,
        graph: &GraphStore,
        default: Size,
    ) -> Option<(Position, Position)> {
        let source = graph.get_node(&conn.source)?;
        let target = graph.get_node(&conn.target)?;
        let start = self.port_anchor(source, conn.source_port.as_ref(), PortKind::Output, default)?;
        let end = self.port_anchor(target, conn.target_port.as_ref(), PortKind::Input, default)?;
        Some((start, end))
    }

    /// Node bounds in paint order, hidden nodes excluded.
    pub fn node_geometries(
        &self,
        graph: &GraphStore,
        default: Size,
    ) -> Vec<SimpleNodeGeometry<NodeId>> {
        graph
            .nodes_by_z()
            .into_iter()
            .filter(|n| !n.is_hidden)
            .map(|n| SimpleNodeGeometry {
                id: n.id.clone(),
                rect: self.node_rect(n, default),
            })
            .collect()
    }

    /// Every port anchor of visible nodes, node-level handles included.
    pub fn port_geometries(
        &self,
        graph: &GraphStore,
        default: Size,
    ) -> Vec<SimplePortGeometry<PortRef>> {
        let mut out = Vec::new();
        for node in graph.nodes_by_z().into_iter().filter(|n| !n.is_hidden) {
            for port in node.ports() {
                if let Some(position) = self.port_anchor(node, Some(&port.id), port.kind, default) {
                    out.push(SimplePortGeometry {
                        id: PortRef {
                            node: node.id.clone(),
                            port: Some(port.id.clone()),
                            kind: port.kind,
                        },
                        position,
                    });
                }
            }
            // Node-level handles only where the node has no ports on that side
            for (kind, has_ports) in [
                (PortKind::Input, !node.inputs.is_empty()),
                (PortKind::Output, !node.outputs.is_empty()),
            ] {
                if has_ports {
                    continue;
                }
                if let Some(position) = self.port_anchor(node, None, kind, default) {
                    out.push(SimplePortGeometry {
                        id: PortRef {
                            node: node.id.clone(),
                            port: None,
                            kind,
                        },
                        position,
                    });
                }
            }
        }
        out
    }

    /// World-space geometry of every connection between visible nodes.
    pub fn connection_geometries(
        &self,
        graph: &GraphStore,
        default: Size,
        default_style: ConnectionStyle,
    ) -> Vec<SimpleConnectionGeometry<ConnectionId>> {
        graph
            .connections()
            .filter(|c| !self.endpoint_hidden(c, graph))
            .filter_map(|c| {
                let (start, end) = self.connection_endpoints(c, graph, default)?;
                Some(SimpleConnectionGeometry {
                    id: c.id.clone(),
                    start,
                    end,
                    style: c.style_or(default_style),
                })
            })
            .collect()
    }

    fn endpoint_hidden(&self, conn: &Connection, graph: &GraphStore) -> bool {
        [&conn.source, &conn.target]
            .into_iter()
            .any(|id| graph.get_node(id).map_or(true, |n| n.is_hidden))
    }
}
