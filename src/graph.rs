//! The graph data store.
//!
//! [`GraphStore`] owns every node and connection, keyed by id, plus an
//! adjacency index from node id to the connections touching it. All
//! mutations are synchronous and finish their cascades before returning,
//! so a connection never outlives either endpoint or the port it names.

use crate::error::{ConnectionRejected, GraphError};
use crate::model::{
    Connection, ConnectionId, GraphDocument, NewConnection, NewNode, Node, NodeId, NodeUpdate,
    PortId,
};
use crate::validation::{
    check_port_pair, default_validator, ConnectionCandidate, ConnectionValidator,
    ValidationResult,
};
use crate::viewport::{Position, Viewport};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, error, warn};

/// Notification sent to subscribers after every completed mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphChange {
    NodeAdded(NodeId),
    NodeUpdated(NodeId),
    NodeMoved { id: NodeId, position: Position },
    /// The node and every connection that was cascade-deleted with it.
    NodeRemoved {
        id: NodeId,
        connections: Vec<ConnectionId>,
    },
    ConnectionAdded(ConnectionId),
    /// Label or style of an existing connection changed.
    ConnectionUpdated(ConnectionId),
    ConnectionRemoved(ConnectionId),
    /// The whole graph was cleared or replaced.
    Reset,
}

impl GraphChange {
    /// Whether the set or shape of nodes changed.
    pub fn touches_nodes(&self) -> bool {
        !matches!(
            self,
            GraphChange::ConnectionAdded(_)
                | GraphChange::ConnectionUpdated(_)
                | GraphChange::ConnectionRemoved(_)
        )
    }

    /// Whether the set of connections changed.
    pub fn touches_connections(&self) -> bool {
        match self {
            GraphChange::ConnectionAdded(_)
            | GraphChange::ConnectionUpdated(_)
            | GraphChange::ConnectionRemoved(_)
            | GraphChange::Reset => true,
            GraphChange::NodeRemoved { connections, .. } => !connections.is_empty(),
            _ => false,
        }
    }
}

/// What [`GraphStore::remove_node`] deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub node: Node,
    pub connections: Vec<Connection>,
}

type Listener = Box<dyn FnMut(&GraphChange)>;

pub struct GraphStore {
    nodes: HashMap<NodeId, Node>,
    node_order: Vec<NodeId>,
    connections: HashMap<ConnectionId, Connection>,
    connection_order: Vec<ConnectionId>,
    adjacency: HashMap<NodeId, Vec<ConnectionId>>,
    validator: Box<dyn ConnectionValidator>,
    listeners: Vec<Listener>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStore")
            .field("nodes", &self.node_order.len())
            .field("connections", &self.connection_order.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl GraphStore {
    /// Empty store using the default validation rules.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            node_order: Vec::new(),
            connections: HashMap::new(),
            connection_order: Vec::new(),
            adjacency: HashMap::new(),
            validator: Box::new(default_validator()),
            listeners: Vec::new(),
        }
    }

    /// Replace the connection validator.
    pub fn with_validator<V: ConnectionValidator + 'static>(mut self, validator: V) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn set_validator<V: ConnectionValidator + 'static>(&mut self, validator: V) {
        self.validator = Box::new(validator);
    }

    /// Register a change listener. Listeners run synchronously after each mutation.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&GraphChange) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, change: GraphChange) {
        for listener in &mut self.listeners {
            listener(&change);
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Connections in insertion order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.connection_order
            .iter()
            .filter_map(|id| self.connections.get(id))
    }

    /// Nodes in paint order: ascending z-index, insertion order within a layer.
    pub fn nodes_by_z(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes().collect();
        nodes.sort_by_key(|n| n.z_index);
        nodes
    }

    /// Every connection that has `node` as source or target.
    pub fn connections_for_node<'a>(
        &'a self,
        node: &NodeId,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.adjacency
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(|id| self.connections.get(id))
    }

    /// Connections terminating at `port` of `node` (the node-level handle when `None`).
    pub fn incoming_connections<'a>(
        &'a self,
        node: &'a NodeId,
        port: Option<&'a PortId>,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections_for_node(node)
            .filter(move |c| &c.target == node && c.target_port.as_ref() == port)
    }

    /// Connections leaving `port` of `node` (the node-level handle when `None`).
    pub fn outgoing_connections<'a>(
        &'a self,
        node: &'a NodeId,
        port: Option<&'a PortId>,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections_for_node(node)
            .filter(move |c| &c.source == node && c.source_port.as_ref() == port)
    }

    /// Run the configured validator against a candidate without mutating.
    pub fn validate(&self, candidate: &ConnectionCandidate) -> ValidationResult {
        self.validator.validate(candidate, self)
    }

    // ------------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------------

    /// Insert a node, generating an id when none is supplied.
    pub fn add_node(&mut self, new_node: NewNode) -> Result<&Node, GraphError> {
        let id = match &new_node.id {
            Some(id) if self.nodes.contains_key(id) => {
                return Err(GraphError::DuplicateNodeId(id.clone()));
            }
            Some(id) => id.clone(),
            None => self.fresh_node_id(),
        };

        let node = new_node.into_node(id.clone());
        node.check_port_ids()?;

        self.insert_node(node);
        self.notify(GraphChange::NodeAdded(id.clone()));
        self.nodes
            .get(&id)
            .ok_or(GraphError::NodeNotFound(id))
    }

    fn insert_node(&mut self, node: Node) {
        let id = node.id.clone();
        self.adjacency.entry(id.clone()).or_default();
        self.node_order.push(id.clone());
        self.nodes.insert(id, node);
    }

    fn fresh_node_id(&self) -> NodeId {
        loop {
            let id = NodeId::generate();
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    fn fresh_connection_id(&self) -> ConnectionId {
        loop {
            let id = ConnectionId::generate();
            if !self.connections.contains_key(&id) {
                return id;
            }
        }
    }

    /// Merge the present fields of `update` into a node.
    ///
    /// Returns `false` (and logs a warning) when the node does not exist or
    /// the new port lists contain duplicate ids. Connections that reference a
    /// port the update removed are deleted, as are connections the new ports
    /// no longer allow: a port that changed direction or data type, or an
    /// input that stopped accepting multiple connections (the oldest one is
    /// kept).
    pub fn update_node(&mut self, id: &NodeId, update: NodeUpdate) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            warn!(node = %id, "update_node: no such node");
            return false;
        };

        let mut candidate = node.clone();
        let ports_changed = update.inputs.is_some() || update.outputs.is_some();
        if let Some(inputs) = update.inputs {
            candidate.inputs = inputs;
        }
        if let Some(outputs) = update.outputs {
            candidate.outputs = outputs;
        }
        if let Err(err) = candidate.check_port_ids() {
            warn!(node = %id, %err, "update_node: rejected port list");
            return false;
        }

        if let Some(position) = update.position {
            candidate.position = position;
        }
        if let Some(size) = update.size {
            candidate.size = size;
        }
        if let Some(data) = update.data {
            candidate.data = data;
        }
        if let Some(v) = update.is_expanded {
            candidate.is_expanded = v;
        }
        if let Some(v) = update.is_locked {
            candidate.is_locked = v;
        }
        if let Some(v) = update.is_hidden {
            candidate.is_hidden = v;
        }
        if let Some(z) = update.z_index {
            candidate.z_index = z;
        }
        *node = candidate;

        if ports_changed {
            let orphaned: Vec<ConnectionId> = self
                .connections_for_node(id)
                .filter(|c| !self.connection_ports_exist(c))
                .map(|c| c.id.clone())
                .collect();
            for conn_id in orphaned {
                if self.detach_connection(&conn_id).is_some() {
                    debug!(connection = %conn_id, node = %id, "removed connection to deleted port");
                    self.notify(GraphChange::ConnectionRemoved(conn_id));
                }
            }
            loop {
                let invalid = first_invalid_connection(self.connections_for_node(id), |n| {
                    self.nodes.get(n)
                })
                .map(|(conn, reason)| (conn.id.clone(), reason));
                let Some((conn_id, reason)) = invalid else {
                    break;
                };
                if self.detach_connection(&conn_id).is_none() {
                    break;
                }
                debug!(
                    connection = %conn_id,
                    node = %id,
                    reason = reason.code(),
                    "removed connection the updated ports no longer allow"
                );
                self.notify(GraphChange::ConnectionRemoved(conn_id));
            }
            self.refresh_port_flags(id);
        }

        self.notify(GraphChange::NodeUpdated(id.clone()));
        true
    }

    /// Position-only update.
    pub fn move_node(&mut self, id: &NodeId, position: Position) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            warn!(node = %id, "move_node: no such node");
            return false;
        };
        node.position = position;
        self.notify(GraphChange::NodeMoved {
            id: id.clone(),
            position,
        });
        true
    }

    /// Delete a node and every connection that references it.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<RemovedNode> {
        if !self.nodes.contains_key(id) {
            return None;
        }

        let conn_ids = self.adjacency.get(id).cloned().unwrap_or_default();
        let connections: Vec<Connection> = conn_ids
            .iter()
            .filter_map(|cid| self.detach_connection(cid))
            .collect();

        self.adjacency.remove(id);
        self.node_order.retain(|n| n != id);
        let node = self.nodes.remove(id)?;

        self.notify(GraphChange::NodeRemoved {
            id: id.clone(),
            connections: connections.iter().map(|c| c.id.clone()).collect(),
        });
        Some(RemovedNode { node, connections })
    }

    // ------------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------------

    /// Validate and insert a connection with a fresh id.
    ///
    /// On rejection nothing changes and the reason is returned.
    pub fn add_connection(
        &mut self,
        new_connection: NewConnection,
    ) -> Result<ConnectionId, ConnectionRejected> {
        let candidate = ConnectionCandidate::from(&new_connection);
        if let ValidationResult::Invalid(reason) = self.validate(&candidate) {
            debug!(
                source = %candidate.source,
                target = %candidate.target,
                reason = reason.code(),
                "connection rejected"
            );
            return Err(reason);
        }

        let id = self.fresh_connection_id();
        self.attach_connection(new_connection.into_connection(id.clone()));
        self.notify(GraphChange::ConnectionAdded(id.clone()));
        Ok(id)
    }

    /// Remove a connection. Absent ids are a no-op.
    pub fn remove_connection(&mut self, id: &ConnectionId) -> Option<Connection> {
        let removed = self.detach_connection(id)?;
        self.notify(GraphChange::ConnectionRemoved(id.clone()));
        Some(removed)
    }

    /// Set or clear a connection's label.
    pub fn set_connection_label(&mut self, id: &ConnectionId, label: Option<String>) -> bool {
        let Some(conn) = self.connections.get_mut(id) else {
            warn!(connection = %id, "set_connection_label: no such connection");
            return false;
        };
        conn.label = label.filter(|l| !l.is_empty());
        self.notify(GraphChange::ConnectionUpdated(id.clone()));
        true
    }

    fn attach_connection(&mut self, conn: Connection) {
        let id = conn.id.clone();
        self.adjacency
            .entry(conn.source.clone())
            .or_default()
            .push(id.clone());
        self.adjacency
            .entry(conn.target.clone())
            .or_default()
            .push(id.clone());
        self.set_port_flag(&conn.source, conn.source_port.as_ref(), true);
        self.set_port_flag(&conn.target, conn.target_port.as_ref(), true);
        self.connection_order.push(id.clone());
        self.connections.insert(id, conn);
    }

    /// Remove a connection from every index without notifying.
    fn detach_connection(&mut self, id: &ConnectionId) -> Option<Connection> {
        let conn = self.connections.remove(id)?;
        self.connection_order.retain(|c| c != id);
        for endpoint in [&conn.source, &conn.target] {
            if let Some(list) = self.adjacency.get_mut(endpoint) {
                list.retain(|c| c != id);
            }
        }
        self.refresh_port_flag(&conn.source, conn.source_port.as_ref());
        self.refresh_port_flag(&conn.target, conn.target_port.as_ref());
        Some(conn)
    }

    fn connection_ports_exist(&self, conn: &Connection) -> bool {
        let exists = |node: &NodeId, port: Option<&PortId>| match port {
            None => self.nodes.contains_key(node),
            Some(port) => self
                .nodes
                .get(node)
                .is_some_and(|n| n.port(port).is_some()),
        };
        exists(&conn.source, conn.source_port.as_ref())
            && exists(&conn.target, conn.target_port.as_ref())
    }

    fn port_in_use(&self, node: &NodeId, port: &PortId) -> bool {
        self.connections_for_node(node).any(|c| {
            (&c.source == node && c.source_port.as_ref() == Some(port))
                || (&c.target == node && c.target_port.as_ref() == Some(port))
        })
    }

    fn set_port_flag(&mut self, node: &NodeId, port: Option<&PortId>, connected: bool) {
        let Some(port) = port else { return };
        if let Some(p) = self.nodes.get_mut(node).and_then(|n| n.port_mut(port)) {
            p.connected = connected;
        }
    }

    fn refresh_port_flag(&mut self, node: &NodeId, port: Option<&PortId>) {
        let Some(port) = port else { return };
        let in_use = self.port_in_use(node, port);
        self.set_port_flag(node, Some(port), in_use);
    }

    fn refresh_port_flags(&mut self, node: &NodeId) {
        let ports: Vec<PortId> = match self.nodes.get(node) {
            Some(n) => n.ports().map(|p| p.id.clone()).collect(),
            None => return,
        };
        for port in &ports {
            self.refresh_port_flag(node, Some(port));
        }
    }

    // ------------------------------------------------------------------------
    // Whole-graph operations
    // ------------------------------------------------------------------------

    /// Remove every node and connection.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.node_order.clear();
        self.connections.clear();
        self.connection_order.clear();
        self.adjacency.clear();
        self.notify(GraphChange::Reset);
    }

    /// Snapshot of the graph in insertion order.
    pub fn to_document(&self, viewport: Option<Viewport>) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes().cloned().collect(),
            connections: self.connections().cloned().collect(),
            viewport,
        }
    }

    /// Replace the graph with the contents of a document.
    ///
    /// The document is checked before anything is replaced: duplicate ids,
    /// self-loops, connections naming missing nodes or ports, and connections
    /// that break the direction, data type, duplicate or single-input rules
    /// are refused and leave the store untouched. Port `connected` flags are recomputed.
    /// Returns the document's viewport, if any.
    pub fn load_document(&mut self, doc: GraphDocument) -> Result<Option<Viewport>, GraphError> {
        let mut node_ids = HashSet::new();
        for node in &doc.nodes {
            if !node_ids.insert(&node.id) {
                return Err(GraphError::DuplicateNodeId(node.id.clone()));
            }
            node.check_port_ids()?;
        }

        let by_id: HashMap<&NodeId, &Node> = doc.nodes.iter().map(|n| (&n.id, n)).collect();
        let mut conn_ids = HashSet::new();
        for conn in &doc.connections {
            if !conn_ids.insert(&conn.id) {
                return Err(GraphError::DuplicateConnectionId(conn.id.clone()));
            }
            if conn.source == conn.target {
                return Err(ConnectionRejected::SelfConnection(conn.source.clone()).into());
            }
            for (node, port) in [
                (&conn.source, conn.source_port.as_ref()),
                (&conn.target, conn.target_port.as_ref()),
            ] {
                let dangling = |what: String| GraphError::DanglingConnection {
                    connection: conn.id.clone(),
                    what,
                };
                let Some(n) = by_id.get(node) else {
                    return Err(dangling(format!("node {}", node)));
                };
                if let Some(port) = port {
                    if n.port(port).is_none() {
                        return Err(dangling(format!("port {} on node {}", port, node)));
                    }
                }
            }
        }
        if let Some((conn, reason)) =
            first_invalid_connection(&doc.connections, |id| by_id.get(id).copied())
        {
            warn!(connection = %conn.id, reason = reason.code(), "load_document: invalid connection");
            return Err(reason.into());
        }

        self.nodes.clear();
        self.node_order.clear();
        self.connections.clear();
        self.connection_order.clear();
        self.adjacency.clear();

        for mut node in doc.nodes {
            for port in node.inputs.iter_mut().chain(node.outputs.iter_mut()) {
                port.connected = false;
            }
            self.insert_node(node);
        }
        for conn in doc.connections {
            self.attach_connection(conn);
        }

        self.notify(GraphChange::Reset);
        Ok(doc.viewport)
    }

    /// Build a store from a document.
    pub fn from_document(doc: GraphDocument) -> Result<Self, GraphError> {
        let mut store = Self::new();
        store.load_document(doc)?;
        Ok(store)
    }

    pub fn to_json(&self, viewport: Option<Viewport>) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(&self.to_document(viewport))?)
    }

    /// Replace the graph from a JSON document, returning its viewport.
    pub fn load_json(&mut self, json: &str) -> Result<Option<Viewport>, GraphError> {
        let doc: GraphDocument = serde_json::from_str(json)?;
        self.load_document(doc)
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let mut store = Self::new();
        store.load_json(json)?;
        Ok(store)
    }

    /// Verify the structural invariants of the store.
    ///
    /// A violation is a programming error in the store itself; it is logged
    /// at error level and returned.
    pub fn check_integrity(&self) -> Result<(), GraphError> {
        let fail = |msg: String| {
            error!(violation = %msg, "graph integrity violation");
            Err(GraphError::IntegrityViolation(msg))
        };

        if self.node_order.len() != self.nodes.len() {
            return fail(format!(
                "node order has {} entries for {} nodes",
                self.node_order.len(),
                self.nodes.len()
            ));
        }
        if self.connection_order.len() != self.connections.len() {
            return fail(format!(
                "connection order has {} entries for {} connections",
                self.connection_order.len(),
                self.connections.len()
            ));
        }

        for conn in self.connections() {
            if conn.source == conn.target {
                return fail(format!("connection {} is a self-loop", conn.id));
            }
            if !self.connection_ports_exist(conn) {
                return fail(format!("connection {} has a missing endpoint", conn.id));
            }
            for endpoint in [&conn.source, &conn.target] {
                let indexed = self
                    .adjacency
                    .get(endpoint)
                    .is_some_and(|list| list.contains(&conn.id));
                if !indexed {
                    return fail(format!(
                        "connection {} missing from adjacency of {}",
                        conn.id, endpoint
                    ));
                }
            }
        }

        if let Some((conn, reason)) =
            first_invalid_connection(self.connections(), |id| self.nodes.get(id))
        {
            return fail(format!("connection {} is invalid: {}", conn.id, reason));
        }

        for (node_id, list) in &self.adjacency {
            if !self.nodes.contains_key(node_id) {
                return fail(format!("adjacency entry for missing node {}", node_id));
            }
            if let Some(stale) = list.iter().find(|c| !self.connections.contains_key(*c)) {
                return fail(format!("stale connection {} in adjacency of {}", stale, node_id));
            }
        }

        for node in self.nodes() {
            for port in node.ports() {
                if port.connected != self.port_in_use(&node.id, &port.id) {
                    return fail(format!(
                        "port {} on node {} has a stale connected flag",
                        port.id, node.id
                    ));
                }
            }
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn attach_unchecked_for_test(&mut self, conn: Connection) {
        self.attach_connection(conn);
    }

    #[cfg(test)]
    pub(crate) fn corrupt_port_flag_for_test(&mut self, node: &NodeId, port: &PortId) {
        if let Some(p) = self.nodes.get_mut(node).and_then(|n| n.port_mut(port)) {
            p.connected = !p.connected;
        }
    }
}

/// The first connection that breaks the direction, data type, duplicate or
/// single-input rules, in iteration order. Earlier connections win: for an
/// over-full input the later connection is reported.
///
/// Connections whose nodes `node` cannot find are skipped; a port id the node
/// lacks is treated as the node-level handle.
fn first_invalid_connection<'a, 'n>(
    connections: impl IntoIterator<Item = &'a Connection>,
    node: impl Fn(&NodeId) -> Option<&'n Node>,
) -> Option<(&'a Connection, ConnectionRejected)> {
    let mut seen = HashSet::new();
    let mut filled: HashMap<(&NodeId, &PortId), &ConnectionId> = HashMap::new();
    for conn in connections {
        let (Some(source), Some(target)) = (node(&conn.source), node(&conn.target)) else {
            continue;
        };
        let source_port = conn.source_port.as_ref().and_then(|p| source.port(p));
        let target_port = conn.target_port.as_ref().and_then(|p| target.port(p));
        if let Err(reason) = check_port_pair(source_port, target_port) {
            return Some((conn, reason));
        }
        if !seen.insert((&conn.source, &conn.source_port, &conn.target, &conn.target_port)) {
            return Some((conn, ConnectionRejected::DuplicateConnection));
        }
        if let (Some(port_id), Some(port)) = (conn.target_port.as_ref(), target_port) {
            if !port.multiple {
                if let Some(existing) = filled.insert((&conn.target, port_id), &conn.id) {
                    let existing = existing.clone();
                    return Some((conn, ConnectionRejected::InputAlreadyConnected { existing }));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodePort;
    use crate::viewport::Size;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn new_node(id: &str, x: f32, y: f32) -> NewNode {
        NewNode::new("test", id.to_uppercase(), Position::new(x, y))
            .with_id(id)
            .with_input(NodePort::input("in", "In"))
            .with_output(NodePort::output("out", "Out"))
    }

    fn chain() -> GraphStore {
        let mut g = GraphStore::new();
        g.add_node(new_node("a", 0.0, 0.0)).unwrap();
        g.add_node(new_node("b", 200.0, 0.0)).unwrap();
        g.add_node(new_node("c", 400.0, 0.0)).unwrap();
        g.add_connection(NewConnection::between("a", "out", "b", "in")).unwrap();
        g.add_connection(NewConnection::between("b", "out", "c", "in")).unwrap();
        g
    }

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    // ========================================================================
    // add_node()
    // ========================================================================

    #[test]
    fn test_add_node_generates_unique_ids() {
        let mut g = GraphStore::new();
        let a = g.add_node(NewNode::new("t", "A", Position::ZERO)).unwrap().id.clone();
        let b = g.add_node(NewNode::new("t", "B", Position::ZERO)).unwrap().id.clone();
        assert_ne!(a, b);
        assert_eq!(g.node_count(), 2);
        assert!(g.check_integrity().is_ok());
    }

    #[test]
    fn test_add_node_rejects_duplicate_id() {
        let mut g = GraphStore::new();
        g.add_node(new_node("a", 0.0, 0.0)).unwrap();
        let err = g.add_node(new_node("a", 5.0, 5.0)).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNodeId(_)));
        assert_eq!(g.get_node(&id("a")).unwrap().position, Position::ZERO);
    }

    #[test]
    fn test_add_node_rejects_duplicate_port_ids() {
        let mut g = GraphStore::new();
        let err = g
            .add_node(
                NewNode::new("t", "X", Position::ZERO)
                    .with_input(NodePort::input("p", "P"))
                    .with_output(NodePort::output("p", "P")),
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicatePortId { .. }));
        assert!(g.is_empty());
    }

    #[test]
    fn test_add_node_resets_connected_flags() {
        let mut g = GraphStore::new();
        let mut port = NodePort::input("in", "In");
        port.connected = true;
        g.add_node(NewNode::new("t", "X", Position::ZERO).with_id("x").with_input(port))
            .unwrap();
        assert!(!g.get_node(&id("x")).unwrap().inputs[0].connected);
    }

    // ========================================================================
    // update_node() / move_node()
    // ========================================================================

    #[test]
    fn test_update_node_merges_fields() {
        let mut g = chain();
        let ok = g.update_node(
            &id("a"),
            NodeUpdate {
                size: Some(Some(Size::new(10.0, 20.0))),
                is_locked: Some(true),
                ..Default::default()
            },
        );
        assert!(ok);
        let a = g.get_node(&id("a")).unwrap();
        assert_eq!(a.size, Some(Size::new(10.0, 20.0)));
        assert!(a.is_locked);
        assert_eq!(a.data.name, "A");
    }

    #[test]
    fn test_update_missing_node_is_noop() {
        let mut g = chain();
        assert!(!g.update_node(&id("zzz"), NodeUpdate::position(Position::ZERO)));
        assert!(!g.move_node(&id("zzz"), Position::ZERO));
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_update_node_removing_port_cascades() {
        let mut g = chain();
        let ok = g.update_node(
            &id("b"),
            NodeUpdate {
                inputs: Some(vec![]),
                ..Default::default()
            },
        );
        assert!(ok);
        assert_eq!(g.connection_count(), 1);
        assert!(g.connections().all(|c| c.target != id("b")));
        assert!(!g.get_node(&id("a")).unwrap().outputs[0].connected);
        assert!(g.check_integrity().is_ok());
    }

    #[test]
    fn test_update_node_keeping_port_keeps_connection() {
        let mut g = chain();
        g.update_node(
            &id("b"),
            NodeUpdate {
                inputs: Some(vec![NodePort::input("in", "Renamed")]),
                ..Default::default()
            },
        );
        assert_eq!(g.connection_count(), 2);
        assert!(g.get_node(&id("b")).unwrap().inputs[0].connected);
        assert!(g.check_integrity().is_ok());
    }

    #[test]
    fn test_update_node_flipping_port_direction_cascades() {
        let mut g = chain();
        let ok = g.update_node(
            &id("b"),
            NodeUpdate {
                inputs: Some(vec![]),
                outputs: Some(vec![NodePort::output("out", "Out"), NodePort::output("in", "In")]),
                ..Default::default()
            },
        );
        assert!(ok);
        assert_eq!(g.connection_count(), 1);
        assert!(g.incoming_connections(&id("b"), Some(&PortId::from("in"))).next().is_none());
        assert!(!g.get_node(&id("a")).unwrap().outputs[0].connected);
        assert!(g.check_integrity().is_ok());
    }

    #[test]
    fn test_update_node_changing_data_type_cascades() {
        let mut g = chain();
        g.update_node(
            &id("a"),
            NodeUpdate {
                outputs: Some(vec![NodePort::output("out", "Out").with_data_type("string")]),
                ..Default::default()
            },
        );
        assert_eq!(g.connection_count(), 2, "string into an untyped input is fine");

        let removed = Rc::new(RefCell::new(Vec::new()));
        let sink = removed.clone();
        g.subscribe(move |change| {
            if let GraphChange::ConnectionRemoved(conn) = change {
                sink.borrow_mut().push(conn.clone());
            }
        });
        g.update_node(
            &id("b"),
            NodeUpdate {
                inputs: Some(vec![NodePort::input("in", "In").with_data_type("number")]),
                ..Default::default()
            },
        );
        assert_eq!(g.connection_count(), 1);
        assert_eq!(removed.borrow().len(), 1);
        assert!(g.connections().all(|c| c.source != id("a")));
        assert!(g.check_integrity().is_ok());
    }

    #[test]
    fn test_update_node_losing_multiple_keeps_oldest_connection() {
        let mut g = GraphStore::new();
        g.add_node(new_node("a", 0.0, 0.0)).unwrap();
        g.add_node(new_node("b", 0.0, 200.0)).unwrap();
        g.add_node(
            NewNode::new("test", "Merge", Position::new(400.0, 0.0))
                .with_id("m")
                .with_input(NodePort::input("in", "In").allow_multiple()),
        )
        .unwrap();
        let first = g.add_connection(NewConnection::between("a", "out", "m", "in")).unwrap();
        g.add_connection(NewConnection::between("b", "out", "m", "in")).unwrap();

        g.update_node(
            &id("m"),
            NodeUpdate {
                inputs: Some(vec![NodePort::input("in", "In")]),
                ..Default::default()
            },
        );
        let incoming: Vec<_> = g
            .incoming_connections(&id("m"), Some(&PortId::from("in")))
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(incoming, vec![first]);
        assert!(!g.get_node(&id("b")).unwrap().outputs[0].connected);
        assert!(g.check_integrity().is_ok());
    }

    #[test]
    fn test_update_node_rejects_duplicate_ports() {
        let mut g = chain();
        let ok = g.update_node(
            &id("b"),
            NodeUpdate {
                outputs: Some(vec![NodePort::output("in", "Clash")]),
                ..Default::default()
            },
        );
        assert!(!ok);
        assert_eq!(g.get_node(&id("b")).unwrap().outputs[0].id, PortId::from("out"));
    }

    #[test]
    fn test_move_node() {
        let mut g = chain();
        assert!(g.move_node(&id("b"), Position::new(7.0, 8.0)));
        assert_eq!(g.get_node(&id("b")).unwrap().position, Position::new(7.0, 8.0));
    }

    // ========================================================================
    // remove_node() - cascade
    // ========================================================================

    #[test]
    fn test_remove_node_cascades() {
        let mut g = chain();
        let removed = g.remove_node(&id("b")).unwrap();
        assert_eq!(removed.node.id, id("b"));
        assert_eq!(removed.connections.len(), 2);
        assert_eq!(g.connection_count(), 0);
        assert!(g.connections().all(|c| !c.references(&id("b"))));
        assert!(!g.get_node(&id("a")).unwrap().outputs[0].connected);
        assert!(!g.get_node(&id("c")).unwrap().inputs[0].connected);
        assert!(g.check_integrity().is_ok());
    }

    #[test]
    fn test_remove_missing_node() {
        let mut g = chain();
        assert!(g.remove_node(&id("zzz")).is_none());
        assert_eq!(g.node_count(), 3);
    }

    // ========================================================================
    // add_connection() / remove_connection()
    // ========================================================================

    #[test]
    fn test_add_connection_sets_flags() {
        let g = chain();
        let b = g.get_node(&id("b")).unwrap();
        assert!(b.inputs[0].connected);
        assert!(b.outputs[0].connected);
        assert_eq!(g.connections_for_node(&id("b")).count(), 2);
    }

    #[test]
    fn test_duplicate_connection_is_noop() {
        let mut g = chain();
        let err = g
            .add_connection(NewConnection::between("a", "out", "b", "in"))
            .unwrap_err();
        assert_eq!(err, ConnectionRejected::DuplicateConnection);
        assert_eq!(g.connection_count(), 2);
    }

    #[test]
    fn test_rejected_connection_leaves_graph_unchanged() {
        let mut g = chain();
        let before = g.to_document(None);
        let err = g
            .add_connection(NewConnection::between("c", "out", "b", "in"))
            .unwrap_err();
        assert_eq!(err.code(), "input-already-connected");
        assert_eq!(g.to_document(None), before);
    }

    #[test]
    fn test_remove_connection() {
        let mut g = chain();
        let conn_id = g.connections().next().unwrap().id.clone();
        let removed = g.remove_connection(&conn_id).unwrap();
        assert_eq!(removed.source, id("a"));
        assert!(g.remove_connection(&conn_id).is_none());
        assert!(!g.get_node(&id("a")).unwrap().outputs[0].connected);
        assert!(g.check_integrity().is_ok());
    }

    #[test]
    fn test_port_flag_survives_fan_out_removal() {
        let mut g = chain();
        let second = g
            .add_connection(NewConnection::between("a", "out", "c", "out").with_label("x"))
            .unwrap_err();
        assert_eq!(second.code(), "wrong-port-kind");

        g.add_node(new_node("d", 0.0, 200.0)).unwrap();
        let fan = g.add_connection(NewConnection::between("a", "out", "d", "in")).unwrap();
        g.remove_connection(&fan);
        assert!(g.get_node(&id("a")).unwrap().outputs[0].connected);
    }

    #[test]
    fn test_incoming_and_outgoing() {
        let g = chain();
        let in_port = PortId::from("in");
        let out_port = PortId::from("out");
        let b = id("b");
        assert_eq!(g.incoming_connections(&b, Some(&in_port)).count(), 1);
        assert_eq!(g.outgoing_connections(&b, Some(&out_port)).count(), 1);
        assert_eq!(g.incoming_connections(&b, None).count(), 0);
    }

    #[test]
    fn test_custom_validator_replaces_rules() {
        let mut g = GraphStore::new().with_validator(
            |_: &ConnectionCandidate, _: &GraphStore| ValidationResult::Valid,
        );
        g.add_node(new_node("a", 0.0, 0.0)).unwrap();
        g.add_node(new_node("b", 0.0, 0.0)).unwrap();
        g.add_connection(NewConnection::nodes("a", "b")).unwrap();
        g.add_connection(NewConnection::nodes("a", "b")).unwrap();
        assert_eq!(g.connection_count(), 2);
    }

    #[test]
    fn test_set_connection_label() {
        let mut g = chain();
        let conn_id = g.connections().next().unwrap().id.clone();
        assert!(g.set_connection_label(&conn_id, Some("yes".into())));
        assert_eq!(g.get_connection(&conn_id).unwrap().label.as_deref(), Some("yes"));
        assert!(g.set_connection_label(&conn_id, Some(String::new())));
        assert_eq!(g.get_connection(&conn_id).unwrap().label, None);
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    #[test]
    fn test_nodes_keep_insertion_order() {
        let g = chain();
        let ids: Vec<&str> = g.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_nodes_by_z_is_stable() {
        let mut g = chain();
        g.update_node(
            &id("a"),
            NodeUpdate {
                z_index: Some(5),
                ..Default::default()
            },
        );
        let ids: Vec<&str> = g.nodes_by_z().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    // ========================================================================
    // Change notifications
    // ========================================================================

    #[test]
    fn test_subscribers_receive_changes() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut g = GraphStore::new();
        let sink = log.clone();
        g.subscribe(move |change| sink.borrow_mut().push(change.clone()));

        g.add_node(new_node("a", 0.0, 0.0)).unwrap();
        g.add_node(new_node("b", 0.0, 0.0)).unwrap();
        let conn = g.add_connection(NewConnection::between("a", "out", "b", "in")).unwrap();
        g.move_node(&id("a"), Position::new(1.0, 1.0));
        g.remove_node(&id("b"));

        let log = log.borrow();
        assert_eq!(log[0], GraphChange::NodeAdded(id("a")));
        assert_eq!(log[2], GraphChange::ConnectionAdded(conn.clone()));
        assert_eq!(
            log[3],
            GraphChange::NodeMoved {
                id: id("a"),
                position: Position::new(1.0, 1.0)
            }
        );
        assert_eq!(
            log[4],
            GraphChange::NodeRemoved {
                id: id("b"),
                connections: vec![conn]
            }
        );
        assert!(log[4].touches_connections());
    }

    #[test]
    fn test_rejection_does_not_notify() {
        let count = Rc::new(RefCell::new(0));
        let mut g = chain();
        let sink = count.clone();
        g.subscribe(move |_| *sink.borrow_mut() += 1);
        let _ = g.add_connection(NewConnection::between("a", "out", "a", "in"));
        assert_eq!(*count.borrow(), 0);
    }

    // ========================================================================
    // Documents
    // ========================================================================

    #[test]
    fn test_document_roundtrip() {
        let g = chain();
        let json = g.to_json(Some(Viewport::new(10.0, 20.0, 1.5))).unwrap();
        let mut loaded = GraphStore::new();
        let viewport = loaded.load_json(&json).unwrap();

        assert_eq!(viewport, Some(Viewport::new(10.0, 20.0, 1.5)));
        assert_eq!(loaded.to_document(None), g.to_document(None));
        assert!(loaded.check_integrity().is_ok());
    }

    #[test]
    fn test_load_rejects_dangling_connection() {
        let mut doc = chain().to_document(None);
        doc.nodes.retain(|n| n.id != id("c"));
        let mut g = chain();
        let err = g.load_document(doc).unwrap_err();
        assert!(matches!(err, GraphError::DanglingConnection { .. }));
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_load_rejects_duplicates() {
        let mut doc = chain().to_document(None);
        let dup = doc.nodes[0].clone();
        doc.nodes.push(dup);
        assert!(matches!(
            GraphStore::from_document(doc),
            Err(GraphError::DuplicateNodeId(_))
        ));

        let mut doc = chain().to_document(None);
        let dup = doc.connections[0].clone();
        doc.connections.push(dup);
        assert!(matches!(
            GraphStore::from_document(doc),
            Err(GraphError::DuplicateConnectionId(_))
        ));
    }

    #[test]
    fn test_load_rejects_connections_breaking_port_rules() {
        let base = chain().to_document(None);
        let template = base.connections[0].clone();

        // Second connection into the single-valued b:in
        let mut doc = base.clone();
        let mut extra = template.clone();
        extra.id = ConnectionId::new("dup-input");
        extra.source = id("c");
        doc.connections.push(extra);
        let mut g = chain();
        let err = g.load_document(doc).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Rejected(ConnectionRejected::InputAlreadyConnected { .. })
        ));
        assert_eq!(g.incoming_connections(&id("b"), Some(&PortId::from("in"))).count(), 1);

        // Input to output
        let mut doc = base.clone();
        doc.connections.push(Connection {
            id: ConnectionId::new("reversed"),
            source: id("c"),
            source_port: Some(PortId::from("in")),
            target: id("a"),
            target_port: Some(PortId::from("out")),
            ..template.clone()
        });
        assert!(matches!(
            GraphStore::from_document(doc),
            Err(GraphError::Rejected(ConnectionRejected::WrongPortKind))
        ));

        // Same endpoints under a new id
        let mut doc = base.clone();
        let mut copy = template.clone();
        copy.id = ConnectionId::new("copy");
        doc.connections.push(copy);
        assert!(matches!(
            GraphStore::from_document(doc),
            Err(GraphError::Rejected(ConnectionRejected::DuplicateConnection))
        ));

        let mut doc = base;
        doc.nodes[0].outputs[0].data_type = Some("string".into());
        doc.nodes[1].inputs[0].data_type = Some("number".into());
        assert!(matches!(
            GraphStore::from_document(doc),
            Err(GraphError::Rejected(ConnectionRejected::TypeMismatch { .. }))
        ));
    }

    #[test]
    fn test_load_recomputes_connected_flags() {
        let mut doc = chain().to_document(None);
        for node in &mut doc.nodes {
            for port in node.inputs.iter_mut().chain(node.outputs.iter_mut()) {
                port.connected = !port.connected;
            }
        }
        let g = GraphStore::from_document(doc).unwrap();
        assert!(g.check_integrity().is_ok());
    }

    #[test]
    fn test_from_json_reports_parse_errors() {
        assert!(matches!(GraphStore::from_json("{not json"), Err(GraphError::Json(_))));
    }

    #[test]
    fn test_clear() {
        let mut g = chain();
        g.clear();
        assert!(g.is_empty());
        assert_eq!(g.connection_count(), 0);
        assert!(g.check_integrity().is_ok());
    }

    // ========================================================================
    // check_integrity()
    // ========================================================================

    #[test]
    fn test_integrity_detects_stale_flag() {
        let mut g = chain();
        g.corrupt_port_flag_for_test(&id("c"), &PortId::from("out"));
        assert!(matches!(
            g.check_integrity(),
            Err(GraphError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_integrity_detects_connection_rule_violations() {
        let mut g = chain();
        g.attach_unchecked_for_test(Connection {
            id: ConnectionId::new("second-input"),
            source: id("c"),
            target: id("b"),
            source_port: Some(PortId::from("out")),
            target_port: Some(PortId::from("in")),
            label: None,
            style: None,
        });
        assert!(matches!(
            g.check_integrity(),
            Err(GraphError::IntegrityViolation(_))
        ));

        let mut g = chain();
        g.attach_unchecked_for_test(Connection {
            id: ConnectionId::new("backwards"),
            source: id("c"),
            target: id("a"),
            source_port: Some(PortId::from("in")),
            target_port: Some(PortId::from("out")),
            label: None,
            style: None,
        });
        assert!(matches!(
            g.check_integrity(),
            Err(GraphError::IntegrityViolation(_))
        ));
    }
}
