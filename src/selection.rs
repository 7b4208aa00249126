use crate::graph::GraphStore;
use crate::model::{ConnectionId, NodeId};
use slint::{Model, SharedString, VecModel};
use std::collections::HashSet;

/// Selection state of the canvas.
///
/// Holds the set of selected nodes, the most recently focused node (the one
/// detail panels show) and at most one selected connection. Selecting nodes
/// clears the connection selection and vice versa.
#[derive(Debug, Default, Clone)]
pub struct SelectionManager {
    selected: HashSet<NodeId>,
    focused: Option<NodeId>,
    connection: Option<ConnectionId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a click on a node based on interaction modifiers
    ///
    /// With `toggle` the node is added to or removed from the selection;
    /// without it the selection collapses to this node.
    pub fn handle_interaction(&mut self, id: &NodeId, toggle: bool) {
        self.connection = None;
        if toggle {
            if self.selected.remove(id) {
                if self.focused.as_ref() == Some(id) {
                    self.focused = None;
                }
            } else {
                self.selected.insert(id.clone());
                self.focused = Some(id.clone());
            }
        } else {
            self.select_only(id);
        }
    }

    /// Collapse the selection to a single node.
    pub fn select_only(&mut self, id: &NodeId) {
        self.connection = None;
        if !(self.selected.len() == 1 && self.selected.contains(id)) {
            self.selected.clear();
            self.selected.insert(id.clone());
        }
        self.focused = Some(id.clone());
    }

    /// Select a connection, dropping any node selection.
    pub fn select_connection(&mut self, id: &ConnectionId) {
        self.selected.clear();
        self.focused = None;
        self.connection = Some(id.clone());
    }

    /// Clear the current selection (nodes and connection)
    pub fn clear(&mut self) {
        self.selected.clear();
        self.focused = None;
        self.connection = None;
    }

    /// Replace the current selection with a new set of IDs
    ///
    /// Used by marquee selection
    pub fn replace_selection<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.selected.clear();
        self.extend(ids);
        if self.focused.as_ref().is_some_and(|f| !self.selected.contains(f)) {
            self.focused = None;
        }
    }

    /// Add IDs to the selection (additive marquee, select all)
    pub fn extend<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.connection = None;
        self.selected.extend(ids);
    }

    /// Forget nodes and connections that no longer exist in the graph.
    pub fn retain_existing(&mut self, graph: &GraphStore) {
        self.selected.retain(|id| graph.contains_node(id));
        if self.focused.as_ref().is_some_and(|id| !graph.contains_node(id)) {
            self.focused = None;
        }
        if self
            .connection
            .as_ref()
            .is_some_and(|id| graph.get_connection(id).is_none())
        {
            self.connection = None;
        }
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.selected.contains(id)
    }

    pub fn iter(&self) -> std::collections::hash_set::Iter<'_, NodeId> {
        self.selected.iter()
    }

    /// Selected ids in a stable order.
    pub fn sorted_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.selected.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// The most recently focused node.
    pub fn selected_node(&self) -> Option<&NodeId> {
        self.focused.as_ref()
    }

    pub fn selected_connection(&self) -> Option<&ConnectionId> {
        self.connection.as_ref()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// True when neither nodes nor a connection are selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.connection.is_none()
    }

    /// Sync the selected node ids to a Slint VecModel
    pub fn sync_to_model(&self, model: &VecModel<SharedString>) {
        let ids = self.sorted_ids();
        for (i, id) in ids.iter().enumerate() {
            let item = SharedString::from(id.as_str());
            if i < model.row_count() {
                model.set_row_data(i, item);
            } else {
                model.push(item);
            }
        }
        while model.row_count() > ids.len() {
            model.remove(model.row_count() - 1);
        }
    }
}
