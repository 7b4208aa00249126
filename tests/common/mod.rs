//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use std::cell::RefCell;
use std::rc::Rc;
use workflow_canvas::{ConnectionId, EditorActions, NodeId};

/// Records calls the editor makes into its host.
///
/// Cloning shares the recorded data, so one clone can be handed to the
/// editor while the test keeps the other.
#[derive(Default, Clone)]
pub struct ActionTracker {
    pub node_editor_opened: Rc<RefCell<Vec<NodeId>>>,
    pub node_panel_opened: Rc<RefCell<Vec<ConnectionId>>>,
    pub label_edits: Rc<RefCell<Vec<ConnectionId>>>,
}

impl ActionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all recorded calls.
    pub fn clear(&self) {
        self.node_editor_opened.borrow_mut().clear();
        self.node_panel_opened.borrow_mut().clear();
        self.label_edits.borrow_mut().clear();
    }
}

impl EditorActions for ActionTracker {
    fn open_node_editor(&self, node: &NodeId) {
        self.node_editor_opened.borrow_mut().push(node.clone());
    }

    fn open_node_panel_for_connection(&self, connection: &ConnectionId) {
        self.node_panel_opened.borrow_mut().push(connection.clone());
    }

    fn edit_connection_label(&self, connection: &ConnectionId) {
        self.label_edits.borrow_mut().push(connection.clone());
    }
}

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
