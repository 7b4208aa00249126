use crate::model::{ConnectionId, NodeId, PortId};
use thiserror::Error;

/// Reasons a connection request was refused.
///
/// Never fatal: the store returns it and leaves the graph untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionRejected {
    #[error("cannot connect node {0} to itself")]
    SelfConnection(NodeId),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("port {port} not found on node {node}")]
    PortNotFound { node: NodeId, port: PortId },

    #[error("connections must run from an output port to an input port")]
    WrongPortKind,

    #[error("cannot connect {source_type} output to {target_type} input")]
    TypeMismatch {
        source_type: String,
        target_type: String,
    },

    #[error("an identical connection already exists")]
    DuplicateConnection,

    #[error("input port already connected by {existing}")]
    InputAlreadyConnected { existing: ConnectionId },
}

impl ConnectionRejected {
    /// Stable reason code, suitable for UI messages and telemetry.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SelfConnection(_) => "self-connection",
            Self::NodeNotFound(_) => "node-not-found",
            Self::PortNotFound { .. } => "port-not-found",
            Self::WrongPortKind => "wrong-port-kind",
            Self::TypeMismatch { .. } => "type-mismatch",
            Self::DuplicateConnection => "duplicate-connection",
            Self::InputAlreadyConnected { .. } => "input-already-connected",
        }
    }
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node id {0} already exists")]
    DuplicateNodeId(NodeId),

    #[error("connection id {0} already exists")]
    DuplicateConnectionId(ConnectionId),

    #[error("port id {port} appears twice on node {node}")]
    DuplicatePortId { node: NodeId, port: PortId },

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("connection {connection} references missing {what}")]
    DanglingConnection {
        connection: ConnectionId,
        what: String,
    },

    #[error("invalid node definition `{definition}`: {reason}")]
    InvalidDefinition { definition: String, reason: String },

    #[error("graph integrity violated: {0}")]
    IntegrityViolation(String),

    #[error("connection rejected: {0}")]
    Rejected(#[from] ConnectionRejected),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_codes() {
        assert_eq!(
            ConnectionRejected::SelfConnection(NodeId::new("a")).code(),
            "self-connection"
        );
        assert_eq!(ConnectionRejected::WrongPortKind.code(), "wrong-port-kind");
        assert_eq!(
            ConnectionRejected::InputAlreadyConnected {
                existing: ConnectionId::new("c1")
            }
            .code(),
            "input-already-connected"
        );
    }

    #[test]
    fn test_rejection_converts_into_graph_error() {
        let err: GraphError = ConnectionRejected::DuplicateConnection.into();
        assert!(matches!(err, GraphError::Rejected(ConnectionRejected::DuplicateConnection)));
        assert_eq!(
            err.to_string(),
            "connection rejected: an identical connection already exists"
        );
    }
}
