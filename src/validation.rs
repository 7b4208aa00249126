//! Connection validation framework.
//!
//! Each rule is a [`ConnectionValidator`]; [`CompositeValidator`] chains them
//! and stops at the first rejection. The default chain checks, in order:
//!
//! 1. self-connection
//! 2. endpoint existence (nodes, then ports)
//! 3. port direction (output → input)
//! 4. data type compatibility
//! 5. duplicate connection
//! 6. input cardinality
//!
//! A missing port id refers to the node-level handle, which is untyped and
//! accepts any number of connections.

use crate::error::ConnectionRejected;
use crate::graph::GraphStore;
use crate::model::{NewConnection, NodeId, NodePort, PortId, PortKind};

/// Result of connection validation with optional rejection reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(ConnectionRejected),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results (AND logic): returns first error if any
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }

    pub fn into_result(self) -> Result<(), ConnectionRejected> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(reason) => Err(reason),
        }
    }

    pub fn rejection(&self) -> Option<&ConnectionRejected> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(reason) => Some(reason),
        }
    }
}

impl From<Result<(), ConnectionRejected>> for ValidationResult {
    fn from(result: Result<(), ConnectionRejected>) -> Self {
        match result {
            Ok(()) => ValidationResult::Valid,
            Err(reason) => ValidationResult::Invalid(reason),
        }
    }
}

/// The endpoints of a proposed connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionCandidate {
    pub source: NodeId,
    pub source_port: Option<PortId>,
    pub target: NodeId,
    pub target_port: Option<PortId>,
}

impl ConnectionCandidate {
    pub fn new(
        source: NodeId,
        source_port: Option<PortId>,
        target: NodeId,
        target_port: Option<PortId>,
    ) -> Self {
        Self {
            source,
            source_port,
            target,
            target_port,
        }
    }

    /// Swap the endpoints when the drag started from an input port.
    ///
    /// Only swaps when the source port is an input and the target port is
    /// not; anything else is left for the validator to judge.
    pub fn normalized(self, graph: &GraphStore) -> Self {
        let kind = |node: &NodeId, port: &Option<PortId>| -> Option<PortKind> {
            let port = port.as_ref()?;
            graph.get_node(node)?.port(port).map(|p| p.kind)
        };
        let source_kind = kind(&self.source, &self.source_port);
        let target_kind = kind(&self.target, &self.target_port);

        if source_kind == Some(PortKind::Input) && target_kind != Some(PortKind::Input) {
            Self {
                source: self.target,
                source_port: self.target_port,
                target: self.source,
                target_port: self.source_port,
            }
        } else {
            self
        }
    }
}

impl From<&NewConnection> for ConnectionCandidate {
    fn from(c: &NewConnection) -> Self {
        Self::new(
            c.source.clone(),
            c.source_port.clone(),
            c.target.clone(),
            c.target_port.clone(),
        )
    }
}

/// Trait for connection validation rules.
///
/// Implement this to add custom rules, and compose them with
/// [`CompositeValidator`].
///
/// # Example
///
/// ```ignore
/// struct NoTriggersAsTargets;
///
/// impl ConnectionValidator for NoTriggersAsTargets {
///     fn validate(&self, c: &ConnectionCandidate, graph: &GraphStore) -> ValidationResult {
///         match graph.get_node(&c.target) {
///             Some(n) if n.node_type == "trigger" => {
///                 ValidationResult::Invalid(ConnectionRejected::WrongPortKind)
///             }
///             _ => ValidationResult::Valid,
///         }
///     }
/// }
/// ```
pub trait ConnectionValidator {
    fn validate(&self, candidate: &ConnectionCandidate, graph: &GraphStore) -> ValidationResult;
}

impl<F> ConnectionValidator for F
where
    F: Fn(&ConnectionCandidate, &GraphStore) -> ValidationResult,
{
    fn validate(&self, candidate: &ConnectionCandidate, graph: &GraphStore) -> ValidationResult {
        self(candidate, graph)
    }
}

/// Look up the port a candidate endpoint refers to.
///
/// `Ok(None)` is the node-level handle.
fn resolve_port<'g>(
    graph: &'g GraphStore,
    node: &NodeId,
    port: Option<&PortId>,
) -> Result<Option<&'g NodePort>, ConnectionRejected> {
    let n = graph
        .get_node(node)
        .ok_or_else(|| ConnectionRejected::NodeNotFound(node.clone()))?;
    match port {
        None => Ok(None),
        Some(port) => n
            .port(port)
            .map(Some)
            .ok_or_else(|| ConnectionRejected::PortNotFound {
                node: node.clone(),
                port: port.clone(),
            }),
    }
}

/// Source must be an output and target an input. Node-level handles pass.
fn check_direction(
    source: Option<&NodePort>,
    target: Option<&NodePort>,
) -> Result<(), ConnectionRejected> {
    let source_ok = source.map_or(true, |p| p.kind == PortKind::Output);
    let target_ok = target.map_or(true, |p| p.kind == PortKind::Input);
    if source_ok && target_ok {
        Ok(())
    } else {
        Err(ConnectionRejected::WrongPortKind)
    }
}

fn check_types(
    source: Option<&NodePort>,
    target: Option<&NodePort>,
) -> Result<(), ConnectionRejected> {
    let (Some(source), Some(target)) = (source, target) else {
        return Ok(());
    };
    let (st, tt) = (source.effective_type(), target.effective_type());
    if st.is_compatible_with(&tt) {
        Ok(())
    } else {
        Err(ConnectionRejected::TypeMismatch {
            source_type: st.to_string(),
            target_type: tt.to_string(),
        })
    }
}

/// Direction and data type checks for a pair of resolved ports.
///
/// Used where the endpoints are not (yet) in a store, such as a document
/// being loaded or a node whose ports are being replaced.
pub fn check_port_pair(
    source: Option<&NodePort>,
    target: Option<&NodePort>,
) -> Result<(), ConnectionRejected> {
    check_direction(source, target)?;
    check_types(source, target)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SelfConnectionRule;

impl ConnectionValidator for SelfConnectionRule {
    fn validate(&self, c: &ConnectionCandidate, _graph: &GraphStore) -> ValidationResult {
        if c.source == c.target {
            ValidationResult::Invalid(ConnectionRejected::SelfConnection(c.source.clone()))
        } else {
            ValidationResult::Valid
        }
    }
}

/// Both nodes exist and every named port exists on its node.
#[derive(Clone, Copy, Debug, Default)]
pub struct EndpointsExistRule;

impl ConnectionValidator for EndpointsExistRule {
    fn validate(&self, c: &ConnectionCandidate, graph: &GraphStore) -> ValidationResult {
        let check = || -> Result<(), ConnectionRejected> {
            // Both nodes first, so a missing node is never reported as a missing port
            for node in [&c.source, &c.target] {
                if graph.get_node(node).is_none() {
                    return Err(ConnectionRejected::NodeNotFound(node.clone()));
                }
            }
            resolve_port(graph, &c.source, c.source_port.as_ref())?;
            resolve_port(graph, &c.target, c.target_port.as_ref())?;
            Ok(())
        };
        check().into()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PortDirectionRule;

impl ConnectionValidator for PortDirectionRule {
    fn validate(&self, c: &ConnectionCandidate, graph: &GraphStore) -> ValidationResult {
        let check = || -> Result<(), ConnectionRejected> {
            let source = resolve_port(graph, &c.source, c.source_port.as_ref())?;
            let target = resolve_port(graph, &c.target, c.target_port.as_ref())?;
            check_direction(source, target)
        };
        check().into()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DataTypeRule;

impl ConnectionValidator for DataTypeRule {
    fn validate(&self, c: &ConnectionCandidate, graph: &GraphStore) -> ValidationResult {
        let check = || -> Result<(), ConnectionRejected> {
            let source = resolve_port(graph, &c.source, c.source_port.as_ref())?;
            let target = resolve_port(graph, &c.target, c.target_port.as_ref())?;
            check_types(source, target)
        };
        check().into()
    }
}

/// Validator that prevents duplicate connections
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDuplicatesRule;

impl ConnectionValidator for NoDuplicatesRule {
    fn validate(&self, c: &ConnectionCandidate, graph: &GraphStore) -> ValidationResult {
        let exists = graph.connections_for_node(&c.source).any(|existing| {
            existing.source == c.source
                && existing.target == c.target
                && existing.source_port == c.source_port
                && existing.target_port == c.target_port
        });
        if exists {
            ValidationResult::Invalid(ConnectionRejected::DuplicateConnection)
        } else {
            ValidationResult::Valid
        }
    }
}

/// A single-valued input port accepts one incoming connection. The existing
/// connection is never replaced.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputCardinalityRule;

impl ConnectionValidator for InputCardinalityRule {
    fn validate(&self, c: &ConnectionCandidate, graph: &GraphStore) -> ValidationResult {
        let check = || -> Result<(), ConnectionRejected> {
            let Some(target) = resolve_port(graph, &c.target, c.target_port.as_ref())? else {
                return Ok(());
            };
            if target.multiple {
                return Ok(());
            }
            match graph
                .incoming_connections(&c.target, c.target_port.as_ref())
                .next()
            {
                Some(existing) => Err(ConnectionRejected::InputAlreadyConnected {
                    existing: existing.id.clone(),
                }),
                None => Ok(()),
            }
        };
        check().into()
    }
}

/// Composite validator that combines multiple validators
///
/// All validators must return Valid for the connection to be valid (AND
/// logic). Returns the first error encountered.
///
/// # Example
///
/// ```ignore
/// let validator = CompositeValidator::new()
///     .add(SelfConnectionRule)
///     .add(NoDuplicatesRule);
///
/// let result = validator.validate(&candidate, &graph);
/// ```
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn ConnectionValidator>>,
}

impl CompositeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validator to the composite
    ///
    /// Validators are checked in the order they were added.
    pub fn add<V: ConnectionValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl ConnectionValidator for CompositeValidator {
    fn validate(&self, candidate: &ConnectionCandidate, graph: &GraphStore) -> ValidationResult {
        for v in &self.validators {
            let result = v.validate(candidate, graph);
            if !result.is_valid() {
                return result;
            }
        }
        ValidationResult::Valid
    }
}

/// The standard rule chain used by [`GraphStore::new`].
pub fn default_validator() -> CompositeValidator {
    CompositeValidator::new()
        .add(SelfConnectionRule)
        .add(EndpointsExistRule)
        .add(PortDirectionRule)
        .add(DataTypeRule)
        .add(NoDuplicatesRule)
        .add(InputCardinalityRule)
}

/// Check whether a connection could be added, using the store's validator.
///
/// # Example
///
/// ```ignore
/// match can_connect(&a, Some(&out), &b, Some(&input), &graph) {
///     ValidationResult::Valid => { /* show the port as a valid drop target */ }
///     ValidationResult::Invalid(reason) => println!("{}", reason.code()),
/// }
/// ```
pub fn can_connect(
    source_node: &NodeId,
    source_port: Option<&PortId>,
    target_node: &NodeId,
    target_port: Option<&PortId>,
    graph: &GraphStore,
) -> ValidationResult {
    let candidate = ConnectionCandidate::new(
        source_node.clone(),
        source_port.cloned(),
        target_node.clone(),
        target_port.cloned(),
    );
    graph.validate(&candidate)
}
