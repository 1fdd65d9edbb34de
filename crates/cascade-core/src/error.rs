//! Graph error types.
//!
//! Errors here cover graph assembly and validation only. Degradation during
//! a firing round is carried in [`crate::node::Status`] and never surfaces
//! as an `Err`.

use thiserror::Error;

use crate::node::NodeKind;

/// A specialized Result type for graph construction and validation.
pub type GraphResult<T> = Result<T, GraphError>;

/// Graph construction/configuration error type.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node type was registered twice under the same name.
    #[error("duplicate node type registered: {0}")]
    DuplicateType(String),

    /// A parameter bundle named a type the registry does not know.
    #[error("unknown node type [{name}] (available: {available})")]
    UnknownType {
        /// The requested type name.
        name: String,
        /// Comma-separated list of registered type names.
        available: String,
    },

    /// Deserialization produced a node of a different kind than requested.
    #[error("node {node} is a {actual} node where a {expected} node was requested")]
    WrongKind {
        /// Name of the produced node.
        node: String,
        /// The kind the caller asked for.
        expected: NodeKind,
        /// The kind that was actually produced.
        actual: NodeKind,
    },

    /// The dependency/trigger relation loops back on itself.
    #[error("dependency cycle through node {node}")]
    CyclicGraph {
        /// A node on the detected cycle.
        node: String,
    },

    /// An edge is present in one direction but not mirrored in the other.
    ///
    /// This should never fire from correct edge-mutation code; it guards
    /// against internal bugs.
    #[error("{relation} edge between {from} and {to} is not symmetric")]
    AsymmetricEdge {
        /// Which relation is broken ("parent/child" or "clock/callback").
        relation: &'static str,
        /// Name of the node holding the forward edge.
        from: String,
        /// Name of the node missing the mirror edge.
        to: String,
    },

    /// A value node does not have exactly one clock.
    #[error("value node {node} has {count} clocks, expected exactly one")]
    ClockCardinality {
        /// Name of the offending node.
        node: String,
        /// How many clocks it actually has.
        count: usize,
    },

    /// An attempt to rename a node that already carries a different name.
    #[error("node already named {existing}, refusing rename to {requested}")]
    NameConflict {
        /// The name the node already carries.
        existing: String,
        /// The rejected replacement.
        requested: String,
    },

    /// A required field is missing or malformed in a parameter bundle.
    #[error("missing or invalid \"{field}\" in node parameters")]
    MissingField {
        /// The field that was expected.
        field: &'static str,
    },

    /// A parameter bundle failed typed deserialization.
    #[error("invalid node parameters: {0}")]
    Params(#[from] serde_json::Error),
}
