//! Node type registry for reconstructing graphs from serialized
//! configuration.
//!
//! The registry is an explicit object constructed once at process start and
//! passed by reference wherever registration or lookup is needed; there is
//! no process-wide table. Builders receive the registry back so each node
//! type can recursively deserialize its own dependencies bottom-up before
//! returning.
//!
//! A parameter bundle is a JSON object carrying a `"type"` field naming a
//! registered node type; the remaining fields are type-specific constructor
//! arguments.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::node::{NodeId, NodeKind};

/// Parameter bundle for node deserialization.
pub type Params = serde_json::Value;

/// Constructor closure reconstructing one node type from parameters.
pub struct NodeBuilder(
    Box<dyn Fn(&mut Graph, &NodeRegistry, &Params) -> GraphResult<NodeId> + Send + Sync>,
);

impl NodeBuilder {
    fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Graph, &NodeRegistry, &Params) -> GraphResult<NodeId> + Send + Sync + 'static,
    {
        NodeBuilder(Box::new(f))
    }

    fn call(&self, graph: &mut Graph, reg: &NodeRegistry, params: &Params) -> GraphResult<NodeId> {
        (self.0)(graph, reg, params)
    }
}

impl fmt::Debug for NodeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodeBuilder(..)")
    }
}

/// Mapping from type name to constructor closure.
#[derive(Default)]
pub struct NodeRegistry {
    builders: BTreeMap<String, NodeBuilder>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type under `name`.
    ///
    /// Registering the same name twice is a configuration error.
    pub fn register<F>(&mut self, name: impl Into<String>, builder: F) -> GraphResult<()>
    where
        F: Fn(&mut Graph, &NodeRegistry, &Params) -> GraphResult<NodeId> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.builders.contains_key(&name) {
            return Err(GraphError::DuplicateType(name));
        }
        self.builders.insert(name, NodeBuilder::new(builder));
        Ok(())
    }

    /// Look up the constructor for `name`.
    pub fn find(&self, name: &str) -> GraphResult<&NodeBuilder> {
        self.builders.get(name).ok_or_else(|| GraphError::UnknownType {
            name: name.to_string(),
            available: self.names().collect::<Vec<_>>().join(", "),
        })
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    /// Reconstruct the node described by `params` inside `graph`.
    ///
    /// Reads the `"type"` field and invokes the registered constructor.
    /// Construction is memoized through [`Graph::add`] inside the builders,
    /// so repeated references to the same subtree share one instance.
    pub fn deserialize(&self, graph: &mut Graph, params: &Params) -> GraphResult<NodeId> {
        let type_name = params
            .get("type")
            .and_then(Params::as_str)
            .ok_or(GraphError::MissingField { field: "type" })?;
        debug!(type_name, "deserializing node");
        let builder = self.find(type_name)?;
        let id = builder.call(graph, self, params)?;
        debug!(type_name, node = %graph.node(id).display_name(), "deserialized node");
        Ok(id)
    }

    /// Like [`NodeRegistry::deserialize`], failing unless the produced node
    /// is of the expected kind.
    pub fn deserialize_expecting(
        &self,
        graph: &mut Graph,
        params: &Params,
        expected: NodeKind,
    ) -> GraphResult<NodeId> {
        let id = self.deserialize(graph, params)?;
        let actual = graph.node(id).kind();
        if actual != expected {
            return Err(GraphError::WrongKind {
                node: graph.node(id).display_name(),
                expected,
                actual,
            });
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source_builder(graph: &mut Graph, _reg: &NodeRegistry, _p: &Params) -> GraphResult<NodeId> {
        Ok(graph.new_source("TestSource"))
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut reg = NodeRegistry::new();
        reg.register("TestSource", source_builder).unwrap();
        assert!(matches!(
            reg.register("TestSource", source_builder),
            Err(GraphError::DuplicateType(name)) if name == "TestSource"
        ));
    }

    #[test]
    fn test_unknown_type_lists_available() {
        let mut reg = NodeRegistry::new();
        reg.register("Alpha", source_builder).unwrap();
        reg.register("Beta", source_builder).unwrap();

        let err = reg.find("Gamma").unwrap_err();
        match err {
            GraphError::UnknownType { name, available } => {
                assert_eq!(name, "Gamma");
                assert_eq!(available, "Alpha, Beta");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deserialize_checks_kind() {
        let mut reg = NodeRegistry::new();
        reg.register("TestSource", source_builder).unwrap();

        let mut g = Graph::new();
        let params = json!({ "type": "TestSource" });
        let id = reg
            .deserialize_expecting(&mut g, &params, NodeKind::Source)
            .unwrap();
        assert_eq!(g.node(id).kind(), NodeKind::Source);

        assert!(matches!(
            reg.deserialize_expecting(&mut g, &params, NodeKind::Value),
            Err(GraphError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_missing_type_field() {
        let reg = NodeRegistry::new();
        let mut g = Graph::new();
        assert!(matches!(
            reg.deserialize(&mut g, &json!({ "half_life": 16 })),
            Err(GraphError::MissingField { field: "type" })
        ));
    }
}
