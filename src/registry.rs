//! Published component definitions.
//!
//! A [`ComponentDefinition`] is the immutable snapshot produced by folding a
//! group: its boundary port interface, the deep-copied internal subgraph,
//! and the bindings that map each boundary port back to the internal
//! endpoint it stands for. Definitions live in a [`ComponentRegistry`] owned
//! by the application context and passed by reference into the compiler and
//! expander — there is no module-level singleton. Entries are write-once;
//! expansion clones what it needs and never mutates a published definition.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Connection, Node, Port, Position};

/// Maps a synthesized boundary port back to the internal endpoint it
/// represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortBinding {
    pub component_port_id: String,
    pub node_id: String,
    pub port_id: String,
}

/// Immutable snapshot of an extracted subgraph plus its boundary interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinition {
    pub id: String,
    pub name: String,
    pub input_ports: Vec<Port>,
    pub output_ports: Vec<Port>,
    /// Deep copy of the folded nodes, positions as captured.
    pub internal_nodes: Vec<Node>,
    /// Internal wiring, connection ids unchanged from capture time.
    pub internal_connections: Vec<Connection>,
    pub input_bindings: Vec<PortBinding>,
    pub output_bindings: Vec<PortBinding>,
    /// The folded group's position; expansion places nodes relative to it.
    pub origin: Position,
}

impl ComponentDefinition {
    /// Binding behind a component input port.
    pub fn input_binding(&self, component_port_id: &str) -> Option<&PortBinding> {
        self.input_bindings
            .iter()
            .find(|b| b.component_port_id == component_port_id)
    }

    /// Binding behind a component output port.
    pub fn output_binding(&self, component_port_id: &str) -> Option<&PortBinding> {
        self.output_bindings
            .iter()
            .find(|b| b.component_port_id == component_port_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("component definition `{0}` is already published")]
    AlreadyPublished(String),
}

/// Session-lifetime collection of published definitions.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    definitions: IndexMap<String, ComponentDefinition>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn definition(&self, id: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(id)
    }

    /// Published ids in publication order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Publish a definition. Ids are write-once: re-publishing is rejected
    /// rather than silently replacing a snapshot other instances refer to.
    pub fn publish(&mut self, definition: ComponentDefinition) -> Result<(), RegistryError> {
        if self.definitions.contains_key(&definition.id) {
            return Err(RegistryError::AlreadyPublished(definition.id));
        }
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Walk definition references from the given roots and report the first
    /// definition revisited along a single path.
    ///
    /// A component instance among a definition's internal nodes references
    /// another definition; a cycle in that reference graph would make
    /// expansion non-terminating, so the compiler refuses to fold a group
    /// whose member instances reach one.
    pub fn find_recursion<'a, I>(&self, roots: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        for root in roots {
            if let Some(hit) = self.walk(root, &mut visited, &mut path) {
                return Some(hit);
            }
        }
        None
    }

    fn walk(
        &self,
        id: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<String> {
        if path.iter().any(|p| p == id) {
            return Some(id.to_string());
        }
        if !visited.insert(id.to_string()) {
            return None;
        }
        let definition = self.definitions.get(id)?;
        path.push(id.to_string());
        for node in &definition.internal_nodes {
            if let Some(child) = &node.data.component_id {
                if let Some(hit) = self.walk(child, visited, path) {
                    path.pop();
                    return Some(hit);
                }
            }
        }
        path.pop();
        None
    }
}
