//! Node kind classification.
//!
//! The engine is generic over the application's node palette. It only needs
//! to answer three questions about a kind: does it grow input slots on
//! demand, which side of a component interface does it represent during
//! extraction, and how big is it by default. Applications implement
//! [`NodeCatalog`] for custom palettes; [`BasicNodeCatalog`] covers the
//! built-in editor kinds.

use crate::model::{PortRole, Size};

/// Well-known node type tags used by the built-in catalog.
pub mod kinds {
    /// Container referencing member node ids; the unit of extraction.
    pub const GROUP: &str = "group";
    /// Opaque instance standing in for a component definition.
    pub const COMPONENT: &str = "component";
    /// Source-like boundary node: feeds values into a group from outside.
    pub const INPUT: &str = "input";
    /// Sink-like boundary node: exposes values produced inside a group.
    pub const OUTPUT: &str = "output";
    /// Elastic-arity combiner: accepts unbounded inputs.
    pub const MERGE: &str = "merge";
}

/// Classification hooks for application node types.
///
/// # Example
///
/// ```ignore
/// struct ShaderCatalog;
///
/// impl NodeCatalog for ShaderCatalog {
///     fn is_elastic(&self, kind: &str) -> bool {
///         kind == "mix-many"
///     }
///     fn boundary_role(&self, kind: &str) -> Option<PortRole> {
///         match kind {
///             "uniform" => Some(PortRole::Input),
///             "fragment-out" => Some(PortRole::Output),
///             _ => None,
///         }
///     }
///     fn default_size(&self, _kind: &str) -> Size {
///         Size::new(200.0, 120.0)
///     }
/// }
/// ```
pub trait NodeCatalog {
    /// Whether the kind accepts unbounded inputs. After a connection lands
    /// on such a node, the router appends a fresh input slot so the next
    /// connection has somewhere to go.
    fn is_elastic(&self, kind: &str) -> bool;

    /// Which side of a component interface the kind represents when its
    /// group is extracted.
    ///
    /// `Some(Input)` marks a source-like kind: each of its declared output
    /// sockets becomes a candidate component *input* port. `Some(Output)`
    /// marks a sink-like kind: each declared input socket becomes a
    /// candidate component *output* port. `None` means the kind contributes
    /// no boundary ports of its own.
    fn boundary_role(&self, kind: &str) -> Option<PortRole>;

    /// Fallback dimensions for a node that carries no explicit size.
    /// Used when computing group bounds.
    fn default_size(&self, kind: &str) -> Size;

    /// Whether the kind is the group container. Overridable for palettes
    /// that rename the built-in tags.
    fn is_group(&self, kind: &str) -> bool {
        kind == kinds::GROUP
    }

    /// Whether the kind is a component instance.
    fn is_component(&self, kind: &str) -> bool {
        kind == kinds::COMPONENT
    }
}

/// Catalog for the built-in editor palette.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicNodeCatalog;

impl NodeCatalog for BasicNodeCatalog {
    fn is_elastic(&self, kind: &str) -> bool {
        kind == kinds::MERGE
    }

    fn boundary_role(&self, kind: &str) -> Option<PortRole> {
        match kind {
            kinds::INPUT => Some(PortRole::Input),
            kinds::OUTPUT => Some(PortRole::Output),
            _ => None,
        }
    }

    fn default_size(&self, kind: &str) -> Size {
        match kind {
            kinds::GROUP => Size::new(320.0, 220.0),
            kinds::COMPONENT => Size::new(180.0, 120.0),
            kinds::INPUT | kinds::OUTPUT => Size::new(140.0, 64.0),
            _ => Size::new(180.0, 100.0),
        }
    }
}
