//! Node creation by type identifier.
//!
//! Hosting subsystems (built-in nodes, plugin formats, scripting) implement
//! [`NodeProvider`] and register with a [`NodeFactory`]. The graph asks the
//! factory for processors by type id and never names a concrete type.
//!
//! # Example
//!
//! ```rust
//! use trama_core::{NodeDescriptor, NodeFactory, NodeProvider, PortCount, Processor, ProcessBlock};
//!
//! struct Silence;
//!
//! impl Processor for Silence {
//!     fn name(&self) -> &str { "Silence" }
//!     fn ports(&self, _: f64, _: usize) -> PortCount { PortCount::new() }
//!     fn process(&mut self, _: &mut ProcessBlock<'_>) {}
//! }
//!
//! struct Provider;
//!
//! impl NodeProvider for Provider {
//!     fn format(&self) -> &str { "demo" }
//!     fn types(&self) -> Vec<NodeDescriptor> {
//!         vec![NodeDescriptor::new("silence", "Silence", "Utility", "demo")]
//!     }
//!     fn create(&self, type_id: &str) -> Option<Box<dyn Processor>> {
//!         (type_id == "silence").then(|| Box::new(Silence) as Box<dyn Processor>)
//!     }
//! }
//!
//! let mut factory = NodeFactory::new();
//! factory.register(Provider);
//! assert!(factory.instantiate("silence").is_some());
//! assert!(factory.instantiate("reverb").is_none());
//! ```

use super::processor::Processor;

/// Describes one creatable node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    /// Unique identifier (lowercase, no spaces).
    pub type_id: String,
    /// Human-readable name.
    pub name: String,
    /// Category for grouping in browsers.
    pub category: String,
    /// Format of the provider that creates it.
    pub format: String,
}

impl NodeDescriptor {
    /// Creates a descriptor.
    pub fn new(
        type_id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            name: name.into(),
            category: category.into(),
            format: format.into(),
        }
    }
}

/// A source of processors.
pub trait NodeProvider: Send + Sync {
    /// Format name, e.g. `"builtin"`.
    fn format(&self) -> &str;

    /// Types this provider can create.
    fn types(&self) -> Vec<NodeDescriptor>;

    /// Creates a processor, or `None` for an unknown type id.
    fn create(&self, type_id: &str) -> Option<Box<dyn Processor>>;
}

/// Registry of node providers, queried in registration order.
#[derive(Default)]
pub struct NodeFactory {
    providers: Vec<Box<dyn NodeProvider>>,
}

impl core::fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.format()))
            .finish()
    }
}

impl NodeFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider. Earlier providers win on type id clashes.
    pub fn register(&mut self, provider: impl NodeProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Registered format names.
    pub fn formats(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.format()).collect()
    }

    /// Every available type, deduplicated by type id.
    pub fn available_types(&self) -> Vec<NodeDescriptor> {
        let mut out: Vec<NodeDescriptor> = Vec::new();
        for provider in &self.providers {
            for desc in provider.types() {
                if !out.iter().any(|d| d.type_id == desc.type_id) {
                    out.push(desc);
                }
            }
        }
        out
    }

    /// Descriptor for a type id.
    pub fn describe(&self, type_id: &str) -> Option<NodeDescriptor> {
        self.providers
            .iter()
            .flat_map(|p| p.types())
            .find(|d| d.type_id == type_id)
    }

    /// Creates a processor from the first provider that knows `type_id`.
    pub fn instantiate(&self, type_id: &str) -> Option<Box<dyn Processor>> {
        self.providers.iter().find_map(|p| p.create(type_id))
    }
}
