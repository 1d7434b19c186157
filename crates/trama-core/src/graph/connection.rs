//! Port-to-port connections and the dependency table derived from them.
//!
//! The [`ArcTable`] is rebuilt from scratch whenever the connection set
//! changes. Lookups are binary searches over sorted vectors, so cycle checks
//! and plan building never touch a hash map.

use core::fmt;
use std::collections::BTreeSet;

use super::node::NodeId;

/// A directed connection from an output port to an input port.
///
/// Ordered by source node, then destination node, then source port, then
/// destination port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Node producing data.
    pub source: NodeId,
    /// Global port index on the source node (an output).
    pub source_port: u32,
    /// Node consuming data.
    pub dest: NodeId,
    /// Global port index on the destination node (an input).
    pub dest_port: u32,
}

impl Connection {
    /// Creates a connection.
    pub fn new(source: NodeId, source_port: u32, dest: NodeId, dest_port: u32) -> Self {
        Self {
            source,
            source_port,
            dest,
            dest_port,
        }
    }

    /// True if this connection touches `node` at either end.
    pub fn involves(&self, node: NodeId) -> bool {
        self.source == node || self.dest == node
    }

    fn key(&self) -> (NodeId, NodeId, u32, u32) {
        (self.source, self.dest, self.source_port, self.dest_port)
    }
}

impl PartialOrd for Connection {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Connection {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.source.0, self.source_port, self.dest.0, self.dest_port
        )
    }
}

/// For every node with inputs, the sorted set of nodes feeding it directly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArcTable {
    entries: Vec<(NodeId, Vec<NodeId>)>,
}

impl ArcTable {
    /// Builds the table from a connection set.
    pub fn build<'a>(connections: impl IntoIterator<Item = &'a Connection>) -> Self {
        let mut pairs: Vec<(NodeId, NodeId)> =
            connections.into_iter().map(|c| (c.dest, c.source)).collect();
        pairs.sort_unstable();
        pairs.dedup();

        let mut entries: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        for (dest, source) in pairs {
            match entries.last_mut() {
                Some((d, sources)) if *d == dest => sources.push(source),
                _ => entries.push((dest, vec![source])),
            }
        }
        Self { entries }
    }

    /// Number of nodes with at least one source.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no node has a source.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted direct sources of `dest`; empty if none.
    pub fn direct_sources(&self, dest: NodeId) -> &[NodeId] {
        self.entries
            .binary_search_by_key(&dest, |(d, _)| *d)
            .map_or(&[], |i| self.entries[i].1.as_slice())
    }

    /// Entries in destination order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[NodeId])> {
        self.entries.iter().map(|(d, s)| (*d, s.as_slice()))
    }

    /// True if `source` feeds `dest` directly or through any chain of nodes.
    ///
    /// Walks upstream from `dest`, visiting each node once.
    pub fn is_an_input_to(&self, source: NodeId, dest: NodeId) -> bool {
        let mut visited = BTreeSet::new();
        let mut pending = vec![dest];
        while let Some(node) = pending.pop() {
            let sources = self.direct_sources(node);
            if sources.binary_search(&source).is_ok() {
                return true;
            }
            pending.extend(sources.iter().copied().filter(|&s| visited.insert(s)));
        }
        false
    }
}
