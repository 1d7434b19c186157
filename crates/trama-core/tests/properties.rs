//! Property-based tests for trama-core graph invariants.
//!
//! Random connection sequences must never produce a cycle, render order must
//! respect every connection and be reproducible, and port lists must be
//! deterministic for any tally.

use proptest::prelude::*;
use trama_core::{
    GraphError, GraphProcessor, GraphSettings, NodeId, PortCount, PortType, ProcessBlock,
    Processor,
};

/// One audio input and one audio output: port 0 in, port 1 out.
struct Wire;

impl Processor for Wire {
    fn name(&self) -> &str {
        "Wire"
    }

    fn ports(&self, _: f64, _: usize) -> PortCount {
        PortCount::new().with(PortType::Audio, 1, 1)
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        block.pass_through(0);
    }
}

fn build(node_count: usize, attempts: &[(usize, usize)]) -> (GraphProcessor, Vec<NodeId>) {
    let (mut graph, _renderer) = GraphProcessor::new(GraphSettings::default());
    let ids: Vec<NodeId> = (0..node_count)
        .map(|_| graph.add_node(Box::new(Wire)))
        .collect();
    for &(s, d) in attempts {
        let _ = graph.add_connection(ids[s % node_count], 1, ids[d % node_count], 0);
    }
    (graph, ids)
}

/// True if `from` reaches `to` by following connections forward.
fn reaches(graph: &GraphProcessor, from: NodeId, to: NodeId) -> bool {
    let mut stack = vec![from];
    let mut seen = Vec::new();
    while let Some(n) = stack.pop() {
        for c in graph.connections().filter(|c| c.source == n) {
            if c.dest == to {
                return true;
            }
            if !seen.contains(&c.dest) {
                seen.push(c.dest);
                stack.push(c.dest);
            }
        }
    }
    false
}

fn attempts() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..12, 0usize..12), 0..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// No sequence of accepted connections closes a cycle.
    #[test]
    fn connections_stay_acyclic(n in 2usize..12, tries in attempts()) {
        let (graph, ids) = build(n, &tries);
        for &id in &ids {
            prop_assert!(!reaches(&graph, id, id), "{id} reaches itself");
        }
    }

    /// A rejected cycle leaves the arc table and generation untouched.
    #[test]
    fn cycle_rejection_does_not_mutate(n in 2usize..12, tries in attempts()) {
        let (mut graph, ids) = build(n, &tries);
        let table = graph.topology().arc_table().clone();
        let generation = graph.generation();
        for &a in &ids {
            for &b in &ids {
                if a != b && reaches(&graph, a, b) {
                    let result = graph.add_connection(b, 1, a, 0);
                    prop_assert!(matches!(result, Err(GraphError::CycleDetected(_))));
                }
            }
        }
        let topology = graph.topology();
        prop_assert_eq!(topology.arc_table(), &table);
        prop_assert_eq!(graph.generation(), generation);
    }

    /// Every connection's source renders before its destination.
    #[test]
    fn render_order_respects_connections(n in 2usize..12, tries in attempts()) {
        let (graph, ids) = build(n, &tries);
        let order = graph.render_order();
        prop_assert_eq!(order.len(), ids.len());
        let position = |id: NodeId| order.iter().position(|&n| n == id);
        for c in graph.connections() {
            prop_assert!(position(c.source) < position(c.dest), "{c} out of order");
        }
    }

    /// The same topology always yields the same order.
    #[test]
    fn render_order_is_reproducible(n in 2usize..12, tries in attempts()) {
        let (first, _) = build(n, &tries);
        let (second, _) = build(n, &tries);
        prop_assert_eq!(first.render_order(), second.render_order());
        let (mut third, _) = build(n, &tries);
        let replay: Vec<_> = third.connections().copied().collect();
        for c in &replay {
            third.remove_connection(c.source, c.source_port, c.dest, c.dest_port);
        }
        for c in replay.iter().rev() {
            third.add_connection(c.source, c.source_port, c.dest, c.dest_port).unwrap();
        }
        prop_assert_eq!(first.render_order(), third.render_order());
    }

    /// Port lists are ordered by type, inputs before outputs, with contiguous channels.
    #[test]
    fn port_list_is_deterministic(counts in prop::array::uniform8(0u32..4)) {
        let mut tally = PortCount::new();
        for (i, port_type) in PortType::ALL.iter().enumerate() {
            tally.set(*port_type, counts[i * 2], true);
            tally.set(*port_type, counts[i * 2 + 1], false);
        }
        let list = tally.to_port_list();
        prop_assert_eq!(&list, &tally.to_port_list());
        prop_assert_eq!(list.len() as u32, tally.total());

        let mut last_key = None;
        for (i, port) in list.iter().enumerate() {
            prop_assert_eq!(port.index as usize, i);
            let key = (port.port_type.id(), !port.is_input, port.channel);
            prop_assert!(last_key.is_none_or(|k| k < key));
            last_key = Some(key);
        }
        prop_assert_eq!(list.port_count(), tally);
    }
}

#[test]
fn stereo_audio_port_symbols() {
    let list = PortCount::new().with(PortType::Audio, 2, 2).to_port_list();
    let symbols: Vec<_> = list.iter().map(|p| p.symbol.as_str()).collect();
    assert_eq!(symbols, ["audio_in_1", "audio_in_2", "audio_out_1", "audio_out_2"]);
    let names: Vec<_> = list.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Audio In 1", "Audio In 2", "Audio Out 1", "Audio Out 2"]);
}
