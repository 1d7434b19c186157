//! Change notifications emitted by a graph on the control thread.

use super::connection::Connection;
use super::node::NodeId;

/// Something changed in a graph.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
    /// A node was added.
    NodeAdded(NodeId),
    /// A node was removed, along with its connections.
    NodeRemoved(NodeId),
    /// A connection was added.
    ConnectionAdded(Connection),
    /// A connection was removed.
    ConnectionRemoved(Connection),
    /// A new topology generation was published.
    TopologyChanged {
        /// Generation number of the new topology.
        generation: u64,
    },
    /// A node was prepared for rendering.
    NodePrepared(NodeId),
    /// A node failed to prepare and will render silence.
    PrepareFailed {
        /// The node.
        node: NodeId,
        /// Why it failed.
        reason: String,
    },
    /// The graph released its resources and stopped rendering.
    Released,
}

/// Handle returned by [`EventQueue::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&GraphEvent) + Send>;

/// Pending events plus the listeners they are dispatched to.
#[derive(Default)]
pub(crate) struct EventQueue {
    pending: Vec<GraphEvent>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl EventQueue {
    pub(crate) fn push(&mut self, event: GraphEvent) {
        self.pending.push(event);
    }

    pub(crate) fn take(&mut self) -> Vec<GraphEvent> {
        core::mem::take(&mut self.pending)
    }

    pub(crate) fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Delivers and clears pending events. Returns how many were delivered.
    pub(crate) fn dispatch(&mut self) -> usize {
        let events = core::mem::take(&mut self.pending);
        for event in &events {
            for (_, listener) in &mut self.listeners {
                listener(event);
            }
        }
        events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatch_reaches_every_listener_once() {
        let mut queue = EventQueue::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let a = queue.subscribe(Box::new(move |_| {
            h.fetch_add(1, Ordering::Relaxed);
        }));
        let h = Arc::clone(&hits);
        queue.subscribe(Box::new(move |_| {
            h.fetch_add(10, Ordering::Relaxed);
        }));

        queue.push(GraphEvent::NodeAdded(NodeId(1)));
        queue.push(GraphEvent::Released);
        assert_eq!(queue.dispatch(), 2);
        assert_eq!(hits.load(Ordering::Relaxed), 22);
        assert_eq!(queue.dispatch(), 0);

        assert!(queue.unsubscribe(a));
        assert!(!queue.unsubscribe(a));
        queue.push(GraphEvent::Released);
        queue.dispatch();
        assert_eq!(hits.load(Ordering::Relaxed), 32);
    }

    #[test]
    fn take_drains_without_dispatch() {
        let mut queue = EventQueue::default();
        queue.push(GraphEvent::TopologyChanged { generation: 3 });
        assert_eq!(queue.take(), [GraphEvent::TopologyChanged { generation: 3 }]);
        assert!(queue.take().is_empty());
    }
}
