//! Fabric endpoints.

use crate::link::Link;
use crate::packet::Packet;
use pbft_types::NodeId;
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Shared handle to a node. The simulator owns these; links and protocol
/// code hold only weak references.
pub type NodeHandle<M> = Rc<RefCell<Node<M>>>;

/// Weak handle to a node, as held by links and protocol code.
pub type WeakNodeHandle<M> = Weak<RefCell<Node<M>>>;

/// Per-tick logic attached to a [`Node`].
///
/// Implementations receive the node's drained inbox and may send through
/// the node freely. The behavior is detached from the node for the
/// duration of the call, so a nested `on_tick` on the same node is a
/// no-op rather than a re-entrant invocation.
pub trait Behavior<M>: Any {
    /// Process one tick's worth of inbox traffic.
    fn on_tick(&mut self, node: &mut Node<M>, inbox: Vec<(NodeId, M)>);

    /// Upcast for inspection by hosts and tests.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast, for host wiring done after node construction.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A fabric endpoint: stable identity, an inbox of delivered messages, and
/// a registry of links to peers.
///
/// Nodes never own their peers or their links. The link registry maps peer
/// identity to a weak link reference; a `BTreeMap` keeps its iteration
/// order (and therefore broadcast order) deterministic.
pub struct Node<M> {
    id: NodeId,
    inbox: Vec<(NodeId, M)>,
    links: BTreeMap<NodeId, Weak<RefCell<Link<M>>>>,
    behavior: Option<Box<dyn Behavior<M>>>,
}

impl<M: 'static> Node<M> {
    /// Create a node with no per-tick logic. Useful as a bare endpoint in
    /// fabric tests; `on_tick` does nothing and the inbox accumulates.
    pub fn new(id: NodeId) -> NodeHandle<M> {
        Rc::new(RefCell::new(Self {
            id,
            inbox: Vec::new(),
            links: BTreeMap::new(),
            behavior: None,
        }))
    }

    /// Create a node driven by `behavior`.
    pub fn with_behavior(id: NodeId, behavior: Box<dyn Behavior<M>>) -> NodeHandle<M> {
        Rc::new(RefCell::new(Self {
            id,
            inbox: Vec::new(),
            links: BTreeMap::new(),
            behavior: Some(behavior),
        }))
    }

    /// This node's stable identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Whether a link to `peer` is registered.
    pub fn has_link(&self, peer: NodeId) -> bool {
        self.links.contains_key(&peer)
    }

    /// Identities of all currently linked peers, in identifier order.
    pub fn peers(&self) -> Vec<NodeId> {
        self.links.keys().copied().collect()
    }

    /// Messages delivered since the last [`Node::take_inbox`], in arrival
    /// order, each tagged with its sender.
    pub fn inbox(&self) -> &[(NodeId, M)] {
        &self.inbox
    }

    /// Remove and return every queued inbox message.
    pub fn take_inbox(&mut self) -> Vec<(NodeId, M)> {
        std::mem::take(&mut self.inbox)
    }

    /// Enqueue a packet toward `peer` on the shared link.
    ///
    /// Returns `false` when no link to `peer` exists or the peer has been
    /// destroyed; the packet is dropped silently in the latter case.
    pub fn send_to(&self, peer: NodeId, packet: Packet<M>) -> bool {
        let Some(link) = self.links.get(&peer).and_then(Weak::upgrade) else {
            trace!(from = %self.id, to = %peer, "send with no link");
            return false;
        };
        let sent = link.borrow_mut().send(peer, packet);
        if !sent {
            trace!(from = %self.id, to = %peer, "send to destroyed peer dropped");
        }
        sent
    }

    /// Send a clone of `packet` to every currently linked peer, in
    /// identifier order. Contents and latency are identical across copies;
    /// per-peer delivery failures are not reported.
    pub fn broadcast(&self, packet: &Packet<M>)
    where
        M: Clone,
    {
        for (peer, link) in &self.links {
            if let Some(link) = link.upgrade() {
                link.borrow_mut().send(*peer, packet.clone());
            }
        }
    }

    /// Run one tick of the attached behavior over the drained inbox.
    pub fn on_tick(&mut self) {
        let Some(mut behavior) = self.behavior.take() else {
            return;
        };
        let inbox = self.take_inbox();
        behavior.on_tick(self, inbox);
        self.behavior = Some(behavior);
    }

    /// The attached behavior, for host inspection.
    pub fn behavior(&self) -> Option<&dyn Behavior<M>> {
        self.behavior.as_deref()
    }

    /// The attached behavior, mutably.
    pub fn behavior_mut(&mut self) -> Option<&mut dyn Behavior<M>> {
        self.behavior.as_deref_mut()
    }

    pub(crate) fn register_link(&mut self, peer: NodeId, link: Weak<RefCell<Link<M>>>) {
        let previous = self.links.insert(peer, link);
        debug_assert!(previous.is_none(), "duplicate link to {peer}");
    }

    pub(crate) fn unregister_link(&mut self, peer: NodeId) {
        self.links.remove(&peer);
    }

    pub(crate) fn deposit(&mut self, sender: NodeId, payload: M) {
        debug_assert!(self.has_link(sender), "delivery without a link");
        self.inbox.push((sender, payload));
    }
}
