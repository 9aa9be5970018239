//! Point-to-point links.

use crate::node::{Node, NodeHandle};
use crate::packet::Packet;
use pbft_types::NodeId;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Errors surfaced when wiring a link. These are configuration errors:
/// callers are expected to enforce the preconditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// Both ends of the proposed link are the same node.
    #[error("link endpoints must be distinct (got {0} twice)")]
    IdenticalEndpoints(NodeId),

    /// The two nodes are already connected.
    #[error("{0} and {1} are already linked")]
    AlreadyLinked(NodeId, NodeId),
}

/// One endpoint's view of a link: the endpoint's identity, a weak
/// back-reference to it, and the queue of packets in flight *toward* it.
struct Mailbox<M> {
    node_id: NodeId,
    node: Weak<RefCell<Node<M>>>,
    queue: VecDeque<Packet<M>>,
}

impl<M: 'static> Mailbox<M> {
    fn new(node: &NodeHandle<M>) -> Self {
        Self {
            node_id: node.borrow().id(),
            node: Rc::downgrade(node),
            queue: VecDeque::new(),
        }
    }
}

/// A bidirectional, in-order channel between exactly two nodes.
///
/// Shared by its two endpoints through weak references; the owning
/// [`LinkHandle`] is held by whoever created the link. Registration in the
/// endpoints' link tables is symmetric on construction and teardown.
pub struct Link<M> {
    first: Mailbox<M>,
    second: Mailbox<M>,
}

impl<M: 'static> Link<M> {
    /// Connect two live nodes.
    ///
    /// Fails if the endpoints are the same node or already linked (in
    /// either direction). On success the link is registered in both
    /// nodes' link tables.
    pub fn connect(a: &NodeHandle<M>, b: &NodeHandle<M>) -> Result<LinkHandle<M>, LinkError> {
        let (a_id, b_id) = (a.borrow().id(), b.borrow().id());
        if Rc::ptr_eq(a, b) || a_id == b_id {
            return Err(LinkError::IdenticalEndpoints(a_id));
        }
        if a.borrow().has_link(b_id) || b.borrow().has_link(a_id) {
            return Err(LinkError::AlreadyLinked(a_id, b_id));
        }

        let link = Rc::new(RefCell::new(Link {
            first: Mailbox::new(a),
            second: Mailbox::new(b),
        }));
        a.borrow_mut().register_link(b_id, Rc::downgrade(&link));
        b.borrow_mut().register_link(a_id, Rc::downgrade(&link));
        trace!(a = %a_id, b = %b_id, "link established");
        Ok(LinkHandle { link })
    }

    /// Queue a packet toward `dst`. Returns `false`, dropping the packet,
    /// when the destination endpoint has been destroyed. This is the only
    /// loss model in the fabric.
    pub(crate) fn send(&mut self, dst: NodeId, packet: Packet<M>) -> bool {
        let mailbox = self.mailbox_toward(dst);
        if mailbox.node.strong_count() == 0 {
            return false;
        }
        mailbox.queue.push_back(packet);
        true
    }

    /// Deliver due packets on both mailboxes, in a fixed order.
    ///
    /// Each mailbox is walked oldest to newest: packets with remaining
    /// latency are decremented and kept; due packets are moved into the
    /// destination's inbox, tagged with the sender. If the destination has
    /// died, the whole queue is discarded.
    fn on_tick(&mut self) {
        let from_second = self.second.node_id;
        Self::deliver(from_second, &mut self.first);
        let from_first = self.first.node_id;
        Self::deliver(from_first, &mut self.second);
    }

    fn deliver(sender: NodeId, mailbox: &mut Mailbox<M>) {
        if mailbox.queue.is_empty() {
            return;
        }
        let Some(dst) = mailbox.node.upgrade() else {
            trace!(
                to = %mailbox.node_id,
                dropped = mailbox.queue.len(),
                "endpoint destroyed; discarding in-flight packets"
            );
            mailbox.queue.clear();
            return;
        };
        let mut dst = dst.borrow_mut();
        let pending = std::mem::take(&mut mailbox.queue);
        for mut packet in pending {
            if packet.latency > 0 {
                packet.latency -= 1;
                mailbox.queue.push_back(packet);
            } else {
                trace!(from = %sender, to = %mailbox.node_id, "packet delivered");
                dst.deposit(sender, packet.payload);
            }
        }
    }

    fn mailbox_toward(&mut self, dst: NodeId) -> &mut Mailbox<M> {
        if self.first.node_id == dst {
            &mut self.first
        } else {
            debug_assert_eq!(self.second.node_id, dst, "packet for a foreign node");
            &mut self.second
        }
    }

    /// Remove this link from both endpoints' link tables. Endpoints that
    /// have already been destroyed are tolerated.
    fn detach(&mut self) {
        if let Some(node) = self.first.node.upgrade() {
            node.borrow_mut().unregister_link(self.second.node_id);
        }
        if let Some(node) = self.second.node.upgrade() {
            node.borrow_mut().unregister_link(self.first.node_id);
        }
    }
}

/// Owning handle to a [`Link`]. The link's identity dies with this handle:
/// dropping it unregisters the link from both endpoints and discards any
/// in-flight packets.
pub struct LinkHandle<M: 'static> {
    link: Rc<RefCell<Link<M>>>,
}

impl<M: 'static> std::fmt::Debug for LinkHandle<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let link = self.link.borrow();
        f.debug_struct("LinkHandle")
            .field("first", &link.first.node_id)
            .field("second", &link.second.node_id)
            .finish()
    }
}

impl<M: 'static> LinkHandle<M> {
    /// Advance the link by one tick.
    pub fn on_tick(&self) {
        self.link.borrow_mut().on_tick();
    }

    /// Identities of the two endpoints.
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        let link = self.link.borrow();
        (link.first.node_id, link.second.node_id)
    }

    /// Number of packets queued toward `node`, for host inspection.
    pub fn pending_toward(&self, node: NodeId) -> usize {
        let link = self.link.borrow();
        if link.first.node_id == node {
            link.first.queue.len()
        } else if link.second.node_id == node {
            link.second.queue.len()
        } else {
            0
        }
    }
}

impl<M: 'static> Drop for LinkHandle<M> {
    fn drop(&mut self) {
        self.link.borrow_mut().detach();
    }
}
