//! Role-aware PBFT node behavior.

use crate::app::Application;
use crate::config::PbftConfig;
use crate::state::{Phase, ProtocolState};
use pbft_fabric::{Behavior, Node, NodeHandle, Packet, WeakNodeHandle};
use pbft_types::{
    sign_request, sign_response, verify_request, Message, NodeId, OpRequest, Proposal, ReqId,
    SignedResponse, View,
};
use std::any::Any;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

/// A node's role within the fixed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The proposer. Exactly one per cluster.
    Primary,
    /// A voting node.
    Replica,
}

/// PBFT node behavior: protocol state plus signing, verification, and the
/// application callback, dispatched over the fabric inbox.
///
/// Holds a weak reference to the designated primary node — needed only to
/// recover the primary's identity for signature verification, and to make
/// verification fail once the primary has been destroyed.
pub struct PbftNode {
    role: Role,
    state: ProtocolState,
    view: View,
    /// Last issued request id. Per-instance so that independent clusters
    /// in one process number their requests independently.
    next_req_id: ReqId,
    primary: WeakNodeHandle<Message>,
    primary_id: Option<NodeId>,
    app: Box<dyn Application>,
}

/// Wire `node` to verify against `primary`.
///
/// A free function rather than a method because the primary points at
/// itself: the primary's identity has to be read before the node is
/// mutably borrowed for the behavior downcast.
pub fn register_primary(node: &NodeHandle<Message>, primary: &NodeHandle<Message>) {
    let primary_id = primary.borrow().id();
    let weak = Rc::downgrade(primary);
    let mut guard = node.borrow_mut();
    if let Some(pbft) = guard
        .behavior_mut()
        .and_then(|b| b.as_any_mut().downcast_mut::<PbftNode>())
    {
        pbft.set_primary(primary_id, weak);
    }
}

impl PbftNode {
    /// Build the behavior for one node.
    pub fn new(role: Role, config: PbftConfig, app: Box<dyn Application>) -> Self {
        Self {
            role,
            state: ProtocolState::new(config.f),
            view: View::ZERO,
            next_req_id: ReqId::ZERO,
            primary: Weak::new(),
            primary_id: None,
            app,
        }
    }

    /// Convenience: build a fabric node with this behavior attached.
    pub fn spawn(
        id: NodeId,
        role: Role,
        config: PbftConfig,
        app: Box<dyn Application>,
    ) -> NodeHandle<Message> {
        Node::with_behavior(id, Box::new(Self::new(role, config, app)))
    }

    /// Point this node at the cluster's primary. The identity is cached;
    /// the weak handle only gates on the primary still being alive. Most
    /// callers want [`register_primary`] instead.
    pub fn set_primary(&mut self, primary_id: NodeId, primary: WeakNodeHandle<Message>) {
        self.primary_id = Some(primary_id);
        self.primary = primary;
    }

    /// This node's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The protocol state, for host inspection.
    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Check a forwarded proposal against the primary's signature.
    ///
    /// The payload is the primary's original signed proposal regardless of
    /// which phase message carried it; nothing is re-signed per hop.
    fn verify_primary(&self, proposal: &Proposal) -> bool {
        if self.primary.strong_count() == 0 {
            return false;
        }
        match self.primary_id {
            Some(primary) => verify_request(&proposal.request, proposal.signature, primary),
            None => false,
        }
    }

    fn on_client_request(&mut self, node: &Node<Message>, client: NodeId, request: OpRequest) {
        if self.role != Role::Primary {
            // Clients broadcast; only the primary proposes.
            return;
        }
        self.next_req_id = self.next_req_id.next();
        let proposal = Proposal {
            signature: sign_request(&request, node.id()),
            request,
            client,
            view: self.view,
            req_id: self.next_req_id,
        };
        if self.state.preprepare(proposal.view, proposal.req_id) {
            debug!(
                node = %node.id(),
                client = %client,
                req_id = %proposal.req_id,
                request = %proposal.request,
                "proposing"
            );
            node.broadcast(&Packet::new(Message::PrePrepare(proposal)));
        }
    }

    fn on_preprepare(&mut self, node: &Node<Message>, proposal: Proposal) {
        if self.role == Role::Primary {
            // The primary's own proposal echoes back through the mesh.
            return;
        }
        if !self.verify_primary(&proposal) {
            trace!(node = %node.id(), req_id = %proposal.req_id, "pre-prepare failed verification");
            return;
        }
        if self.state.preprepare(proposal.view, proposal.req_id)
            && self.state.prepare(proposal.view, proposal.req_id)
        {
            node.broadcast(&Packet::new(Message::Prepare(proposal)));
        }
    }

    fn on_prepare(&mut self, node: &Node<Message>, proposal: Proposal) {
        if !self.verify_primary(&proposal) {
            trace!(node = %node.id(), req_id = %proposal.req_id, "prepare failed verification");
            return;
        }
        if self.state.prepare(proposal.view, proposal.req_id)
            && self.state.commit(proposal.view, proposal.req_id)
        {
            node.broadcast(&Packet::new(Message::Commit(proposal)));
        }
    }

    fn on_commit(&mut self, node: &Node<Message>, proposal: Proposal) {
        if !self.verify_primary(&proposal) {
            trace!(node = %node.id(), req_id = %proposal.req_id, "commit failed verification");
            return;
        }
        if self.state.commit(proposal.view, proposal.req_id)
            && self.state.phase() == Phase::Committed
        {
            let response = self.app.accept(&proposal.request);
            debug!(
                node = %node.id(),
                req_id = %proposal.req_id,
                request = %proposal.request,
                response = %response,
                "committed"
            );
            let reply = SignedResponse {
                signature: sign_response(&response, node.id()),
                response,
            };
            // The client may be gone; nothing to do about it either way.
            let _ = node.send_to(proposal.client, Packet::new(Message::Response(reply)));
        }
    }
}

impl Behavior<Message> for PbftNode {
    fn on_tick(&mut self, node: &mut Node<Message>, inbox: Vec<(NodeId, Message)>) {
        for (sender, message) in inbox {
            trace!(
                node = %node.id(),
                from = %sender,
                kind = message.type_name(),
                "received"
            );
            match message {
                Message::Write(w) => self.on_client_request(node, sender, OpRequest::Write(w)),
                Message::Read(r) => self.on_client_request(node, sender, OpRequest::Read(r)),
                Message::PrePrepare(p) => self.on_preprepare(node, p),
                Message::Prepare(p) => self.on_prepare(node, p),
                Message::Commit(p) => self.on_commit(node, p),
                unexpected @ (Message::WriteAck(_) | Message::ReadAck(_) | Message::Response(_)) => {
                    // A correct fabric never routes these here.
                    warn!(
                        node = %node.id(),
                        kind = unexpected.type_name(),
                        "unexpected message at a replica; dropping"
                    );
                    debug_assert!(
                        false,
                        "unexpected {} at a replica",
                        unexpected.type_name()
                    );
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
