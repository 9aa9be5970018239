//! Scripted client.

use pbft_fabric::{Behavior, Node};
use pbft_types::{verify_response, Message, NodeId, OpResponse};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// One response collected by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedResponse {
    /// The replica that answered.
    pub replica: NodeId,
    /// The application's reply.
    pub response: OpResponse,
    /// Whether the reply's signature verified against the replica's
    /// identity.
    pub verified: bool,
}

/// What the client has collected, per request.
///
/// Shared between the client behavior (which records responses) and the
/// simulator (which checks readiness and seals batches). Every replica
/// that commits answers independently, so a request is complete once one
/// response per live node has arrived.
#[derive(Debug, Default)]
pub struct ResponseLedger {
    expected: usize,
    in_flight: bool,
    current: Vec<ReceivedResponse>,
    completed: Vec<Vec<ReceivedResponse>>,
}

impl ResponseLedger {
    /// Whether the in-flight request (if any) has all its responses.
    pub fn ready(&self) -> bool {
        self.current.len() >= self.expected
    }

    /// Start collecting for a new request expecting `expected` responses,
    /// sealing the previous request's batch.
    pub(crate) fn begin(&mut self, expected: usize) {
        if self.in_flight {
            self.completed.push(std::mem::take(&mut self.current));
        }
        self.expected = expected;
        self.in_flight = true;
    }

    pub(crate) fn record(&mut self, response: ReceivedResponse) {
        self.current.push(response);
    }

    /// Responses grouped per request, in submission order. The in-flight
    /// request's batch is included last.
    pub fn outcomes(&self) -> Vec<Vec<ReceivedResponse>> {
        let mut all = self.completed.clone();
        if self.in_flight {
            all.push(self.current.clone());
        }
        all
    }

    /// Total responses collected across all requests.
    pub fn responses_received(&self) -> u64 {
        (self.completed.iter().map(Vec::len).sum::<usize>() + self.current.len()) as u64
    }

    /// Responses whose signature failed to verify.
    pub fn responses_rejected(&self) -> u64 {
        self.completed
            .iter()
            .flatten()
            .chain(self.current.iter())
            .filter(|r| !r.verified)
            .count() as u64
    }
}

/// Client behavior: collects signed responses into the shared ledger and
/// ignores the protocol chatter it sees by virtue of being linked to
/// every node.
pub(crate) struct ClientNode {
    pub(crate) ledger: Rc<RefCell<ResponseLedger>>,
}

impl Behavior<Message> for ClientNode {
    fn on_tick(&mut self, node: &mut Node<Message>, inbox: Vec<(NodeId, Message)>) {
        for (sender, message) in inbox {
            match message {
                Message::Response(reply) => {
                    let verified = verify_response(&reply.response, reply.signature, sender);
                    debug!(
                        client = %node.id(),
                        from = %sender,
                        response = %reply.response,
                        verified,
                        "response collected"
                    );
                    self.ledger.borrow_mut().record(ReceivedResponse {
                        replica: sender,
                        response: reply.response,
                        verified,
                    });
                }
                protocol @ (Message::PrePrepare(_) | Message::Prepare(_) | Message::Commit(_)) => {
                    // Replica broadcasts reach the client too; useful for
                    // debugging, otherwise noise.
                    trace!(client = %node.id(), from = %sender, kind = protocol.type_name(), "protocol traffic");
                }
                unexpected => {
                    warn!(
                        client = %node.id(),
                        from = %sender,
                        kind = unexpected.type_name(),
                        "unexpected message at the client; dropping"
                    );
                    debug_assert!(false, "unexpected {} at the client", unexpected.type_name());
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
