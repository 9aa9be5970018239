//! Wire messages.
//!
//! Everything that travels between nodes is a [`Message`]: client
//! operations, the three PBFT phases, and replies. The three protocol
//! phases deliberately share one [`Proposal`] payload — a replica builds
//! the next phase by rewrapping the payload it received, unchanged, so the
//! primary's original signature survives every hop.

use crate::crypto::Signature;
use crate::identifiers::{NodeId, ReqId, View};
use std::fmt;

/// Client request to append a value to the replicated log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRequest {
    /// Value to append.
    pub value: i64,
}

/// Client request to read the log entry at an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    /// Zero-based log index.
    pub index: u64,
}

/// Application reply to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    /// Whether the append was applied.
    pub success: bool,
    /// Index the value landed at.
    pub index: u64,
}

/// Application reply to a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadAck {
    /// Whether the index was in bounds.
    pub success: bool,
    /// The value read, or 0 on a miss.
    pub value: i64,
}

/// A client operation, as handed to the application on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpRequest {
    /// Append a value.
    Write(WriteRequest),
    /// Read by index.
    Read(ReadRequest),
}

impl OpRequest {
    /// Convenience constructor for a write.
    pub fn write(value: i64) -> Self {
        OpRequest::Write(WriteRequest { value })
    }

    /// Convenience constructor for a read.
    pub fn read(index: u64) -> Self {
        OpRequest::Read(ReadRequest { index })
    }
}

impl fmt::Display for OpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpRequest::Write(w) => write!(f, "Write({})", w.value),
            OpRequest::Read(r) => write!(f, "Read({})", r.index),
        }
    }
}

/// An application reply, as produced by the application on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpResponse {
    /// Reply to a write.
    WriteAck(WriteAck),
    /// Reply to a read.
    ReadAck(ReadAck),
}

impl fmt::Display for OpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpResponse::WriteAck(a) => write!(f, "WriteAck({}, {})", a.success, a.index),
            OpResponse::ReadAck(a) => write!(f, "ReadAck({}, {})", a.success, a.value),
        }
    }
}

/// The primary's signed proposal, forwarded verbatim through every phase.
///
/// `signature` is the primary's signature over the digest of `request`.
/// `Prepare` and `Commit` never re-sign; they carry this payload as
/// received, so every replica verifies the same primary signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// The client operation being agreed on.
    pub request: OpRequest,
    /// Primary's signature over the request digest.
    pub signature: Signature,
    /// Identity of the client that submitted the request.
    pub client: NodeId,
    /// View the proposal was issued in.
    pub view: View,
    /// Primary-issued request id.
    pub req_id: ReqId,
}

/// A replica's signed reply to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedResponse {
    /// The application's reply.
    pub response: OpResponse,
    /// The answering replica's signature over the response digest.
    pub signature: Signature,
}

/// Everything that can appear on a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Client write request.
    Write(WriteRequest),
    /// Client read request.
    Read(ReadRequest),
    /// Bare application reply to a write. Never sent by this
    /// implementation; replies travel inside [`Message::Response`].
    WriteAck(WriteAck),
    /// Bare application reply to a read. See [`Message::WriteAck`].
    ReadAck(ReadAck),
    /// Replica's signed reply to the client.
    Response(SignedResponse),
    /// Primary's proposal.
    PrePrepare(Proposal),
    /// Replica's endorsement of a proposal.
    Prepare(Proposal),
    /// Replica's commit vote for a proposal.
    Commit(Proposal),
}

impl Message {
    /// Human-readable name for this message kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Write(_) => "Write",
            Message::Read(_) => "Read",
            Message::WriteAck(_) => "WriteAck",
            Message::ReadAck(_) => "ReadAck",
            Message::Response(_) => "Response",
            Message::PrePrepare(_) => "PrePrepare",
            Message::Prepare(_) => "Prepare",
            Message::Commit(_) => "Commit",
        }
    }

    /// Whether this is one of the three PBFT phase messages.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Message::PrePrepare(_) | Message::Prepare(_) | Message::Commit(_)
        )
    }
}

impl From<OpRequest> for Message {
    fn from(request: OpRequest) -> Self {
        match request {
            OpRequest::Write(w) => Message::Write(w),
            OpRequest::Read(r) => Message::Read(r),
        }
    }
}

impl From<OpResponse> for Message {
    fn from(response: OpResponse) -> Self {
        match response {
            OpResponse::WriteAck(a) => Message::WriteAck(a),
            OpResponse::ReadAck(a) => Message::ReadAck(a),
        }
    }
}
