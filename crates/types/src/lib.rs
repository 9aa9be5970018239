//! Core types for the PBFT simulation.
//!
//! This crate provides the foundational types used throughout the
//! implementation:
//!
//! - **Identifiers**: [`NodeId`], [`View`], [`ReqId`]
//! - **Messages**: [`Message`] and its payloads ([`OpRequest`],
//!   [`OpResponse`], [`Proposal`], [`SignedResponse`])
//! - **Mock crypto**: [`Digest`], [`Signature`], and the deterministic
//!   sign/recover/verify functions keyed by node identity
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not
//! depend on any other workspace crates, making it the foundation layer.

mod crypto;
mod identifiers;
mod message;
mod signing;

pub use crypto::{recover_digest, sign, verify, Digest, Signature};
pub use identifiers::{NodeId, ReqId, View};
pub use message::{
    Message, OpRequest, OpResponse, Proposal, ReadAck, ReadRequest, SignedResponse, WriteAck,
    WriteRequest,
};
pub use signing::{
    request_digest, response_digest, sign_request, sign_response, verify_request, verify_response,
    DOMAIN_KEY, DOMAIN_REQUEST, DOMAIN_RESPONSE,
};
