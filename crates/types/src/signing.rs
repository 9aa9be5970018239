//! Domain-separated digesting and signing helpers.
//!
//! Every signable payload gets a unique domain tag prefix so a digest from
//! one context can never be replayed in another.
//!
//! | Tag | Purpose |
//! |-----|---------|
//! | `pbft:key:` | Key-stream derivation from a node identity |
//! | `pbft:request:` | Client operation digests (signed by the primary) |
//! | `pbft:response:` | Application reply digests (signed by each replica) |

use crate::crypto::{sign, verify, Digest, Signature};
use crate::identifiers::NodeId;
use crate::message::{OpRequest, OpResponse};

/// Domain tag for key-stream derivation.
pub const DOMAIN_KEY: &[u8] = b"pbft:key:";

/// Domain tag for client operation digests.
pub const DOMAIN_REQUEST: &[u8] = b"pbft:request:";

/// Domain tag for application reply digests.
pub const DOMAIN_RESPONSE: &[u8] = b"pbft:response:";

/// Digest of a client operation.
///
/// Format: `pbft:request:` || variant tag || payload fields, little-endian.
pub fn request_digest(request: &OpRequest) -> Digest {
    match request {
        OpRequest::Write(w) => {
            Digest::from_parts(&[DOMAIN_REQUEST, b"write", &w.value.to_le_bytes()])
        }
        OpRequest::Read(r) => {
            Digest::from_parts(&[DOMAIN_REQUEST, b"read", &r.index.to_le_bytes()])
        }
    }
}

/// Digest of an application reply.
///
/// Format: `pbft:response:` || variant tag || payload fields, little-endian.
pub fn response_digest(response: &OpResponse) -> Digest {
    match response {
        OpResponse::WriteAck(a) => Digest::from_parts(&[
            DOMAIN_RESPONSE,
            b"write_ack",
            &[a.success as u8],
            &a.index.to_le_bytes(),
        ]),
        OpResponse::ReadAck(a) => Digest::from_parts(&[
            DOMAIN_RESPONSE,
            b"read_ack",
            &[a.success as u8],
            &a.value.to_le_bytes(),
        ]),
    }
}

/// Sign a client operation as `signer`.
pub fn sign_request(request: &OpRequest, signer: NodeId) -> Signature {
    sign(request_digest(request), signer)
}

/// Sign an application reply as `signer`.
pub fn sign_response(response: &OpResponse, signer: NodeId) -> Signature {
    sign(response_digest(response), signer)
}

/// Check that `signature` covers `request` and was made by `signer`.
pub fn verify_request(request: &OpRequest, signature: Signature, signer: NodeId) -> bool {
    verify(request_digest(request), signature, signer)
}

/// Check that `signature` covers `response` and was made by `signer`.
pub fn verify_response(response: &OpResponse, signature: Signature, signer: NodeId) -> bool {
    verify(response_digest(response), signature, signer)
}
