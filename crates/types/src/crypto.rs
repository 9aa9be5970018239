//! Mock cryptography.
//!
//! Digest, signature, and verification are deterministic stand-ins for
//! real asymmetric crypto: the digest is a blake3 hash, and a signature is
//! the digest masked with a key stream derived from the signer's identity.
//! The mask makes the signature invertible given the claimed signer, which
//! is what lets verification recover the digest and compare it against a
//! recomputation. All functions here are pure.

use crate::identifiers::NodeId;
use crate::signing::DOMAIN_KEY;
use std::fmt;

/// A 32-byte deterministic fingerprint of a message's tag and payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Size of a digest in bytes.
    pub const BYTES: usize = 32;

    /// Zero digest (all bytes 0x00).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Hash multiple byte slices into a digest.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Get bytes as a slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &hex::encode(self.0)[..16])
    }
}

/// A signer-keyed transform of a [`Digest`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 32]);

impl Signature {
    /// Zero signature. Verifies for nothing in practice; used as a
    /// placeholder and by tests that need a structurally valid value.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Get bytes as a slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Build a signature from raw bytes. Intended for tests that need to
    /// forge a tampered signature.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", &hex::encode(self.0)[..16])
    }
}

/// Key stream for a node identity.
///
/// Any holder of the identity can derive the same stream, which models a
/// world where the identity is also the public key.
fn key_stream(node: NodeId) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN_KEY);
    hasher.update(&node.0.to_le_bytes());
    *hasher.finalize().as_bytes()
}

/// Sign a digest with a node's identity.
pub fn sign(digest: Digest, signer: NodeId) -> Signature {
    let key = key_stream(signer);
    let mut out = [0u8; 32];
    for (i, byte) in digest.0.iter().enumerate() {
        out[i] = byte ^ key[i];
    }
    Signature(out)
}

/// Recover the digest a signature was made over, given the claimed signer.
pub fn recover_digest(signature: Signature, signer: NodeId) -> Digest {
    let key = key_stream(signer);
    let mut out = [0u8; 32];
    for (i, byte) in signature.0.iter().enumerate() {
        out[i] = byte ^ key[i];
    }
    Digest(out)
}

/// Check that `signature` was produced over `digest` by `signer`.
pub fn verify(digest: Digest, signature: Signature, signer: NodeId) -> bool {
    recover_digest(signature, signer) == digest
}
