//! Application seam.

use pbft_types::{OpRequest, OpResponse};

/// The replicated application, injected into a node as a callback.
///
/// `accept` is invoked exactly once per committed request on each
/// committing node. Implementations must be deterministic: every replica
/// has to produce an identical response for the same request, since that
/// is what lets a client cross-check the replies it collects.
pub trait Application: 'static {
    /// Apply one committed request and produce its reply.
    fn accept(&mut self, request: &OpRequest) -> OpResponse;
}
