//! Per-request protocol state machine.

use pbft_types::{ReqId, View};

/// Agreement phase for the currently active request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No request has been seen yet.
    Init,
    /// A proposal was accepted; waiting for prepare endorsements.
    PrePrepare,
    /// Collecting prepare endorsements.
    Prepare,
    /// Prepare quorum reached; waiting for commit votes.
    Prepared,
    /// Collecting commit votes.
    Commit,
    /// Commit quorum reached; the request is decided.
    Committed,
}

/// The `(view, req_id)` pair identifying one agreement instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    /// View the request was proposed in.
    pub view: View,
    /// Primary-issued request id.
    pub req_id: ReqId,
}

/// State machine tracking one node's progress through the three phases.
///
/// Strictly per-slot: every transition is gated on an exact `(view,
/// req_id)` match, except accepting a fresh pre-prepare, which may also
/// start the direct successor slot from any phase. Refused transitions
/// return `false` and leave the state untouched; the caller drops the
/// triggering message and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolState {
    phase: Phase,
    slot: Option<Slot>,
    approves: u64,
    f: u64,
}

impl ProtocolState {
    /// Fresh state tolerating `f` faults.
    pub fn new(f: u64) -> Self {
        Self {
            phase: Phase::Init,
            slot: None,
            approves: 0,
            f,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Votes counted toward the current phase's quorum.
    pub fn approves(&self) -> u64 {
        self.approves
    }

    /// The active slot, if any request has been accepted yet.
    pub fn slot(&self) -> Option<Slot> {
        self.slot
    }

    /// Tolerated fault count.
    pub fn f(&self) -> u64 {
        self.f
    }

    /// Accept a proposal for `(view, req_id)`.
    ///
    /// Unconditional from `Init`; from any later phase only the direct
    /// successor of the current slot (same view, next request id) is
    /// accepted. Acceptance resets the vote count to the node's own
    /// implicit prepare.
    pub fn preprepare(&mut self, view: View, req_id: ReqId) -> bool {
        let accept = match self.slot {
            None => true,
            Some(current) => current.view == view && current.req_id.next() == req_id,
        };
        if accept {
            self.slot = Some(Slot { view, req_id });
            self.approves = 1;
            self.phase = Phase::PrePrepare;
        }
        accept
    }

    /// Count a prepare endorsement for `(view, req_id)`.
    ///
    /// Valid only between accepting the proposal and reaching the prepare
    /// quorum of `2f`. Reaching the quorum moves to `Prepared` and resets
    /// the count to the node's own commit vote.
    pub fn prepare(&mut self, view: View, req_id: ReqId) -> bool {
        if !self.is_current(view, req_id) {
            return false;
        }
        match self.phase {
            Phase::Init | Phase::Prepared | Phase::Commit | Phase::Committed => false,
            Phase::PrePrepare | Phase::Prepare => {
                if self.phase == Phase::PrePrepare {
                    self.phase = Phase::Prepare;
                    self.approves = 0;
                }
                self.approves += 1;
                if self.approves >= 2 * self.f {
                    self.phase = Phase::Prepared;
                    self.approves = 1;
                }
                true
            }
        }
    }

    /// Count a commit vote for `(view, req_id)`.
    ///
    /// Valid only between reaching `Prepared` and reaching the commit
    /// quorum of `2f+1` (which includes the node's own vote). Reaching the
    /// quorum moves to `Committed`.
    pub fn commit(&mut self, view: View, req_id: ReqId) -> bool {
        if !self.is_current(view, req_id) {
            return false;
        }
        match self.phase {
            Phase::Init | Phase::PrePrepare | Phase::Prepare | Phase::Committed => false,
            Phase::Prepared | Phase::Commit => {
                if self.phase == Phase::Prepared {
                    self.phase = Phase::Commit;
                    self.approves = 0;
                }
                self.approves += 1;
                if self.approves >= 2 * self.f + 1 {
                    self.phase = Phase::Committed;
                    self.approves = 1;
                }
                true
            }
        }
    }

    fn is_current(&self, view: View, req_id: ReqId) -> bool {
        self.slot == Some(Slot { view, req_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V0: View = View(0);
    const V1: View = View(1);

    fn r(id: u64) -> ReqId {
        ReqId(id)
    }

    #[test]
    fn degenerate_single_node_run() {
        // f = 0: one self-vote is enough to advance every phase.
        let mut state = ProtocolState::new(0);
        assert!(!state.prepare(V0, r(0)));
        assert!(state.preprepare(V0, r(0)));
        assert_eq!(state.phase(), Phase::PrePrepare);
        assert!(!state.preprepare(V0, r(0)));
        assert!(!state.prepare(V1, r(0)));
        assert!(!state.prepare(V0, r(1)));
        assert!(state.prepare(V0, r(0)));
        assert_eq!(state.approves(), 1);
        assert_eq!(state.phase(), Phase::Prepared);
        assert!(!state.prepare(V0, r(0)));
        assert!(!state.preprepare(V0, r(0)));
        assert!(!state.commit(V1, r(0)));
        assert!(!state.commit(V0, r(1)));
        assert!(state.commit(V0, r(0)));
        assert_eq!(state.phase(), Phase::Committed);
        assert!(!state.commit(V0, r(0)));
        assert!(!state.prepare(V0, r(0)));
        assert!(!state.preprepare(V1, r(0)));
        assert!(!state.preprepare(V1, r(1)));
        assert!(state.preprepare(V0, r(1)));
    }

    #[test]
    fn four_node_quorum_run() {
        // f = 1: 2f = 2 prepares, then 2f+1 = 3 commits.
        let mut state = ProtocolState::new(1);
        assert!(!state.prepare(V0, r(0)));
        assert!(state.preprepare(V0, r(0)));
        assert_eq!(state.phase(), Phase::PrePrepare);
        assert!(!state.preprepare(V0, r(0)));
        assert!(!state.prepare(V1, r(0)));
        assert!(!state.prepare(V0, r(1)));
        assert!(state.prepare(V0, r(0)));
        assert_eq!(state.approves(), 1);
        assert_eq!(state.phase(), Phase::Prepare);
        assert!(state.prepare(V0, r(0)));
        assert_eq!(state.approves(), 1);
        assert_eq!(state.phase(), Phase::Prepared);
        assert!(!state.prepare(V0, r(0)));
        assert!(!state.preprepare(V0, r(0)));
        assert!(!state.commit(V1, r(0)));
        assert!(!state.commit(V0, r(1)));
        assert!(state.commit(V0, r(0)));
        assert_eq!(state.phase(), Phase::Commit);
        assert!(state.commit(V0, r(0)));
        assert_eq!(state.phase(), Phase::Commit);
        assert!(state.commit(V0, r(0)));
        assert_eq!(state.phase(), Phase::Committed);
        assert!(!state.commit(V0, r(0)));
        assert!(!state.prepare(V0, r(0)));
        assert!(!state.preprepare(V1, r(0)));
        assert!(!state.preprepare(V1, r(1)));
        assert!(state.preprepare(V0, r(1)));
    }

    #[test]
    fn successor_slot_restarts_from_any_phase() {
        // A fresh pre-prepare for (view, req_id + 1) is legal even while a
        // request is mid-flight; it abandons the stuck instance.
        let mut state = ProtocolState::new(1);
        assert!(state.preprepare(V0, r(1)));
        assert!(state.prepare(V0, r(1)));
        assert_eq!(state.phase(), Phase::Prepare);
        assert!(state.preprepare(V0, r(2)));
        assert_eq!(state.phase(), Phase::PrePrepare);
        assert_eq!(state.slot(), Some(Slot { view: V0, req_id: r(2) }));
        assert_eq!(state.approves(), 1);
        // Skipping an id is not.
        assert!(!state.preprepare(V0, r(4)));
    }

    #[test]
    fn transition_function_is_deterministic() {
        // Two instances fed the same call sequence end in identical state.
        let script: &[(&str, View, ReqId)] = &[
            ("preprepare", V0, r(1)),
            ("prepare", V0, r(1)),
            ("prepare", V0, r(1)),
            ("commit", V0, r(1)),
            ("commit", V1, r(1)),
            ("commit", V0, r(1)),
            ("commit", V0, r(1)),
            ("preprepare", V0, r(2)),
        ];
        let mut a = ProtocolState::new(1);
        let mut b = ProtocolState::new(1);
        for (call, view, req_id) in script {
            let (ra, rb) = match *call {
                "preprepare" => (a.preprepare(*view, *req_id), b.preprepare(*view, *req_id)),
                "prepare" => (a.prepare(*view, *req_id), b.prepare(*view, *req_id)),
                _ => (a.commit(*view, *req_id), b.commit(*view, *req_id)),
            };
            assert_eq!(ra, rb);
        }
        assert_eq!(a, b);
    }
}
