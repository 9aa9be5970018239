//! PBFT agreement protocol.
//!
//! This crate implements the three-phase PBFT agreement protocol
//! (pre-prepare → prepare → commit) on a fixed primary, as a synchronous
//! behavior over the tick fabric:
//!
//! - `Message::Write` / `Message::Read` → primary wraps the request in a
//!   signed `PrePrepare` and broadcasts it
//! - `Message::PrePrepare` → replicas verify the primary's signature and
//!   answer with a `Prepare` carrying the same payload
//! - `Message::Prepare` → nodes collect endorsements; at quorum they
//!   broadcast a `Commit`
//! - `Message::Commit` → nodes collect votes; at quorum they apply the
//!   request and send a signed `Response` to the client
//!
//! # Quorums
//!
//! In a cluster of size ≥ 3f+1, a node moves to `Prepared` after `2f`
//! prepare endorsements: its own pre-prepare counts as an implicit
//! prepare, so `2f` more make a prepare quorum. Commits need the full
//! `2f+1`, including the node's own vote — the classical PBFT quorum.
//! Both counters are monotone, which makes f = 0 a degenerate but legal
//! configuration where a single self-vote advances every phase.
//!
//! # Safety
//!
//! - A proposal is identified by its `(view, req_id)` slot; every
//!   transition is gated on an exact slot match, and a new slot is only
//!   accepted as the direct successor of the current one.
//! - The primary signs each proposal once; `Prepare` and `Commit` forward
//!   that payload verbatim, so every hop verifies the same signature and a
//!   tampered payload dies at the first honest receiver.
//!
//! # Liveness
//!
//! There is none to speak of: the primary is fixed, there is no
//! view-change, and a cluster that loses its primary (or more than f
//! replicas) simply stops making progress until the host gives up.

mod app;
mod config;
mod node;
mod state;

pub use app::Application;
pub use config::{ConfigError, PbftConfig};
pub use node::{register_primary, PbftNode, Role};
pub use state::{Phase, ProtocolState, Slot};
