//! Deterministic network fabric.
//!
//! This crate provides the transport layer the protocol runs on:
//!
//! - [`Node`]: identity, inbox, link registry, send/broadcast, and a
//!   per-tick hook supplied through the [`Behavior`] trait
//! - [`Link`] / [`LinkHandle`]: a bidirectional channel between exactly
//!   two nodes, delivering queued messages as their latency counters
//!   expire
//! - [`Packet`]: a payload plus its remaining in-flight latency
//!
//! # Architecture
//!
//! The fabric is synchronous and tick-driven:
//!
//! ```text
//! every tick: each link delivers due packets → each node drains its inbox
//! ```
//!
//! Links are edges owned by whoever created them (the [`LinkHandle`]);
//! nodes know their edges only through weak references, and mailboxes know
//! their endpoint the same way. Dropping either side leaves the other in a
//! consistent state: sends to a dead peer fail cleanly, and in-flight
//! traffic toward it is discarded on the next link tick. That silent drop
//! is the fabric's only loss model.
//!
//! Determinism of a run rests on fixed iteration orders: the link registry
//! is a `BTreeMap`, so a broadcast always walks peers in identifier order,
//! and the caller is expected to tick links and nodes in a stable order.

mod link;
mod node;
mod packet;

pub use link::{Link, LinkError, LinkHandle};
pub use node::{Behavior, Node, NodeHandle, WeakNodeHandle};
pub use packet::{Packet, Ticks};
