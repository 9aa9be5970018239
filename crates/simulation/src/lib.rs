//! Deterministic simulation host.
//!
//! This crate wires a PBFT cluster onto the tick fabric and drives it:
//!
//! - [`Simulator`]: builds the cluster (full replica mesh, client linked
//!   to every replica), runs the tick loop, and exposes the outcome
//! - [`AppendLog`]: the sample replicated application, an append-only
//!   integer log
//! - [`ResponseLedger`] / [`ReceivedResponse`]: what the scripted client
//!   collected, per request
//! - [`NetworkConfig`]: seeded latency for client-submitted requests
//!
//! A simulation is synchronous and single-threaded. One tick advances
//! every link (in creation order), then every live node (in index order),
//! then feeds the client its next scripted action if the previous one has
//! been answered by every live node. Given the same configuration and
//! seed, a run produces identical results every time.

mod app;
mod client;
mod network;
mod runner;

pub use app::AppendLog;
pub use client::{ReceivedResponse, ResponseLedger};
pub use network::NetworkConfig;
pub use runner::{SimConfig, SimError, SimulationStats, Simulator, TICK_LIMIT};
