//! PBFT Simulator CLI
//!
//! Runs a scripted crash-tolerance scenario against a simulated cluster:
//! a batch of writes and reads, one replica destroyed, then a second
//! batch that must still commit on the surviving quorum.
//!
//! # Example
//!
//! ```bash
//! # Default: f = 1, four nodes, kill node 1 between batches
//! pbft-sim
//!
//! # Larger cluster with client-side latency
//! pbft-sim -f 2 --latency 3 --jitter 2 --seed 7
//! ```

use clap::Parser;
use pbft_simulation::{NetworkConfig, SimConfig, Simulator};
use pbft_types::OpRequest;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// PBFT Cluster Simulator
///
/// Drives a deterministic, tick-based PBFT cluster through a fixed
/// crash-tolerance scenario. Given the same arguments, produces identical
/// results every run.
#[derive(Parser, Debug)]
#[command(name = "pbft-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Tolerated fault count (cluster size is at least 3f+1)
    #[arg(short = 'f', long, default_value = "1")]
    fault_tolerance: u64,

    /// Number of nodes; 0 means the minimum for the fault tolerance
    #[arg(short = 'n', long, default_value = "0")]
    nodes: usize,

    /// Replica index to destroy between the two batches (0 is the
    /// primary and cannot be destroyed)
    #[arg(long, default_value = "1")]
    kill: usize,

    /// Base client-request latency in ticks
    #[arg(long, default_value = "0")]
    latency: u32,

    /// Maximum extra jitter on client-request latency, in ticks
    #[arg(long, default_value = "0")]
    jitter: u32,

    /// Seed for the latency jitter stream
    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pbft_fabric=warn")),
        )
        .init();

    let args = Args::parse();

    if args.kill == 0 {
        error!("node 0 is the primary and cannot be killed");
        std::process::exit(1);
    }

    let config = SimConfig {
        f: args.fault_tolerance,
        nodes: args.nodes,
        network: NetworkConfig {
            base_latency: args.latency,
            jitter: args.jitter,
            seed: args.seed,
        },
    };

    let mut sim = match Simulator::with_config(config) {
        Ok(sim) => sim,
        Err(e) => {
            error!(error = %e, "failed to build simulator");
            std::process::exit(1);
        }
    };

    info!(
        f = args.fault_tolerance,
        nodes = sim.alive_nodes(),
        "starting scenario"
    );

    sim.enqueue_actions([
        OpRequest::write(1),
        OpRequest::write(2),
        OpRequest::write(10),
        OpRequest::read(0),
        OpRequest::read(2),
        OpRequest::read(3),
    ]);
    let first = sim.run();
    info!(ticks = first, "first batch answered");

    sim.destroy_node(args.kill);
    sim.enqueue_actions([
        OpRequest::write(1000),
        OpRequest::write(1234),
        OpRequest::write(9876),
        OpRequest::read(5),
        OpRequest::read(10),
        OpRequest::read(3),
    ]);
    let second = sim.run();
    info!(ticks = second, alive = sim.alive_nodes(), "second batch answered");

    for (index, batch) in sim.outcomes().iter().enumerate() {
        for received in batch {
            info!(
                request = index,
                from = %received.replica,
                response = %received.response,
                verified = received.verified,
                "response"
            );
        }
    }

    let stats = sim.stats();
    info!(
        ticks = stats.ticks,
        requests = stats.requests_submitted,
        responses = stats.responses_received,
        rejected = stats.responses_rejected,
        "simulation finished"
    );
}
