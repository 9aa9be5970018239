//! Determinism tests.
//!
//! Same configuration, same seed, same results — the property that makes
//! a failing simulation run replayable. Also checks that two clusters in
//! one process are fully independent.

use pbft_simulation::{NetworkConfig, SimConfig, Simulator};
use pbft_types::{OpRequest, ReqId};
use tracing_test::traced_test;

fn jittery_config(seed: u64) -> SimConfig {
    SimConfig {
        f: 1,
        nodes: 0,
        network: NetworkConfig {
            base_latency: 1,
            jitter: 4,
            seed,
        },
    }
}

fn script() -> Vec<OpRequest> {
    vec![
        OpRequest::write(3),
        OpRequest::write(7),
        OpRequest::read(1),
        OpRequest::read(5),
    ]
}

#[traced_test]
#[test]
fn same_seed_same_run() {
    let mut a = Simulator::with_config(jittery_config(99)).expect("valid config");
    let mut b = Simulator::with_config(jittery_config(99)).expect("valid config");

    a.enqueue_actions(script());
    b.enqueue_actions(script());
    let ticks_a = a.run();
    let ticks_b = b.run();

    assert_eq!(ticks_a, ticks_b, "same seed must take the same ticks");
    assert_eq!(a.outcomes(), b.outcomes(), "same responses in same order");
    assert_eq!(a.stats(), b.stats());
}

#[traced_test]
#[test]
fn clusters_in_one_process_are_independent() {
    // The primary's request-id counter is per instance: a second cluster
    // starts numbering from 1 no matter what the first one did.
    let mut first = Simulator::new(1).expect("valid config");
    first.enqueue_actions(script());
    first.run();
    let first_slot = first
        .with_node(0, |p| p.state().slot())
        .flatten()
        .expect("decided");
    assert_eq!(first_slot.req_id, ReqId(4));

    let mut second = Simulator::new(1).expect("valid config");
    second.enqueue_actions([OpRequest::write(1)]);
    second.run();
    let second_slot = second
        .with_node(0, |p| p.state().slot())
        .flatten()
        .expect("decided");
    assert_eq!(second_slot.req_id, ReqId(1));

    // The first cluster is untouched by the second one's run.
    let first_again = first
        .with_node(0, |p| p.state().slot())
        .flatten()
        .expect("still decided");
    assert_eq!(first_again, first_slot);
}

#[test]
fn repeated_default_runs_are_identical() {
    let run = || {
        let mut sim = Simulator::new(1).expect("valid config");
        sim.enqueue_actions(script());
        let ticks = sim.run();
        (ticks, sim.outcomes())
    };
    assert_eq!(run(), run());
}
