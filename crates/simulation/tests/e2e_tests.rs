//! End-to-end simulation tests.
//!
//! These drive full clusters through scripted request batches and check
//! what the client collected, request by request. Runs are synchronous
//! and deterministic; none of them should come anywhere near the tick
//! cap.

use pbft_consensus::Phase;
use pbft_simulation::{NetworkConfig, SimConfig, Simulator, TICK_LIMIT};
use pbft_types::{NodeId, OpRequest, OpResponse, ReadAck, ReqId, View, WriteAck};
use tracing_test::traced_test;

fn write_ack(index: u64) -> OpResponse {
    OpResponse::WriteAck(WriteAck {
        success: true,
        index,
    })
}

fn read_hit(value: i64) -> OpResponse {
    OpResponse::ReadAck(ReadAck {
        success: true,
        value,
    })
}

fn read_miss() -> OpResponse {
    OpResponse::ReadAck(ReadAck {
        success: false,
        value: 0,
    })
}

/// Every response in a batch must carry the expected reply, verify, and
/// come from a distinct replica.
fn assert_batch(batch: &[pbft_simulation::ReceivedResponse], expected: &OpResponse, count: usize) {
    assert_eq!(batch.len(), count, "response count");
    let mut repliers: Vec<NodeId> = batch.iter().map(|r| r.replica).collect();
    repliers.sort();
    repliers.dedup();
    assert_eq!(repliers.len(), count, "responses from distinct replicas");
    for received in batch {
        assert!(received.verified, "response signature must verify");
        assert_eq!(&received.response, expected);
    }
}

#[traced_test]
#[test]
fn happy_path_single_write() {
    let mut sim = Simulator::new(1).expect("valid config");
    sim.enqueue_actions([OpRequest::write(1)]);
    let ticks = sim.run();
    assert!(ticks < TICK_LIMIT, "must finish well under the cap");

    let outcomes = sim.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_batch(&outcomes[0], &write_ack(0), 4);

    // Every node decided the same (view, req_id).
    for index in 0..4 {
        let (phase, slot) = sim
            .with_node(index, |p| (p.state().phase(), p.state().slot()))
            .expect("node alive");
        assert_eq!(phase, Phase::Committed);
        let slot = slot.expect("a request was decided");
        assert_eq!(slot.view, View::ZERO);
        assert_eq!(slot.req_id, ReqId(1));
    }

    let stats = sim.stats();
    assert_eq!(stats.requests_submitted, 1);
    assert_eq!(stats.responses_received, 4);
    assert_eq!(stats.responses_rejected, 0);
    assert_eq!(stats.verification_rate(), 1.0);
}

#[traced_test]
#[test]
fn one_dead_replica_still_commits() {
    let mut sim = Simulator::new(1).expect("valid config");
    sim.destroy_node(1);
    assert_eq!(sim.alive_nodes(), 3);

    sim.enqueue_actions([OpRequest::write(1)]);
    let ticks = sim.run();
    assert!(ticks < TICK_LIMIT);

    // 2f+1 = 3 live nodes meet the quorum exactly; three responses.
    let outcomes = sim.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_batch(&outcomes[0], &write_ack(0), 3);
    assert!(sim.with_node(1, |_| ()).is_none(), "dead node is gone");
}

#[traced_test]
#[test]
fn sequential_writes_and_reads() {
    let mut sim = Simulator::new(1).expect("valid config");
    sim.enqueue_actions([
        OpRequest::write(1),
        OpRequest::write(2),
        OpRequest::write(10),
        OpRequest::read(0),
        OpRequest::read(2),
        OpRequest::read(3),
    ]);
    let ticks = sim.run();
    assert!(ticks < TICK_LIMIT);

    let expected = [
        write_ack(0),
        write_ack(1),
        write_ack(2),
        read_hit(1),
        read_hit(10),
        read_miss(),
    ];
    let outcomes = sim.outcomes();
    assert_eq!(outcomes.len(), expected.len());
    for (batch, expected) in outcomes.iter().zip(&expected) {
        assert_batch(batch, expected, 4);
    }

    // Six requests commit as six consecutive slots; every node ends on
    // the last one.
    for index in 0..4 {
        let slot = sim
            .with_node(index, |p| p.state().slot())
            .flatten()
            .expect("node decided");
        assert_eq!(slot.view, View::ZERO);
        assert_eq!(slot.req_id, ReqId(6));
    }
}

#[traced_test]
#[test]
fn continues_after_mid_run_failure() {
    let mut sim = Simulator::new(1).expect("valid config");
    sim.enqueue_actions([
        OpRequest::write(1),
        OpRequest::write(2),
        OpRequest::write(10),
        OpRequest::read(0),
        OpRequest::read(2),
        OpRequest::read(3),
    ]);
    sim.run();

    sim.destroy_node(2);
    let dead = NodeId(3);
    sim.enqueue_actions([
        OpRequest::write(1000),
        OpRequest::write(1234),
        OpRequest::write(9876),
        OpRequest::read(5),
        OpRequest::read(10),
        OpRequest::read(3),
    ]);
    let ticks = sim.run();
    assert!(ticks < TICK_LIMIT);

    let expected_second = [
        write_ack(3),
        write_ack(4),
        write_ack(5),
        read_hit(9876),
        read_miss(),
        read_hit(1000),
    ];
    let outcomes = sim.outcomes();
    assert_eq!(outcomes.len(), 12);
    for (batch, expected) in outcomes[6..].iter().zip(&expected_second) {
        assert_batch(batch, expected, 3);
        assert!(
            batch.iter().all(|r| r.replica != dead),
            "no responses from the destroyed node"
        );
    }
}

#[traced_test]
#[test]
fn client_latency_delays_but_does_not_break_agreement() {
    let mut sim = Simulator::with_config(SimConfig {
        f: 1,
        nodes: 0,
        network: NetworkConfig {
            base_latency: 2,
            jitter: 3,
            seed: 1234,
        },
    })
    .expect("valid config");
    sim.enqueue_actions([OpRequest::write(5), OpRequest::read(0)]);
    let ticks = sim.run();
    assert!(ticks < TICK_LIMIT);

    let outcomes = sim.outcomes();
    assert_eq!(outcomes.len(), 2);
    assert_batch(&outcomes[0], &write_ack(0), 4);
    assert_batch(&outcomes[1], &read_hit(5), 4);
}

#[test]
fn empty_script_finishes_immediately() {
    let mut sim = Simulator::new(1).expect("valid config");
    assert_eq!(sim.run(), 0);
    assert!(sim.outcomes().is_empty());
}

#[test]
fn oversized_cluster_answers_with_every_node() {
    // Seven nodes with f = 1: quorums stay at 2 and 3, every node commits
    // and answers.
    let mut sim = Simulator::with_config(SimConfig {
        f: 1,
        nodes: 7,
        network: NetworkConfig::default(),
    })
    .expect("valid config");
    sim.enqueue_actions([OpRequest::write(9)]);
    sim.run();

    let outcomes = sim.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_batch(&outcomes[0], &write_ack(0), 7);
}

#[test]
fn rejects_zero_fault_tolerance() {
    assert!(Simulator::new(0).is_err());
}
