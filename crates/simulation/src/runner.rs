//! Deterministic simulation runner.
//!
//! The runner owns everything: the client, the replica nodes, and the
//! link handles. Nodes reference links (and links reference nodes) only
//! weakly, so dropping a node handle is how a crash is modeled.

use crate::app::AppendLog;
use crate::client::{ClientNode, ReceivedResponse, ResponseLedger};
use crate::network::{LatencyModel, NetworkConfig};
use pbft_consensus::{register_primary, ConfigError, PbftConfig, PbftNode, Role};
use pbft_fabric::{Link, LinkError, LinkHandle, Node, NodeHandle, Packet};
use pbft_types::{Message, NodeId, OpRequest};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, info};

/// Hard cap on ticks per [`Simulator::run`] call. A cluster that cannot
/// answer its script within this many ticks (dead primary, too many
/// faults) is considered stuck; there is no timeout-driven recovery to
/// wait for.
pub const TICK_LIMIT: u64 = 10_000;

/// Errors surfaced when building a simulator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// Invalid protocol configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Cluster wiring failed.
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Simulator configuration.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Tolerated fault count. Must be at least 1.
    pub f: u64,
    /// Requested node count; raised to `3f + 1` when smaller. Zero means
    /// "the minimum".
    pub nodes: usize,
    /// Client-side latency model.
    pub network: NetworkConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            f: 1,
            nodes: 0,
            network: NetworkConfig::default(),
        }
    }
}

/// Statistics collected during a simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Ticks driven across all `run` calls.
    pub ticks: u64,
    /// Client actions submitted to the cluster.
    pub requests_submitted: u64,
    /// Responses the client collected.
    pub responses_received: u64,
    /// Responses whose signature failed verification.
    pub responses_rejected: u64,
}

impl SimulationStats {
    /// Fraction of collected responses that verified.
    pub fn verification_rate(&self) -> f64 {
        if self.responses_received == 0 {
            1.0
        } else {
            1.0 - self.responses_rejected as f64 / self.responses_received as f64
        }
    }
}

/// Deterministic PBFT cluster simulation.
///
/// Builds `n` replicas (node 0 is the fixed primary) in a full mesh, with
/// the scripted client linked to every replica. `run` drives ticks until
/// the script is answered or [`TICK_LIMIT`] is hit. Given the same
/// configuration, every run is identical.
pub struct Simulator {
    client: NodeHandle<Message>,
    nodes: Vec<Option<NodeHandle<Message>>>,
    links: Vec<LinkHandle<Message>>,
    actions: VecDeque<OpRequest>,
    ledger: Rc<RefCell<ResponseLedger>>,
    latency: LatencyModel,
    ticks: u64,
    requests_submitted: u64,
}

impl Simulator {
    /// Build a minimum-size cluster tolerating `f` faults.
    pub fn new(f: u64) -> Result<Self, SimError> {
        Self::with_config(SimConfig {
            f,
            ..SimConfig::default()
        })
    }

    /// Build a cluster from an explicit configuration.
    pub fn with_config(config: SimConfig) -> Result<Self, SimError> {
        let pbft = PbftConfig::new(config.f)?;
        let n = config.nodes.max(pbft.min_cluster_size() as usize);

        let ledger = Rc::new(RefCell::new(ResponseLedger::default()));
        let client = Node::with_behavior(
            NodeId(0),
            Box::new(ClientNode {
                ledger: ledger.clone(),
            }),
        );

        let nodes: Vec<NodeHandle<Message>> = (1..=n as u64)
            .map(|id| {
                let role = if id == 1 { Role::Primary } else { Role::Replica };
                PbftNode::spawn(NodeId(id), role, pbft, Box::new(AppendLog::new()))
            })
            .collect();
        for node in &nodes {
            register_primary(node, &nodes[0]);
        }

        let mut links = Vec::new();
        for node in &nodes {
            links.push(Link::connect(&client, node)?);
        }
        for i in 0..nodes.len() - 1 {
            for j in i + 1..nodes.len() {
                links.push(Link::connect(&nodes[i], &nodes[j])?);
            }
        }

        info!(
            nodes = n,
            f = config.f,
            links = links.len(),
            "simulator built"
        );

        Ok(Self {
            client,
            nodes: nodes.into_iter().map(Some).collect(),
            links,
            actions: VecDeque::new(),
            ledger,
            latency: LatencyModel::new(config.network),
            ticks: 0,
            requests_submitted: 0,
        })
    }

    /// Append client actions to the script.
    pub fn enqueue_actions(&mut self, actions: impl IntoIterator<Item = OpRequest>) {
        self.actions.extend(actions);
    }

    /// Drive ticks until the script has one response per live node for
    /// every action, or [`TICK_LIMIT`] is reached. Returns the number of
    /// ticks this call took.
    pub fn run(&mut self) -> u64 {
        let mut ticks = 0;
        loop {
            let done = self.actions.is_empty() && self.ledger.borrow().ready();
            if done || ticks >= TICK_LIMIT {
                break;
            }
            self.tick();
            ticks += 1;
        }
        self.ticks += ticks;
        info!(ticks, total = self.ticks, "run complete");
        ticks
    }

    /// Remove a non-primary node from the simulation, modeling a crash.
    ///
    /// Peers keep their link entries; sends toward the dead node fail
    /// cleanly and its in-flight traffic is dropped on the next link
    /// tick.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or names the primary (index 0);
    /// without view change a cluster cannot survive its primary.
    pub fn destroy_node(&mut self, index: usize) {
        assert!(index < self.nodes.len(), "node index out of range");
        assert_ne!(index, 0, "the primary cannot be destroyed");
        if self.nodes[index].take().is_some() {
            info!(index, "node destroyed");
        }
    }

    /// Number of live nodes.
    pub fn alive_nodes(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Identity of the node at `index`, if it is still alive.
    pub fn node_id(&self, index: usize) -> Option<NodeId> {
        Some(self.nodes.get(index)?.as_ref()?.borrow().id())
    }

    /// Run a closure against the PBFT behavior of the node at `index`.
    /// Returns `None` for a dead or out-of-range node.
    pub fn with_node<R>(&self, index: usize, f: impl FnOnce(&PbftNode) -> R) -> Option<R> {
        let node = self.nodes.get(index)?.as_ref()?;
        let guard = node.borrow();
        let pbft = guard.behavior()?.as_any().downcast_ref::<PbftNode>()?;
        Some(f(pbft))
    }

    /// Responses grouped per request, in submission order.
    pub fn outcomes(&self) -> Vec<Vec<ReceivedResponse>> {
        self.ledger.borrow().outcomes()
    }

    /// Statistics for the run so far.
    pub fn stats(&self) -> SimulationStats {
        let ledger = self.ledger.borrow();
        SimulationStats {
            ticks: self.ticks,
            requests_submitted: self.requests_submitted,
            responses_received: ledger.responses_received(),
            responses_rejected: ledger.responses_rejected(),
        }
    }

    /// One simulated tick: links deliver, nodes process, then the client
    /// is fed its next action (if the previous one is fully answered) and
    /// ticked.
    fn tick(&mut self) {
        for link in &self.links {
            link.on_tick();
        }
        for node in self.nodes.iter().flatten() {
            node.borrow_mut().on_tick();
        }
        let ready = self.ledger.borrow().ready();
        if ready {
            if let Some(request) = self.actions.pop_front() {
                self.submit(request);
            }
        }
        self.client.borrow_mut().on_tick();
    }

    fn submit(&mut self, request: OpRequest) {
        let expected = self.alive_nodes();
        let latency = self.latency.sample();
        debug!(request = %request, expected, latency, "submitting");
        self.ledger.borrow_mut().begin(expected);
        self.client
            .borrow()
            .broadcast(&Packet::new(request.into()).with_latency(latency));
        self.requests_submitted += 1;
    }
}
