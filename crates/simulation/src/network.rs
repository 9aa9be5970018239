//! Simulated client-side network conditions.

use pbft_fabric::Ticks;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Latency configuration for client-submitted requests.
///
/// Protocol traffic between replicas stays at zero latency; what this
/// models is the client sitting further from the cluster than the
/// replicas sit from each other. The default adds no latency at all,
/// which keeps the protocol's tick cadence exact.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Base latency applied to every client request, in ticks.
    pub base_latency: Ticks,
    /// Maximum additional jitter, in ticks. Sampled uniformly from
    /// `0..=jitter` per request.
    pub jitter: Ticks,
    /// Seed for the jitter stream. Same seed, same run.
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_latency: 0,
            jitter: 0,
            seed: 42,
        }
    }
}

/// Deterministic latency sampler.
#[derive(Debug)]
pub(crate) struct LatencyModel {
    config: NetworkConfig,
    rng: ChaCha8Rng,
}

impl LatencyModel {
    pub(crate) fn new(config: NetworkConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    /// Latency for the next request.
    pub(crate) fn sample(&mut self) -> Ticks {
        if self.config.jitter == 0 {
            return self.config.base_latency;
        }
        self.config.base_latency + self.rng.gen_range(0..=self.config.jitter)
    }
}
