//! Protocol configuration.

/// Errors surfaced when building a [`PbftConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Operational nodes must tolerate at least one fault.
    #[error("fault tolerance must be at least 1 (got {0})")]
    FaultToleranceTooLow(u64),
}

/// PBFT configuration for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PbftConfig {
    /// Number of faulty nodes the cluster tolerates.
    pub f: u64,
}

impl PbftConfig {
    /// Build a configuration, rejecting `f < 1`.
    ///
    /// The protocol state machine itself tolerates f = 0 (a single
    /// self-vote then advances every phase), but a cluster built that way
    /// replicates nothing, so operational configurations refuse it.
    pub fn new(f: u64) -> Result<Self, ConfigError> {
        if f < 1 {
            return Err(ConfigError::FaultToleranceTooLow(f));
        }
        Ok(Self { f })
    }

    /// Minimum cluster size for this fault tolerance.
    pub fn min_cluster_size(&self) -> u64 {
        3 * self.f + 1
    }
}

impl Default for PbftConfig {
    fn default() -> Self {
        Self { f: 1 }
    }
}
