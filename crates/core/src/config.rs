//! Roll-DPoS consensus configuration.

use std::time::Duration;
use thiserror::Error;

/// Consensus configuration.
///
/// Timing constants, committee sizing, and liveness switches. The YAML layer
/// that populates this from node configuration lives outside the core.
#[derive(Debug, Clone)]
pub struct RollDposConfig {
    /// Retry period for `RollDelegates` when the local node is not in the
    /// committee (or epoch-start work failed).
    pub delegate_interval: Duration,

    /// Target round cadence. A new round starts this long after the last
    /// block's creation time.
    pub proposer_interval: Duration,

    /// Maximum age at which an event with no matching transition is
    /// redelivered instead of dropped.
    pub unmatched_event_ttl: Duration,

    /// Delay used when redelivering an unmatched event.
    pub unmatched_event_interval: Duration,

    /// Overall wall-clock budget for a round. Advisory; not enforced by the
    /// state machine.
    pub round_start_ttl: Duration,

    /// Timeout while awaiting a block proposal.
    pub accept_propose_ttl: Duration,

    /// Timeout while awaiting proposal endorsements.
    pub accept_proposal_endorse_ttl: Duration,

    /// Timeout while awaiting commit endorsements.
    pub accept_commit_endorse_ttl: Duration,

    /// Startup grace before the first `RollDelegates`.
    pub delay: Duration,

    /// Rounds per epoch per delegate slot.
    pub num_sub_epochs: u32,

    /// Bounded event queue capacity.
    pub event_chan_size: usize,

    /// Committee size.
    pub num_delegates: usize,

    /// On commit-quorum failure, commit a dummy block to advance height.
    pub enable_dummy_block: bool,

    /// Use clock time rather than height for proposer selection. Requires
    /// `enable_dummy_block`.
    pub time_based_rotation: bool,
}

impl Default for RollDposConfig {
    fn default() -> Self {
        Self {
            delegate_interval: Duration::from_secs(10),
            proposer_interval: Duration::from_secs(10),
            unmatched_event_ttl: Duration::from_secs(3),
            unmatched_event_interval: Duration::from_millis(100),
            round_start_ttl: Duration::from_secs(10),
            accept_propose_ttl: Duration::from_secs(1),
            accept_proposal_endorse_ttl: Duration::from_secs(1),
            accept_commit_endorse_ttl: Duration::from_secs(1),
            delay: Duration::from_secs(5),
            num_sub_epochs: 1,
            event_chan_size: 10_000,
            num_delegates: 21,
            enable_dummy_block: true,
            time_based_rotation: false,
        }
    }
}

impl RollDposConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the committee size.
    pub fn with_num_delegates(mut self, num_delegates: usize) -> Self {
        self.num_delegates = num_delegates;
        self
    }

    /// Set the number of sub-epochs.
    pub fn with_num_sub_epochs(mut self, num_sub_epochs: u32) -> Self {
        self.num_sub_epochs = num_sub_epochs;
        self
    }

    /// Set the target round cadence.
    pub fn with_proposer_interval(mut self, interval: Duration) -> Self {
        self.proposer_interval = interval;
        self
    }

    /// Set the `RollDelegates` retry period.
    pub fn with_delegate_interval(mut self, interval: Duration) -> Self {
        self.delegate_interval = interval;
        self
    }

    /// Set the startup grace period.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set all three phase timeouts at once.
    pub fn with_phase_ttls(mut self, propose: Duration, endorse: Duration, commit: Duration) -> Self {
        self.accept_propose_ttl = propose;
        self.accept_proposal_endorse_ttl = endorse;
        self.accept_commit_endorse_ttl = commit;
        self
    }

    /// Set the unmatched-event redelivery window and interval.
    pub fn with_unmatched_event(mut self, ttl: Duration, interval: Duration) -> Self {
        self.unmatched_event_ttl = ttl;
        self.unmatched_event_interval = interval;
        self
    }

    /// Enable or disable dummy blocks.
    pub fn with_enable_dummy_block(mut self, enable: bool) -> Self {
        self.enable_dummy_block = enable;
        self
    }

    /// Enable or disable time-based proposer rotation.
    pub fn with_time_based_rotation(mut self, enable: bool) -> Self {
        self.time_based_rotation = enable;
        self
    }

    /// Set the event queue capacity.
    pub fn with_event_chan_size(mut self, size: usize) -> Self {
        self.event_chan_size = size;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_delegates == 0 {
            return Err(ConfigError::ZeroDelegates);
        }
        if self.event_chan_size == 0 {
            return Err(ConfigError::ZeroEventChanSize);
        }
        if self.num_sub_epochs == 0 {
            return Err(ConfigError::ZeroSubEpochs);
        }
        if self.time_based_rotation && !self.enable_dummy_block {
            return Err(ConfigError::TimeRotationNeedsDummyBlocks);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("committee size must be greater than 0")]
    ZeroDelegates,
    #[error("event queue capacity must be greater than 0")]
    ZeroEventChanSize,
    #[error("number of sub-epochs must be at least 1")]
    ZeroSubEpochs,
    #[error("time-based rotation requires dummy blocks to be enabled")]
    TimeRotationNeedsDummyBlocks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(RollDposConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_delegates_rejected() {
        let cfg = RollDposConfig::default().with_num_delegates(0);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroDelegates));
    }

    #[test]
    fn test_time_rotation_requires_dummy_blocks() {
        let cfg = RollDposConfig::default()
            .with_time_based_rotation(true)
            .with_enable_dummy_block(false);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TimeRotationNeedsDummyBlocks)
        );

        let cfg = RollDposConfig::default()
            .with_time_based_rotation(true)
            .with_enable_dummy_block(true);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_chan_size_rejected() {
        let cfg = RollDposConfig::default().with_event_chan_size(0);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroEventChanSize));
    }
}
