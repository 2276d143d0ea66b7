use crate::hand::Stage;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const MIN_ACTION_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_ACTION_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_ARCHIVE_CAPACITY: usize = 10_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} timeout of {secs}s is outside the allowed range {min}s..={max}s")]
    TimeoutOutOfRange {
        name: &'static str,
        secs: u64,
        min: u64,
        max: u64,
    },
    #[error("{0} must be non-zero")]
    ZeroInterval(&'static str),
}

/// How long each stage may wait for its pending step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub bonding: Duration,
    pub seed_commit: Duration,
    pub seed_reveal: Duration,
    pub card_commit: Duration,
    pub community_reveal: Duration,
    pub betting: Duration,
    pub showdown: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_ACTION_TIMEOUT)
    }
}

impl StageTimeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            bonding: timeout,
            seed_commit: timeout,
            seed_reveal: timeout,
            card_commit: timeout,
            community_reveal: timeout,
            betting: timeout,
            showdown: timeout,
        }
    }

    fn named(&self) -> [(&'static str, Duration); 7] {
        [
            ("bonding", self.bonding),
            ("seed_commit", self.seed_commit),
            ("seed_reveal", self.seed_reveal),
            ("card_commit", self.card_commit),
            ("community_reveal", self.community_reveal),
            ("betting", self.betting),
            ("showdown", self.showdown),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, timeout) in self.named() {
            if timeout < MIN_ACTION_TIMEOUT || timeout > MAX_ACTION_TIMEOUT {
                return Err(ConfigError::TimeoutOutOfRange {
                    name,
                    secs: timeout.as_secs(),
                    min: MIN_ACTION_TIMEOUT.as_secs(),
                    max: MAX_ACTION_TIMEOUT.as_secs(),
                });
            }
        }
        Ok(())
    }

    /// Deadline length for a stage. Street stages wait on the board reveal
    /// first and on betting afterwards. Terminal stages have none.
    pub fn for_stage(&self, stage: Stage, reveal_pending: bool) -> Option<Duration> {
        match stage {
            Stage::Waiting => Some(self.bonding),
            Stage::SeedCommit => Some(self.seed_commit),
            Stage::SeedReveal => Some(self.seed_reveal),
            Stage::CardCommit => Some(self.card_commit),
            Stage::PreFlop => Some(self.betting),
            Stage::Flop | Stage::Turn | Stage::River if reveal_pending => {
                Some(self.community_reveal)
            }
            Stage::Flop | Stage::Turn | Stage::River => Some(self.betting),
            Stage::Showdown => Some(self.showdown),
            Stage::Completed | Stage::Aborted => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub timeouts: StageTimeouts,
    /// Upper bound on a single proof verification.
    pub proof_timeout: Duration,
    /// How often the sweeper looks for overdue hands.
    pub sweep_interval: Duration,
    /// Finished hands kept before the oldest are evicted.
    pub archive_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeouts: StageTimeouts::default(),
            proof_timeout: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(1),
            archive_capacity: DEFAULT_ARCHIVE_CAPACITY,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeouts.validate()?;
        if self.proof_timeout.is_zero() {
            return Err(ConfigError::ZeroInterval("proof_timeout"));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("sweep_interval"));
        }
        if self.archive_capacity == 0 {
            return Err(ConfigError::ZeroInterval("archive_capacity"));
        }
        Ok(())
    }
}
