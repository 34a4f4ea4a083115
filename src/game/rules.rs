//! Tunable game rules read by the reducer

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;
use crate::game::constants::{economy, upgrade};

/// Share of alive nodes that must approve an upgrade, kept as a fraction so
/// `needed` is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    pub numerator: u32,
    pub denominator: u32,
}

impl Threshold {
    pub const HALF: Threshold = Threshold {
        numerator: 1,
        denominator: 2,
    };
    pub const TWO_THIRDS: Threshold = Threshold {
        numerator: 2,
        denominator: 3,
    };

    /// `ceil(total * threshold)`
    pub fn needed(&self, total: usize) -> usize {
        let num = self.numerator as usize;
        let den = self.denominator as usize;
        (total * num + den - 1) / den
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.denominator == 0 || self.numerator == 0 || self.numerator > self.denominator {
            return Err(ConfigError::InvalidThreshold(self.to_string()));
        }
        Ok(())
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold {
            numerator: upgrade::THRESHOLD_NUMERATOR,
            denominator: upgrade::THRESHOLD_DENOMINATOR,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Threshold {
    type Err = ConfigError;

    /// Parses `"1/2"` style fractions
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidThreshold(s.to_string());
        let (num, den) = s.trim().split_once('/').ok_or_else(invalid)?;
        let threshold = Threshold {
            numerator: num.trim().parse().map_err(|_| invalid())?,
            denominator: den.trim().parse().map_err(|_| invalid())?,
        };
        threshold.validate()?;
        Ok(threshold)
    }
}

/// What to do when a new ticker repeats text already on the banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickerPolicy {
    /// Every event gets its own message
    #[default]
    AlwaysAppend,
    /// Skip the message if identical text is still queued
    SuppressDuplicates,
}

impl FromStr for TickerPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" | "always" => Ok(TickerPolicy::AlwaysAppend),
            "dedupe" | "suppress" => Ok(TickerPolicy::SuppressDuplicates),
            _ => Err(ConfigError::InvalidTickerPolicy(s.to_string())),
        }
    }
}

/// Rules the reducer applies
#[derive(Debug, Clone, PartialEq)]
pub struct Rules {
    pub threshold: Threshold,
    pub challenge_reward: u64,
    pub disaster_reward: u64,
    pub tick_reward: u64,
    pub bip_range: (u32, u32),
    pub ticker_policy: TickerPolicy,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            challenge_reward: economy::CHALLENGE_REWARD,
            disaster_reward: economy::DISASTER_REWARD,
            tick_reward: economy::TICK_REWARD,
            bip_range: (upgrade::BIP_MIN, upgrade::BIP_MAX),
            ticker_policy: TickerPolicy::default(),
        }
    }
}
