use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::{ticker, timing};
use crate::game::rules::{Rules, Threshold, TickerPolicy};

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid challenge threshold '{0}', expected a fraction like 1/2")]
    InvalidThreshold(String),
    #[error("Invalid ticker policy '{0}', expected 'append' or 'dedupe'")]
    InvalidTickerPolicy(String),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("BIP range {0}..={1} is empty")]
    EmptyBipRange(u32, u32),
}

/// Scheduler cadences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Block interval while playing
    pub tick: Duration,
    /// Disaster interval while playing
    pub disaster: Duration,
    /// Upgrade proposal interval while playing
    pub upgrade: Duration,
    /// Challenge length before it is scored
    pub challenge: Duration,
    /// Result screen length before play resumes
    pub result: Duration,
    /// Time to answer a proposal before it is rejected
    pub confirm: Duration,
    /// Ticker pruning cadence
    pub ticker_prune: Duration,
    /// Age at which ticker messages are dropped
    pub ticker_lifespan: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(timing::TICK_MS),
            disaster: Duration::from_millis(timing::DISASTER_MS),
            upgrade: Duration::from_millis(timing::UPGRADE_MS),
            challenge: Duration::from_millis(timing::CHALLENGE_MS),
            result: Duration::from_millis(timing::RESULT_MS),
            confirm: Duration::from_millis(timing::CONFIRM_MS),
            ticker_prune: Duration::from_millis(ticker::PRUNE_INTERVAL_MS),
            ticker_lifespan: Duration::from_millis(ticker::LIFESPAN_MS),
        }
    }
}

impl TimerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("TICK_MS", self.tick),
            ("DISASTER_MS", self.disaster),
            ("UPGRADE_MS", self.upgrade),
            ("CHALLENGE_MS", self.challenge),
            ("RESULT_MS", self.result),
            ("CONFIRM_MS", self.confirm),
            ("TICKER_PRUNE_MS", self.ticker_prune),
            ("TICKER_LIFESPAN_MS", self.ticker_lifespan),
        ];
        for (name, value) in named {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        Ok(())
    }
}

/// Game configuration
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Fixed RNG seed; entropy when unset
    pub seed: Option<u64>,
    pub rules: Rules,
    pub timers: TimerConfig,
    /// Where the high-score file lives
    pub scores_path: PathBuf,
    /// Games the headless runner plays before exiting (0 = until Ctrl+C)
    pub autopilot_games: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,
            rules: Rules::default(),
            timers: TimerConfig::default(),
            scores_path: PathBuf::from("highscores.json"),
            autopilot_games: 1,
        }
    }
}

impl GameConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(seed) = parse_env::<u64>("GAME_SEED") {
            config.seed = Some(seed);
        }

        if let Some(threshold) = parse_env::<Threshold>("CHALLENGE_THRESHOLD") {
            config.rules.threshold = threshold;
        }

        if let Some(policy) = parse_env::<TickerPolicy>("TICKER_POLICY") {
            config.rules.ticker_policy = policy;
        }

        let timers = &mut config.timers;
        for (name, slot) in [
            ("TICK_MS", &mut timers.tick),
            ("DISASTER_MS", &mut timers.disaster),
            ("UPGRADE_MS", &mut timers.upgrade),
            ("CHALLENGE_MS", &mut timers.challenge),
            ("RESULT_MS", &mut timers.result),
            ("CONFIRM_MS", &mut timers.confirm),
            ("TICKER_PRUNE_MS", &mut timers.ticker_prune),
            ("TICKER_LIFESPAN_MS", &mut timers.ticker_lifespan),
        ] {
            match parse_env::<u64>(name) {
                Some(0) => tracing::warn!("{} must be > 0, using default", name),
                Some(ms) => *slot = Duration::from_millis(ms),
                None => {}
            }
        }

        if let Ok(path) = std::env::var("SCORES_PATH") {
            config.scores_path = PathBuf::from(path);
        }

        if let Some(games) = parse_env::<u32>("AUTOPILOT_GAMES") {
            config.autopilot_games = games;
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules.threshold.validate()?;
        let (lo, hi) = self.rules.bip_range;
        if lo > hi {
            return Err(ConfigError::EmptyBipRange(lo, hi));
        }
        self.timers.validate()
    }
}

/// Read and parse an environment variable, warning and ignoring bad values
fn parse_env<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Invalid {} '{}' ({}), using default", name, raw, e);
            None
        }
    }
}
