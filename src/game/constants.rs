/// Play-area geometry
pub mod view {
    /// Play-area width in game units
    pub const WIDTH: f32 = 800.0;
    /// Play-area height in game units
    pub const HEIGHT: f32 = 600.0;
    /// Height of the ticker banner strip along the bottom edge.
    /// Nodes never spawn under it.
    pub const BANNER_HEIGHT: f32 = 40.0;
}

/// Node constants
pub mod node {
    /// Node radius used for placement and hit-testing
    pub const RADIUS: f32 = 12.0;
    /// Nodes created by START
    pub const INITIAL_COUNT: usize = 12;
    /// Below this many alive nodes the network has collapsed
    pub const MIN_ALIVE: usize = 2;
    /// Placement retries before accepting an overlapping position
    pub const MAX_PLACEMENT_ATTEMPTS: u32 = 30;
}

/// Sats economy
pub mod economy {
    /// Price of the first purchased node; each purchase adds 1
    pub const NODE_COST_BASE: u64 = 10;
    /// Sats earned per block
    pub const TICK_REWARD: u64 = 1;
    /// Sats earned for every disaster survived
    pub const DISASTER_REWARD: u64 = 2;
    /// Sats earned for an accepted upgrade
    pub const CHALLENGE_REWARD: u64 = 50;
}

/// Upgrade proposal constants
pub mod upgrade {
    /// Proposal numbers are drawn from this inclusive range
    pub const BIP_MIN: u32 = 300;
    pub const BIP_MAX: u32 = 399;
    /// Share of alive nodes that must approve, as numerator/denominator
    pub const THRESHOLD_NUMERATOR: u32 = 1;
    pub const THRESHOLD_DENOMINATOR: u32 = 2;
}

/// Scheduler cadences in milliseconds
pub mod timing {
    pub const TICK_MS: u64 = 1_000;
    pub const DISASTER_MS: u64 = 5_000;
    pub const UPGRADE_MS: u64 = 30_000;
    /// Time allowed to click nodes once the challenge starts
    pub const CHALLENGE_MS: u64 = 5_000;
    /// How long the challenge result stays on screen
    pub const RESULT_MS: u64 = 3_000;
    /// Unanswered proposals are rejected after this long
    pub const CONFIRM_MS: u64 = 9_000;
    /// Splash effect duration after a disaster
    pub const SPLASH_MS: u64 = 1_000;
}

/// Ticker banner constants
pub mod ticker {
    /// Messages older than this are pruned
    pub const LIFESPAN_MS: u64 = 15_000;
    /// How often the pruner runs while messages exist
    pub const PRUNE_INTERVAL_MS: u64 = 2_000;
    pub const ACCEPTED_COLOR: &str = "#27ae60";
    pub const REJECTED_COLOR: &str = "#e74c3c";
    pub const COLLAPSE_COLOR: &str = "#7f0000";
}

/// A named disaster type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisasterKind {
    pub name: &'static str,
    pub radius: f32,
    pub color: &'static str,
}

/// Disasters the scheduler picks from, uniformly
pub const DISASTERS: &[DisasterKind] = &[
    DisasterKind { name: "Earthquake", radius: 120.0, color: "#c0392b" },
    DisasterKind { name: "Flood", radius: 160.0, color: "#2980b9" },
    DisasterKind { name: "Wildfire", radius: 100.0, color: "#e67e22" },
    DisasterKind { name: "Power Outage", radius: 200.0, color: "#7f8c8d" },
    DisasterKind { name: "Regulatory Ban", radius: 220.0, color: "#8e44ad" },
    DisasterKind { name: "Solar Flare", radius: 140.0, color: "#f1c40f" },
];
