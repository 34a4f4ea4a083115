//! The closed set of events that can change a [`GameState`](crate::game::state::GameState)

use serde::{Deserialize, Serialize};

use crate::game::state::{NodeId, TickerMessage};
use crate::util::vec2::Vec2;

/// A rolled disaster: where it strikes and what it looks like
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disaster {
    pub name: String,
    pub center: Vec2,
    pub radius: f32,
    pub color: String,
}

/// Every action the reducer understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Reset everything and begin a new game
    Start,
    /// One block elapsed
    Tick,
    Disaster(Disaster),
    /// Buy a node and place it at the given point
    Buy { position: Vec2 },
    /// Move an alive node
    Drag { id: NodeId, position: Vec2 },
    /// Propose an upgrade
    UpgradePop,
    /// Player approved the proposal; start clicking
    BeginChallenge,
    /// Player declined the proposal, or dismissed the result
    Reject,
    /// Node selected during a challenge
    Click { id: NodeId },
    EndChallenge,
    /// Leave the result screen
    Resume,
    /// Replace the ticker list with an already-pruned copy
    CleanupTickers(Vec<TickerMessage>),
}

impl Action {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::Start => "START",
            Action::Tick => "TICK",
            Action::Disaster(_) => "DIS",
            Action::Buy { .. } => "BUY",
            Action::Drag { .. } => "DRAG",
            Action::UpgradePop => "UPGRADE_POP",
            Action::BeginChallenge => "BEGIN_CHAL",
            Action::Reject => "REJECT",
            Action::Click { .. } => "CLICK",
            Action::EndChallenge => "END_CHAL",
            Action::Resume => "RESUME",
            Action::CleanupTickers(_) => "CLEANUP_TICKERS",
        }
    }
}
