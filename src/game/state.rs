//! Game state definitions
//!
//! `GameState` is treated as an immutable value: the reducer clones it into a
//! fresh `Arc` for every transition and hands back the same `Arc` for no-ops.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::game::constants::{economy, node, timing};
use crate::util::vec2::Vec2;

/// Stable node identifier
pub type NodeId = u32;

/// Milliseconds on the session clock
pub type Millis = u64;

/// A network participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Vec2,
    pub alive: bool,
}

impl Node {
    pub fn new(id: NodeId, position: Vec2) -> Self {
        Self {
            id,
            position,
            alive: true,
        }
    }

    /// Whether a point lands on this node (alive nodes only)
    pub fn hit_test(&self, point: Vec2) -> bool {
        self.alive && self.position.distance_to(point) <= node::RADIUS
    }
}

/// Transient banner message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerMessage {
    pub id: String,
    pub text: String,
    pub color: String,
    pub created_at: Millis,
}

impl TickerMessage {
    pub fn is_expired(&self, now: Millis, lifespan: Millis) -> bool {
        now.saturating_sub(self.created_at) > lifespan
    }
}

/// Visual extent of the most recent disaster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Splash {
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
    /// When the disaster fired
    pub t: Millis,
}

impl Splash {
    pub fn is_visible(&self, now: Millis) -> bool {
        now.saturating_sub(self.t) < timing::SPLASH_MS
    }
}

/// State machine discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Before the first START
    Idle,
    /// Normal play: blocks tick, disasters strike
    Main,
    /// An upgrade was proposed and awaits approval
    Confirm,
    /// Player is clicking nodes to signal approval
    Challenge,
    /// Challenge outcome on screen
    Result,
    /// Network collapsed; only START leaves this phase
    GameOver,
}

impl Phase {
    /// Phases where the collapse pre-check does not apply
    pub fn is_dormant(&self) -> bool {
        matches!(self, Phase::Idle | Phase::GameOver)
    }
}

/// Complete game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub nodes: Vec<Node>,
    pub sats: u64,
    /// Block height
    pub sec: u64,
    pub run: bool,
    pub overlay: Option<String>,
    pub splash: Option<Splash>,
    /// Last event text and color, kept for consumers that predate `tickers`
    pub tick_text: String,
    pub tick_color: String,
    pub phase: Phase,
    pub clicked: BTreeSet<NodeId>,
    pub confirm_start: Option<Millis>,
    pub tickers: Vec<TickerMessage>,
    pub node_cost: u64,
    pub bip_number: Option<u32>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            sats: 0,
            sec: 0,
            run: false,
            overlay: None,
            splash: None,
            tick_text: String::new(),
            tick_color: String::new(),
            phase: Phase::Idle,
            clicked: BTreeSet::new(),
            confirm_start: None,
            tickers: Vec::new(),
            node_cost: economy::NODE_COST_BASE,
            bip_number: None,
        }
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn alive_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.alive)
    }

    pub fn alive_count(&self) -> usize {
        self.alive_nodes().count()
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get_node(id).is_some_and(|n| n.alive)
    }

    /// Next free node id. Nodes are never removed, so the length is always fresh.
    pub fn next_node_id(&self) -> NodeId {
        self.nodes.len() as NodeId
    }

    /// Topmost alive node under a point, for presentation hit-testing
    pub fn node_at(&self, point: Vec2) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.hit_test(point))
            .map(|n| n.id)
    }

    /// Proposal label used in overlays and tickers
    pub fn bip_label(&self) -> String {
        match self.bip_number {
            Some(n) => format!("BIP-{}", n),
            None => "Upgrade".to_string(),
        }
    }

    /// Tickers that survive a pruning pass at `now`
    pub fn live_tickers(&self, now: Millis, lifespan: Millis) -> Vec<TickerMessage> {
        self.tickers
            .iter()
            .filter(|t| !t.is_expired(now, lifespan))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(created_at: Millis) -> TickerMessage {
        TickerMessage {
            id: format!("t{}", created_at),
            text: "Flood".to_string(),
            color: "#2980b9".to_string(),
            created_at,
        }
    }

    #[test]
    fn test_default_state() {
        let state = GameState::new();
        assert_eq!(state.phase, Phase::Idle);
        assert!(!state.run);
        assert_eq!(state.node_cost, economy::NODE_COST_BASE);
        assert!(state.nodes.is_empty());
    }

    #[test]
    fn test_alive_count() {
        let mut state = GameState::new();
        state.nodes.push(Node::new(0, Vec2::new(50.0, 50.0)));
        state.nodes.push(Node::new(1, Vec2::new(100.0, 50.0)));
        state.nodes.push(Node::new(2, Vec2::new(150.0, 50.0)));
        state.nodes[1].alive = false;

        assert_eq!(state.alive_count(), 2);
        assert!(state.is_alive(0));
        assert!(!state.is_alive(1));
        assert!(!state.is_alive(99));
        assert_eq!(state.next_node_id(), 3);
    }

    #[test]
    fn test_node_at_skips_dead_nodes() {
        let mut state = GameState::new();
        state.nodes.push(Node::new(0, Vec2::new(50.0, 50.0)));
        state.nodes.push(Node::new(1, Vec2::new(55.0, 50.0)));

        assert_eq!(state.node_at(Vec2::new(53.0, 50.0)), Some(1));

        state.nodes[1].alive = false;
        assert_eq!(state.node_at(Vec2::new(53.0, 50.0)), Some(0));
        assert_eq!(state.node_at(Vec2::new(300.0, 300.0)), None);
    }

    #[test]
    fn test_live_tickers() {
        let now = 100_000;
        let mut state = GameState::new();
        state.tickers.push(ticker(now - 16_000));
        state.tickers.push(ticker(now - 5_000));

        let live = state.live_tickers(now, 15_000);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].created_at, now - 5_000);
    }

    #[test]
    fn test_splash_visibility() {
        let splash = Splash { cx: 0.0, cy: 0.0, r: 10.0, t: 1_000 };
        assert!(splash.is_visible(1_500));
        assert!(!splash.is_visible(2_000));
    }

    #[test]
    fn test_bip_label() {
        let mut state = GameState::new();
        assert_eq!(state.bip_label(), "Upgrade");
        state.bip_number = Some(341);
        assert_eq!(state.bip_label(), "BIP-341");
    }

    #[test]
    fn test_serialization() {
        let mut state = GameState::new();
        state.nodes.push(Node::new(0, Vec2::new(1.0, 2.0)));
        state.clicked.insert(0);
        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: GameState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, state);
    }
}
