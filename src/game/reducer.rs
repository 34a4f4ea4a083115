//! Game state machine
//!
//! [`reduce`] is a total function of `(state, action)`. Actions that do not
//! apply to the current phase return the input `Arc` untouched, so callers can
//! detect changes with `Arc::ptr_eq`.
//!
//! Phase flow: `Idle -> Main -> (Confirm -> Challenge -> Result -> Main) | GameOver`.

use std::sync::Arc;

use crate::game::action::{Action, Disaster};
use crate::game::constants::{node, ticker};
use crate::game::factory;
use crate::game::rules::{Rules, TickerPolicy};
use crate::game::state::{GameState, Millis, Node, NodeId, Phase, Splash, TickerMessage};
use crate::util::random::RandomSource;
use crate::util::vec2::Vec2;

/// Everything a transition may read besides the state itself
pub struct Context<'a> {
    pub now: Millis,
    pub rng: &'a mut dyn RandomSource,
    pub rules: &'a Rules,
}

/// Apply one action
pub fn reduce(state: &Arc<GameState>, action: Action, ctx: &mut Context<'_>) -> Arc<GameState> {
    // Collapse check runs before everything except START
    if !matches!(action, Action::Start)
        && !state.phase.is_dormant()
        && state.alive_count() < node::MIN_ALIVE
    {
        return update(state, collapse);
    }

    match action {
        Action::Start => start(ctx),
        Action::Tick => tick(state, ctx.rules),
        Action::Disaster(disaster) => strike(state, disaster, ctx),
        Action::Buy { position } => buy(state, position),
        Action::Drag { id, position } => drag(state, id, position),
        Action::UpgradePop => propose_upgrade(state, ctx),
        Action::BeginChallenge => begin_challenge(state),
        Action::Reject => reject(state),
        Action::Click { id } => click(state, id),
        Action::EndChallenge => end_challenge(state, ctx),
        Action::Resume => resume(state),
        Action::CleanupTickers(tickers) => cleanup_tickers(state, tickers),
    }
}

fn update(state: &Arc<GameState>, f: impl FnOnce(&mut GameState)) -> Arc<GameState> {
    let mut next = GameState::clone(state);
    f(&mut next);
    Arc::new(next)
}

fn collapse(state: &mut GameState) {
    state.phase = Phase::GameOver;
    state.run = false;
    state.overlay = Some(format!(
        "Network collapsed: fewer than {} nodes online. Reached block {}. Press START to rebuild.",
        node::MIN_ALIVE,
        state.sec
    ));
    state.clicked.clear();
    state.confirm_start = None;
    state.bip_number = None;
}

fn push_ticker(state: &mut GameState, text: String, color: &str, ctx: &mut Context<'_>) {
    state.tick_text = text.clone();
    state.tick_color = color.to_string();

    if ctx.rules.ticker_policy == TickerPolicy::SuppressDuplicates
        && state.tickers.iter().any(|t| t.text == text)
    {
        return;
    }

    let mut bytes = [0u8; 16];
    ctx.rng.fill_random(&mut bytes);
    state.tickers.push(TickerMessage {
        id: uuid::Builder::from_random_bytes(bytes).into_uuid().to_string(),
        text,
        color: color.to_string(),
        created_at: ctx.now,
    });
}

fn start(ctx: &mut Context<'_>) -> Arc<GameState> {
    Arc::new(GameState {
        nodes: factory::initial_nodes(&mut *ctx.rng),
        run: true,
        phase: Phase::Main,
        ..GameState::default()
    })
}

fn tick(state: &Arc<GameState>, rules: &Rules) -> Arc<GameState> {
    if state.phase != Phase::Main || !state.run {
        return Arc::clone(state);
    }
    update(state, |s| {
        s.sec += 1;
        s.sats += rules.tick_reward;
    })
}

fn strike(state: &Arc<GameState>, disaster: Disaster, ctx: &mut Context<'_>) -> Arc<GameState> {
    if state.phase != Phase::Main {
        return Arc::clone(state);
    }

    let mut next = GameState::clone(state);
    let mut lost = 0;
    for n in next.nodes.iter_mut().filter(|n| n.alive) {
        if n.position.distance_to(disaster.center) < disaster.radius {
            n.alive = false;
            lost += 1;
        }
    }

    next.sats += ctx.rules.disaster_reward;
    next.splash = Some(Splash {
        cx: disaster.center.x,
        cy: disaster.center.y,
        r: disaster.radius,
        t: ctx.now,
    });
    let text = match lost {
        0 => format!("{}! The network held", disaster.name),
        1 => format!("{}! 1 node offline", disaster.name),
        n => format!("{}! {} nodes offline", disaster.name, n),
    };
    push_ticker(&mut next, text, &disaster.color, ctx);

    if next.alive_count() < node::MIN_ALIVE {
        collapse(&mut next);
    }
    Arc::new(next)
}

fn buy(state: &Arc<GameState>, position: Vec2) -> Arc<GameState> {
    if state.phase != Phase::Main || !state.run || state.sats < state.node_cost {
        return Arc::clone(state);
    }
    update(state, |s| {
        s.sats -= s.node_cost;
        let id = s.next_node_id();
        s.nodes.push(Node::new(id, position));
        s.node_cost += 1;
    })
}

fn drag(state: &Arc<GameState>, id: NodeId, position: Vec2) -> Arc<GameState> {
    if state.phase.is_dormant() || !state.is_alive(id) {
        return Arc::clone(state);
    }
    update(state, |s| {
        if let Some(n) = s.get_node_mut(id) {
            n.position = position;
        }
    })
}

fn propose_upgrade(state: &Arc<GameState>, ctx: &mut Context<'_>) -> Arc<GameState> {
    if state.phase != Phase::Main {
        return Arc::clone(state);
    }
    let (lo, hi) = ctx.rules.bip_range;
    let bip = ctx.rng.range_u32(lo, hi);
    let now = ctx.now;
    update(state, |s| {
        s.run = false;
        s.phase = Phase::Confirm;
        s.bip_number = Some(bip);
        s.confirm_start = Some(now);
        s.overlay = Some(format!(
            "BIP-{} proposed. Signal support by clicking your nodes?",
            bip
        ));
    })
}

fn begin_challenge(state: &Arc<GameState>) -> Arc<GameState> {
    if state.phase != Phase::Confirm {
        return Arc::clone(state);
    }
    update(state, |s| {
        s.phase = Phase::Challenge;
        s.clicked.clear();
        s.overlay = None;
        s.confirm_start = None;
    })
}

fn reject(state: &Arc<GameState>) -> Arc<GameState> {
    if !matches!(state.phase, Phase::Confirm | Phase::Result) {
        return Arc::clone(state);
    }
    update(state, |s| {
        s.phase = Phase::Main;
        s.run = true;
        s.overlay = None;
        s.bip_number = None;
        s.confirm_start = None;
    })
}

fn click(state: &Arc<GameState>, id: NodeId) -> Arc<GameState> {
    if state.phase != Phase::Challenge || !state.is_alive(id) || state.clicked.contains(&id) {
        return Arc::clone(state);
    }
    update(state, |s| {
        s.clicked.insert(id);
    })
}

fn end_challenge(state: &Arc<GameState>, ctx: &mut Context<'_>) -> Arc<GameState> {
    if state.phase != Phase::Challenge {
        return Arc::clone(state);
    }

    let mut next = GameState::clone(state);
    let label = next.bip_label();
    let total = next.alive_count();
    let needed = ctx.rules.threshold.needed(total);
    let approvals = next.clicked.iter().filter(|id| next.is_alive(**id)).count();

    if approvals >= needed {
        next.sats += ctx.rules.challenge_reward;
        next.overlay = Some(format!(
            "{} activated with {}/{} nodes signalling. +{} sats",
            label, approvals, total, ctx.rules.challenge_reward
        ));
        push_ticker(&mut next, format!("{} accepted", label), ticker::ACCEPTED_COLOR, ctx);
    } else {
        let clicked = next.clicked.clone();
        let mut forked = 0;
        for n in next.nodes.iter_mut().filter(|n| n.alive) {
            if !clicked.contains(&n.id) {
                n.alive = false;
                forked += 1;
            }
        }

        if next.alive_count() < node::MIN_ALIVE {
            push_ticker(
                &mut next,
                format!("{} rejected — chain split, network collapsed", label),
                ticker::COLLAPSE_COLOR,
                ctx,
            );
            collapse(&mut next);
            return Arc::new(next);
        }

        next.overlay = Some(format!(
            "{} rejected: {}/{} approvals. {} nodes forked off",
            label, approvals, needed, forked
        ));
        push_ticker(
            &mut next,
            format!("{} rejected — partial hard fork", label),
            ticker::REJECTED_COLOR,
            ctx,
        );
    }

    next.bip_number = None;
    next.phase = Phase::Result;
    Arc::new(next)
}

fn resume(state: &Arc<GameState>) -> Arc<GameState> {
    if state.phase != Phase::Result {
        return Arc::clone(state);
    }
    update(state, |s| {
        s.phase = Phase::Main;
        s.run = true;
        s.overlay = None;
        s.clicked.clear();
        s.bip_number = None;
    })
}

fn cleanup_tickers(state: &Arc<GameState>, tickers: Vec<TickerMessage>) -> Arc<GameState> {
    if state.tickers == tickers {
        return Arc::clone(state);
    }
    update(state, |s| s.tickers = tickers)
}
