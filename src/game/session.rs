//! Game session - the single dispatch point
//!
//! One task owns the state, RNG, clock and timer table. External dispatches and
//! timer fires share one channel and are applied in arrival order. Every
//! snapshot that differs from the previous one is published on a `watch`
//! channel.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::game::action::Action;
use crate::game::clock::{Clock, TokioClock};
use crate::game::factory;
use crate::game::reducer::{reduce, Context};
use crate::game::rules::Rules;
use crate::game::scheduler::{Scheduler, TimerFire, TimerKind};
use crate::game::state::{GameState, Millis, Phase};
use crate::util::random::{make_rng, RandomSource};

/// Session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("game session has stopped")]
    Closed,
}

/// Messages on the session channel
#[derive(Debug)]
pub(crate) enum Command {
    Dispatch(Action),
    Timer(TimerFire),
    Shutdown,
}

/// Cloneable handle for the presentation side
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<Arc<GameState>>,
}

impl SessionHandle {
    /// Queue an action behind everything already dispatched
    pub fn dispatch(&self, action: Action) -> Result<(), SessionError> {
        self.tx
            .send(Command::Dispatch(action))
            .map_err(|_| SessionError::Closed)
    }

    /// Latest published state
    pub fn snapshot(&self) -> Arc<GameState> {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every published state
    pub fn subscribe(&self) -> watch::Receiver<Arc<GameState>> {
        self.state.clone()
    }

    /// Stop the session and all of its timers
    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.tx.send(Command::Shutdown).map_err(|_| SessionError::Closed)
    }
}

pub struct GameSession {
    state: Arc<GameState>,
    rules: Rules,
    rng: Box<dyn RandomSource + Send>,
    clock: Arc<dyn Clock>,
    scheduler: Scheduler,
    rx: mpsc::UnboundedReceiver<Command>,
    publisher: watch::Sender<Arc<GameState>>,
}

impl GameSession {
    /// Session with the configured seed (or entropy) on tokio's clock
    pub fn new(config: &GameConfig) -> (Self, SessionHandle) {
        Self::with_sources(
            config,
            Box::new(make_rng(config.seed)),
            Arc::new(TokioClock::new()),
        )
    }

    /// Session with explicit randomness and time sources
    pub fn with_sources(
        config: &GameConfig,
        rng: Box<dyn RandomSource + Send>,
        clock: Arc<dyn Clock>,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(GameState::new());
        let (publisher, subscriber) = watch::channel(state.clone());

        let session = Self {
            state,
            rules: config.rules.clone(),
            rng,
            clock,
            scheduler: Scheduler::new(config.timers.clone(), tx.downgrade()),
            rx,
            publisher,
        };
        let handle = SessionHandle {
            tx,
            state: subscriber,
        };
        (session, handle)
    }

    /// Start the session loop on the current runtime
    pub fn spawn(config: &GameConfig) -> (SessionHandle, JoinHandle<()>) {
        let (session, handle) = Self::new(config);
        let task = tokio::spawn(session.run());
        (handle, task)
    }

    pub fn state(&self) -> &Arc<GameState> {
        &self.state
    }

    /// Process commands until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        info!("Game session started");

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Dispatch(action) => {
                    self.apply(action);
                }
                Command::Timer(fire) => {
                    if !self.scheduler.accept(fire) {
                        debug!("Dropped stale {:?} fire (token {})", fire.kind, fire.token);
                        continue;
                    }
                    let action = self.timed_action(fire.kind);
                    self.apply(action);
                }
                Command::Shutdown => break,
            }
        }

        self.scheduler.cancel_all();
        info!("Game session stopped at block {}", self.state.sec);
    }

    /// Apply one action; returns whether the state changed
    pub fn apply(&mut self, action: Action) -> bool {
        let name = action.name();
        let now = self.clock.now_ms();
        let mut ctx = Context {
            now,
            rng: &mut *self.rng,
            rules: &self.rules,
        };
        let next = reduce(&self.state, action, &mut ctx);

        if Arc::ptr_eq(&next, &self.state) {
            debug!("{} ignored in {:?}", name, self.state.phase);
            return false;
        }

        let previous = std::mem::replace(&mut self.state, next);
        self.log_transition(name, &previous);
        self.scheduler.sync(&self.state, now);
        self.publisher.send_replace(self.state.clone());
        true
    }

    /// Build the action a timer stands for, against the current state
    fn timed_action(&mut self, kind: TimerKind) -> Action {
        match kind {
            TimerKind::Tick => Action::Tick,
            TimerKind::Disaster => Action::Disaster(factory::random_disaster(&mut *self.rng)),
            TimerKind::Upgrade => Action::UpgradePop,
            TimerKind::ChallengeTimeout => Action::EndChallenge,
            TimerKind::ResultTimeout => Action::Resume,
            TimerKind::ConfirmTimeout => Action::Reject,
            TimerKind::TickerPruner => {
                let lifespan = self.scheduler.config().ticker_lifespan.as_millis() as Millis;
                Action::CleanupTickers(self.state.live_tickers(self.clock.now_ms(), lifespan))
            }
        }
    }

    fn log_transition(&self, action: &str, previous: &GameState) {
        let state = &self.state;
        if previous.phase != state.phase {
            info!(
                "{}: {:?} -> {:?} at block {} ({} nodes alive, {} sats)",
                action,
                previous.phase,
                state.phase,
                state.sec,
                state.alive_count(),
                state.sats
            );
        }
        if state.tickers.len() > previous.tickers.len() {
            if let Some(ticker) = state.tickers.last() {
                info!("Ticker: {}", ticker.text);
            }
        }
        if state.phase == Phase::GameOver && previous.phase != Phase::GameOver {
            info!(
                "Game over at block {} with {} nodes bought",
                state.sec,
                state.nodes.len().saturating_sub(crate::game::constants::node::INITIAL_COUNT)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimerConfig;
    use crate::game::action::Disaster;
    use crate::util::vec2::Vec2;
    use std::time::Duration;
    use tokio::time::sleep;

    fn spawn_seeded(config: GameConfig) -> (SessionHandle, JoinHandle<()>) {
        let (session, handle) = GameSession::with_sources(
            &config,
            Box::new(make_rng(Some(77))),
            Arc::new(TokioClock::new()),
        );
        (handle, tokio::spawn(session.run()))
    }

    /// No disasters or proposals unless a test dispatches them
    fn quiet_config() -> GameConfig {
        GameConfig {
            timers: TimerConfig {
                disaster: Duration::from_secs(3_600),
                upgrade: Duration::from_secs(3_600),
                ..TimerConfig::default()
            },
            ..GameConfig::default()
        }
    }

    fn click_all(handle: &SessionHandle) {
        let state = handle.snapshot();
        for node in state.alive_nodes() {
            handle.dispatch(Action::Click { id: node.id }).unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_ticks() {
        let (handle, _task) = spawn_seeded(quiet_config());
        handle.dispatch(Action::Start).unwrap();

        sleep(Duration::from_millis(1_500)).await;
        let state = handle.snapshot();
        assert_eq!(state.phase, Phase::Main);
        assert_eq!(state.sec, 1);
        assert_eq!(state.sats, 1);

        sleep(Duration::from_millis(2_000)).await;
        assert_eq!(handle.snapshot().sec, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disaster_timer_fires_in_main() {
        let config = GameConfig {
            timers: TimerConfig {
                upgrade: Duration::from_secs(3_600),
                ..TimerConfig::default()
            },
            ..GameConfig::default()
        };
        let (handle, _task) = spawn_seeded(config);
        handle.dispatch(Action::Start).unwrap();

        sleep(Duration::from_millis(5_500)).await;
        let state = handle.snapshot();
        assert!(state.splash.is_some());
        assert!(!state.tickers.is_empty());
        assert!(state.sats >= 2 + 5 || state.phase == Phase::GameOver);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_proposal_is_rejected() {
        let (handle, _task) = spawn_seeded(quiet_config());
        handle.dispatch(Action::Start).unwrap();
        handle.dispatch(Action::UpgradePop).unwrap();

        sleep(Duration::from_millis(8_500)).await;
        let state = handle.snapshot();
        assert_eq!(state.phase, Phase::Confirm);
        assert_eq!(state.sec, 0, "blocks must not tick while confirming");

        sleep(Duration::from_millis(1_000)).await;
        let state = handle.snapshot();
        assert_eq!(state.phase, Phase::Main);
        assert!(state.run);
        assert!(state.bip_number.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_challenge_round_trip() {
        let (handle, _task) = spawn_seeded(quiet_config());
        handle.dispatch(Action::Start).unwrap();
        handle.dispatch(Action::UpgradePop).unwrap();
        handle.dispatch(Action::BeginChallenge).unwrap();
        sleep(Duration::from_millis(100)).await;
        click_all(&handle);

        sleep(Duration::from_millis(5_000)).await;
        let state = handle.snapshot();
        assert_eq!(state.phase, Phase::Result);
        assert_eq!(state.sats, 50);
        assert_eq!(state.alive_count(), 12);

        sleep(Duration::from_millis(3_000)).await;
        let state = handle.snapshot();
        assert_eq!(state.phase, Phase::Main);
        assert!(state.run);
        assert!(state.clicked.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_challenge_ends_game_and_stops_timers() {
        let (handle, _task) = spawn_seeded(quiet_config());
        handle.dispatch(Action::Start).unwrap();
        handle.dispatch(Action::UpgradePop).unwrap();
        handle.dispatch(Action::BeginChallenge).unwrap();

        sleep(Duration::from_millis(5_500)).await;
        let state = handle.snapshot();
        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.alive_count(), 0);

        sleep(Duration::from_secs(10)).await;
        let later = handle.snapshot();
        assert_eq!(later.phase, Phase::GameOver);
        assert_eq!(later.sec, state.sec);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timeout_never_fires() {
        let (handle, _task) = spawn_seeded(quiet_config());
        handle.dispatch(Action::Start).unwrap();
        handle.dispatch(Action::UpgradePop).unwrap();
        handle.dispatch(Action::BeginChallenge).unwrap();
        sleep(Duration::from_millis(100)).await;
        click_all(&handle);
        handle.dispatch(Action::EndChallenge).unwrap();
        handle.dispatch(Action::Resume).unwrap();

        // Second challenge starts at t=2s; its timeout is due at t=7s
        sleep(Duration::from_millis(1_900)).await;
        handle.dispatch(Action::UpgradePop).unwrap();
        handle.dispatch(Action::BeginChallenge).unwrap();

        // t=6s: the first challenge's timeout (t=5s) must not have ended this one
        sleep(Duration::from_millis(4_000)).await;
        assert_eq!(handle.snapshot().phase, Phase::Challenge);

        sleep(Duration::from_millis(1_500)).await;
        assert_ne!(handle.snapshot().phase, Phase::Challenge);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tickers_pruned_after_lifespan() {
        let (handle, _task) = spawn_seeded(quiet_config());
        handle.dispatch(Action::Start).unwrap();
        handle
            .dispatch(Action::Disaster(Disaster {
                name: "Flood".to_string(),
                center: Vec2::new(790.0, 5.0),
                radius: 1.0,
                color: "#2980b9".to_string(),
            }))
            .unwrap();

        sleep(Duration::from_millis(14_500)).await;
        assert_eq!(handle.snapshot().tickers.len(), 1);

        sleep(Duration::from_millis(2_000)).await;
        assert!(handle.snapshot().tickers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_handle() {
        let (handle, task) = spawn_seeded(quiet_config());
        handle.dispatch(Action::Start).unwrap();
        handle.shutdown().unwrap();
        task.await.unwrap();

        assert_eq!(handle.dispatch(Action::Tick), Err(SessionError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_session() {
        let (handle, task) = spawn_seeded(quiet_config());
        handle.dispatch(Action::Start).unwrap();
        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_apply_reports_changes() {
        let config = quiet_config();
        let (mut session, _handle) = GameSession::with_sources(
            &config,
            Box::new(make_rng(Some(3))),
            Arc::new(crate::game::clock::ManualClock::new(0)),
        );
        assert!(!session.apply(Action::Tick));
        assert!(session.apply(Action::Start));
        assert_eq!(session.state().phase, Phase::Main);
        assert!(!session.apply(Action::Resume));
    }
}
