//! Timer table driving the timed actions
//!
//! The set of live timers is a pure function of the game state
//! ([`desired_timers`]). After every state change the session calls
//! [`Scheduler::sync`], which aborts registrations whose key no longer matches
//! and spawns the missing ones. Each registration carries a token; a fire whose
//! token is no longer in the table was already cancelled and is dropped by
//! [`Scheduler::accept`].

use std::time::Duration;

use hashbrown::HashMap;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::debug;

use crate::config::TimerConfig;
use crate::game::session::Command;
use crate::game::state::{GameState, Millis, Phase};

/// Every timer the scheduler can own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    Tick,
    Disaster,
    Upgrade,
    ChallengeTimeout,
    ResultTimeout,
    ConfirmTimeout,
    TickerPruner,
}

/// What a registration is tied to. A change of key means a fresh timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKey {
    Phase(Phase),
    ConfirmStart(Millis),
    Tickers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Every(Duration),
    Once(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    pub kind: TimerKind,
    pub key: TimerKey,
    pub schedule: Schedule,
}

/// A timer went off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFire {
    pub kind: TimerKind,
    pub token: u64,
}

/// Timers that should be live for `state` at `now`
pub fn desired_timers(state: &GameState, config: &TimerConfig, now: Millis) -> Vec<TimerSpec> {
    let mut specs = Vec::new();
    let phase_key = TimerKey::Phase(state.phase);

    match state.phase {
        Phase::Main => {
            specs.push(TimerSpec {
                kind: TimerKind::Tick,
                key: phase_key,
                schedule: Schedule::Every(config.tick),
            });
            specs.push(TimerSpec {
                kind: TimerKind::Disaster,
                key: phase_key,
                schedule: Schedule::Every(config.disaster),
            });
            specs.push(TimerSpec {
                kind: TimerKind::Upgrade,
                key: phase_key,
                schedule: Schedule::Every(config.upgrade),
            });
        }
        Phase::Confirm => {
            // Deadline counts from confirm_start, not from registration
            let started = state.confirm_start.unwrap_or(now);
            let elapsed = Duration::from_millis(now.saturating_sub(started));
            specs.push(TimerSpec {
                kind: TimerKind::ConfirmTimeout,
                key: TimerKey::ConfirmStart(started),
                schedule: Schedule::Once(config.confirm.saturating_sub(elapsed)),
            });
        }
        Phase::Challenge => specs.push(TimerSpec {
            kind: TimerKind::ChallengeTimeout,
            key: phase_key,
            schedule: Schedule::Once(config.challenge),
        }),
        Phase::Result => specs.push(TimerSpec {
            kind: TimerKind::ResultTimeout,
            key: phase_key,
            schedule: Schedule::Once(config.result),
        }),
        Phase::Idle | Phase::GameOver => {}
    }

    if !state.tickers.is_empty() {
        specs.push(TimerSpec {
            kind: TimerKind::TickerPruner,
            key: TimerKey::Tickers,
            schedule: Schedule::Every(config.ticker_prune),
        });
    }

    specs
}

struct Registration {
    key: TimerKey,
    token: u64,
    handle: JoinHandle<()>,
}

/// Owns the live timer tasks for one session
pub struct Scheduler {
    config: TimerConfig,
    table: HashMap<TimerKind, Registration>,
    next_token: u64,
    sink: WeakUnboundedSender<Command>,
}

impl Scheduler {
    /// Fires are delivered to `sink`; the scheduler never keeps the session
    /// channel open on its own.
    pub(crate) fn new(config: TimerConfig, sink: WeakUnboundedSender<Command>) -> Self {
        Self {
            config,
            table: HashMap::new(),
            next_token: 1,
            sink,
        }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Bring the timer table in line with `state`
    pub fn sync(&mut self, state: &GameState, now: Millis) {
        let desired = desired_timers(state, &self.config, now);

        let stale: Vec<TimerKind> = self
            .table
            .iter()
            .filter(|(kind, reg)| !desired.iter().any(|d| d.kind == **kind && d.key == reg.key))
            .map(|(kind, _)| *kind)
            .collect();
        for kind in stale {
            if let Some(reg) = self.table.remove(&kind) {
                reg.handle.abort();
                debug!("Cancelled {:?} timer (token {})", kind, reg.token);
            }
        }

        for spec in desired {
            if !self.table.contains_key(&spec.kind) {
                self.register(spec);
            }
        }
    }

    /// Whether a fire belongs to a live registration.
    ///
    /// One-shot registrations stay in the table after firing until their key
    /// goes stale, so they cannot be re-armed by a no-op dispatch.
    pub fn accept(&self, fire: TimerFire) -> bool {
        self.table
            .get(&fire.kind)
            .is_some_and(|reg| reg.token == fire.token)
    }

    /// Kinds currently registered, sorted
    pub fn active(&self) -> Vec<TimerKind> {
        let mut kinds: Vec<TimerKind> = self.table.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn cancel_all(&mut self) {
        for (kind, reg) in self.table.drain() {
            reg.handle.abort();
            debug!("Cancelled {:?} timer (token {})", kind, reg.token);
        }
    }

    fn register(&mut self, spec: TimerSpec) {
        let token = self.next_token;
        self.next_token += 1;

        let fire = TimerFire {
            kind: spec.kind,
            token,
        };
        let handle = spawn_timer(self.sink.clone(), fire, spec.schedule);
        debug!("Registered {:?} timer {:?} (token {})", spec.kind, spec.schedule, token);

        self.table.insert(
            spec.kind,
            Registration {
                key: spec.key,
                token,
                handle,
            },
        );
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn spawn_timer(
    sink: WeakUnboundedSender<Command>,
    fire: TimerFire,
    schedule: Schedule,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match schedule {
            Schedule::Once(after) => {
                sleep(after).await;
                if let Some(tx) = sink.upgrade() {
                    let _ = tx.send(Command::Timer(fire));
                }
            }
            Schedule::Every(period) => {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    let Some(tx) = sink.upgrade() else { break };
                    if tx.send(Command::Timer(fire)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::TickerMessage;
    use tokio::sync::mpsc;

    fn state_in(phase: Phase) -> GameState {
        GameState {
            phase,
            run: phase == Phase::Main,
            ..GameState::default()
        }
    }

    fn kinds(specs: &[TimerSpec]) -> Vec<TimerKind> {
        let mut kinds: Vec<TimerKind> = specs.iter().map(|s| s.kind).collect();
        kinds.sort();
        kinds
    }

    fn with_ticker(mut state: GameState) -> GameState {
        state.tickers.push(TickerMessage {
            id: "a".to_string(),
            text: "Flood! The network held".to_string(),
            color: "#2980b9".to_string(),
            created_at: 0,
        });
        state
    }

    #[test]
    fn test_no_timers_when_idle_or_over() {
        let config = TimerConfig::default();
        assert!(desired_timers(&state_in(Phase::Idle), &config, 0).is_empty());
        assert!(desired_timers(&state_in(Phase::GameOver), &config, 0).is_empty());
    }

    #[test]
    fn test_main_runs_repeating_timers() {
        let config = TimerConfig::default();
        let specs = desired_timers(&state_in(Phase::Main), &config, 0);
        assert_eq!(
            kinds(&specs),
            vec![TimerKind::Tick, TimerKind::Disaster, TimerKind::Upgrade]
        );
        let tick = specs.iter().find(|s| s.kind == TimerKind::Tick).unwrap();
        assert_eq!(tick.schedule, Schedule::Every(Duration::from_secs(1)));
    }

    #[test]
    fn test_confirm_deadline_counts_from_confirm_start() {
        let config = TimerConfig::default();
        let mut state = state_in(Phase::Confirm);
        state.confirm_start = Some(1_000);

        let specs = desired_timers(&state, &config, 4_000);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].kind, TimerKind::ConfirmTimeout);
        assert_eq!(specs[0].key, TimerKey::ConfirmStart(1_000));
        assert_eq!(specs[0].schedule, Schedule::Once(Duration::from_millis(6_000)));

        // Past the deadline: fire immediately
        let late = desired_timers(&state, &config, 20_000);
        assert_eq!(late[0].schedule, Schedule::Once(Duration::ZERO));
    }

    #[test]
    fn test_challenge_and_result_timeouts() {
        let config = TimerConfig::default();
        let challenge = desired_timers(&state_in(Phase::Challenge), &config, 0);
        assert_eq!(challenge[0].kind, TimerKind::ChallengeTimeout);
        assert_eq!(challenge[0].schedule, Schedule::Once(Duration::from_secs(5)));

        let result = desired_timers(&state_in(Phase::Result), &config, 0);
        assert_eq!(result[0].kind, TimerKind::ResultTimeout);
        assert_eq!(result[0].schedule, Schedule::Once(Duration::from_secs(3)));
    }

    #[test]
    fn test_pruner_follows_tickers_in_any_phase() {
        let config = TimerConfig::default();
        for phase in [Phase::Main, Phase::Challenge, Phase::GameOver] {
            let specs = desired_timers(&with_ticker(state_in(phase)), &config, 0);
            assert!(specs.iter().any(|s| s.kind == TimerKind::TickerPruner));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_swaps_timers_on_phase_change() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(TimerConfig::default(), tx.downgrade());

        scheduler.sync(&state_in(Phase::Main), 0);
        assert_eq!(
            scheduler.active(),
            vec![TimerKind::Tick, TimerKind::Disaster, TimerKind::Upgrade]
        );

        let mut confirm = state_in(Phase::Confirm);
        confirm.confirm_start = Some(0);
        scheduler.sync(&confirm, 0);
        assert_eq!(scheduler.active(), vec![TimerKind::ConfirmTimeout]);

        scheduler.sync(&state_in(Phase::GameOver), 0);
        assert!(scheduler.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_rejects_stale_tokens() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(TimerConfig::default(), tx.downgrade());

        scheduler.sync(&state_in(Phase::Challenge), 0);
        let first = match rx.recv().await {
            Some(Command::Timer(fire)) => fire,
            _ => panic!("expected a timer fire"),
        };
        assert_eq!(first.kind, TimerKind::ChallengeTimeout);
        assert!(scheduler.accept(first));

        // Leave and re-enter: the old token is dead
        scheduler.sync(&state_in(Phase::Result), 0);
        scheduler.sync(&state_in(Phase::Challenge), 0);
        assert!(!scheduler.accept(first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_key_keeps_registration() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(TimerConfig::default(), tx.downgrade());

        let state = with_ticker(state_in(Phase::Main));
        scheduler.sync(&state, 0);
        let token = scheduler.table[&TimerKind::TickerPruner].token;

        let mut more = state.clone();
        more.sec = 5;
        scheduler.sync(&more, 500);
        assert_eq!(scheduler.table[&TimerKind::TickerPruner].token, token);
    }
}
