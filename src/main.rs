//! Headless runner: plays the game with a simple autopilot and logs it

use anyhow::Context as _;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use node_survival::config::GameConfig;
use node_survival::game::action::Action;
use node_survival::game::factory::random_node_position;
use node_survival::game::session::{GameSession, SessionHandle};
use node_survival::game::state::Phase;
use node_survival::scores::HighScores;
use node_survival::util::random::make_rng;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Node Survival v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = GameConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: threshold={}, ticker policy={:?}, seed={:?}, games={}",
        config.rules.threshold, config.rules.ticker_policy, config.seed, config.autopilot_games
    );

    let mut scores = match HighScores::load(&config.scores_path) {
        Ok(scores) => scores,
        Err(e) => {
            warn!("Ignoring high scores at {}: {}", config.scores_path.display(), e);
            HighScores::default()
        }
    };
    info!(
        "High scores: block {}, {} nodes alive",
        scores.best_height, scores.best_alive
    );

    let (handle, task) = GameSession::spawn(&config);

    // Shutdown signal handler
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = autopilot(&handle, &config, &mut scores) => {
            if let Err(e) = result {
                error!("Autopilot error: {}", e);
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    // Cleanup
    handle.shutdown().ok();
    task.await.context("game session task failed")?;
    scores
        .save(&config.scores_path)
        .with_context(|| format!("saving high scores to {}", config.scores_path.display()))?;
    info!(
        "High scores saved: block {}, {} nodes alive",
        scores.best_height, scores.best_alive
    );

    Ok(())
}

/// Approve every upgrade, click every node, buy whenever affordable
async fn autopilot(
    handle: &SessionHandle,
    config: &GameConfig,
    scores: &mut HighScores,
) -> anyhow::Result<()> {
    let mut rx = handle.subscribe();
    let mut rng = make_rng(config.seed.map(|seed| seed.wrapping_add(1)));
    let mut last_phase = Phase::Idle;
    let mut games = 0u32;

    handle.dispatch(Action::Start)?;

    loop {
        rx.changed().await?;
        let state = rx.borrow_and_update().clone();
        let entered = state.phase != last_phase;
        last_phase = state.phase;

        if scores.record(&state) {
            info!(
                "New record: block {}, {} nodes alive",
                scores.best_height, scores.best_alive
            );
        }

        match state.phase {
            Phase::Confirm if entered => handle.dispatch(Action::BeginChallenge)?,
            Phase::Challenge => {
                // One click per update; the next snapshot triggers the next click
                if let Some(node) = state.alive_nodes().find(|n| !state.clicked.contains(&n.id)) {
                    handle.dispatch(Action::Click { id: node.id })?;
                }
            }
            Phase::Main if state.run && state.sats >= state.node_cost => {
                let position = random_node_position(&mut rng);
                handle.dispatch(Action::Buy { position })?;
            }
            Phase::GameOver if entered => {
                games += 1;
                info!(
                    "Game {} over at block {} ({} nodes ever online)",
                    games,
                    state.sec,
                    state.nodes.len()
                );
                if config.autopilot_games != 0 && games >= config.autopilot_games {
                    return Ok(());
                }
                handle.dispatch(Action::Start)?;
            }
            _ => {}
        }
    }
}
