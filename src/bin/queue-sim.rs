//! Queue Simulation Driver
//!
//! Runs the matchmaking engine against in-memory collaborators with
//! randomized arrivals, departures and invitation accepts, acting as the
//! central periodic scheduler the engine expects.
//!
//! Usage:
//!   cargo run --bin queue-sim -- --help
//!   cargo run --bin queue-sim -- --ticks 300 --max-arrivals 3 --seed 7
//!   RUST_LOG=debug cargo run --bin queue-sim -- --tick-ms 50

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ready_room::config::QueueSettings;
use ready_room::external::{
    InMemoryInstanceDirectory, LogNotifier, ManualClock, NullRatingService, SessionTemplate,
    StaticPlayerDirectory,
};
use ready_room::types::{MatchVariant, ParticipantId, SessionKind, Team};
use ready_room::{EnqueueRequest, SessionQueue};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "queue-sim")]
#[command(about = "Simulated matchmaking load against the ready-room engine")]
struct Cli {
    /// Number of scheduler ticks to run
    #[arg(long, default_value = "120")]
    ticks: u64,

    /// Simulated milliseconds per tick
    #[arg(long, default_value = "1000")]
    sim_ms_per_tick: u64,

    /// Real milliseconds between ticks
    #[arg(long, default_value = "10")]
    tick_ms: u64,

    /// Maximum arrivals per tick (uniform 0..=N)
    #[arg(long, default_value = "3")]
    max_arrivals: u64,

    /// Chance an invited participant accepts on a given tick, in percent
    #[arg(long, default_value = "40")]
    accept_percent: u32,

    /// Chance a waiting participant abandons the queue, in percent
    #[arg(long, default_value = "2")]
    leave_percent: u32,

    /// Minimum participants per team
    #[arg(long, default_value = "3")]
    min_per_team: u32,

    /// Maximum participants per team
    #[arg(long, default_value = "10")]
    max_per_team: u32,

    /// RNG seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

const SESSION_TYPE: u32 = 1;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = QueueSettings::from_env()?;

    let instances = Arc::new(InMemoryInstanceDirectory::new());
    instances.register_template(SessionTemplate {
        session_type: SESSION_TYPE,
        kind: SessionKind::Standard,
        rated: false,
        min_per_team: cli.min_per_team,
        max_per_team: cli.max_per_team,
    });
    let directory = Arc::new(StaticPlayerDirectory::new());
    let clock = Arc::new(ManualClock::new(0));
    let mut queue = SessionQueue::new(
        SESSION_TYPE,
        settings,
        instances.clone(),
        directory.clone(),
        Arc::new(NullRatingService::new()),
        Arc::new(LogNotifier::new()),
        clock.clone(),
    );

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut next_id: ParticipantId = 1;
    let mut accepted: u64 = 0;
    let mut abandoned: u64 = 0;

    let mut ticker = tokio::time::interval(Duration::from_millis(cli.tick_ms.max(1)));
    for tick in 0..cli.ticks {
        ticker.tick().await;
        clock.advance(cli.sim_ms_per_tick);

        let arrivals = rng.gen_range(0..=cli.max_arrivals);
        for _ in 0..arrivals {
            let team = if rng.gen_bool(0.5) { Team::A } else { Team::B };
            directory.set_online(next_id, 0);
            queue.enqueue(
                0,
                next_id,
                None,
                EnqueueRequest {
                    team,
                    premade: false,
                    variant: MatchVariant::standard(),
                    rating: 1500,
                    matchmaking_rating: rng.gen_range(1200..1800),
                    party: None,
                },
            )?;
            next_id += 1;
        }

        // invited participants accept (entering the session takes them out
        // of the queue), waiting ones occasionally walk away
        for id in 1..next_id {
            let Some(is_invited) = queue.group_of(id).map(|e| e.is_invited()) else {
                continue;
            };
            if is_invited {
                if rng.gen_ratio(cli.accept_percent.min(100), 100) {
                    queue.remove_player(id, false);
                    accepted += 1;
                }
            } else if rng.gen_ratio(cli.leave_percent.min(100), 100) {
                queue.remove_player(id, true);
                abandoned += 1;
            }
        }

        queue.update(0, 0, None, false);
        queue.pump_timers();

        if tick % 20 == 0 {
            info!(
                tick,
                queued = queue.queued_participants(),
                instances = instances.instance_count(),
                "simulation progress"
            );
        }
    }

    let summary = serde_json::json!({
        "ticks": cli.ticks,
        "participants_seen": next_id - 1,
        "accepted": accepted,
        "abandoned": abandoned,
        "still_queued": queue.queued_participants(),
        "instances_created": instances.instance_count(),
        "instances_started": instances.started_instances().len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
