//! Performance benchmarks for match assembly

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use ready_room::config::QueueSettings;
use ready_room::external::{
    InMemoryInstanceDirectory, ManualClock, NullRatingService, RecordingNotifier, SessionTemplate,
    StaticPlayerDirectory,
};
use ready_room::types::{MatchVariant, SessionKind, Team};
use ready_room::{EnqueueRequest, SessionQueue};
use std::sync::Arc;

const SESSION_TYPE: u32 = 1;

fn create_bench_queue(solos_per_team: u64) -> SessionQueue {
    let instances = Arc::new(InMemoryInstanceDirectory::new());
    instances.register_template(SessionTemplate {
        session_type: SESSION_TYPE,
        kind: SessionKind::Standard,
        rated: false,
        min_per_team: 10,
        max_per_team: 40,
    });
    let directory = Arc::new(StaticPlayerDirectory::new());
    let mut queue = SessionQueue::new(
        SESSION_TYPE,
        QueueSettings::default(),
        instances,
        directory.clone(),
        Arc::new(NullRatingService::new()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(ManualClock::new(0)),
    );

    let mut next_id = 1u64;
    for team in [Team::A, Team::B] {
        for _ in 0..solos_per_team {
            directory.set_online(next_id, 0);
            queue
                .enqueue(
                    0,
                    next_id,
                    None,
                    EnqueueRequest {
                        team,
                        premade: false,
                        variant: MatchVariant::standard(),
                        rating: 1500,
                        matchmaking_rating: 1500,
                        party: None,
                    },
                )
                .expect("bench enqueue failed");
            next_id += 1;
        }
    }
    queue
}

fn bench_normal_assembly(c: &mut Criterion) {
    c.bench_function("normal_assembly_80_solos", |b| {
        b.iter_batched(
            || create_bench_queue(40),
            |mut queue| {
                queue.update(black_box(0), 0, None, false);
                queue
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_enqueue_remove_cycle(c: &mut Criterion) {
    c.bench_function("enqueue_remove_cycle", |b| {
        b.iter_batched(
            || create_bench_queue(40),
            |mut queue| {
                queue
                    .enqueue(
                        0,
                        10_000,
                        None,
                        EnqueueRequest {
                            team: Team::A,
                            premade: false,
                            variant: MatchVariant::standard(),
                            rating: 1500,
                            matchmaking_rating: 1500,
                            party: None,
                        },
                    )
                    .expect("bench enqueue failed");
                queue.remove_player(black_box(10_000), false);
                queue
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_normal_assembly, bench_enqueue_remove_cycle);
criterion_main!(benches);
