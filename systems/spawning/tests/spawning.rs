use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use cable_rush_core::{CellCoord, Command, DeviceId, Event, RewardMultipliers};
use cable_rush_system_spawning::{
    default_levels, Config, LevelTable, SpawnContext, SpawnLevel, Spawning,
};
use cable_rush_world::{self as world, query, World};

fn certain_level(min_score: u32, max_score: u32, max_devices: u32) -> SpawnLevel {
    SpawnLevel {
        min_score,
        max_score,
        base_time_limit_secs: 5.0,
        min_download_mb: 10,
        max_download_mb: 20,
        base_coin_reward: 3,
        base_points_reward: 4,
        spawn_interval_secs: 1.0,
        spawn_weight: 1.0,
        max_simultaneous_devices: max_devices,
        multipliers: RewardMultipliers::default(),
        wiring_share: 0.0,
    }
}

fn certain_spawning(max_devices: u32) -> Spawning {
    let table = LevelTable::new(vec![certain_level(0, 100, max_devices)]).expect("valid table");
    Spawning::new(Config::new(table, 0x4d59_5df4_d0f3_3173))
}

fn advanced(millis: u64) -> Vec<Event> {
    vec![Event::TimeAdvanced {
        dt: Duration::from_millis(millis),
    }]
}

fn open_context() -> SpawnContext {
    SpawnContext {
        score: 0,
        active_devices: 0,
        free_cells: 8,
        session_over: false,
    }
}

#[test]
fn waits_for_spawn_interval() {
    let mut spawning = certain_spawning(3);
    let mut commands = Vec::new();

    spawning.handle(&advanced(600), open_context(), &mut commands);
    assert!(commands.is_empty(), "no spawn before full interval");

    spawning.handle(&advanced(400), open_context(), &mut commands);
    assert_eq!(commands.len(), 1);
    match &commands[0] {
        Command::SpawnDevice { template } => {
            assert_eq!(template.time_limit, Duration::from_secs(5));
            assert_eq!(template.base_score, 4);
            assert_eq!(template.base_gold, 3);
            assert!((10..=20).contains(&template.download_mb));
        }
        other => panic!("unexpected command emitted: {other:?}"),
    }

    commands.clear();
    spawning.handle(&advanced(500), open_context(), &mut commands);
    assert!(commands.is_empty(), "interval restarts after a spawn");
}

#[test]
fn emits_at_most_one_spawn_per_tick() {
    let mut spawning = certain_spawning(10);
    let mut commands = Vec::new();
    spawning.handle(&advanced(10_000), open_context(), &mut commands);
    assert_eq!(commands.len(), 1);
}

#[test]
fn ignores_batches_without_time() {
    let mut spawning = certain_spawning(3);
    let mut commands = Vec::new();
    spawning.handle(&advanced(2_000), open_context(), &mut commands);
    assert_eq!(commands.len(), 1);

    spawning.handle(
        &[Event::DeviceDestroyed {
            device: DeviceId::new(0),
        }],
        open_context(),
        &mut commands,
    );
    assert_eq!(commands.len(), 1);
}

#[test]
fn respects_simultaneous_device_cap() {
    let mut spawning = certain_spawning(2);
    let mut commands = Vec::new();
    let crowded = SpawnContext {
        active_devices: 2,
        ..open_context()
    };

    spawning.handle(&advanced(5_000), crowded, &mut commands);
    assert!(commands.is_empty());

    spawning.handle(&advanced(16), open_context(), &mut commands);
    assert_eq!(commands.len(), 1, "elapsed time survives a rejected spawn");
}

#[test]
fn full_grid_skips_the_tick() {
    let mut spawning = certain_spawning(5);
    let mut commands = Vec::new();
    let full = SpawnContext {
        free_cells: 0,
        ..open_context()
    };

    spawning.handle(&advanced(1_000), full, &mut commands);
    assert!(commands.is_empty());

    spawning.handle(&advanced(16), open_context(), &mut commands);
    assert_eq!(commands.len(), 1);
}

#[test]
fn zero_weight_never_spawns() {
    let mut level = certain_level(0, 100, 5);
    level.spawn_weight = 0.0;
    let table = LevelTable::new(vec![level]).expect("valid table");
    let mut spawning = Spawning::new(Config::new(table, 7));
    let mut commands = Vec::new();

    for _ in 0..100 {
        spawning.handle(&advanced(1_000), open_context(), &mut commands);
    }
    assert!(commands.is_empty());
}

#[test]
fn session_over_resets_elapsed_time() {
    let mut spawning = certain_spawning(5);
    let mut commands = Vec::new();
    let over = SpawnContext {
        session_over: true,
        ..open_context()
    };

    spawning.handle(&advanced(900), open_context(), &mut commands);
    spawning.handle(&advanced(900), over, &mut commands);
    assert!(commands.is_empty());

    spawning.handle(&advanced(500), open_context(), &mut commands);
    assert!(commands.is_empty(), "time accrued before game over is discarded");
}

#[test]
fn tracks_level_by_score() {
    let table = LevelTable::new(vec![certain_level(0, 9, 1), certain_level(10, 19, 1)])
        .expect("valid table");
    let mut spawning = Spawning::new(Config::new(table, 3));
    let mut commands = Vec::new();

    spawning.handle(&advanced(16), open_context(), &mut commands);
    assert_eq!(spawning.current_level(), Some(0));

    let scored = SpawnContext {
        score: 12,
        ..open_context()
    };
    spawning.handle(&advanced(16), scored, &mut commands);
    assert_eq!(spawning.current_level(), Some(1));

    let beyond = SpawnContext {
        score: 20,
        ..open_context()
    };
    commands.clear();
    spawning.handle(&advanced(5_000), beyond, &mut commands);
    assert_eq!(spawning.current_level(), None);
    assert!(commands.is_empty());
}

#[test]
fn level_table_loads_from_toml() {
    #[derive(serde::Deserialize)]
    struct Document {
        levels: Vec<SpawnLevel>,
    }

    let document: Document = toml::from_str(
        r#"
        [[levels]]
        min_score = 0
        max_score = 49
        base_time_limit_secs = 9.0
        min_download_mb = 10
        max_download_mb = 30
        base_coin_reward = 5
        base_points_reward = 7
        spawn_interval_secs = 2.0
        spawn_weight = 0.5
        max_simultaneous_devices = 3
        wiring_share = 0.25

        [levels.multipliers]
        score = 2.0
        "#,
    )
    .expect("parse");

    let table = LevelTable::new(document.levels).expect("valid table");
    let (_, level) = table.level_for(30).expect("level");
    assert_eq!(level.multipliers.score, 2.0);
    assert_eq!(level.multipliers.gold, 1.0);
    assert_eq!(level.wiring_share, 0.25);
}

#[test]
fn deterministic_replay_matches_between_runs() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
    assert!(
        first.spawned.len() >= 2,
        "expected the default table to spawn within two minutes"
    );
    assert_ne!(first.fingerprint(), 0);
}

fn replay() -> ReplayOutcome {
    let mut world = World::new();
    let table = LevelTable::new(default_levels()).expect("valid table");
    let mut spawning = Spawning::new(Config::new(table, 0x1234_5678));
    let mut spawned = Vec::new();

    for _ in 0..120 {
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );

        let context = SpawnContext {
            score: query::score(&world),
            active_devices: query::active_device_count(&world),
            free_cells: query::free_cell_count(&world),
            session_over: query::is_game_over(&world),
        };
        let mut commands = Vec::new();
        spawning.handle(&events, context, &mut commands);

        for command in commands {
            let mut generated = Vec::new();
            world::apply(&mut world, command, &mut generated);
            spawned.extend(generated.iter().filter_map(|event| match event {
                Event::DeviceSpawned {
                    device,
                    cell,
                    time_limit,
                    ..
                } => Some(SpawnRecord {
                    device: *device,
                    cell: *cell,
                    time_limit_millis: time_limit.as_millis(),
                }),
                _ => None,
            }));
        }
    }

    ReplayOutcome {
        spawned,
        lives: query::ledger(&world).lives(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    spawned: Vec<SpawnRecord>,
    lives: u32,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SpawnRecord {
    device: DeviceId,
    cell: CellCoord,
    time_limit_millis: u128,
}
