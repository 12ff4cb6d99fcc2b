use std::time::Duration;

use cable_rush_core::{
    Command, DeviceKind, DeviceState, DeviceTemplate, DragRejection, Event, RewardMultipliers,
    UpgradeError, UpgradeTrack,
};
use cable_rush_world::{
    self as world,
    config::{GridConfig, WorldConfig},
    query, World,
};
use glam::Vec3;

fn download(limit: Duration) -> DeviceTemplate {
    DeviceTemplate {
        kind: DeviceKind::Download,
        time_limit: limit,
        base_score: 10,
        base_gold: 8,
        download_mb: 100,
        multipliers: RewardMultipliers::default(),
    }
}

fn tiny_world(max_lives: u32) -> World {
    let config = WorldConfig {
        grid: GridConfig {
            columns: 3,
            rows: 3,
            cell_size: 1.0,
            center: Vec3::ZERO,
        },
        max_lives,
        ..WorldConfig::default()
    };
    World::with_config(config, 11).expect("valid config")
}

fn tick(world: &mut World, dt: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt }, &mut events);
    events
}

fn spawn(world: &mut World, template: DeviceTemplate) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::SpawnDevice { template }, &mut events);
    events
}

#[test]
fn timer_expires_exactly_once_on_fifth_tick() {
    let mut world = tiny_world(3);
    let _ = spawn(&mut world, download(Duration::from_secs(5)));
    let device = query::device_view(&world)
        .iter()
        .next()
        .map(|snapshot| snapshot.id)
        .expect("device");

    let mut expirations = 0;
    let mut previous = Duration::from_secs(5);
    for step in 1..=6 {
        let events = tick(&mut world, Duration::from_secs(1));
        expirations += events
            .iter()
            .filter(|event| matches!(event, Event::DeviceTimerExpired { .. }))
            .count();

        match step {
            1..=4 => {
                let snapshot = query::device(&world, device).expect("device alive");
                assert_eq!(snapshot.state, DeviceState::Disconnected);
                assert!(snapshot.remaining < previous, "timer must strictly decrease");
                previous = snapshot.remaining;
            }
            5 => {
                let snapshot = query::device(&world, device).expect("device lingers");
                assert_eq!(snapshot.state, DeviceState::Failed);
                assert_eq!(snapshot.remaining, Duration::ZERO);
                assert!(events.contains(&Event::LivesChanged { lives: 2 }));
            }
            _ => {
                assert!(events.contains(&Event::DeviceDestroyed { device }));
                assert!(query::device(&world, device).is_none());
            }
        }
    }

    assert_eq!(expirations, 1);
    assert_eq!(query::ledger(&world).lives(), 2);
}

#[test]
fn exhausted_grid_recovers_the_freed_cell() {
    let mut world = tiny_world(3);
    for _ in 0..8 {
        let events = spawn(&mut world, download(Duration::from_secs(30)));
        assert_eq!(events.len(), 1);
    }
    assert_eq!(query::free_cell_count(&world), 0);
    assert!(spawn(&mut world, download(Duration::from_secs(30))).is_empty());

    let victim = query::device_view(&world)
        .iter()
        .nth(3)
        .cloned()
        .expect("device");
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ForceDestroyDevice { device: victim.id },
        &mut events,
    );
    assert_eq!(query::free_cell_count(&world), 1);

    let events = spawn(&mut world, download(Duration::from_secs(30)));
    match events.as_slice() {
        [Event::DeviceSpawned { cell, position, .. }] => {
            assert_eq!(*cell, victim.cell);
            assert_eq!(*position, victim.position);
        }
        other => panic!("unexpected events: {other:?}"),
    }

    let grid = query::grid(&world);
    assert!(grid.is_occupied(grid.center_cell()));
}

#[test]
fn losing_last_life_ends_the_session_until_reset() {
    let mut world = tiny_world(1);
    let _ = spawn(&mut world, download(Duration::from_millis(500)));

    let events = tick(&mut world, Duration::from_secs(1));
    assert!(events.contains(&Event::LivesChanged { lives: 0 }));
    assert_eq!(
        events
            .iter()
            .filter(|event| **event == Event::GameOver)
            .count(),
        1
    );
    assert!(query::is_game_over(&world));

    let mut events = Vec::new();
    world::apply(&mut world, Command::ClickHub, &mut events);
    assert_eq!(
        events,
        vec![Event::CableDragRejected {
            reason: DragRejection::SessionOver
        }]
    );
    assert!(spawn(&mut world, download(Duration::from_secs(5))).is_empty());

    let mut events = Vec::new();
    world::apply(&mut world, Command::ResetSession, &mut events);
    assert_eq!(events.last(), Some(&Event::SessionReset));
    assert!(!query::is_game_over(&world));
    assert_eq!(query::active_device_count(&world), 0);
    assert_eq!(query::free_cell_count(&world), 8);
    assert_eq!(query::elapsed(&world), Duration::ZERO);
}

#[test]
fn zero_dt_pauses_timers() {
    let mut world = tiny_world(3);
    let _ = spawn(&mut world, download(Duration::from_secs(2)));

    for _ in 0..10 {
        let _ = tick(&mut world, Duration::ZERO);
    }

    let snapshot = query::device_view(&world)
        .into_vec()
        .pop()
        .expect("device");
    assert_eq!(snapshot.remaining, Duration::from_secs(2));
}

#[test]
fn extra_time_extends_waiting_devices() {
    let mut world = tiny_world(3);
    let _ = spawn(&mut world, download(Duration::from_secs(5)));
    let device = query::device_view(&world)
        .iter()
        .next()
        .map(|snapshot| snapshot.id)
        .expect("device");
    let _ = tick(&mut world, Duration::from_secs(3));

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::AddExtraTime {
            device,
            extra: Duration::from_secs(2),
        },
        &mut events,
    );

    assert!(events.is_empty());
    let snapshot = query::device(&world, device).expect("device");
    assert_eq!(snapshot.remaining, Duration::from_secs(4));
}

#[test]
fn hub_upgrades_require_coins() {
    let mut world = tiny_world(3);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::UpgradeHub {
            track: UpgradeTrack::Cables,
        },
        &mut events,
    );

    assert_eq!(
        events,
        vec![Event::HubUpgradeRejected {
            track: UpgradeTrack::Cables,
            reason: UpgradeError::InsufficientCoins,
        }]
    );
    assert_eq!(query::hub(&world).max_simultaneous_cables(), 2);
}
