#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Cable Rush session.

mod autoplay;
mod config;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use cable_rush_core::{Command, Event};
use cable_rush_system_spawning::{self as spawning, SpawnContext, Spawning};
use cable_rush_world::{self as world, query, World};
use clap::Parser;

use crate::{
    autoplay::{AutoPlayer, Observation},
    config::GameConfig,
};

const DEFAULT_SEED: u64 = 0x00c0_ffee_cab1_e5ed;

/// Headless Cable Rush simulation.
#[derive(Debug, Parser)]
#[command(name = "cable-rush", version, about)]
struct Args {
    /// TOML file describing the grid, hub, cables, levels and scripted player.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed overriding the one in the configuration file.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 1_200)]
    ticks: u32,
    /// Simulated duration of a single tick, in milliseconds.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
    /// Start a fresh session whenever the last life is lost.
    #[arg(long)]
    restart: bool,
    /// Enable debug logging unless `RUST_LOG` says otherwise.
    #[arg(long)]
    verbose: bool,
}

/// Entry point for the Cable Rush command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let seed = args.seed.or(config.seed).unwrap_or(DEFAULT_SEED);
    let table = config.level_table()?;
    let mut world =
        World::with_config(config.world.clone(), seed).context("failed to build the world")?;
    let mut spawning = Spawning::new(spawning::Config::new(table, seed.rotate_left(17)));
    let mut player = config
        .autoplay
        .enabled
        .then(|| AutoPlayer::new(config.autoplay, seed.rotate_left(41)));

    println!("{}", query::welcome_banner(&world));
    log::info!("running {} ticks of {} ms with seed {seed:#x}", args.ticks, args.tick_ms);

    let dt = Duration::from_millis(args.tick_ms);
    let mut summary = Summary::default();
    for _ in 0..args.ticks {
        let mut events = Vec::new();
        world::apply(&mut world, Command::Tick { dt }, &mut events);
        pump(&mut world, &mut spawning, player.as_mut(), events, &mut summary);

        if query::is_game_over(&world) {
            if !args.restart {
                break;
            }
            summary.record_restart(query::score(&world));
            let mut events = Vec::new();
            world::apply(&mut world, Command::ResetSession, &mut events);
            pump(&mut world, &mut spawning, player.as_mut(), events, &mut summary);
        }
    }

    summary.print(&world);
    Ok(())
}

/// Feeds events to the systems and applies their commands until they go quiet.
fn pump(
    world: &mut World,
    spawning: &mut Spawning,
    mut player: Option<&mut AutoPlayer>,
    pending_events: Vec<Event>,
    summary: &mut Summary,
) {
    let mut events = pending_events;

    loop {
        if events.is_empty() {
            break;
        }
        summary.record(&events);

        let mut commands = Vec::new();
        let context = SpawnContext {
            score: query::score(world),
            active_devices: query::active_device_count(world),
            free_cells: query::free_cell_count(world),
            session_over: query::is_game_over(world),
        };
        spawning.handle(&events, context, &mut commands);

        if let Some(player) = player.as_deref_mut() {
            let devices = query::device_view(world);
            player.handle(
                &events,
                Observation {
                    devices: &devices,
                    hub: query::hub(world),
                    ledger: query::ledger(world),
                    dragging: query::is_dragging(world),
                    connected_cables: query::connected_cable_count(world),
                },
                &mut commands,
            );
        }

        if commands.is_empty() {
            break;
        }

        events.clear();
        for command in commands {
            let mut generated_events = Vec::new();
            world::apply(world, command, &mut generated_events);
            events.extend(generated_events);
        }
    }
}

/// Running tally of notable events.
#[derive(Debug, Default)]
struct Summary {
    spawned: u32,
    connected: u32,
    completed: u32,
    failed: u32,
    expired: u32,
    upgrades: u32,
    rejected_drags: u32,
    sessions: Vec<u32>,
}

impl Summary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::DeviceSpawned { .. } => self.spawned += 1,
                Event::CableConnected { .. } => self.connected += 1,
                Event::DeviceCompleted { .. } => self.completed += 1,
                Event::DeviceFailed { .. } => self.failed += 1,
                Event::DeviceTimerExpired { .. } => self.expired += 1,
                Event::HubUpgraded { .. } => self.upgrades += 1,
                Event::CableDragRejected { reason } => {
                    log::debug!("cable drag rejected: {reason:?}");
                    self.rejected_drags += 1;
                }
                Event::GameOver => log::warn!("all lives lost"),
                _ => {}
            }
        }
    }

    fn record_restart(&mut self, final_score: u32) {
        self.sessions.push(final_score);
        log::info!("session {} ended with score {final_score}", self.sessions.len());
    }

    fn print(&self, world: &World) {
        let ledger = query::ledger(world);
        let hub = query::hub(world);
        println!("simulated time:   {:.1}s", query::elapsed(world).as_secs_f32());
        println!("devices spawned:  {}", self.spawned);
        println!("cables connected: {}", self.connected);
        println!("devices done:     {} completed, {} failed", self.completed, self.failed);
        println!("timers expired:   {}", self.expired);
        println!("drags rejected:   {}", self.rejected_drags);
        println!(
            "hub:              {} upgrades, {} MB/s, {} cables",
            self.upgrades,
            hub.internet_speed(),
            hub.max_simultaneous_cables()
        );
        if !self.sessions.is_empty() {
            println!("earlier sessions: {:?}", self.sessions);
        }
        println!(
            "final ledger:     score {}, coins {}, lives {}/{}",
            ledger.score(),
            ledger.coins(),
            ledger.lives(),
            ledger.max_lives()
        );
    }
}
