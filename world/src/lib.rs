#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Cable Rush.

pub mod cables;
pub mod config;
pub mod device;
pub mod grid;
pub mod hub;
pub mod ledger;

use std::time::Duration;

use cable_rush_core::{
    Command, DeviceId, DeviceTemplate, DragRejection, Event, UpgradeTrack, WELCOME_BANNER,
};
use cable_rush_system_cable_geometry::{CableGeometry, HubPose};
use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    cables::ConnectionOrchestrator,
    config::{ConfigError, WorldConfig},
    device::{device_view, Device, Transition},
    grid::GridAllocator,
    hub::Hub,
    ledger::Ledger,
};

const DEFAULT_WORLD_SEED: u64 = 0x42f0_e1eb_d4a5_3c21;

/// Represents the authoritative Cable Rush world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: WorldConfig,
    grid: GridAllocator,
    hub: Hub,
    ledger: Ledger,
    devices: Vec<Device>,
    orchestrator: ConnectionOrchestrator,
    rng: ChaCha8Rng,
    next_device_id: u32,
    elapsed: Duration,
    game_over_announced: bool,
}

impl World {
    /// Creates a world with the default layout and seed.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default(), DEFAULT_WORLD_SEED)
    }

    /// Creates a world from a validated configuration.
    ///
    /// `seed` drives grid cell selection.
    pub fn with_config(config: WorldConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, seed))
    }

    fn build(config: WorldConfig, seed: u64) -> Self {
        let grid = GridAllocator::new(
            config.grid.columns,
            config.grid.rows,
            config.grid.cell_size,
            config.grid.center,
        );
        let hub = Hub::new(
            HubPose::new(grid.center(), config.hub.forward),
            config.hub.speed.clone(),
            config.hub.cables.clone(),
        );
        let orchestrator = ConnectionOrchestrator::new(CableGeometry::new(config.cables));
        log::info!(
            "world ready: {}x{} grid, {} free cells",
            grid.columns(),
            grid.rows(),
            grid.free_cell_count()
        );
        Self {
            banner: WELCOME_BANNER,
            ledger: Ledger::new(config.max_lives),
            grid,
            hub,
            devices: Vec::new(),
            orchestrator,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_device_id: 0,
            elapsed: Duration::ZERO,
            game_over_announced: false,
            config,
        }
    }

    fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.iter_mut().find(|device| device.id() == id)
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.elapsed = self.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        let speed = self.hub.internet_speed();
        let mut transitions = Vec::new();
        for device in &mut self.devices {
            if let Some(transition) = device.tick(dt, speed, out_events) {
                transitions.push((device.id(), transition));
            }
        }

        for (id, transition) in transitions {
            self.settle(id, transition, out_events);
        }

        if self.orchestrator.is_dragging() {
            let view = device_view(&self.devices);
            let _ = self.orchestrator.refresh(self.hub.pose(), &view);
        }
    }

    fn settle(&mut self, id: DeviceId, transition: Transition, out_events: &mut Vec<Event>) {
        match transition {
            Transition::Expired => self.lose_life(out_events),
            Transition::Completed { score, gold } => {
                self.ledger.add_rewards(score, gold);
                log::debug!("device {} completed: +{score} score, +{gold} coins", id.get());
            }
            Transition::Failed => {
                log::debug!("device {} failed its minigame", id.get());
            }
            Transition::DestructionDue => self.destroy_device(id, out_events),
        }
    }

    fn lose_life(&mut self, out_events: &mut Vec<Event>) {
        let Some(lives) = self.ledger.lose_life() else {
            return;
        };
        out_events.push(Event::LivesChanged { lives });
        if lives == 0 && !self.game_over_announced {
            self.game_over_announced = true;
            log::info!("game over after {:.1}s", self.elapsed.as_secs_f32());
            out_events.push(Event::GameOver);
        }
    }

    fn spawn_device(&mut self, template: DeviceTemplate, out_events: &mut Vec<Event>) {
        if self.ledger.is_game_over() {
            return;
        }
        let Some((cell, position)) = self.grid.allocate_random_free_position(&mut self.rng) else {
            return;
        };
        if !self.grid.occupy(cell) {
            return;
        }

        let id = DeviceId::new(self.next_device_id);
        self.next_device_id = self.next_device_id.wrapping_add(1);
        let device = Device::spawn(id, cell, position, &template);
        out_events.push(Event::DeviceSpawned {
            device: id,
            kind: device.kind(),
            cell,
            position,
            time_limit: device.time_limit(),
        });
        self.devices.push(device);
    }

    fn destroy_device(&mut self, id: DeviceId, out_events: &mut Vec<Event>) {
        let Some(index) = self.devices.iter().position(|device| device.id() == id) else {
            return;
        };
        let _ = self.devices[index].force_destroy(out_events);
        let _ = self.orchestrator.on_device_destroyed(id, out_events);
        let device = self.devices.remove(index);
        if !self.grid.free(device.cell()) {
            log::warn!("cell {:?} of device {} was already free", device.cell(), id.get());
        }
    }

    fn begin_drag(&mut self, pointer: Vec3, out_events: &mut Vec<Event>) {
        if self.ledger.is_game_over() {
            out_events.push(Event::CableDragRejected {
                reason: DragRejection::SessionOver,
            });
            return;
        }
        let view = device_view(&self.devices);
        let _ = self.orchestrator.begin_drag(
            self.hub.pose(),
            self.hub.max_simultaneous_cables(),
            pointer,
            &view,
            out_events,
        );
    }

    fn upgrade_hub(&mut self, track: UpgradeTrack, out_events: &mut Vec<Event>) {
        match self.hub.upgrade(track, &mut self.ledger) {
            Ok((level, cost)) => {
                log::info!("hub {track:?} upgraded to level {level} for {cost} coins");
                out_events.push(Event::HubUpgraded { track, level, cost });
            }
            Err(reason) => out_events.push(Event::HubUpgradeRejected { track, reason }),
        }
    }

    fn reset_session(&mut self, out_events: &mut Vec<Event>) {
        let ids: Vec<DeviceId> = self.devices.iter().map(Device::id).collect();
        for id in ids {
            self.destroy_device(id, out_events);
        }
        let _ = self.orchestrator.destroy_all_cables(out_events);
        self.grid.reset();
        self.ledger.reset();
        self.hub.reset_to_basic_level();
        self.game_over_announced = false;
        self.elapsed = Duration::ZERO;
        out_events.push(Event::SessionReset);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::ClickHub => {
            let hub = world.hub.pose().position();
            world.begin_drag(hub, out_events);
        }
        Command::BeginCableDrag { pointer } => world.begin_drag(pointer, out_events),
        Command::DragCable { pointer } => {
            let view = device_view(&world.devices);
            let _ = world.orchestrator.drag(world.hub.pose(), pointer, &view);
        }
        Command::EndCableDrag { pointer } => {
            let _ = world.orchestrator.end_drag(
                world.hub.pose(),
                pointer,
                &mut world.devices,
                out_events,
            );
        }
        Command::CancelCableDrag => {
            let _ = world.orchestrator.cancel_drag(out_events);
        }
        Command::SpawnDevice { template } => world.spawn_device(template, out_events),
        Command::ResolveMinigame { device, success } => {
            let transition = world
                .device_mut(device)
                .and_then(|record| record.resolve_minigame(success, out_events));
            if let Some(transition) = transition {
                world.settle(device, transition, out_events);
            }
        }
        Command::SetDeviceConnecting { device, connecting } => {
            if let Some(record) = world.device_mut(device) {
                let _ = record.set_connecting(connecting);
            }
        }
        Command::AddExtraTime { device, extra } => {
            if let Some(record) = world.device_mut(device) {
                let _ = record.add_extra_time(extra);
            }
        }
        Command::UpgradeHub { track } => world.upgrade_hub(track, out_events),
        Command::ForceDestroyDevice { device } => world.destroy_device(device, out_events),
        Command::ResetSession => world.reset_session(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use cable_rush_core::{CableSnapshot, DeviceId, DeviceSnapshot, DeviceView};

    use super::{GridAllocator, Hub, Ledger, World, WorldConfig};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Configuration the world was built from.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Provides read-only access to the spawn grid.
    #[must_use]
    pub fn grid(world: &World) -> &GridAllocator {
        &world.grid
    }

    /// Provides read-only access to the hub.
    #[must_use]
    pub fn hub(world: &World) -> &Hub {
        &world.hub
    }

    /// Provides read-only access to score, coins and lives.
    #[must_use]
    pub fn ledger(world: &World) -> &Ledger {
        &world.ledger
    }

    /// Captures a read-only view of the devices on the grid.
    #[must_use]
    pub fn device_view(world: &World) -> DeviceView {
        super::device_view(&world.devices)
    }

    /// Captures the snapshot of a single device.
    #[must_use]
    pub fn device(world: &World, id: DeviceId) -> Option<DeviceSnapshot> {
        world
            .devices
            .iter()
            .find(|device| device.id() == id)
            .map(|device| device.snapshot())
    }

    /// Snapshots of every cable, including the one being dragged.
    #[must_use]
    pub fn cables(world: &World) -> Vec<CableSnapshot> {
        world.orchestrator.snapshots()
    }

    /// Number of cables attached to devices.
    #[must_use]
    pub fn connected_cable_count(world: &World) -> usize {
        world.orchestrator.connected_count()
    }

    /// Reports whether a cable is following the pointer.
    #[must_use]
    pub fn is_dragging(world: &World) -> bool {
        world.orchestrator.is_dragging()
    }

    /// Number of devices still on the grid.
    #[must_use]
    pub fn active_device_count(world: &World) -> usize {
        world.devices.len()
    }

    /// Number of cells a new device could spawn on.
    #[must_use]
    pub fn free_cell_count(world: &World) -> usize {
        world.grid.free_cell_count()
    }

    /// Cumulative score of the session.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.ledger.score()
    }

    /// Reports whether the last life has been lost.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.ledger.is_game_over()
    }

    /// Simulated time since the session started.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    #[cfg(test)]
    pub(crate) fn device_ids(world: &World) -> Vec<DeviceId> {
        device_view(world).iter().map(|snapshot| snapshot.id).collect()
    }
}
