use std::time::Duration;

use cable_rush_core::{Command, DeviceId, DeviceSnapshot, DeviceView, Event, UpgradeTrack};
use cable_rush_world::{hub::Hub, ledger::Ledger};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::AutoPlayConfig;

const UPGRADE_ORDER: [UpgradeTrack; 2] = [UpgradeTrack::Cables, UpgradeTrack::Speed];

/// Read-only state the scripted player inspects each tick.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Observation<'a> {
    /// Devices currently on the grid.
    pub(crate) devices: &'a DeviceView,
    /// Hub pose and upgrade state.
    pub(crate) hub: &'a Hub,
    /// Coins available for upgrades.
    pub(crate) ledger: &'a Ledger,
    /// Whether a cable already follows the pointer.
    pub(crate) dragging: bool,
    /// Cables attached to devices.
    pub(crate) connected_cables: usize,
}

/// Scripted player that drags cables to the most urgent device.
#[derive(Debug)]
pub(crate) struct AutoPlayer {
    config: AutoPlayConfig,
    rng: ChaCha8Rng,
    cooldown: Duration,
    minigames: Vec<(DeviceId, Duration)>,
}

impl AutoPlayer {
    pub(crate) fn new(config: AutoPlayConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            cooldown: Duration::from_millis(config.reaction_delay_ms),
            minigames: Vec::new(),
        }
    }

    /// Reacts to a batch of events with player input commands.
    ///
    /// Input is only produced on batches that advanced time.
    pub(crate) fn handle(
        &mut self,
        events: &[Event],
        observation: Observation<'_>,
        out: &mut Vec<Command>,
    ) {
        let mut elapsed = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => elapsed = elapsed.saturating_add(*dt),
                Event::MinigameStarted { device, .. } => self
                    .minigames
                    .push((*device, Duration::from_millis(self.config.minigame_delay_ms))),
                Event::DeviceDestroyed { device } => {
                    self.minigames.retain(|(pending, _)| pending != device);
                }
                Event::SessionReset => {
                    self.minigames.clear();
                    self.cooldown = Duration::from_millis(self.config.reaction_delay_ms);
                }
                _ => {}
            }
        }

        if elapsed.is_zero() {
            return;
        }

        self.solve_minigames(elapsed, out);
        if self.config.buy_upgrades {
            self.buy_upgrade(observation, out);
        }
        self.connect_most_urgent(elapsed, observation, out);
    }

    fn solve_minigames(&mut self, elapsed: Duration, out: &mut Vec<Command>) {
        let mut finished = Vec::new();
        for (device, remaining) in &mut self.minigames {
            *remaining = remaining.saturating_sub(elapsed);
            if remaining.is_zero() {
                finished.push(*device);
            }
        }
        self.minigames.retain(|(_, remaining)| !remaining.is_zero());

        for device in finished {
            let success = self.rng.gen_bool(self.config.minigame_success_rate);
            out.push(Command::ResolveMinigame { device, success });
        }
    }

    fn buy_upgrade(&mut self, observation: Observation<'_>, out: &mut Vec<Command>) {
        let coins = observation.ledger.coins();
        let affordable = UPGRADE_ORDER.into_iter().find(|track| {
            observation
                .hub
                .next_cost(*track)
                .map_or(false, |cost| cost <= coins)
        });
        if let Some(track) = affordable {
            out.push(Command::UpgradeHub { track });
        }
    }

    fn connect_most_urgent(
        &mut self,
        elapsed: Duration,
        observation: Observation<'_>,
        out: &mut Vec<Command>,
    ) {
        self.cooldown = self.cooldown.saturating_sub(elapsed);
        if !self.cooldown.is_zero() || observation.dragging {
            return;
        }
        let limit = usize::try_from(observation.hub.max_simultaneous_cables()).unwrap_or(0);
        if observation.connected_cables >= limit {
            return;
        }
        let Some(target) = most_urgent(observation.devices) else {
            return;
        };

        let hub = observation.hub.pose().position();
        let pointer = Vec3::new(target.position.x, hub.y, target.position.z);
        out.push(Command::BeginCableDrag { pointer: hub });
        out.push(Command::DragCable { pointer });
        out.push(Command::EndCableDrag { pointer });
        self.cooldown = Duration::from_millis(self.config.reaction_delay_ms);
    }
}

fn most_urgent(devices: &DeviceView) -> Option<&DeviceSnapshot> {
    devices
        .iter()
        .filter(|snapshot| snapshot.is_connectable())
        .min_by_key(|snapshot| (snapshot.remaining, snapshot.id))
}
