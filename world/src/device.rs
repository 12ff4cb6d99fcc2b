//! Per-device lifecycle: connection timer, activity and delayed removal.

use std::time::Duration;

use cable_rush_core::{
    CellCoord, DeviceId, DeviceKind, DeviceSnapshot, DeviceState, DeviceTemplate, DeviceView,
    Event, RewardMultipliers, WiringVariation,
};
use glam::Vec3;

/// Time a failed device lingers before it is removed.
pub const FAILED_DESTRUCTION_DELAY: Duration = Duration::from_secs(1);
/// Time a completed device lingers before it is removed.
pub const COMPLETED_DESTRUCTION_DELAY: Duration = Duration::from_millis(800);

/// Outcome of a device step that the world must act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The connection timer ran out; the player loses a life.
    Expired,
    /// The device finished and its rewards are due.
    Completed {
        /// Score to credit.
        score: u32,
        /// Coins to credit.
        gold: u32,
    },
    /// The device failed without costing a life.
    Failed,
    /// The linger delay elapsed; the device should be removed.
    DestructionDue,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Activity {
    Download { base_mb: u32, downloaded_mb: f32 },
    Wiring { variation: WiringVariation },
}

/// A spawned device and its state machine.
#[derive(Clone, Debug)]
pub struct Device {
    id: DeviceId,
    activity: Activity,
    state: DeviceState,
    time_limit: Duration,
    remaining: Duration,
    base_score: u32,
    base_gold: u32,
    multipliers: RewardMultipliers,
    multipliers_locked: bool,
    cell: CellCoord,
    position: Vec3,
    pending_destruction: Option<Duration>,
    destroyed: bool,
}

impl Device {
    /// Creates a disconnected device from a level template.
    ///
    /// The template's multipliers are applied and locked immediately.
    #[must_use]
    pub fn spawn(id: DeviceId, cell: CellCoord, position: Vec3, template: &DeviceTemplate) -> Self {
        let activity = match template.kind {
            DeviceKind::Download => Activity::Download {
                base_mb: template.download_mb,
                downloaded_mb: 0.0,
            },
            DeviceKind::Wiring { variation } => Activity::Wiring { variation },
        };
        let mut device = Self {
            id,
            activity,
            state: DeviceState::Disconnected,
            time_limit: template.time_limit,
            remaining: template.time_limit,
            base_score: template.base_score,
            base_gold: template.base_gold,
            multipliers: RewardMultipliers::default(),
            multipliers_locked: false,
            cell,
            position,
            pending_destruction: None,
            destroyed: false,
        };
        let _ = device.apply_level_multipliers(template.multipliers);
        device
    }

    /// Identifier of the device.
    #[must_use]
    pub const fn id(&self) -> DeviceId {
        self.id
    }

    /// Kind of the device.
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        match self.activity {
            Activity::Download { .. } => DeviceKind::Download,
            Activity::Wiring { variation } => DeviceKind::Wiring { variation },
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DeviceState {
        self.state
    }

    /// Grid cell the device occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// World position of the device.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Connection time left.
    #[must_use]
    pub const fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Connection time granted at spawn.
    #[must_use]
    pub const fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Multipliers fixed at spawn time.
    #[must_use]
    pub const fn multipliers(&self) -> RewardMultipliers {
        self.multipliers
    }

    /// Reports whether [`Self::force_destroy`] already ran.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Score granted on completion, rounded to the nearest integer.
    #[must_use]
    pub fn score_value(&self) -> u32 {
        scale(self.base_score, self.multipliers.score)
    }

    /// Coins granted on completion, rounded to the nearest integer.
    #[must_use]
    pub fn gold_value(&self) -> u32 {
        scale(self.base_gold, self.multipliers.gold)
    }

    /// Download size in megabytes for download devices.
    #[must_use]
    pub fn download_target(&self) -> Option<u32> {
        match self.activity {
            Activity::Download { base_mb, .. } => Some(scale(base_mb, self.multipliers.download)),
            Activity::Wiring { .. } => None,
        }
    }

    /// Completed download fraction in `[0, 1]` for download devices.
    #[must_use]
    pub fn download_fraction(&self) -> Option<f32> {
        let target = self.download_target()?;
        let Activity::Download { downloaded_mb, .. } = self.activity else {
            return None;
        };
        if target == 0 {
            return Some(if self.state == DeviceState::Completed { 1.0 } else { 0.0 });
        }
        Some((downloaded_mb / target as f32).clamp(0.0, 1.0))
    }

    /// Sets the reward multipliers. Fails once they have been locked at spawn.
    pub fn apply_level_multipliers(&mut self, multipliers: RewardMultipliers) -> bool {
        if self.multipliers_locked {
            return false;
        }
        self.multipliers = multipliers;
        self.multipliers_locked = true;
        true
    }

    /// Advances timers and activity by `dt`.
    ///
    /// `internet_speed` is the hub's download rate in megabytes per second.
    pub fn tick(
        &mut self,
        dt: Duration,
        internet_speed: f32,
        out_events: &mut Vec<Event>,
    ) -> Option<Transition> {
        if self.destroyed || dt.is_zero() {
            return None;
        }

        match self.state {
            DeviceState::Disconnected | DeviceState::Connecting => {
                self.remaining = self.remaining.saturating_sub(dt);
                out_events.push(Event::DeviceTimerUpdated {
                    device: self.id,
                    remaining: self.remaining,
                });
                if !self.remaining.is_zero() {
                    return None;
                }
                out_events.push(Event::DeviceTimerExpired { device: self.id });
                self.fail(out_events);
                Some(Transition::Expired)
            }
            DeviceState::Downloading => self.advance_download(dt, internet_speed, out_events),
            DeviceState::Completed | DeviceState::Failed => {
                let left = self.pending_destruction?.saturating_sub(dt);
                if left.is_zero() {
                    self.pending_destruction = None;
                    Some(Transition::DestructionDue)
                } else {
                    self.pending_destruction = Some(left);
                    None
                }
            }
            DeviceState::Connected | DeviceState::Minigame => None,
        }
    }

    /// Attaches a cable and starts the kind-specific activity.
    ///
    /// Only a waiting device with time left accepts a connection.
    pub fn connect(&mut self, out_events: &mut Vec<Event>) -> bool {
        if self.destroyed || !self.state.is_awaiting_connection() || self.remaining.is_zero() {
            return false;
        }
        self.state = DeviceState::Connected;
        out_events.push(Event::DeviceConnected { device: self.id });

        match self.activity {
            Activity::Download { .. } => self.start_download(),
            Activity::Wiring { variation } => {
                self.state = DeviceState::Minigame;
                out_events.push(Event::MinigameStarted {
                    device: self.id,
                    variation,
                });
            }
        }
        true
    }

    /// Finishes the wiring minigame.
    pub fn resolve_minigame(
        &mut self,
        success: bool,
        out_events: &mut Vec<Event>,
    ) -> Option<Transition> {
        if self.destroyed || self.state != DeviceState::Minigame {
            return None;
        }
        if success {
            Some(self.complete(out_events))
        } else {
            self.fail(out_events);
            Some(Transition::Failed)
        }
    }

    /// Toggles the visual connecting sub-state while the device waits.
    pub fn set_connecting(&mut self, connecting: bool) -> bool {
        match (self.state, connecting) {
            (DeviceState::Disconnected, true) => {
                self.state = DeviceState::Connecting;
                true
            }
            (DeviceState::Connecting, false) => {
                self.state = DeviceState::Disconnected;
                true
            }
            _ => false,
        }
    }

    /// Grants extra connection time, never exceeding the time limit.
    pub fn add_extra_time(&mut self, extra: Duration) -> bool {
        if self.destroyed || !self.state.is_awaiting_connection() || self.remaining.is_zero() {
            return false;
        }
        self.remaining = self.remaining.saturating_add(extra).min(self.time_limit);
        true
    }

    /// Marks the device destroyed, skipping any pending delay.
    ///
    /// Calling it again is a no-op.
    pub fn force_destroy(&mut self, out_events: &mut Vec<Event>) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        self.pending_destruction = None;
        out_events.push(Event::DeviceDestroyed { device: self.id });
        true
    }

    /// Captures an immutable snapshot for queries.
    #[must_use]
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            id: self.id,
            kind: self.kind(),
            state: self.state,
            cell: self.cell,
            position: self.position,
            remaining: self.remaining,
            time_limit: self.time_limit,
            download_fraction: self.download_fraction(),
            score_value: self.score_value(),
            gold_value: self.gold_value(),
        }
    }

    fn start_download(&mut self) {
        if let Activity::Download { downloaded_mb, .. } = &mut self.activity {
            *downloaded_mb = 0.0;
            self.state = DeviceState::Downloading;
        }
    }

    fn advance_download(
        &mut self,
        dt: Duration,
        internet_speed: f32,
        out_events: &mut Vec<Event>,
    ) -> Option<Transition> {
        let target = self.download_target()? as f32;
        let Activity::Download { downloaded_mb, .. } = &mut self.activity else {
            return None;
        };
        let step = internet_speed.max(0.0) * dt.as_secs_f32();
        *downloaded_mb = (*downloaded_mb + step).min(target);
        let done = *downloaded_mb >= target;

        out_events.push(Event::DownloadProgressed {
            device: self.id,
            fraction: self.download_fraction().unwrap_or(1.0),
        });

        if done {
            Some(self.complete(out_events))
        } else {
            None
        }
    }

    fn complete(&mut self, out_events: &mut Vec<Event>) -> Transition {
        self.state = DeviceState::Completed;
        self.pending_destruction = Some(COMPLETED_DESTRUCTION_DELAY);
        let score = self.score_value();
        let gold = self.gold_value();
        out_events.push(Event::DeviceCompleted {
            device: self.id,
            score,
            gold,
        });
        Transition::Completed { score, gold }
    }

    fn fail(&mut self, out_events: &mut Vec<Event>) {
        self.state = DeviceState::Failed;
        self.pending_destruction = Some(FAILED_DESTRUCTION_DELAY);
        out_events.push(Event::DeviceFailed { device: self.id });
    }
}

/// Builds a [`DeviceView`] over the provided devices, skipping destroyed ones.
#[must_use]
pub fn device_view(devices: &[Device]) -> DeviceView {
    DeviceView::from_snapshots(
        devices
            .iter()
            .filter(|device| !device.is_destroyed())
            .map(Device::snapshot)
            .collect(),
    )
}

fn scale(base: u32, multiplier: f32) -> u32 {
    let scaled = (base as f32 * multiplier).round();
    if scaled.is_finite() && scaled > 0.0 {
        scaled as u32
    } else {
        0
    }
}
