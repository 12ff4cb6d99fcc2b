#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Cable Rush simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems and
//! presentation layers to react to. Systems consume event streams, query
//! immutable snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Cable Rush.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// The hub was clicked; starts a cable anchored at the hub itself.
    ClickHub,
    /// The pointer started dragging from the hub.
    BeginCableDrag {
        /// Pointer position projected onto the ground plane.
        pointer: Vec3,
    },
    /// The pointer moved while a cable is being dragged.
    DragCable {
        /// Pointer position projected onto the ground plane.
        pointer: Vec3,
    },
    /// The pointer was released, finishing the current drag.
    EndCableDrag {
        /// Pointer position projected onto the ground plane.
        pointer: Vec3,
    },
    /// Explicit cancel of the in-progress drag.
    CancelCableDrag,
    /// Requests that a device be spawned at a random free grid cell.
    SpawnDevice {
        /// Level-scaled parameters for the new device.
        template: DeviceTemplate,
    },
    /// Reports the outcome of a wiring minigame.
    ResolveMinigame {
        /// Device whose minigame finished.
        device: DeviceId,
        /// Whether the player solved the minigame.
        success: bool,
    },
    /// Toggles the connecting highlight of a waiting device.
    SetDeviceConnecting {
        /// Device under the pointer.
        device: DeviceId,
        /// Whether the device shows as connecting.
        connecting: bool,
    },
    /// Grants additional connection time to a waiting device.
    AddExtraTime {
        /// Device receiving the bonus.
        device: DeviceId,
        /// Amount of time added, capped at the device's time limit.
        extra: Duration,
    },
    /// Spends coins on the next level of a hub upgrade track.
    UpgradeHub {
        /// Track to upgrade.
        track: UpgradeTrack,
    },
    /// Removes a device immediately, skipping its destruction delay.
    ForceDestroyDevice {
        /// Device to remove.
        device: DeviceId,
    },
    /// Clears devices, cables, rewards and upgrades for a fresh session.
    ResetSession,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a device was placed on the grid.
    DeviceSpawned {
        /// Identifier assigned to the device.
        device: DeviceId,
        /// Kind of device that was spawned.
        kind: DeviceKind,
        /// Grid cell reserved for the device.
        cell: CellCoord,
        /// World position of the reserved cell.
        position: Vec3,
        /// Time the player has to connect the device.
        time_limit: Duration,
    },
    /// Reports the remaining connection time of a waiting device.
    DeviceTimerUpdated {
        /// Device whose timer advanced.
        device: DeviceId,
        /// Time left before the device fails.
        remaining: Duration,
    },
    /// A waiting device ran out of time. Costs the player one life.
    DeviceTimerExpired {
        /// Device whose timer reached zero.
        device: DeviceId,
    },
    /// A cable was attached to the device.
    DeviceConnected {
        /// Device that was connected.
        device: DeviceId,
    },
    /// Download progress of a connected download device.
    DownloadProgressed {
        /// Device receiving data.
        device: DeviceId,
        /// Completed fraction in `[0, 1]`.
        fraction: f32,
    },
    /// A wiring device opened its minigame.
    MinigameStarted {
        /// Device that requires wiring.
        device: DeviceId,
        /// Cable layout the player must reproduce.
        variation: WiringVariation,
    },
    /// A device finished successfully and its rewards are due.
    DeviceCompleted {
        /// Device that completed.
        device: DeviceId,
        /// Score awarded after multipliers.
        score: u32,
        /// Coins awarded after multipliers.
        gold: u32,
    },
    /// A device entered the failed state.
    DeviceFailed {
        /// Device that failed.
        device: DeviceId,
    },
    /// A device left the grid and its cell was released.
    DeviceDestroyed {
        /// Device that was removed.
        device: DeviceId,
    },
    /// A new cable started following the pointer.
    CableDragStarted {
        /// Identifier assigned to the cable.
        cable: CableId,
    },
    /// A drag request was refused.
    CableDragRejected {
        /// Reason the drag could not start.
        reason: DragRejection,
    },
    /// The in-progress cable was discarded.
    CableDragCanceled {
        /// Cable that was discarded.
        cable: CableId,
    },
    /// The in-progress cable was attached to a device.
    CableConnected {
        /// Cable that was attached.
        cable: CableId,
        /// Device at the end of the cable.
        device: DeviceId,
    },
    /// A connected cable was removed because its device went away.
    CableRemoved {
        /// Cable that was removed.
        cable: CableId,
        /// Device the cable was bound to.
        device: DeviceId,
    },
    /// The player's life counter changed.
    LivesChanged {
        /// Lives left after the change.
        lives: u32,
    },
    /// The last life was lost.
    GameOver,
    /// A hub upgrade was purchased.
    HubUpgraded {
        /// Track that was upgraded.
        track: UpgradeTrack,
        /// Zero-based level reached on the track.
        level: u32,
        /// Coins spent on the upgrade.
        cost: u32,
    },
    /// A hub upgrade could not be purchased.
    HubUpgradeRejected {
        /// Track the purchase targeted.
        track: UpgradeTrack,
        /// Reason the purchase failed.
        reason: UpgradeError,
    },
    /// Devices, cables, rewards and upgrades were reset.
    SessionReset,
}

/// Unique identifier assigned to a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(u32);

impl DeviceId {
    /// Creates a new device identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a cable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CableId(u32);

impl CableId {
    /// Creates a new cable identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Lifecycle states of a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceState {
    /// Waiting for a cable while the timer runs.
    Disconnected,
    /// Visual sub-state of [`DeviceState::Disconnected`]; the timer keeps running.
    Connecting,
    /// A cable was attached and the device-specific activity is starting.
    Connected,
    /// Receiving data from the hub.
    Downloading,
    /// Waiting for the player to finish the wiring minigame.
    Minigame,
    /// Finished successfully. Terminal.
    Completed,
    /// Timed out or failed its minigame. Terminal.
    Failed,
}

impl DeviceState {
    /// Reports whether the device still waits for a cable.
    #[must_use]
    pub const fn is_awaiting_connection(self) -> bool {
        matches!(self, Self::Disconnected | Self::Connecting)
    }

    /// Reports whether the device reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Cable layouts a wiring minigame may ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WiringVariation {
    /// Both ends use the same pin order.
    StraightThrough,
    /// Transmit and receive pairs are swapped.
    Crossover,
}

/// Variants of devices that can be spawned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Completes once its download finishes.
    Download,
    /// Completes once the player solves a wiring minigame.
    Wiring {
        /// Layout the minigame asks for.
        variation: WiringVariation,
    },
}

/// Scaling factors applied to a device's rewards and workload.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardMultipliers {
    /// Multiplier applied to the base score.
    pub score: f32,
    /// Multiplier applied to the base coin reward.
    pub gold: f32,
    /// Multiplier applied to the base download size.
    pub download: f32,
}

impl Default for RewardMultipliers {
    fn default() -> Self {
        Self {
            score: 1.0,
            gold: 1.0,
            download: 1.0,
        }
    }
}

/// Level-scaled parameters used to instantiate a device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceTemplate {
    /// Kind of device to create.
    pub kind: DeviceKind,
    /// Time the player has to connect the device.
    pub time_limit: Duration,
    /// Score granted on completion before multipliers.
    pub base_score: u32,
    /// Coins granted on completion before multipliers.
    pub base_gold: u32,
    /// Download size in megabytes before multipliers.
    pub download_mb: u32,
    /// Multipliers fixed at spawn time.
    pub multipliers: RewardMultipliers,
}

/// Visual validity of the cable being dragged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CableStatus {
    /// No target in reach and the cable is not stretched.
    Neutral,
    /// The cable snapped to a connectable device.
    Valid,
    /// The cable is stretched to its maximum length.
    Invalid,
}

/// Hub upgrade tracks that can be purchased with coins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeTrack {
    /// Raises the internet speed used by downloads.
    Speed,
    /// Raises the number of simultaneously connected cables.
    Cables,
}

/// Reasons a hub upgrade purchase may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeError {
    /// The track is already at its highest level.
    MaxLevel,
    /// The player cannot afford the next level.
    InsufficientCoins,
}

/// Reasons a cable drag may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DragRejection {
    /// Another cable is already following the pointer.
    AlreadyDragging,
    /// Every hub port is occupied by a connected cable.
    CableLimitReached,
    /// The session ended; no new connections are accepted.
    SessionOver,
}

/// Immutable representation of a single device's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceSnapshot {
    /// Identifier assigned to the device.
    pub id: DeviceId,
    /// Kind of device.
    pub kind: DeviceKind,
    /// Current lifecycle state.
    pub state: DeviceState,
    /// Grid cell occupied by the device.
    pub cell: CellCoord,
    /// World position of the device.
    pub position: Vec3,
    /// Connection time left.
    pub remaining: Duration,
    /// Connection time granted at spawn.
    pub time_limit: Duration,
    /// Download completion for download devices.
    pub download_fraction: Option<f32>,
    /// Score awarded on completion.
    pub score_value: u32,
    /// Coins awarded on completion.
    pub gold_value: u32,
}

impl DeviceSnapshot {
    /// Reports whether a cable may be attached to the device right now.
    #[must_use]
    pub fn is_connectable(&self) -> bool {
        self.state.is_awaiting_connection() && !self.remaining.is_zero()
    }
}

/// Read-only snapshot describing all devices on the grid.
#[derive(Clone, Debug, Default)]
pub struct DeviceView {
    snapshots: Vec<DeviceSnapshot>,
}

impl DeviceView {
    /// Creates a new device view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<DeviceSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured device snapshots in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a single device.
    #[must_use]
    pub fn get(&self, device: DeviceId) -> Option<&DeviceSnapshot> {
        self.snapshots
            .binary_search_by_key(&device, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of devices captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no devices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<DeviceSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a cable used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct CableSnapshot {
    /// Identifier assigned to the cable.
    pub id: CableId,
    /// Hub port the cable leaves from.
    pub start: Vec3,
    /// Bézier control point bowing the cable away from the hub.
    pub control: Vec3,
    /// Free end of the cable.
    pub end: Vec3,
    /// Sampled polyline for rendering.
    pub points: Vec<Vec3>,
    /// Visual validity of the cable.
    pub status: CableStatus,
    /// Device the cable is bound to once connected.
    pub device: Option<DeviceId>,
}

impl CableSnapshot {
    /// Reports whether the cable is attached to a device.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{
        CellCoord, DeviceId, DeviceKind, DeviceSnapshot, DeviceState, DeviceView,
        RewardMultipliers, WiringVariation,
    };
    use glam::Vec3;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    fn snapshot(id: u32, state: DeviceState, remaining: Duration) -> DeviceSnapshot {
        DeviceSnapshot {
            id: DeviceId::new(id),
            kind: DeviceKind::Download,
            state,
            cell: CellCoord::new(0, 0),
            position: Vec3::ZERO,
            remaining,
            time_limit: Duration::from_secs(10),
            download_fraction: None,
            score_value: 0,
            gold_value: 0,
        }
    }

    #[test]
    fn connecting_counts_as_awaiting_connection() {
        assert!(DeviceState::Disconnected.is_awaiting_connection());
        assert!(DeviceState::Connecting.is_awaiting_connection());
        assert!(!DeviceState::Downloading.is_awaiting_connection());
        assert!(DeviceState::Failed.is_terminal());
        assert!(DeviceState::Completed.is_terminal());
        assert!(!DeviceState::Minigame.is_terminal());
    }

    #[test]
    fn only_waiting_devices_with_time_left_are_connectable() {
        assert!(snapshot(1, DeviceState::Disconnected, Duration::from_secs(1)).is_connectable());
        assert!(!snapshot(1, DeviceState::Disconnected, Duration::ZERO).is_connectable());
        assert!(snapshot(1, DeviceState::Connecting, Duration::from_secs(1)).is_connectable());
        assert!(!snapshot(1, DeviceState::Connecting, Duration::ZERO).is_connectable());
        assert!(!snapshot(1, DeviceState::Minigame, Duration::from_secs(1)).is_connectable());
    }

    #[test]
    fn device_view_sorts_and_looks_up_by_id() {
        let view = DeviceView::from_snapshots(vec![
            snapshot(7, DeviceState::Disconnected, Duration::from_secs(1)),
            snapshot(2, DeviceState::Failed, Duration::ZERO),
        ]);
        let ids: Vec<u32> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![2, 7]);
        assert_eq!(
            view.get(DeviceId::new(2)).map(|snapshot| snapshot.state),
            Some(DeviceState::Failed)
        );
        assert!(view.get(DeviceId::new(3)).is_none());
    }

    #[test]
    fn device_kind_round_trips_through_bincode() {
        assert_round_trip(&DeviceKind::Wiring {
            variation: WiringVariation::Crossover,
        });
    }

    #[test]
    fn reward_multipliers_round_trip_through_bincode() {
        assert_round_trip(&RewardMultipliers {
            score: 2.0,
            gold: 1.5,
            download: 0.5,
        });
    }
}
