//! The modem cables originate from, with its purchasable upgrades.

use cable_rush_core::{UpgradeError, UpgradeTrack};
use cable_rush_system_cable_geometry::HubPose;
use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;

/// Ordered upgrade levels with the cost of reaching each one.
///
/// `costs[i]` buys the step from `values[i]` to `values[i + 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeLadder<T> {
    /// Value provided at each level, starting with the basic level.
    pub values: Vec<T>,
    /// Coin cost of each step up.
    pub costs: Vec<u32>,
}

impl<T: Copy> UpgradeLadder<T> {
    /// Value at `level`, clamped to the top rung.
    #[must_use]
    pub fn value_at(&self, level: usize) -> Option<T> {
        let top = self.values.len().checked_sub(1)?;
        self.values.get(level.min(top)).copied()
    }

    /// Cost of the step leaving `level`, or `None` at the top.
    #[must_use]
    pub fn cost_from(&self, level: usize) -> Option<u32> {
        if level + 1 >= self.values.len() {
            return None;
        }
        self.costs.get(level).copied()
    }
}

/// Default internet speed ladder in megabytes per second.
#[must_use]
pub fn default_speed_ladder() -> UpgradeLadder<f32> {
    UpgradeLadder {
        values: vec![10.0, 20.0, 35.0, 50.0],
        costs: vec![25, 60, 120],
    }
}

/// Default simultaneous cable ladder.
#[must_use]
pub fn default_cable_ladder() -> UpgradeLadder<u32> {
    UpgradeLadder {
        values: vec![2, 3, 4, 5],
        costs: vec![40, 90, 160],
    }
}

/// Internet speed used when a ladder is empty.
pub const FALLBACK_INTERNET_SPEED: f32 = 10.0;
/// Cable limit used when a ladder is empty.
pub const FALLBACK_MAX_CABLES: u32 = 2;

/// The hub: pose plus upgrade progress.
#[derive(Clone, Debug)]
pub struct Hub {
    pose: HubPose,
    speed: UpgradeLadder<f32>,
    cables: UpgradeLadder<u32>,
    speed_level: usize,
    cable_level: usize,
}

impl Hub {
    /// Creates a hub at its basic level.
    #[must_use]
    pub fn new(pose: HubPose, speed: UpgradeLadder<f32>, cables: UpgradeLadder<u32>) -> Self {
        Self {
            pose,
            speed,
            cables,
            speed_level: 0,
            cable_level: 0,
        }
    }

    /// Position and facing of the hub.
    #[must_use]
    pub const fn pose(&self) -> HubPose {
        self.pose
    }

    /// Download rate granted to connected devices, in megabytes per second.
    #[must_use]
    pub fn internet_speed(&self) -> f32 {
        self.speed
            .value_at(self.speed_level)
            .unwrap_or(FALLBACK_INTERNET_SPEED)
    }

    /// Number of cables that may be connected at once.
    #[must_use]
    pub fn max_simultaneous_cables(&self) -> u32 {
        self.cables
            .value_at(self.cable_level)
            .unwrap_or(FALLBACK_MAX_CABLES)
    }

    /// Current zero-based level of a track.
    #[must_use]
    pub const fn level(&self, track: UpgradeTrack) -> usize {
        match track {
            UpgradeTrack::Speed => self.speed_level,
            UpgradeTrack::Cables => self.cable_level,
        }
    }

    /// Cost of the next level of a track, or `None` when maxed out.
    #[must_use]
    pub fn next_cost(&self, track: UpgradeTrack) -> Option<u32> {
        match track {
            UpgradeTrack::Speed => self.speed.cost_from(self.speed_level),
            UpgradeTrack::Cables => self.cables.cost_from(self.cable_level),
        }
    }

    /// Buys the next level of `track`, paying from `ledger`.
    ///
    /// Returns the new level and the coins spent.
    pub fn upgrade(
        &mut self,
        track: UpgradeTrack,
        ledger: &mut Ledger,
    ) -> Result<(u32, u32), UpgradeError> {
        let cost = self.next_cost(track).ok_or(UpgradeError::MaxLevel)?;
        if !ledger.spend(cost) {
            return Err(UpgradeError::InsufficientCoins);
        }
        let level = match track {
            UpgradeTrack::Speed => {
                self.speed_level += 1;
                self.speed_level
            }
            UpgradeTrack::Cables => {
                self.cable_level += 1;
                self.cable_level
            }
        };
        Ok((u32::try_from(level).unwrap_or(u32::MAX), cost))
    }

    /// Drops every track back to its basic level.
    pub fn reset_to_basic_level(&mut self) {
        self.speed_level = 0;
        self.cable_level = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn hub() -> Hub {
        Hub::new(
            HubPose::new(Vec3::ZERO, Vec3::Z),
            default_speed_ladder(),
            default_cable_ladder(),
        )
    }

    #[test]
    fn upgrades_spend_coins_and_raise_values() {
        let mut hub = hub();
        let mut ledger = Ledger::new(3);
        ledger.add_rewards(0, 100);

        assert_eq!(hub.upgrade(UpgradeTrack::Speed, &mut ledger), Ok((1, 25)));
        assert_eq!(hub.internet_speed(), 20.0);
        assert_eq!(ledger.coins(), 75);

        assert_eq!(hub.upgrade(UpgradeTrack::Cables, &mut ledger), Ok((1, 40)));
        assert_eq!(hub.max_simultaneous_cables(), 3);
        assert_eq!(ledger.coins(), 35);
    }

    #[test]
    fn upgrades_are_rejected_without_coins() {
        let mut hub = hub();
        let mut ledger = Ledger::new(3);
        assert_eq!(
            hub.upgrade(UpgradeTrack::Speed, &mut ledger),
            Err(UpgradeError::InsufficientCoins)
        );
        assert_eq!(hub.level(UpgradeTrack::Speed), 0);
    }

    #[test]
    fn top_level_reports_max_level() {
        let mut hub = hub();
        let mut ledger = Ledger::new(3);
        ledger.add_rewards(0, 1_000);
        for _ in 0..3 {
            assert!(hub.upgrade(UpgradeTrack::Speed, &mut ledger).is_ok());
        }
        assert_eq!(
            hub.upgrade(UpgradeTrack::Speed, &mut ledger),
            Err(UpgradeError::MaxLevel)
        );
        assert_eq!(hub.internet_speed(), 50.0);

        hub.reset_to_basic_level();
        assert_eq!(hub.internet_speed(), 10.0);
    }

    #[test]
    fn empty_ladders_fall_back_to_defaults() {
        let empty_speed = UpgradeLadder {
            values: Vec::new(),
            costs: Vec::new(),
        };
        let empty_cables = UpgradeLadder {
            values: Vec::new(),
            costs: Vec::new(),
        };
        let hub = Hub::new(HubPose::new(Vec3::ZERO, Vec3::Z), empty_speed, empty_cables);
        assert_eq!(hub.internet_speed(), FALLBACK_INTERNET_SPEED);
        assert_eq!(hub.max_simultaneous_cables(), FALLBACK_MAX_CABLES);
        assert_eq!(hub.next_cost(UpgradeTrack::Cables), None);
    }
}
