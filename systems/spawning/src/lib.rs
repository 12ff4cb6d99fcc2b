#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting device spawn commands.
//!
//! The active difficulty level is picked from a score-keyed table. Each tick
//! the system checks, in order, the level's spawn interval, its device cap, a
//! weighted random roll and the availability of a free grid cell. A spawn is
//! only requested when every gate passes.

use std::time::Duration;

use cable_rush_core::{
    Command, DeviceKind, DeviceTemplate, Event, RewardMultipliers, WiringVariation,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Difficulty bucket selected by the player's cumulative score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnLevel {
    /// Lowest score (inclusive) covered by the level.
    pub min_score: u32,
    /// Highest score (inclusive) covered by the level.
    pub max_score: u32,
    /// Connection time granted to new devices, in seconds.
    pub base_time_limit_secs: f32,
    /// Smallest download size in megabytes.
    pub min_download_mb: u32,
    /// Largest download size in megabytes.
    pub max_download_mb: u32,
    /// Coins granted by a completed device before multipliers.
    pub base_coin_reward: u32,
    /// Score granted by a completed device before multipliers.
    pub base_points_reward: u32,
    /// Minimum time between two spawns, in seconds.
    pub spawn_interval_secs: f32,
    /// Probability in `[0, 1]` that a due spawn actually happens.
    pub spawn_weight: f32,
    /// Devices allowed on the grid at once.
    pub max_simultaneous_devices: u32,
    /// Multipliers stamped onto devices spawned at this level.
    #[serde(default)]
    pub multipliers: RewardMultipliers,
    /// Probability in `[0, 1]` that a spawn is a wiring device.
    #[serde(default)]
    pub wiring_share: f32,
}

impl SpawnLevel {
    /// Minimum time between two spawns.
    #[must_use]
    pub fn spawn_interval(&self) -> Duration {
        Duration::try_from_secs_f32(self.spawn_interval_secs).unwrap_or_default()
    }

    /// Connection time granted to new devices.
    #[must_use]
    pub fn time_limit(&self) -> Duration {
        Duration::try_from_secs_f32(self.base_time_limit_secs).unwrap_or_default()
    }

    /// Reports whether `score` falls inside the level's inclusive range.
    #[must_use]
    pub const fn contains(&self, score: u32) -> bool {
        self.min_score <= score && score <= self.max_score
    }

    fn check(&self, index: usize) -> Result<(), LevelTableError> {
        let invalid = |reason| LevelTableError::InvalidLevel { index, reason };
        if self.min_score > self.max_score {
            return Err(LevelTableError::InvertedRange { index });
        }
        if !(self.base_time_limit_secs.is_finite() && self.base_time_limit_secs > 0.0) {
            return Err(invalid("time limit must be positive"));
        }
        if !(self.spawn_interval_secs.is_finite() && self.spawn_interval_secs >= 0.0) {
            return Err(invalid("spawn interval must not be negative"));
        }
        if !(0.0..=1.0).contains(&self.spawn_weight) {
            return Err(invalid("spawn weight must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.wiring_share) {
            return Err(invalid("wiring share must lie in [0, 1]"));
        }
        if self.min_download_mb > self.max_download_mb {
            return Err(invalid("download range is inverted"));
        }
        Ok(())
    }
}

/// Errors raised when a level table is inconsistent.
#[derive(Debug, Error, PartialEq)]
pub enum LevelTableError {
    /// The table has no levels.
    #[error("level table is empty")]
    Empty,
    /// The first level does not start at score zero.
    #[error("first level starts at score {0}, expected 0")]
    MissingStart(u32),
    /// A level's minimum score exceeds its maximum.
    #[error("level {index} has min_score above max_score")]
    InvertedRange {
        /// Position of the level in the table.
        index: usize,
    },
    /// A level starts at or below the previous level's maximum.
    #[error("level {index} overlaps or precedes the previous level")]
    Overlap {
        /// Position of the level in the table.
        index: usize,
    },
    /// Some scores between two levels are not covered.
    #[error("scores {from}..={to} are not covered before level {index}")]
    Gap {
        /// Position of the level following the gap.
        index: usize,
        /// First uncovered score.
        from: u32,
        /// Last uncovered score.
        to: u32,
    },
    /// A level carries an unusable value.
    #[error("level {index} is invalid: {reason}")]
    InvalidLevel {
        /// Position of the level in the table.
        index: usize,
        /// What is wrong with the level.
        reason: &'static str,
    },
}

/// Ordered, contiguous and non-overlapping table of spawn levels.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelTable {
    levels: Vec<SpawnLevel>,
}

impl LevelTable {
    /// Validates and wraps the provided levels.
    pub fn new(levels: Vec<SpawnLevel>) -> Result<Self, LevelTableError> {
        let first = levels.first().ok_or(LevelTableError::Empty)?;
        if first.min_score != 0 {
            return Err(LevelTableError::MissingStart(first.min_score));
        }

        for (index, level) in levels.iter().enumerate() {
            level.check(index)?;
            let Some(previous) = index.checked_sub(1).and_then(|prev| levels.get(prev)) else {
                continue;
            };
            if level.min_score <= previous.max_score {
                return Err(LevelTableError::Overlap { index });
            }
            let expected = previous.max_score.saturating_add(1);
            if level.min_score > expected {
                return Err(LevelTableError::Gap {
                    index,
                    from: expected,
                    to: level.min_score - 1,
                });
            }
        }

        Ok(Self { levels })
    }

    /// Levels in ascending score order.
    #[must_use]
    pub fn levels(&self) -> &[SpawnLevel] {
        &self.levels
    }

    /// Index and parameters of the level covering `score`.
    ///
    /// Scores above the last level's maximum match nothing.
    #[must_use]
    pub fn level_for(&self, score: u32) -> Option<(usize, &SpawnLevel)> {
        self.levels
            .iter()
            .enumerate()
            .find(|(_, level)| level.contains(score))
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            levels: default_levels(),
        }
    }
}

/// Built-in five-level difficulty curve.
#[must_use]
pub fn default_levels() -> Vec<SpawnLevel> {
    let level = |min_score,
                 max_score,
                 time_limit,
                 download: (u32, u32),
                 coins,
                 points,
                 interval,
                 weight,
                 max_devices| SpawnLevel {
        min_score,
        max_score,
        base_time_limit_secs: time_limit,
        min_download_mb: download.0,
        max_download_mb: download.1,
        base_coin_reward: coins,
        base_points_reward: points,
        spawn_interval_secs: interval,
        spawn_weight: weight,
        max_simultaneous_devices: max_devices,
        multipliers: RewardMultipliers::default(),
        wiring_share: 0.0,
    };

    vec![
        level(0, 20, 15.0, (50, 150), 8, 10, 6.0, 0.3, 2),
        level(21, 60, 12.0, (100, 250), 12, 15, 5.0, 0.4, 3),
        level(61, 120, 10.0, (150, 350), 16, 20, 4.0, 0.5, 4),
        level(121, 200, 8.0, (200, 450), 20, 25, 3.0, 0.6, 5),
        level(201, 9999, 6.0, (300, 600), 25, 30, 2.5, 0.7, 6),
    ]
}

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug)]
pub struct Config {
    table: LevelTable,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided level table and seed.
    #[must_use]
    pub const fn new(table: LevelTable, rng_seed: u64) -> Self {
        Self { table, rng_seed }
    }
}

/// Live counters the world reports to the spawning system each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnContext {
    /// Cumulative score.
    pub score: u32,
    /// Devices currently on the grid.
    pub active_devices: usize,
    /// Cells a device could spawn on.
    pub free_cells: usize,
    /// Whether the session ended and spawning must stop.
    pub session_over: bool,
}

/// Pure system that emits spawn commands according to the level table.
#[derive(Debug)]
pub struct Spawning {
    table: LevelTable,
    rng: ChaCha8Rng,
    since_last_spawn: Duration,
    current_level: Option<usize>,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            table: config.table,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            since_last_spawn: Duration::ZERO,
            current_level: None,
        }
    }

    /// Index of the level selected on the most recent tick.
    #[must_use]
    pub const fn current_level(&self) -> Option<usize> {
        self.current_level
    }

    /// Level table the system draws from.
    #[must_use]
    pub const fn table(&self) -> &LevelTable {
        &self.table
    }

    /// Consumes events and world counters to emit at most one spawn command.
    pub fn handle(&mut self, events: &[Event], context: SpawnContext, out: &mut Vec<Command>) {
        let mut accumulated = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => accumulated = accumulated.saturating_add(*dt),
                Event::SessionReset => {
                    self.since_last_spawn = Duration::ZERO;
                    self.current_level = None;
                    accumulated = Duration::ZERO;
                }
                _ => {}
            }
        }

        if context.session_over {
            self.since_last_spawn = Duration::ZERO;
            return;
        }

        if accumulated.is_zero() {
            return;
        }
        self.since_last_spawn = self.since_last_spawn.saturating_add(accumulated);

        let Some((index, level)) = self.table.level_for(context.score) else {
            if self.current_level.take().is_some() {
                log::info!("score {} is beyond the level table", context.score);
            }
            return;
        };
        if self.current_level != Some(index) {
            log::info!(
                "spawn level {} active for score {}",
                index + 1,
                context.score
            );
            self.current_level = Some(index);
        }

        if self.since_last_spawn < level.spawn_interval() {
            return;
        }
        let cap = usize::try_from(level.max_simultaneous_devices).unwrap_or(usize::MAX);
        if context.active_devices >= cap {
            return;
        }
        if self.rng.gen::<f32>() > level.spawn_weight {
            return;
        }
        if context.free_cells == 0 {
            return;
        }

        let template = roll_template(&mut self.rng, level);
        log::debug!("spawning {:?} device", template.kind);
        self.since_last_spawn = Duration::ZERO;
        out.push(Command::SpawnDevice { template });
    }
}

fn roll_template<R: Rng + ?Sized>(rng: &mut R, level: &SpawnLevel) -> DeviceTemplate {
    let kind = if level.wiring_share > 0.0 && rng.gen_bool(f64::from(level.wiring_share)) {
        let variation = if rng.gen_bool(0.5) {
            WiringVariation::StraightThrough
        } else {
            WiringVariation::Crossover
        };
        DeviceKind::Wiring { variation }
    } else {
        DeviceKind::Download
    };

    DeviceTemplate {
        kind,
        time_limit: level.time_limit(),
        base_score: level.base_points_reward,
        base_gold: level.base_coin_reward,
        download_mb: rng.gen_range(level.min_download_mb..=level.max_download_mb),
        multipliers: level.multipliers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        let table = LevelTable::new(default_levels()).expect("valid table");
        assert_eq!(table.levels().len(), 5);
        assert_eq!(table.level_for(0).map(|(index, _)| index), Some(0));
        assert_eq!(table.level_for(20).map(|(index, _)| index), Some(0));
        assert_eq!(table.level_for(21).map(|(index, _)| index), Some(1));
        assert_eq!(table.level_for(9_999).map(|(index, _)| index), Some(4));
        assert!(table.level_for(10_000).is_none());
    }

    #[test]
    fn rejects_overlapping_levels() {
        let mut levels = default_levels();
        levels[1].min_score = 20;
        assert_eq!(
            LevelTable::new(levels),
            Err(LevelTableError::Overlap { index: 1 })
        );
    }

    #[test]
    fn rejects_gaps_between_levels() {
        let mut levels = default_levels();
        levels[2].min_score = 70;
        assert_eq!(
            LevelTable::new(levels),
            Err(LevelTableError::Gap {
                index: 2,
                from: 61,
                to: 69,
            })
        );
    }

    #[test]
    fn rejects_tables_not_starting_at_zero() {
        let mut levels = default_levels();
        levels[0].min_score = 5;
        assert_eq!(
            LevelTable::new(levels),
            Err(LevelTableError::MissingStart(5))
        );
        assert_eq!(LevelTable::new(Vec::new()), Err(LevelTableError::Empty));
    }

    #[test]
    fn rejects_weights_outside_unit_range() {
        let mut levels = default_levels();
        levels[3].spawn_weight = 1.5;
        assert!(matches!(
            LevelTable::new(levels),
            Err(LevelTableError::InvalidLevel { index: 3, .. })
        ));
    }

    #[test]
    fn rolled_downloads_stay_in_level_range() {
        let level = &default_levels()[2];
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..200 {
            let template = roll_template(&mut rng, level);
            assert!((150..=350).contains(&template.download_mb));
            assert_eq!(template.time_limit, Duration::from_secs(10));
            assert_eq!(template.kind, DeviceKind::Download);
        }
    }
}
