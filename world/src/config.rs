//! Static world configuration loaded once at startup.

use cable_rush_system_cable_geometry::CableSettings;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hub::{default_cable_ladder, default_speed_ladder, UpgradeLadder};

/// Largest number of points a cable curve may be sampled into.
pub const MAX_CURVE_RESOLUTION: usize = 256;

/// Errors raised when a world configuration is inconsistent.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Grid cells must have a positive, finite size.
    #[error("grid cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),
    /// The grid has no room for devices around the hub.
    #[error("grid of {columns}x{rows} leaves no cell for devices")]
    GridTooSmall {
        /// Configured columns.
        columns: u32,
        /// Configured rows.
        rows: u32,
    },
    /// An upgrade ladder has no levels.
    #[error("{track} upgrade ladder has no levels")]
    EmptyLadder {
        /// Name of the offending ladder.
        track: &'static str,
    },
    /// An upgrade ladder lacks a cost for some step.
    #[error("{track} upgrade ladder has {values} levels but {costs} costs")]
    LadderCostMismatch {
        /// Name of the offending ladder.
        track: &'static str,
        /// Number of levels.
        values: usize,
        /// Number of costs.
        costs: usize,
    },
    /// Cable settings cannot produce a usable cable.
    #[error("cable settings are invalid: {0}")]
    InvalidCableSettings(&'static str),
    /// The session would start without lives.
    #[error("max lives must be at least one")]
    NoLives,
}

/// Layout of the spawn grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Requested column count; even values are bumped to odd.
    pub columns: u32,
    /// Requested row count; even values are bumped to odd.
    pub rows: u32,
    /// Side length of a cell in world units.
    pub cell_size: f32,
    /// World position of the hub cell.
    pub center: Vec3,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 7,
            rows: 5,
            cell_size: 2.0,
            center: Vec3::ZERO,
        }
    }
}

/// Hub facing and upgrade ladders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Forward axis of the hub; flattened onto the ground plane.
    pub forward: Vec3,
    /// Internet speed levels in megabytes per second.
    pub speed: UpgradeLadder<f32>,
    /// Simultaneous cable levels.
    pub cables: UpgradeLadder<u32>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            forward: Vec3::Z,
            speed: default_speed_ladder(),
            cables: default_cable_ladder(),
        }
    }
}

/// Everything needed to construct a [`crate::World`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Spawn grid layout.
    pub grid: GridConfig,
    /// Hub parameters.
    pub hub: HubConfig,
    /// Cable shape parameters.
    pub cables: CableSettings,
    /// Lives granted at the start of a session.
    pub max_lives: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            hub: HubConfig::default(),
            cables: CableSettings::default(),
            max_lives: 3,
        }
    }
}

impl WorldConfig {
    /// Checks the configuration for values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cell_size = self.grid.cell_size;
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(ConfigError::InvalidCellSize(cell_size));
        }
        if self.grid.columns <= 1 && self.grid.rows <= 1 {
            return Err(ConfigError::GridTooSmall {
                columns: self.grid.columns,
                rows: self.grid.rows,
            });
        }
        validate_ladder("speed", &self.hub.speed)?;
        validate_ladder("cable", &self.hub.cables)?;

        let cables = &self.cables;
        if !(cables.max_cable_distance.is_finite() && cables.max_cable_distance > 0.0) {
            return Err(ConfigError::InvalidCableSettings(
                "max_cable_distance must be positive",
            ));
        }
        if !(cables.connection_radius.is_finite() && cables.connection_radius >= 0.0) {
            return Err(ConfigError::InvalidCableSettings(
                "connection_radius must not be negative",
            ));
        }
        if cables.curve_resolution > MAX_CURVE_RESOLUTION {
            return Err(ConfigError::InvalidCableSettings(
                "curve_resolution must not exceed 256",
            ));
        }
        if self.max_lives == 0 {
            return Err(ConfigError::NoLives);
        }
        Ok(())
    }
}

fn validate_ladder<T>(track: &'static str, ladder: &UpgradeLadder<T>) -> Result<(), ConfigError> {
    if ladder.values.is_empty() {
        return Err(ConfigError::EmptyLadder { track });
    }
    if ladder.costs.len() + 1 != ladder.values.len() {
        return Err(ConfigError::LadderCostMismatch {
            track,
            values: ladder.values.len(),
            costs: ladder.costs.len(),
        });
    }
    Ok(())
}
