use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use cable_rush_system_spawning::{default_levels, LevelTable, SpawnLevel};
use cable_rush_world::config::WorldConfig;
use serde::Deserialize;

/// Complete configuration of a headless session.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    /// Seed shared by the world and the systems unless overridden.
    pub(crate) seed: Option<u64>,
    /// Grid, hub and cable parameters.
    pub(crate) world: WorldConfig,
    /// Difficulty table; the built-in curve is used when omitted.
    pub(crate) levels: Option<Vec<SpawnLevel>>,
    /// Behaviour of the scripted player.
    pub(crate) autoplay: AutoPlayConfig,
}

impl GameConfig {
    /// Reads and validates a TOML configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read game config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid game config {}", path.display()))
    }

    /// Parses and validates TOML configuration contents.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse game config toml contents")?;
        config.world.validate().context("world section is invalid")?;
        config.autoplay.validate()?;
        Ok(config)
    }

    /// Builds the validated spawn level table.
    pub(crate) fn level_table(&self) -> Result<LevelTable> {
        let levels = self.levels.clone().unwrap_or_else(default_levels);
        LevelTable::new(levels).context("levels section is invalid")
    }
}

/// Tuning of the scripted player driving headless runs.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AutoPlayConfig {
    /// Whether the scripted player acts at all.
    pub(crate) enabled: bool,
    /// Delay between two cable connections, in milliseconds.
    pub(crate) reaction_delay_ms: u64,
    /// Time spent solving a wiring minigame, in milliseconds.
    pub(crate) minigame_delay_ms: u64,
    /// Probability in `[0, 1]` of solving a wiring minigame.
    pub(crate) minigame_success_rate: f64,
    /// Whether spare coins are spent on hub upgrades.
    pub(crate) buy_upgrades: bool,
}

impl AutoPlayConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.minigame_success_rate) {
            bail!(
                "autoplay minigame_success_rate must lie in [0, 1], got {}",
                self.minigame_success_rate
            );
        }
        Ok(())
    }
}

impl Default for AutoPlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reaction_delay_ms: 1_200,
            minigame_delay_ms: 2_500,
            minigame_success_rate: 0.8,
            buy_upgrades: true,
        }
    }
}
