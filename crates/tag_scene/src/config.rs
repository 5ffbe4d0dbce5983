//! Environment configuration

use crate::agent::SPAWN_OFFSET_X;
use crate::error::{Result, SceneError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of one pursuit environment
///
/// Supplied once per run and never mutated afterwards. Equal values always
/// produce the same scene document and mesh assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Wall-to-wall inner width along x (m)
    pub arena_width: f64,
    /// Wall-to-wall inner height along y (m)
    pub arena_height: f64,

    /// Agent chassis radius (m)
    pub agent_radius: f64,
    /// Chassis center height at rest (m)
    pub agent_z: f64,

    /// Multiplier on the agent radius giving the tag distance
    pub tag_distance_factor: f64,

    /// Perception rays per agent
    pub n_rays: u32,

    /// Physics engine timestep (s)
    pub timestep: f64,
    /// Policy action rate (Hz)
    pub action_frequency: u32,

    /// Episode length bound (s)
    pub episode_max_length: u32,
    /// Time the chaser is held still at episode start (s)
    pub chaser_freeze_seconds: u32,

    /// Terminal reward: tag for the chaser, timeout for the evader
    pub win_reward: f64,
    /// Per-step reward, positive for the evader and negative for the chaser
    pub time_reward: f64,
    pub distance_shaping_scale: f64,

    /// Velocity normalization, approximate (m/s)
    pub max_linear_velocity: f64,
    /// Angular velocity normalization, approximate (rad/s)
    pub max_angular_velocity: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            arena_width: 3.0,
            arena_height: 2.0,
            agent_radius: 0.05,
            agent_z: 0.0299,
            tag_distance_factor: 1.1,
            n_rays: 64,
            timestep: 0.002,
            action_frequency: 50,
            episode_max_length: 30,
            chaser_freeze_seconds: 2,
            win_reward: 1.0,
            time_reward: 0.000001,
            distance_shaping_scale: 0.001,
            max_linear_velocity: 1.35,
            max_angular_velocity: 31.0,
        }
    }
}

impl EnvironmentConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| SceneError::InvalidConfig(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        log::debug!("Loaded environment config from {}", path.display());
        Self::from_toml_str(&source)
    }

    /// Set the arena inner extents
    pub fn with_arena(mut self, width: f64, height: f64) -> Self {
        self.arena_width = width;
        self.arena_height = height;
        self
    }

    /// Set the agent radius
    pub fn with_agent_radius(mut self, radius: f64) -> Self {
        self.agent_radius = radius;
        self
    }

    /// Set the chassis rest height
    pub fn with_agent_z(mut self, z: f64) -> Self {
        self.agent_z = z;
        self
    }

    /// Set timestep
    pub fn with_timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    /// Set the action rate
    pub fn with_action_frequency(mut self, hz: u32) -> Self {
        self.action_frequency = hz;
        self
    }

    /// Check every invariant the scene generator relies on
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("arena_width", self.arena_width),
            ("arena_height", self.arena_height),
            ("agent_radius", self.agent_radius),
            ("agent_z", self.agent_z),
            ("tag_distance_factor", self.tag_distance_factor),
            ("timestep", self.timestep),
            ("max_linear_velocity", self.max_linear_velocity),
            ("max_angular_velocity", self.max_angular_velocity),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SceneError::InvalidConfig(format!(
                    "{} must be positive and finite, got {}",
                    field, value
                )));
            }
        }

        let counts = [
            ("n_rays", self.n_rays),
            ("action_frequency", self.action_frequency),
            ("episode_max_length", self.episode_max_length),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(SceneError::InvalidConfig(format!("{} must be non-zero", field)));
            }
        }

        let rewards = [
            ("win_reward", self.win_reward),
            ("time_reward", self.time_reward),
            ("distance_shaping_scale", self.distance_shaping_scale),
        ];
        for (field, value) in rewards {
            if !value.is_finite() {
                return Err(SceneError::InvalidConfig(format!("{} must be finite", field)));
            }
        }

        let ratio = self.action_period() / self.timestep;
        if ratio < 1.0 - 1e-9 || (ratio - ratio.round()).abs() > 1e-9 * ratio {
            return Err(SceneError::InvalidConfig(format!(
                "action period {}s is not a whole number of {}s timesteps",
                self.action_period(),
                self.timestep
            )));
        }

        if self.chaser_freeze_seconds >= self.episode_max_length {
            return Err(SceneError::InvalidConfig(format!(
                "chaser freeze ({}s) must be shorter than the episode ({}s)",
                self.chaser_freeze_seconds, self.episode_max_length
            )));
        }

        if SPAWN_OFFSET_X - self.agent_radius <= 0.0 {
            return Err(SceneError::InvalidConfig(format!(
                "agents of radius {} overlap at spawn offset +/-{}",
                self.agent_radius, SPAWN_OFFSET_X
            )));
        }

        let half_width = self.arena_width / 2.0;
        let half_height = self.arena_height / 2.0;
        if SPAWN_OFFSET_X + self.agent_radius >= half_width || self.agent_radius >= half_height {
            return Err(SceneError::InvalidConfig(format!(
                "arena {}x{} is too small for agents of radius {} spawned at +/-{}",
                self.arena_width, self.arena_height, self.agent_radius, SPAWN_OFFSET_X
            )));
        }

        Ok(())
    }

    /// Center distance at which the chaser tags the evader
    pub fn tag_distance(&self) -> f64 {
        self.agent_radius * self.tag_distance_factor
    }

    /// Seconds between policy actions
    pub fn action_period(&self) -> f64 {
        1.0 / f64::from(self.action_frequency)
    }

    /// Physics steps taken per policy action
    pub fn physics_steps_per_action(&self) -> u32 {
        (self.action_period() / self.timestep).round() as u32
    }

    /// Policy steps before an episode times out
    pub fn max_episode_steps(&self) -> u64 {
        u64::from(self.episode_max_length) * u64::from(self.action_frequency)
    }

    /// Policy steps the chaser stays frozen
    pub fn chaser_freeze_steps(&self) -> u64 {
        u64::from(self.chaser_freeze_seconds) * u64::from(self.action_frequency)
    }

    /// Hashable identity of this configuration value
    pub fn cache_key(&self) -> ConfigKey {
        ConfigKey(vec![
            bits(self.arena_width),
            bits(self.arena_height),
            bits(self.agent_radius),
            bits(self.agent_z),
            bits(self.tag_distance_factor),
            u64::from(self.n_rays),
            bits(self.timestep),
            u64::from(self.action_frequency),
            u64::from(self.episode_max_length),
            u64::from(self.chaser_freeze_seconds),
            bits(self.win_reward),
            bits(self.time_reward),
            bits(self.distance_shaping_scale),
            bits(self.max_linear_velocity),
            bits(self.max_angular_velocity),
        ])
    }
}

/// Bit pattern of a field, with `-0.0` folded into `0.0`
fn bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Bitwise identity of an [`EnvironmentConfig`], usable as a map key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigKey(Vec<u64>);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid() {
        EnvironmentConfig::default().validate().unwrap();
    }

    #[test]
    fn test_derived_quantities() {
        let config = EnvironmentConfig::default();
        assert_relative_eq!(config.tag_distance(), 0.055, epsilon = 1e-12);
        assert_eq!(config.physics_steps_per_action(), 10);
        assert_eq!(config.max_episode_steps(), 1500);
        assert_eq!(config.chaser_freeze_steps(), 100);
    }

    #[test]
    fn test_rejects_non_positive_dimensions() {
        for config in [
            EnvironmentConfig::default().with_arena(0.0, 2.0),
            EnvironmentConfig::default().with_arena(3.0, -1.0),
            EnvironmentConfig::default().with_agent_radius(0.0),
            EnvironmentConfig::default().with_agent_z(f64::NAN),
            EnvironmentConfig::default().with_timestep(0.0),
        ] {
            assert!(matches!(config.validate(), Err(SceneError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_rejects_arena_too_small_for_spawn() {
        let config = EnvironmentConfig::default().with_arena(0.6, 2.0);
        assert!(matches!(config.validate(), Err(SceneError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_overlapping_spawn() {
        let config = EnvironmentConfig::default().with_agent_radius(0.3);
        assert!(matches!(config.validate(), Err(SceneError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_fractional_action_period() {
        let config = EnvironmentConfig::default().with_action_frequency(30);
        assert!(matches!(config.validate(), Err(SceneError::InvalidConfig(_))));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = EnvironmentConfig::from_toml_str("arena_width = 4.0\nn_rays = 32\n").unwrap();
        assert_relative_eq!(config.arena_width, 4.0);
        assert_eq!(config.n_rays, 32);
        assert_relative_eq!(config.arena_height, 2.0);
    }

    #[test]
    fn test_toml_is_validated() {
        assert!(EnvironmentConfig::from_toml_str("agent_radius = -0.05\n").is_err());
    }

    #[test]
    fn test_step_counts_do_not_overflow() {
        let config =
            EnvironmentConfig::from_toml_str("episode_max_length = 4294967295\n").unwrap();
        assert_eq!(config.max_episode_steps(), 4_294_967_295 * 50);

        let config = EnvironmentConfig {
            chaser_freeze_seconds: u32::MAX - 1,
            ..config
        };
        assert_eq!(config.chaser_freeze_steps(), 214_748_364_700);
    }

    #[test]
    fn test_cache_key_folds_signed_zero() {
        let positive = EnvironmentConfig {
            time_reward: 0.0,
            ..EnvironmentConfig::default()
        };
        let negative = EnvironmentConfig {
            time_reward: -0.0,
            ..EnvironmentConfig::default()
        };
        assert_eq!(positive.cache_key(), negative.cache_key());
    }

    #[test]
    fn test_cache_key_tracks_value() {
        let a = EnvironmentConfig::default();
        let b = EnvironmentConfig::default();
        let c = EnvironmentConfig::default().with_arena(3.5, 2.0);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }
}
