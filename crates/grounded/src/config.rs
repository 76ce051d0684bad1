use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::SteeringKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const CONFIG_ENV_VAR: &str = "GROUNDED_CONFIG";
pub const DEFAULT_CONFIG_RELATIVE_PATH: &str = "config/game.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value at {field}: expected {expected}, got {actual}")]
    Invalid {
        field: &'static str,
        expected: &'static str,
        actual: String,
    },
}

/// Gameplay tunables. Every field has a default so config files only list overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    pub level_file: String,
    pub initial_guests: u32,
    pub first_guest_milestone: u32,
    pub guest_milestone_step: [u32; 2],
    pub guest_countdown_mean_seconds: f32,
    pub guest_countdown_std_dev_seconds: f32,
    pub guest_countdown_min_seconds: f32,
    pub guest_issue_chance: f64,
    pub issue_min_interval_seconds: f32,
    pub hard_issue_base_chance: f64,
    pub issue_margin: f32,
    pub issue_placement_tries: u32,
    pub issue_grace_seconds: f32,
    pub issue_resolution_seconds: f32,
    pub grounded_ceiling: f32,
    pub soft_issue_cost: f32,
    pub hard_issue_cost: f32,
    pub issue_resolve_reward: f32,
    pub player_max_speed: f32,
    pub player_move_force: f32,
    pub player_stamina: f32,
    pub issues_disabled: bool,
    pub rng_seed: Option<u64>,
    pub steering: SteeringKind,
    pub target_tps: u32,
    pub max_session_seconds: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            level_file: "levels/basic_house.xml".to_string(),
            initial_guests: 10,
            first_guest_milestone: 5,
            guest_milestone_step: [3, 6],
            guest_countdown_mean_seconds: 5.0,
            guest_countdown_std_dev_seconds: 1.5,
            guest_countdown_min_seconds: 0.5,
            guest_issue_chance: 0.1,
            issue_min_interval_seconds: 5.0,
            hard_issue_base_chance: 0.01,
            issue_margin: 32.0,
            issue_placement_tries: 10,
            issue_grace_seconds: 0.5,
            issue_resolution_seconds: 2.0,
            grounded_ceiling: 100.0,
            soft_issue_cost: 2.0,
            hard_issue_cost: 5.0,
            issue_resolve_reward: 2.0,
            player_max_speed: 600.0,
            player_move_force: 6000.0,
            player_stamina: 1.0,
            issues_disabled: false,
            rng_seed: None,
            steering: SteeringKind::Thumbstick,
            target_tps: 60,
            max_session_seconds: 300.0,
        }
    }
}

impl GameConfig {
    pub fn from_json_str(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: GameConfig = serde_path_to_error::deserialize(&mut deserializer).map_err(
            |error| {
                let json_path = error.path().to_string();
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    json_path,
                    source: error.into_inner(),
                }
            },
        )?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(path, &raw)?;
        info!(path = %path.display(), "config_loaded");
        Ok(config)
    }

    /// Loads `GROUNDED_CONFIG` when set (the file must exist), otherwise
    /// `assets/config/game.json` when present, otherwise defaults.
    pub fn resolve(assets_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&explicit));
        }
        let default_path = assets_dir.join(DEFAULT_CONFIG_RELATIVE_PATH);
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            info!("config_defaults_used");
            Ok(Self::default())
        }
    }

    pub fn level_path(&self, assets_dir: &Path) -> PathBuf {
        assets_dir.join(&self.level_file)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let [step_min, step_max] = self.guest_milestone_step;
        if step_min == 0 || step_min > step_max {
            return Err(invalid(
                "guest_milestone_step",
                "[min, max] with 1 <= min <= max",
                format!("{:?}", self.guest_milestone_step),
            ));
        }
        check_probability("guest_issue_chance", self.guest_issue_chance)?;
        check_probability("hard_issue_base_chance", self.hard_issue_base_chance)?;
        check_positive("guest_countdown_min_seconds", self.guest_countdown_min_seconds)?;
        check_positive("issue_min_interval_seconds", self.issue_min_interval_seconds)?;
        check_positive("issue_resolution_seconds", self.issue_resolution_seconds)?;
        check_positive("grounded_ceiling", self.grounded_ceiling)?;
        check_positive("player_max_speed", self.player_max_speed)?;
        check_non_negative("guest_countdown_std_dev_seconds", self.guest_countdown_std_dev_seconds)?;
        check_non_negative("issue_grace_seconds", self.issue_grace_seconds)?;
        check_non_negative("issue_margin", self.issue_margin)?;
        check_non_negative("soft_issue_cost", self.soft_issue_cost)?;
        check_non_negative("hard_issue_cost", self.hard_issue_cost)?;
        check_non_negative("issue_resolve_reward", self.issue_resolve_reward)?;
        check_non_negative("player_move_force", self.player_move_force)?;
        check_non_negative("player_stamina", self.player_stamina)?;
        check_non_negative("max_session_seconds", self.max_session_seconds)?;
        if self.target_tps == 0 {
            return Err(invalid("target_tps", "at least 1", "0".to_string()));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, expected: &'static str, actual: String) -> ConfigError {
    ConfigError::Invalid {
        field,
        expected,
        actual,
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, "probability in [0, 1]", value.to_string()))
    }
}

fn check_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "finite number > 0", value.to_string()))
    }
}

fn check_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "finite number >= 0", value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<GameConfig, ConfigError> {
        GameConfig::from_json_str(Path::new("game.json"), raw)
    }

    #[test]
    fn defaults_are_valid() {
        GameConfig::default().validate().expect("defaults");
    }

    #[test]
    fn partial_file_overrides_only_listed_fields() {
        let config = parse(r#"{ "initial_guests": 4, "steering": "follow_pointer" }"#)
            .expect("parse");
        assert_eq!(config.initial_guests, 4);
        assert_eq!(config.steering, SteeringKind::FollowPointer);
        assert_eq!(config.grounded_ceiling, 100.0);
    }

    #[test]
    fn unknown_field_is_rejected_with_path() {
        let err = parse(r#"{ "initial_guests": 4, "guests_per_room": 2 }"#).expect_err("unknown");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn type_error_reports_json_path() {
        let err = parse(r#"{ "guest_milestone_step": [3, "six"] }"#).expect_err("type");
        match err {
            ConfigError::Parse { json_path, .. } => assert_eq!(json_path, "guest_milestone_step[1]"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_rejects_bad_ranges() {
        let err = parse(r#"{ "guest_milestone_step": [6, 3] }"#).expect_err("range");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "guest_milestone_step",
                ..
            }
        ));

        let err = parse(r#"{ "hard_issue_base_chance": 1.5 }"#).expect_err("probability");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "hard_issue_base_chance",
                ..
            }
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("game.json");
        fs::write(&path, r#"{ "rng_seed": 42 }"#).expect("write");
        assert_eq!(GameConfig::load(&path).expect("load").rng_seed, Some(42));
        assert!(matches!(
            GameConfig::load(&dir.path().join("nope.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/config/game.json");
        let config = GameConfig::load(&path).expect("shipped config");
        assert_eq!(config.level_file, GameConfig::default().level_file);
    }
}
