pub mod autopilot;
pub mod bootstrap;
pub mod gameplay;
pub mod loop_runner;

use engine::{InputError, StartupError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::house::LevelLoadError;

pub use autopilot::Autopilot;
pub use gameplay::{ChaosMeter, GameState, PartyScene};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Level(#[from] LevelLoadError),
    #[error(transparent)]
    Input(#[from] InputError),
}
