use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use engine::{resolve_app_paths, LoopConfig, SettingsStore, SteeringHost};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::autopilot::Autopilot;
use super::gameplay::{scene_rng, PartyScene};
use super::AppError;
use crate::audio::{AudioDirector, TracingAudioBackend};
use crate::config::GameConfig;
use crate::events::GameBus;
use crate::house::load_level;

pub const POINTER_CONFIG_KEY: &str = "pointer_config";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerConfig {
    pub show_pointer_helper: bool,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            show_pointer_helper: true,
        }
    }
}

pub struct AppWiring {
    pub loop_config: LoopConfig,
    pub scene: PartyScene,
    pub input: Autopilot,
    pub audio: Rc<RefCell<AudioDirector>>,
}

pub fn build_app() -> Result<AppWiring, AppError> {
    info!("=== Grounded Startup ===");

    let paths = resolve_app_paths()?;
    let config = GameConfig::resolve(&paths.assets_dir)?;
    let map = load_level(&config.level_path(&paths.assets_dir))?;

    let settings = Rc::new(RefCell::new(SettingsStore::load_or_empty(
        paths.settings_file(),
    )));
    let pointer: PointerConfig = settings
        .borrow()
        .get_or(POINTER_CONFIG_KEY, PointerConfig::default());
    let mut steering = SteeringHost::new(pointer.show_pointer_helper);
    steering.attach(config.steering)?;

    let bus = GameBus::new();
    let audio = Rc::new(RefCell::new(AudioDirector::new(
        Box::new(TracingAudioBackend::with_default_tracks()),
        Rc::clone(&settings),
    )));
    AudioDirector::attach(&audio, &bus);
    let input = Autopilot::attach(&bus);

    let loop_config = LoopConfig {
        target_tps: config.target_tps,
        max_sim_duration: session_limit(config.max_session_seconds),
        ..LoopConfig::default()
    };
    info!(
        root = %paths.root.display(),
        level = %config.level_file,
        seed = ?config.rng_seed,
        steering = ?config.steering,
        "app_configured"
    );

    let rng = scene_rng(&config);
    let scene = PartyScene::new(config, map, bus, steering, rng).quit_on_game_over(true);
    Ok(AppWiring {
        loop_config,
        scene,
        input,
        audio,
    })
}

/// `0` disables the limit.
fn session_limit(seconds: f32) -> Option<Duration> {
    (seconds > 0.0).then(|| Duration::from_secs_f32(seconds))
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
