mod input;
mod loop_runner;
mod scene;
mod steering;

pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_headless, InputSource, LoopConfig, LoopOutcome, StopReason};
pub use scene::{viewport_center, Camera2D, Scene, SceneCommand, Vec2};
pub use steering::{
    keyboard_move_vector, FollowPointerSteering, InputError, PointerSteering, SteeringHost,
    SteeringKind, ThumbstickSteering, FOLLOW_POINTER_RADIUS_PX, THUMBSTICK_MAX_MAGNITUDE_PX,
};
