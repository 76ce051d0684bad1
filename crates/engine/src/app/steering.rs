use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::input::{InputAction, InputSnapshot};
use super::scene::{viewport_center, Vec2};

pub const THUMBSTICK_MAX_MAGNITUDE_PX: f32 = 64.0;
pub const FOLLOW_POINTER_RADIUS_PX: f32 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("pointer steering is already attached ({0:?}); it can only be initialized once")]
    SteeringAlreadyAttached(SteeringKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteeringKind {
    Thumbstick,
    FollowPointer,
}

/// Normalized keyboard direction in screen orientation (+y down), `None` when idle.
pub fn keyboard_move_vector(input: &InputSnapshot) -> Option<Vec2> {
    let mut direction = Vec2::ZERO;
    if input.is_down(InputAction::MoveRight) {
        direction.x += 1.0;
    }
    if input.is_down(InputAction::MoveLeft) {
        direction.x -= 1.0;
    }
    if input.is_down(InputAction::MoveUp) {
        direction.y -= 1.0;
    }
    if input.is_down(InputAction::MoveDown) {
        direction.y += 1.0;
    }

    let normalized = direction.normalized_or_zero();
    (normalized != Vec2::ZERO).then_some(normalized)
}

/// Maps a raw pointer offset to a steering vector: direction kept, magnitude clamped to
/// `max_magnitude` and squared for finer control near the origin.
fn progressive_vector(offset: Vec2, max_magnitude: f32) -> Vec2 {
    let magnitude = offset.length().clamp(0.0, max_magnitude);
    let scaled = magnitude / max_magnitude;
    offset.normalized_or_zero() * (scaled * scaled)
}

#[derive(Debug, Clone, Default)]
pub struct ThumbstickSteering {
    origin_px: Option<Vec2>,
    knob_px: Option<Vec2>,
    current: Vec2,
}

impl ThumbstickSteering {
    fn observe(&mut self, input: &InputSnapshot) {
        if !input.pointer_down() {
            self.release();
            return;
        }
        let Some(pointer) = input.pointer_position_px() else {
            return;
        };
        if input.pointer_pressed() || self.origin_px.is_none() {
            self.origin_px = Some(pointer);
            self.knob_px = Some(pointer);
            self.current = Vec2::ZERO;
            return;
        }
        let Some(origin) = self.origin_px else {
            return;
        };
        let offset = pointer - origin;
        self.knob_px = Some(origin + offset.clamp_length(THUMBSTICK_MAX_MAGNITUDE_PX));
        self.current = progressive_vector(offset, THUMBSTICK_MAX_MAGNITUDE_PX);
    }

    fn release(&mut self) {
        self.origin_px = None;
        self.knob_px = None;
        self.current = Vec2::ZERO;
    }

    pub fn origin_px(&self) -> Option<Vec2> {
        self.origin_px
    }

    pub fn knob_px(&self) -> Option<Vec2> {
        self.knob_px
    }
}

#[derive(Debug, Clone, Default)]
pub struct FollowPointerSteering {
    active: bool,
    current: Vec2,
}

impl FollowPointerSteering {
    fn observe(&mut self, input: &InputSnapshot) {
        match input.pointer_position_px() {
            Some(pointer) if input.pointer_down() => {
                let offset = pointer - viewport_center(input.window_size());
                self.active = true;
                self.current = progressive_vector(offset, FOLLOW_POINTER_RADIUS_PX);
            }
            _ => self.release(),
        }
    }

    fn release(&mut self) {
        self.active = false;
        self.current = Vec2::ZERO;
    }
}

/// Pointer-driven steering strategy, selected at configuration time.
#[derive(Debug, Clone)]
pub enum PointerSteering {
    Thumbstick(ThumbstickSteering),
    FollowPointer(FollowPointerSteering),
}

impl PointerSteering {
    pub fn new(kind: SteeringKind) -> Self {
        match kind {
            SteeringKind::Thumbstick => Self::Thumbstick(ThumbstickSteering::default()),
            SteeringKind::FollowPointer => Self::FollowPointer(FollowPointerSteering::default()),
        }
    }

    pub fn kind(&self) -> SteeringKind {
        match self {
            Self::Thumbstick(_) => SteeringKind::Thumbstick,
            Self::FollowPointer(_) => SteeringKind::FollowPointer,
        }
    }

    pub fn observe(&mut self, input: &InputSnapshot) {
        match self {
            Self::Thumbstick(stick) => stick.observe(input),
            Self::FollowPointer(follow) => follow.observe(input),
        }
    }

    pub fn move_vector(&self) -> Vec2 {
        match self {
            Self::Thumbstick(stick) => stick.current,
            Self::FollowPointer(follow) => follow.current,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::Thumbstick(stick) => stick.origin_px.is_some(),
            Self::FollowPointer(follow) => follow.active,
        }
    }

    pub fn teardown(&mut self) {
        match self {
            Self::Thumbstick(stick) => stick.release(),
            Self::FollowPointer(follow) => follow.release(),
        }
    }
}

/// Owns the single pointer steering strategy bound to the input surface, and resolves
/// the movement intent with keyboard taking priority over the pointer.
#[derive(Debug, Clone)]
pub struct SteeringHost {
    pointer: Option<PointerSteering>,
    show_pointer_helper: bool,
}

impl Default for SteeringHost {
    fn default() -> Self {
        Self {
            pointer: None,
            show_pointer_helper: true,
        }
    }
}

impl SteeringHost {
    pub fn new(show_pointer_helper: bool) -> Self {
        Self {
            pointer: None,
            show_pointer_helper,
        }
    }

    pub fn attach(&mut self, kind: SteeringKind) -> Result<(), InputError> {
        if let Some(existing) = &self.pointer {
            return Err(InputError::SteeringAlreadyAttached(existing.kind()));
        }
        self.pointer = Some(PointerSteering::new(kind));
        info!(kind = ?kind, "steering_attached");
        Ok(())
    }

    /// Tears down the current strategy (if any) and attaches a fresh one of `kind`.
    pub fn replace(&mut self, kind: SteeringKind) {
        if let Some(mut previous) = self.pointer.take() {
            previous.teardown();
        }
        self.pointer = Some(PointerSteering::new(kind));
        info!(kind = ?kind, "steering_replaced");
    }

    pub fn detach(&mut self) {
        if let Some(mut previous) = self.pointer.take() {
            previous.teardown();
        }
    }

    pub fn kind(&self) -> Option<SteeringKind> {
        self.pointer.as_ref().map(PointerSteering::kind)
    }

    pub fn observe(&mut self, input: &InputSnapshot) {
        if let Some(pointer) = self.pointer.as_mut() {
            pointer.observe(input);
        }
    }

    pub fn move_vector(&self, input: &InputSnapshot) -> Option<Vec2> {
        if let Some(keyboard) = keyboard_move_vector(input) {
            return Some(keyboard);
        }
        self.pointer
            .as_ref()
            .filter(|pointer| pointer.is_active())
            .map(PointerSteering::move_vector)
    }

    pub fn pointer(&self) -> Option<&PointerSteering> {
        self.pointer.as_ref()
    }

    pub fn show_pointer_helper(&self) -> bool {
        self.show_pointer_helper
    }

    pub fn set_show_pointer_helper(&mut self, show: bool) {
        self.show_pointer_helper = show;
    }

    pub fn helper_visible(&self) -> bool {
        self.show_pointer_helper && self.pointer.as_ref().is_some_and(PointerSteering::is_active)
    }
}
