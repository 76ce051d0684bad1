use std::cell::RefCell;
use std::rc::Rc;

use engine::{InputAction, InputSnapshot, InputSource, Vec2};

use crate::events::{GameBus, GameEvent, GameEventKind, GameUpdate};

const AUTOPILOT_WINDOW_SIZE: (u32, u32) = (1280, 720);
/// Closer than this on an axis and the autopilot stops pressing that axis.
const AXIS_DEADZONE_PX: f32 = 8.0;

/// Scripted input for headless sessions: starts the game on the first tick, then walks
/// the player toward the nearest open issue using the keyboard actions.
pub struct Autopilot {
    bus: GameBus,
    latest: Rc<RefCell<Option<GameUpdate>>>,
}

impl Autopilot {
    /// Follows the scene through its `GameUpdate` broadcasts on `bus`.
    pub fn attach(bus: &GameBus) -> Self {
        let latest = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&latest);
        bus.on(GameEventKind::GameUpdate, move |event| {
            if let GameEvent::GameUpdate(update) = event {
                *sink.borrow_mut() = Some(update.clone());
            }
        });
        Self {
            bus: bus.clone(),
            latest,
        }
    }

    fn target(&self) -> Option<(Vec2, Vec2)> {
        let latest = self.latest.borrow();
        let update = latest.as_ref()?;
        let player = update.player;
        update
            .issues
            .iter()
            .map(|issue| issue.position)
            .min_by(|a, b| player.distance(*a).total_cmp(&player.distance(*b)))
            .map(|target| (player, target))
    }
}

impl InputSource for Autopilot {
    fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot {
        if tick == 0 {
            self.bus.emit(&GameEvent::GameStart);
        }

        let snapshot = InputSnapshot::empty().with_window_size(AUTOPILOT_WINDOW_SIZE);
        let Some((player, target)) = self.target() else {
            return snapshot;
        };
        let offset = target - player;
        snapshot
            .with_action_down(InputAction::MoveRight, offset.x > AXIS_DEADZONE_PX)
            .with_action_down(InputAction::MoveLeft, offset.x < -AXIS_DEADZONE_PX)
            .with_action_down(InputAction::MoveDown, offset.y > AXIS_DEADZONE_PX)
            .with_action_down(InputAction::MoveUp, offset.y < -AXIS_DEADZONE_PX)
    }
}
