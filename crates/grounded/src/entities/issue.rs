use engine::{BodyDesc, BodyId, PhysicsWorld, Shape, Vec2};

use crate::collision::{CATEGORY_ISSUES, CATEGORY_PLAYER};
use crate::config::GameConfig;
use crate::events::IssueId;

/// Radius of the sensor zone the player has to stand in to clean an issue.
pub const ISSUE_CLEAN_RADIUS: f32 = 48.0;
pub const HARD_ISSUE_TIME_FACTOR: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IssueTuning {
    pub grace_seconds: f32,
    pub resolution_seconds: f32,
    pub soft_cost: f32,
    pub hard_cost: f32,
    pub resolve_reward: f32,
}

impl From<&GameConfig> for IssueTuning {
    fn from(config: &GameConfig) -> Self {
        Self {
            grace_seconds: config.issue_grace_seconds,
            resolution_seconds: config.issue_resolution_seconds,
            soft_cost: config.soft_issue_cost,
            hard_cost: config.hard_issue_cost,
            resolve_reward: config.issue_resolve_reward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Idle,
    Resolving,
    Resolved,
}

#[derive(Debug, Clone)]
pub struct Issue {
    id: IssueId,
    body: BodyId,
    position: Vec2,
    hard: bool,
    state: IssueState,
    tuning: IssueTuning,
    grace_remaining: f32,
    base_resolution: f32,
    resolution_remaining: f32,
}

impl Issue {
    /// Creates the issue together with its sensor body in `world`.
    pub fn spawn(
        world: &mut PhysicsWorld,
        id: IssueId,
        position: Vec2,
        hard: bool,
        tuning: IssueTuning,
    ) -> Self {
        let body = world.add_body(
            BodyDesc::fixed(Shape::circle(ISSUE_CLEAN_RADIUS), position)
                .with_category(CATEGORY_ISSUES)
                .with_mask(CATEGORY_PLAYER)
                .sensor(),
        );
        let base_resolution = if hard {
            tuning.resolution_seconds * HARD_ISSUE_TIME_FACTOR
        } else {
            tuning.resolution_seconds
        };
        Self {
            id,
            body,
            position,
            hard,
            state: IssueState::Idle,
            tuning,
            grace_remaining: tuning.grace_seconds,
            base_resolution,
            resolution_remaining: base_resolution,
        }
    }

    pub fn despawn(&self, world: &mut PhysicsWorld) {
        world.remove_body(self.body);
    }

    pub fn id(&self) -> IssueId {
        self.id
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_hard(&self) -> bool {
        self.hard
    }

    pub fn state(&self) -> IssueState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state == IssueState::Resolved
    }

    pub fn resolution_remaining(&self) -> f32 {
        self.resolution_remaining
    }

    pub fn grace_remaining(&self) -> f32 {
        self.grace_remaining
    }

    /// Chaos added when this issue appears.
    pub fn spawn_cost(&self) -> f32 {
        if self.hard {
            self.tuning.hard_cost
        } else {
            self.tuning.soft_cost
        }
    }

    /// Chaos removed when this issue is cleaned.
    pub fn resolve_reward(&self) -> f32 {
        self.tuning.resolve_reward
    }

    /// Cleaning progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.base_resolution <= 0.0 {
            return 1.0;
        }
        (1.0 - self.resolution_remaining / self.base_resolution).clamp(0.0, 1.0)
    }

    /// Visual scale cue: grows while being cleaned, collapses once resolved.
    pub fn scale_cue(&self) -> f32 {
        match self.state {
            IssueState::Idle => 1.0,
            IssueState::Resolving => 1.2,
            IssueState::Resolved => 0.0,
        }
    }

    pub fn start_resolving(&mut self) {
        if self.state == IssueState::Resolved {
            return;
        }
        self.state = IssueState::Resolving;
        self.grace_remaining = self.tuning.grace_seconds;
    }

    /// Pauses cleaning. Time already spent past the grace delay is kept.
    pub fn stop_resolving(&mut self) {
        if self.state == IssueState::Resolving {
            self.state = IssueState::Idle;
        }
    }

    /// Returns `true` on the single tick the issue becomes resolved.
    pub fn update(&mut self, dt_seconds: f32) -> bool {
        if self.state != IssueState::Resolving {
            return false;
        }
        if self.grace_remaining > 0.0 {
            self.grace_remaining -= dt_seconds;
            return false;
        }
        self.resolution_remaining -= dt_seconds;
        if self.resolution_remaining <= 0.0 {
            self.state = IssueState::Resolved;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> IssueTuning {
        IssueTuning::from(&GameConfig::default())
    }

    fn spawn(hard: bool) -> (PhysicsWorld, Issue) {
        let mut world = PhysicsWorld::new();
        let issue = Issue::spawn(&mut world, IssueId(1), Vec2::new(5.0, 5.0), hard, tuning());
        (world, issue)
    }

    #[test]
    fn spawn_adds_sensor_body_and_despawn_removes_it() {
        let (mut world, issue) = spawn(false);
        let body = world.body(issue.body()).expect("body");
        assert!(body.is_sensor());
        assert_eq!(body.category(), CATEGORY_ISSUES);

        issue.despawn(&mut world);
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn idle_issue_does_not_progress() {
        let (_world, mut issue) = spawn(false);
        assert!(!issue.update(10.0));
        assert_eq!(issue.state(), IssueState::Idle);
        assert_eq!(issue.progress(), 0.0);
    }

    #[test]
    fn exact_budget_resolves_exactly_once() {
        let (_world, mut issue) = spawn(false);
        issue.start_resolving();

        let mut resolutions = 0;
        for dt in [0.5, 2.0, 1.0, 1.0] {
            if issue.update(dt) {
                resolutions += 1;
            }
        }
        assert_eq!(resolutions, 1);
        assert!(issue.is_resolved());
        assert_eq!(issue.scale_cue(), 0.0);

        issue.start_resolving();
        assert!(issue.is_resolved());
        assert!(!issue.update(1.0));
    }

    #[test]
    fn small_steps_resolve_once_at_end_of_budget() {
        let (_world, mut issue) = spawn(false);
        issue.start_resolving();
        let dt = 1.0 / 60.0;
        let mut resolved_at = None;
        for tick in 0..400 {
            if issue.update(dt) {
                assert!(resolved_at.is_none(), "resolved twice");
                resolved_at = Some(tick);
            }
        }
        let tick = resolved_at.expect("resolved");
        let elapsed = (tick + 1) as f32 * dt;
        assert!((elapsed - 2.5).abs() < 3.0 * dt, "resolved after {elapsed}s");
    }

    #[test]
    fn interrupt_during_grace_keeps_budget_untouched() {
        let (_world, mut issue) = spawn(false);
        issue.start_resolving();
        issue.update(0.3);
        issue.stop_resolving();
        assert_eq!(issue.state(), IssueState::Idle);

        issue.start_resolving();
        assert_eq!(issue.grace_remaining(), 0.5);
        assert_eq!(issue.resolution_remaining(), 2.0);
    }

    #[test]
    fn interrupt_after_grace_keeps_spent_progress() {
        let (_world, mut issue) = spawn(false);
        issue.start_resolving();
        issue.update(0.5);
        issue.update(1.0);
        issue.stop_resolving();
        assert!((issue.progress() - 0.5).abs() < 1e-6);

        issue.start_resolving();
        issue.update(0.5);
        assert!(issue.update(1.0));
    }

    #[test]
    fn hard_issue_takes_twice_as_long_and_costs_more() {
        let (_world, mut issue) = spawn(true);
        assert_eq!(issue.resolution_remaining(), 4.0);
        assert_eq!(issue.spawn_cost(), 5.0);
        assert_eq!(issue.resolve_reward(), 2.0);

        issue.start_resolving();
        issue.update(0.5);
        assert!(!issue.update(3.9));
        assert!(issue.update(0.2));
    }

    #[test]
    fn scale_cue_follows_state() {
        let (_world, mut issue) = spawn(false);
        assert_eq!(issue.scale_cue(), 1.0);
        issue.start_resolving();
        assert_eq!(issue.scale_cue(), 1.2);
        issue.stop_resolving();
        assert_eq!(issue.scale_cue(), 1.0);
    }
}
