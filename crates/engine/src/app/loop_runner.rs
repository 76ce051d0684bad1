use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::{InputSnapshot, Scene, SceneCommand};

/// Supplies the input snapshot consumed by each simulation tick.
pub trait InputSource {
    fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot;
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stops the loop once this much simulated time has elapsed.
    pub max_sim_duration: Option<Duration>,
    /// Paces ticks against the wall clock; otherwise ticks run back to back.
    pub realtime: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_sim_duration: None,
            realtime: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SceneQuit,
    DurationElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub ticks: u64,
    pub simulated: Duration,
    pub reason: StopReason,
}

pub fn run_headless(
    config: &LoopConfig,
    scene: &mut dyn Scene,
    input: &mut dyn InputSource,
) -> LoopOutcome {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        realtime = config.realtime,
        max_sim_duration_ms = config.max_sim_duration.map(|d| d.as_millis() as u64),
        "loop_config"
    );

    scene.load();

    let mut ticks = 0u64;
    let mut simulated = Duration::ZERO;
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics = TickMetrics::new(metrics_log_interval);

    let reason = 'frames: loop {
        let frame_dt = if config.realtime {
            let now = Instant::now();
            let raw = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            clamp_frame_delta(raw, max_frame_delta)
        } else {
            fixed_dt
        };
        accumulator = accumulator.saturating_add(frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            let snapshot = input.snapshot_for_tick(ticks);
            let command = scene.update(fixed_dt_seconds, &snapshot);
            ticks = ticks.saturating_add(1);
            simulated = simulated.saturating_add(fixed_dt);
            metrics.record_tick();

            if command == SceneCommand::Quit || snapshot.quit_requested() {
                break 'frames StopReason::SceneQuit;
            }
            if config
                .max_sim_duration
                .is_some_and(|limit| simulated >= limit)
            {
                break 'frames StopReason::DurationElapsed;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        if let Some(tps) = metrics.maybe_rate(Instant::now()) {
            info!(
                tps,
                ticks,
                simulated_ms = simulated.as_millis() as u64,
                title = scene.debug_title().unwrap_or_default(),
                "loop_metrics"
            );
        }

        if config.realtime {
            let elapsed = Instant::now().saturating_duration_since(last_frame_instant);
            if elapsed < fixed_dt {
                thread::sleep(fixed_dt - elapsed);
            }
        }
    };

    scene.unload();
    info!(ticks, simulated_ms = simulated.as_millis() as u64, reason = ?reason, "loop_stopped");

    LoopOutcome {
        ticks,
        simulated,
        reason,
    }
}

#[derive(Debug)]
struct TickMetrics {
    interval_start: Instant,
    interval: Duration,
    ticks: u32,
}

impl TickMetrics {
    fn new(interval: Duration) -> Self {
        Self {
            interval_start: Instant::now(),
            interval,
            ticks: 0,
        }
    }

    fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    fn maybe_rate(&mut self, now: Instant) -> Option<f32> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }
        let rate = self.ticks as f32 / elapsed.as_secs_f32().max(f32::EPSILON);
        self.interval_start = now;
        self.ticks = 0;
        Some(rate)
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::InputAction;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let result = plan_sim_steps(Duration::from_millis(48), Duration::from_millis(16), 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[derive(Default)]
    struct CountingScene {
        loads: u32,
        unloads: u32,
        updates: u32,
        quit_after: Option<u32>,
    }

    impl Scene for CountingScene {
        fn load(&mut self) {
            self.loads += 1;
        }

        fn update(&mut self, fixed_dt_seconds: f32, _input: &InputSnapshot) -> SceneCommand {
            assert!((fixed_dt_seconds - 0.1).abs() < 1e-6);
            self.updates += 1;
            match self.quit_after {
                Some(limit) if self.updates >= limit => SceneCommand::Quit,
                _ => SceneCommand::None,
            }
        }

        fn unload(&mut self) {
            self.unloads += 1;
        }
    }

    struct IdleInput;

    impl InputSource for IdleInput {
        fn snapshot_for_tick(&mut self, _tick: u64) -> InputSnapshot {
            InputSnapshot::empty()
        }
    }

    struct QuitAtTick(u64);

    impl InputSource for QuitAtTick {
        fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot {
            InputSnapshot::empty().with_action_down(InputAction::Quit, tick >= self.0)
        }
    }

    fn fast_config(max_sim_duration: Option<Duration>) -> LoopConfig {
        LoopConfig {
            target_tps: 10,
            max_sim_duration,
            ..LoopConfig::default()
        }
    }

    #[test]
    fn headless_loop_stops_after_duration() {
        let mut scene = CountingScene::default();
        let outcome = run_headless(
            &fast_config(Some(Duration::from_secs(2))),
            &mut scene,
            &mut IdleInput,
        );

        assert_eq!(outcome.reason, StopReason::DurationElapsed);
        assert_eq!(outcome.ticks, 20);
        assert_eq!(scene.loads, 1);
        assert_eq!(scene.unloads, 1);
    }

    #[test]
    fn headless_loop_stops_on_scene_quit() {
        let mut scene = CountingScene {
            quit_after: Some(3),
            ..CountingScene::default()
        };
        let outcome = run_headless(&fast_config(None), &mut scene, &mut IdleInput);

        assert_eq!(outcome.reason, StopReason::SceneQuit);
        assert_eq!(outcome.ticks, 3);
    }

    #[test]
    fn headless_loop_stops_on_quit_input() {
        let mut scene = CountingScene::default();
        let outcome = run_headless(&fast_config(None), &mut scene, &mut QuitAtTick(4));

        assert_eq!(outcome.reason, StopReason::SceneQuit);
        assert_eq!(outcome.ticks, 5);
    }
}
