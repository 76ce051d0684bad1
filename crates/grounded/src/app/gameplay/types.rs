#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    /// Entities exist and physics settles, but nothing ticks.
    Paused,
    Running,
    GameOver,
}

/// Chaos accounting. Keeps the raw running total so the round trip stays exact; only the
/// broadcast value is clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaosMeter {
    ceiling: f32,
    raw: f32,
}

impl ChaosMeter {
    pub fn new(ceiling: f32) -> Self {
        Self {
            ceiling,
            raw: ceiling,
        }
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    pub fn raw(&self) -> f32 {
        self.raw
    }

    pub fn clamped(&self) -> f32 {
        self.raw.clamp(0.0, self.ceiling)
    }

    /// `1.0` is a calm party, `0.0` a grounded one.
    pub fn normalized(&self) -> f32 {
        self.clamped() / self.ceiling
    }

    pub fn apply(&mut self, delta: f32) {
        self.raw += delta;
    }

    pub fn is_depleted(&self) -> bool {
        self.raw < 0.0
    }
}

/// Seeds from `rng_seed` when set so runs can be replayed.
pub fn scene_rng(config: &GameConfig) -> ChaCha8Rng {
    match config.rng_seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}
