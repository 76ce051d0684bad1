use engine::{BusEvent, EventBus, Vec2};

use crate::house::RoomType;

pub type GameBus = EventBus<GameEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuestId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IssueId(pub u32);

/// One-shot sound effects the scene may ask the audio layer to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    GameOverSting,
    IssueResolved,
}

impl SoundCue {
    pub fn track_name(self) -> &'static str {
        match self {
            SoundCue::GameOverSting => "sfx_game_over",
            SoundCue::IssueResolved => "sfx_clean",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IssueMarker {
    pub id: IssueId,
    pub position: Vec2,
    pub hard: bool,
    pub progress: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameUpdate {
    pub player: Vec2,
    pub issues: Vec<IssueMarker>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSummary {
    pub resolved: u32,
    pub left: usize,
    pub guests: usize,
    pub play_time_seconds: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    GameStart,
    GuestSpawned {
        guest: GuestId,
        spot: usize,
        position: Vec2,
    },
    GuestsCountChanged(usize),
    GuestRequestsIssue {
        guest: GuestId,
    },
    IssueSpawned {
        issue: IssueId,
        position: Vec2,
        hard: bool,
        forced: bool,
        cost: f32,
    },
    IssueResolved {
        issue: IssueId,
        hard: bool,
        reward: f32,
    },
    IssuesCounterChanged(usize),
    ResolvedIssuesCounterChanged(u32),
    /// Chaos meter normalized to `[0, 1]`, 1 meaning calm.
    GroundedProgressChanged(f32),
    RoomEntered {
        room: RoomType,
        name: String,
    },
    GameUpdate(GameUpdate),
    PlayTimeUpdated(u32),
    PlaySound(SoundCue),
    StopMusic,
    GameOver(GameSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameEventKind {
    GameStart,
    GuestSpawned,
    GuestsCountChanged,
    GuestRequestsIssue,
    IssueSpawned,
    IssueResolved,
    IssuesCounterChanged,
    ResolvedIssuesCounterChanged,
    GroundedProgressChanged,
    RoomEntered,
    GameUpdate,
    PlayTimeUpdated,
    PlaySound,
    StopMusic,
    GameOver,
}

impl BusEvent for GameEvent {
    type Kind = GameEventKind;

    fn kind(&self) -> GameEventKind {
        match self {
            GameEvent::GameStart => GameEventKind::GameStart,
            GameEvent::GuestSpawned { .. } => GameEventKind::GuestSpawned,
            GameEvent::GuestsCountChanged(_) => GameEventKind::GuestsCountChanged,
            GameEvent::GuestRequestsIssue { .. } => GameEventKind::GuestRequestsIssue,
            GameEvent::IssueSpawned { .. } => GameEventKind::IssueSpawned,
            GameEvent::IssueResolved { .. } => GameEventKind::IssueResolved,
            GameEvent::IssuesCounterChanged(_) => GameEventKind::IssuesCounterChanged,
            GameEvent::ResolvedIssuesCounterChanged(_) => {
                GameEventKind::ResolvedIssuesCounterChanged
            }
            GameEvent::GroundedProgressChanged(_) => GameEventKind::GroundedProgressChanged,
            GameEvent::RoomEntered { .. } => GameEventKind::RoomEntered,
            GameEvent::GameUpdate(_) => GameEventKind::GameUpdate,
            GameEvent::PlayTimeUpdated(_) => GameEventKind::PlayTimeUpdated,
            GameEvent::PlaySound(_) => GameEventKind::PlaySound,
            GameEvent::StopMusic => GameEventKind::StopMusic,
            GameEvent::GameOver(_) => GameEventKind::GameOver,
        }
    }
}
