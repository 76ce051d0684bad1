//! Turns bus events into playback requests. Actual playback sits behind [`AudioBackend`].

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use engine::{SettingsStore, SubscriptionId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::events::{GameBus, GameEvent, GameEventKind, SoundCue};
use crate::house::RoomType;

pub const SOUND_CONFIG_KEY: &str = "sound_config";
pub const MUSIC_FADE_SECONDS: f32 = 1.0;
pub const EFFECT_FADE_SECONDS: f32 = 0.5;
/// Quiet game updates to wait after the last volume change before writing settings.
pub const SAVE_DEBOUNCE_UPDATES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundConfig {
    pub volume: f32,
    pub music_volume: f32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            volume: 0.5,
            music_volume: 0.5,
        }
    }
}

pub fn music_track(room: RoomType) -> &'static str {
    match room {
        RoomType::Bathroom => "music_bathroom",
        RoomType::Kitchen => "music_kitchen",
        RoomType::Bedroom => "music_bedroom",
        RoomType::LivingRoom => "music_livingroom",
        RoomType::Hall => "music_hall",
        RoomType::Garden => "music_garden",
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playback {
    pub looped: bool,
    pub volume: f32,
    pub fade_in_seconds: f32,
}

pub trait AudioBackend {
    fn has_track(&self, name: &str) -> bool;
    fn play(&mut self, name: &str, playback: Playback);
    fn fade_out(&mut self, name: &str, seconds: f32);
    fn set_track_volume(&mut self, name: &str, volume: f32);
    fn set_master_volume(&mut self, volume: f32);
}

/// Backend for headless runs: knows the shipped track names and logs every request.
#[derive(Debug, Clone, Default)]
pub struct TracingAudioBackend {
    tracks: BTreeSet<String>,
}

impl TracingAudioBackend {
    pub fn with_tracks<I, S>(tracks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracks: tracks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_default_tracks() -> Self {
        let music = RoomType::ALL.into_iter().map(music_track);
        let effects = [SoundCue::GameOverSting, SoundCue::IssueResolved]
            .into_iter()
            .map(SoundCue::track_name);
        Self::with_tracks(music.chain(effects))
    }
}

impl AudioBackend for TracingAudioBackend {
    fn has_track(&self, name: &str) -> bool {
        self.tracks.contains(name)
    }

    fn play(&mut self, name: &str, playback: Playback) {
        debug!(
            track = name,
            looped = playback.looped,
            volume = playback.volume,
            fade_in = playback.fade_in_seconds,
            "audio_play"
        );
    }

    fn fade_out(&mut self, name: &str, seconds: f32) {
        debug!(track = name, seconds, "audio_fade_out");
    }

    fn set_track_volume(&mut self, name: &str, volume: f32) {
        debug!(track = name, volume, "audio_track_volume");
    }

    fn set_master_volume(&mut self, volume: f32) {
        debug!(volume, "audio_master_volume");
    }
}

pub struct AudioDirector {
    backend: Box<dyn AudioBackend>,
    settings: Rc<RefCell<SettingsStore>>,
    config: SoundConfig,
    current_track: Option<&'static str>,
    current_audible: bool,
    save_countdown: Option<u32>,
}

impl AudioDirector {
    /// Reads `sound_config` from `settings`, falling back to defaults.
    pub fn new(backend: Box<dyn AudioBackend>, settings: Rc<RefCell<SettingsStore>>) -> Self {
        let stored: SoundConfig = settings.borrow().get_or(SOUND_CONFIG_KEY, SoundConfig::default());
        let config = SoundConfig {
            volume: stored.volume.clamp(0.0, 1.0),
            music_volume: stored.music_volume.clamp(0.0, 1.0),
        };
        let mut director = Self {
            backend,
            settings,
            config,
            current_track: None,
            current_audible: false,
            save_countdown: None,
        };
        director.backend.set_master_volume(config.volume);
        director
    }

    /// Subscribes `director` to the bus events it reacts to.
    pub fn attach(director: &Rc<RefCell<AudioDirector>>, bus: &GameBus) -> Vec<SubscriptionId> {
        let kinds = [
            GameEventKind::RoomEntered,
            GameEventKind::PlaySound,
            GameEventKind::StopMusic,
            GameEventKind::GameOver,
            GameEventKind::GameUpdate,
        ];
        kinds
            .into_iter()
            .map(|kind| {
                let director = Rc::clone(director);
                bus.on(kind, move |event| director.borrow_mut().handle(event))
            })
            .collect()
    }

    pub fn handle(&mut self, event: &GameEvent) {
        match event {
            GameEvent::RoomEntered { room, .. } => self.play_music(music_track(*room)),
            GameEvent::PlaySound(cue) => self.play_effect(*cue),
            GameEvent::StopMusic | GameEvent::GameOver(_) => self.stop_music(),
            GameEvent::GameUpdate(_) => self.count_down_save(),
            _ => {}
        }
    }

    pub fn config(&self) -> SoundConfig {
        self.config
    }

    pub fn current_track(&self) -> Option<&'static str> {
        self.current_track
    }

    /// Cross-fades to `track`. Asking for the track already playing does nothing.
    pub fn play_music(&mut self, track: &'static str) {
        if !self.backend.has_track(track) {
            warn!(track, "music_track_not_found");
            return;
        }
        if self.current_track == Some(track) {
            return;
        }
        if let Some(previous) = self.current_track.take() {
            self.backend.fade_out(previous, MUSIC_FADE_SECONDS);
        }
        self.current_track = Some(track);
        self.current_audible = self.fade_in(track, true, MUSIC_FADE_SECONDS);
        info!(track, audible = self.current_audible, "music_changed");
    }

    pub fn stop_music(&mut self) {
        if let Some(track) = self.current_track.take() {
            self.backend.fade_out(track, EFFECT_FADE_SECONDS);
            self.current_audible = false;
            info!(track, "music_stopped");
        }
    }

    pub fn play_effect(&mut self, cue: SoundCue) {
        let track = cue.track_name();
        if !self.backend.has_track(track) {
            warn!(track, "sound_track_not_found");
            return;
        }
        if self.config.volume > 0.0 {
            self.backend.play(
                track,
                Playback {
                    looped: false,
                    volume: 1.0,
                    fade_in_seconds: 0.0,
                },
            );
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.config.volume = volume.clamp(0.0, 1.0);
        self.backend.set_master_volume(self.config.volume);
        self.schedule_save();
    }

    /// Applies to the current track right away; a track that was muted starts fading in.
    pub fn set_music_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        if volume == self.config.music_volume {
            return;
        }
        self.config.music_volume = volume;
        if let Some(track) = self.current_track {
            self.backend.set_track_volume(track, volume);
            if volume > 0.0 && !self.current_audible {
                self.current_audible = self.fade_in(track, true, EFFECT_FADE_SECONDS);
            }
        }
        self.schedule_save();
    }

    pub fn has_pending_save(&self) -> bool {
        self.save_countdown.is_some()
    }

    /// Writes a pending volume change now instead of waiting for the debounce.
    pub fn flush(&mut self) {
        if self.save_countdown.take().is_some() {
            self.save();
        }
    }

    fn fade_in(&mut self, track: &str, is_music: bool, seconds: f32) -> bool {
        if self.config.volume == 0.0 || (is_music && self.config.music_volume == 0.0) {
            return false;
        }
        let volume = if is_music { self.config.music_volume } else { 1.0 };
        self.backend.play(
            track,
            Playback {
                looped: is_music,
                volume,
                fade_in_seconds: seconds,
            },
        );
        true
    }

    fn schedule_save(&mut self) {
        self.save_countdown = Some(SAVE_DEBOUNCE_UPDATES);
    }

    fn count_down_save(&mut self) {
        match self.save_countdown {
            Some(0) | Some(1) => self.flush(),
            Some(remaining) => self.save_countdown = Some(remaining - 1),
            None => {}
        }
    }

    fn save(&self) {
        if let Err(error) = self.settings.borrow_mut().persist(SOUND_CONFIG_KEY, &self.config) {
            warn!(error = %error, "sound_config_save_failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::Vec2;

    use super::*;
    use crate::events::GameUpdate;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Play(String, Playback),
        FadeOut(String),
        TrackVolume(String, f32),
        MasterVolume(f32),
    }

    struct RecordingBackend {
        inner: TracingAudioBackend,
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl AudioBackend for RecordingBackend {
        fn has_track(&self, name: &str) -> bool {
            self.inner.has_track(name)
        }

        fn play(&mut self, name: &str, playback: Playback) {
            self.calls.borrow_mut().push(Call::Play(name.to_string(), playback));
        }

        fn fade_out(&mut self, name: &str, _seconds: f32) {
            self.calls.borrow_mut().push(Call::FadeOut(name.to_string()));
        }

        fn set_track_volume(&mut self, name: &str, volume: f32) {
            self.calls
                .borrow_mut()
                .push(Call::TrackVolume(name.to_string(), volume));
        }

        fn set_master_volume(&mut self, volume: f32) {
            self.calls.borrow_mut().push(Call::MasterVolume(volume));
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        settings: Rc<RefCell<SettingsStore>>,
        calls: Rc<RefCell<Vec<Call>>>,
        director: AudioDirector,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Rc::new(RefCell::new(SettingsStore::empty(
            dir.path().join("settings.json"),
        )));
        let calls = Rc::new(RefCell::new(Vec::new()));
        let backend = RecordingBackend {
            inner: TracingAudioBackend::with_default_tracks(),
            calls: Rc::clone(&calls),
        };
        let director = AudioDirector::new(Box::new(backend), Rc::clone(&settings));
        calls.borrow_mut().clear();
        Fixture {
            _dir: dir,
            settings,
            calls,
            director,
        }
    }

    fn plays(calls: &[Call]) -> Vec<String> {
        calls
            .iter()
            .filter_map(|call| match call {
                Call::Play(name, _) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn room_change_cross_fades_and_same_track_is_noop() {
        let mut f = fixture();
        f.director.play_music(music_track(RoomType::Kitchen));
        f.director.play_music(music_track(RoomType::Kitchen));
        f.director.play_music(music_track(RoomType::Hall));

        let calls = f.calls.borrow();
        assert_eq!(plays(&calls), vec!["music_kitchen", "music_hall"]);
        assert!(calls.contains(&Call::FadeOut("music_kitchen".to_string())));
        assert_eq!(f.director.current_track(), Some("music_hall"));
    }

    #[test]
    fn unknown_track_is_ignored() {
        let mut f = fixture();
        f.director.play_music("music_attic");
        assert!(f.calls.borrow().is_empty());
        assert_eq!(f.director.current_track(), None);
    }

    #[test]
    fn muted_music_starts_when_volume_is_raised() {
        let mut f = fixture();
        f.director.set_music_volume(0.0);
        f.director.play_music(music_track(RoomType::Garden));
        assert!(plays(&f.calls.borrow()).is_empty());

        f.director.set_music_volume(0.7);
        assert_eq!(plays(&f.calls.borrow()), vec!["music_garden"]);
    }

    fn stored_config(settings: &RefCell<SettingsStore>) -> Option<SoundConfig> {
        let path = settings.borrow().path().to_path_buf();
        SettingsStore::load(path).expect("reload").get(SOUND_CONFIG_KEY)
    }

    fn game_update() -> GameEvent {
        GameEvent::GameUpdate(GameUpdate {
            player: Vec2::ZERO,
            issues: Vec::new(),
        })
    }

    #[test]
    fn volumes_are_clamped_and_persisted_on_flush() {
        let mut f = fixture();
        f.director.set_volume(3.0);
        f.director.set_music_volume(-1.0);
        assert_eq!(
            f.director.config(),
            SoundConfig {
                volume: 1.0,
                music_volume: 0.0
            }
        );
        assert_eq!(stored_config(&f.settings), None);

        f.director.flush();
        assert!(!f.director.has_pending_save());
        let path = f.settings.borrow().path().to_path_buf();
        let reloaded = SettingsStore::load(path).expect("reload");
        assert_eq!(
            reloaded.get::<SoundConfig>(SOUND_CONFIG_KEY),
            Some(f.director.config())
        );
    }

    #[test]
    fn bus_events_drive_the_director() {
        let f = fixture();
        let calls = Rc::clone(&f.calls);
        let director = Rc::new(RefCell::new(f.director));
        let bus = GameBus::new();
        let subscriptions = AudioDirector::attach(&director, &bus);
        assert_eq!(subscriptions.len(), 5);

        bus.emit(&GameEvent::RoomEntered {
            room: RoomType::Bedroom,
            name: "bedroom".to_string(),
        });
        bus.emit(&GameEvent::StopMusic);
        bus.emit(&GameEvent::PlaySound(SoundCue::GameOverSting));

        let calls = calls.borrow();
        assert_eq!(plays(&calls), vec!["music_bedroom", "sfx_game_over"]);
        assert!(calls.contains(&Call::FadeOut("music_bedroom".to_string())));
        assert_eq!(director.borrow().current_track(), None);
    }

    #[test]
    fn volume_changes_are_saved_once_after_quiet_updates() {
        let mut f = fixture();
        f.director.set_volume(0.2);
        for _ in 0..10 {
            f.director.handle(&game_update());
        }
        f.director.set_volume(0.8);
        for _ in 1..SAVE_DEBOUNCE_UPDATES {
            f.director.handle(&game_update());
        }
        assert!(f.director.has_pending_save());
        assert_eq!(stored_config(&f.settings), None);

        f.director.handle(&game_update());
        assert!(!f.director.has_pending_save());
        assert_eq!(
            stored_config(&f.settings).map(|config| config.volume),
            Some(0.8)
        );
    }
}
