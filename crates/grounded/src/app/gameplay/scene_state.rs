pub struct PartyScene {
    config: GameConfig,
    map: HouseMap,
    bus: GameBus,
    steering: SteeringHost,
    rng: ChaCha8Rng,
    world: PhysicsWorld,
    wall_bodies: Vec<BodyId>,
    player: Option<Player>,
    guests: Vec<Guest>,
    issues: BTreeMap<IssueId, Issue>,
    issue_by_body: HashMap<BodyId, IssueId>,
    guest_spawner: GuestSpawner,
    issue_spawner: IssueSpawner,
    guest_behavior: GuestBehavior,
    issue_tuning: IssueTuning,
    state: GameState,
    chaos: ChaosMeter,
    resolved: u32,
    play_time_seconds: f32,
    reported_play_seconds: u32,
    current_room: Option<usize>,
    camera: Camera2D,
    timers: TimerQueue<GameEvent>,
    start_requested: Rc<Cell<bool>>,
    subscriptions: Vec<SubscriptionId>,
    next_guest_id: u32,
    next_issue_id: u32,
    quit_on_game_over: bool,
}

impl PartyScene {
    pub fn new(
        config: GameConfig,
        map: HouseMap,
        bus: GameBus,
        steering: SteeringHost,
        rng: ChaCha8Rng,
    ) -> Self {
        let guest_spawner = GuestSpawner::new(
            map.guest_spots(),
            config.first_guest_milestone,
            config.guest_milestone_step,
        );
        Self {
            issue_spawner: IssueSpawner::new(&config),
            guest_behavior: GuestBehavior::from(&config),
            issue_tuning: IssueTuning::from(&config),
            chaos: ChaosMeter::new(config.grounded_ceiling),
            guest_spawner,
            config,
            map,
            bus,
            steering,
            rng,
            world: PhysicsWorld::new(),
            wall_bodies: Vec::new(),
            player: None,
            guests: Vec::new(),
            issues: BTreeMap::new(),
            issue_by_body: HashMap::new(),
            state: GameState::Paused,
            resolved: 0,
            play_time_seconds: 0.0,
            reported_play_seconds: 0,
            current_room: None,
            camera: Camera2D::default(),
            timers: TimerQueue::new(),
            start_requested: Rc::new(Cell::new(false)),
            subscriptions: Vec::new(),
            next_guest_id: 0,
            next_issue_id: 0,
            quit_on_game_over: false,
        }
    }

    /// Makes `update` return [`SceneCommand::Quit`] once the game is over and every
    /// delayed cue has fired.
    pub fn quit_on_game_over(mut self, quit: bool) -> Self {
        self.quit_on_game_over = quit;
        self
    }

    pub fn bus(&self) -> &GameBus {
        &self.bus
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn chaos(&self) -> ChaosMeter {
        self.chaos
    }

    pub fn resolved_count(&self) -> u32 {
        self.resolved
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    pub fn guest_count(&self) -> usize {
        self.guests.len()
    }

    pub fn play_time_seconds(&self) -> f32 {
        self.play_time_seconds
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn camera(&self) -> Camera2D {
        self.camera
    }

    pub fn player_position(&self) -> Option<Vec2> {
        self.player.as_ref().map(Player::position)
    }

    pub fn current_room(&self) -> Option<usize> {
        self.current_room
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            resolved: self.resolved,
            left: self.issues.len(),
            guests: self.guests.len(),
            play_time_seconds: self.play_time_seconds,
        }
    }

    /// Leaves the paused state and broadcasts the initial counters. Only acts once.
    pub fn start_game(&mut self) {
        if self.state != GameState::Paused {
            return;
        }
        self.state = GameState::Running;
        info!(guests = self.guests.len(), "game_started");
        self.emit(GameEvent::IssuesCounterChanged(self.issues.len()));
        self.emit(GameEvent::ResolvedIssuesCounterChanged(self.resolved));
        self.emit(GameEvent::GuestsCountChanged(self.guests.len()));
        self.emit(GameEvent::GroundedProgressChanged(self.chaos.normalized()));
    }

    /// Routes one event: the scene's own reactions run first (and may raise further
    /// events, handled depth-first), then bus subscribers see it.
    fn emit(&mut self, event: GameEvent) {
        self.react(&event);
        self.bus.emit(&event);
    }

    fn react(&mut self, event: &GameEvent) {
        match event {
            GameEvent::IssueSpawned { cost, .. } => {
                self.emit(GameEvent::IssuesCounterChanged(self.issues.len()));
                self.chaos.apply(-cost);
                self.emit(GameEvent::GroundedProgressChanged(self.chaos.normalized()));
                if self.chaos.is_depleted() && self.state != GameState::GameOver {
                    self.game_over();
                }
            }
            GameEvent::IssueResolved { issue, reward, .. } => {
                if let Some(player) = self.player.as_mut() {
                    player.issue_resolved(*issue);
                }
                if let Some(removed) = self.issues.remove(issue) {
                    self.issue_by_body.remove(&removed.body());
                    removed.despawn(&mut self.world);
                }
                self.emit(GameEvent::PlaySound(SoundCue::IssueResolved));
                self.emit(GameEvent::IssuesCounterChanged(self.issues.len()));
                self.resolved += 1;
                self.emit(GameEvent::ResolvedIssuesCounterChanged(self.resolved));
                self.chaos.apply(*reward);
                self.emit(GameEvent::GroundedProgressChanged(self.chaos.normalized()));
            }
            GameEvent::ResolvedIssuesCounterChanged(resolved) => {
                if let Some(placement) = self.guest_spawner.on_resolved_count(*resolved, &mut self.rng)
                {
                    self.spawn_guest(placement);
                }
            }
            GameEvent::GuestRequestsIssue { guest } => {
                let guest_count = self.guests.len();
                let placement = self
                    .guests
                    .iter()
                    .find(|candidate| candidate.id() == *guest)
                    .and_then(|requester| {
                        self.issue_spawner
                            .request(requester, guest_count, &self.map, &mut self.rng)
                    });
                if let Some(placement) = placement {
                    self.spawn_issue(placement);
                }
            }
            _ => {}
        }
    }

    fn spawn_guest(&mut self, placement: GuestPlacement) {
        let id = GuestId(self.next_guest_id);
        self.next_guest_id += 1;
        let guest = Guest::spawn(
            &mut self.world,
            id,
            placement.spot,
            placement.position,
            self.guest_behavior,
            &mut self.rng,
        );
        self.guests.push(guest);
        info!(guest = id.0, spot = placement.spot, guests = self.guests.len(), "guest_spawned");
        self.emit(GameEvent::GuestSpawned {
            guest: id,
            spot: placement.spot,
            position: placement.position,
        });
        self.emit(GameEvent::GuestsCountChanged(self.guests.len()));
    }

    fn spawn_issue(&mut self, placement: IssuePlacement) {
        let id = IssueId(self.next_issue_id);
        self.next_issue_id += 1;
        let issue = Issue::spawn(
            &mut self.world,
            id,
            placement.position,
            placement.hard,
            self.issue_tuning,
        );
        let cost = issue.spawn_cost();
        self.issue_by_body.insert(issue.body(), id);
        self.issues.insert(id, issue);
        info!(
            issue = id.0,
            hard = placement.hard,
            forced = placement.forced,
            guest = placement.guest.0,
            "issue_spawned"
        );
        self.emit(GameEvent::IssueSpawned {
            issue: id,
            position: placement.position,
            hard: placement.hard,
            forced: placement.forced,
            cost,
        });
    }

    fn game_over(&mut self) {
        self.state = GameState::GameOver;
        let summary = self.summary();
        info!(
            resolved = summary.resolved,
            left = summary.left,
            guests = summary.guests,
            play_time_seconds = summary.play_time_seconds,
            "game_over"
        );
        self.emit(GameEvent::StopMusic);
        self.timers.schedule(
            GAME_OVER_STING_DELAY_SECONDS,
            GameEvent::PlaySound(SoundCue::GameOverSting),
        );
        self.emit(GameEvent::GameOver(summary));
    }

    /// One gameplay tick: player intent, guests, the issue spawner, then issues.
    /// Stops early if the game ends part way through.
    fn tick_gameplay(&mut self, dt_seconds: f32, input: &InputSnapshot) {
        let direction = self.steering.move_vector(input);
        if let Some(player) = self.player.as_mut() {
            player.move_step(&mut self.world, direction);
        }

        let requesting: Vec<GuestId> = self
            .guests
            .iter_mut()
            .filter_map(|guest| guest.update(dt_seconds, &mut self.rng).then_some(guest.id()))
            .collect();
        for guest in requesting {
            if self.state != GameState::Running {
                return;
            }
            self.emit(GameEvent::GuestRequestsIssue { guest });
        }

        if self.state != GameState::Running {
            return;
        }
        if let Some(placement) =
            self.issue_spawner
                .update(dt_seconds, &self.guests, &self.map, &mut self.rng)
        {
            self.spawn_issue(placement);
        }

        let resolved: Vec<(IssueId, bool, f32)> = self
            .issues
            .values_mut()
            .filter_map(|issue| {
                issue
                    .update(dt_seconds)
                    .then_some((issue.id(), issue.is_hard(), issue.resolve_reward()))
            })
            .collect();
        for (issue, hard, reward) in resolved {
            if self.state != GameState::Running {
                return;
            }
            info!(issue = issue.0, hard, "issue_resolved");
            self.emit(GameEvent::IssueResolved { issue, hard, reward });
        }

        self.play_time_seconds += dt_seconds;
        let whole_seconds = self.play_time_seconds as u32;
        if whole_seconds != self.reported_play_seconds {
            self.reported_play_seconds = whole_seconds;
            self.emit(GameEvent::PlayTimeUpdated(whole_seconds));
        }
    }

    /// Feeds one physics step's overlap changes to the player.
    pub fn apply_collision_report(&mut self, report: &StepReport) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        let issue_by_body = &self.issue_by_body;
        let contacts = collision::translate(report, player.body(), |body| {
            issue_by_body.get(&body).copied()
        });
        for contact in contacts {
            let Some(issue) = self.issues.get_mut(&contact.issue) else {
                continue;
            };
            match contact.change {
                ContactChange::Entered => player.issue_entered(issue),
                ContactChange::Exited => player.issue_exited(issue),
            }
        }
    }

    fn sync_positions(&mut self) {
        for guest in &mut self.guests {
            guest.sync_position(&self.world);
        }
        if let Some(player) = self.player.as_mut() {
            player.sync_position(&self.world);
        }
    }

    fn update_room(&mut self) {
        let Some(position) = self.player_position() else {
            return;
        };
        let current = self.map.room_index_at(position);
        if current.is_some() && current != self.current_room {
            if let Some(room) = current.and_then(|index| self.map.rooms().get(index)) {
                let event = GameEvent::RoomEntered {
                    room: room.room_type,
                    name: room.name.clone(),
                };
                debug!(room = %room.room_type, name = %room.name, "room_entered");
                self.current_room = current;
                self.emit(event);
                return;
            }
        }
        self.current_room = current;
    }

    fn broadcast_game_update(&mut self) {
        let Some(player) = self.player_position() else {
            return;
        };
        let issues = self
            .issues
            .values()
            .map(|issue| IssueMarker {
                id: issue.id(),
                position: issue.position(),
                hard: issue.is_hard(),
                progress: issue.progress(),
            })
            .collect();
        self.emit(GameEvent::GameUpdate(GameUpdate { player, issues }));
    }

    fn add_walls(&mut self) {
        for wall in self.map.walls() {
            let body = self.world.add_body(
                BodyDesc::fixed(wall.shape, wall.center)
                    .with_category(CATEGORY_WALLS)
                    .with_mask(CATEGORY_PLAYER | CATEGORY_GUESTS),
            );
            self.wall_bodies.push(body);
        }
    }

    #[cfg(test)]
    fn spawn_issue_at(&mut self, position: Vec2, hard: bool) -> IssueId {
        let id = IssueId(self.next_issue_id);
        self.spawn_issue(IssuePlacement {
            guest: GuestId(0),
            position,
            hard,
            forced: false,
        });
        id
    }

    #[cfg(test)]
    fn teleport_player(&mut self, position: Vec2) {
        if let Some(player) = self.player.as_ref() {
            self.world.set_position(player.body(), position);
            self.world.set_velocity(player.body(), Vec2::ZERO);
        }
    }
}
