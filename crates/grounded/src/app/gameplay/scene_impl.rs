impl Scene for PartyScene {
    fn load(&mut self) {
        self.add_walls();
        let spawn = self.map.player_spawn(&mut self.rng);
        self.player = Some(Player::spawn(
            &mut self.world,
            spawn,
            PlayerTuning::from(&self.config),
        ));

        let count = self.config.initial_guests as usize;
        for placement in self.guest_spawner.spawn_initial(count, &mut self.rng) {
            self.spawn_guest(placement);
        }

        let start_requested = Rc::clone(&self.start_requested);
        self.subscriptions
            .push(self.bus.on(GameEventKind::GameStart, move |_| start_requested.set(true)));

        info!(
            walls = self.wall_bodies.len(),
            rooms = self.map.rooms().len(),
            guests = self.guests.len(),
            bodies = self.world.body_count(),
            "scene_loaded"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if self.start_requested.replace(false) {
            self.start_game();
        }

        self.steering.observe(input);
        let viewport = match input.window_size() {
            (0, _) | (_, 0) => FALLBACK_VIEWPORT,
            size => size,
        };

        if self.state == GameState::Running {
            self.tick_gameplay(fixed_dt_seconds, input);
        }

        let report = self.world.step(fixed_dt_seconds);
        self.apply_collision_report(&report);
        self.sync_positions();

        if let Some(position) = self.player_position() {
            self.camera.center_on(position, viewport);
        }
        self.update_room();
        self.broadcast_game_update();

        for cue in self.timers.advance(fixed_dt_seconds) {
            self.emit(cue);
        }

        if self.state == GameState::GameOver
            && self.quit_on_game_over
            && self.timers.pending_len() == 0
        {
            return SceneCommand::Quit;
        }
        SceneCommand::None
    }

    fn unload(&mut self) {
        for issue in std::mem::take(&mut self.issues).into_values() {
            issue.despawn(&mut self.world);
        }
        self.issue_by_body.clear();
        for guest in self.guests.drain(..) {
            guest.despawn(&mut self.world);
        }
        if let Some(player) = self.player.take() {
            player.despawn(&mut self.world);
        }
        for body in self.wall_bodies.drain(..) {
            self.world.remove_body(body);
        }
        for subscription in self.subscriptions.drain(..) {
            self.bus.off(subscription);
        }
        self.timers.clear();
        info!(
            bodies = self.world.body_count(),
            constraints = self.world.constraint_count(),
            "scene_unloaded"
        );
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!(
            "{:?} | chaos {:.0}/{:.0} | issues {} | resolved {} | guests {}",
            self.state,
            self.chaos.clamped(),
            self.chaos.ceiling(),
            self.issues.len(),
            self.resolved,
            self.guests.len()
        ))
    }
}
