//! The hardware loop: producer thread driving lights, input, and timing.
//!
//! Runs independently of the frame rate, polling buttons and timers at
//! millisecond granularity. It publishes [`GameEvent`]s into the channel
//! and never blocks on consumption. Direct state mutation is limited to
//! its own score counter, its own active-light index, the light outputs,
//! and [`BattleState::reset_round`] at the round boundary; everything
//! else happens consumer-side when events are drained.
//!
//! ```text
//! ┌──────────────────┐     GameEvent      ┌─────────────────┐
//! │  Hardware Loop   │ ─────────────────▶ │  Frame Loop     │
//! │  (this thread)   │                    │  (Game::tick)   │
//! └──────────────────┘                    └─────────────────┘
//! ```

use crate::battle::BattleState;
use crate::config::{GameConfig, START_KEY};
use crate::events::{GameEvent, GameOverReason};
use crate::hardware::{Hardware, KeyEvent, Rgb};
use crate::webhook::AutomationClient;
use crossbeam_channel::Sender;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Idle sleep between polls of the restart gate.
const RESTART_POLL: Duration = Duration::from_millis(50);

/// Handle to the hardware loop thread.
pub struct HardwareLoop {
    /// Handle to the producer thread.
    handle: Option<JoinHandle<()>>,
    /// Cooperative stop flag, observed at every polling point.
    running: Arc<AtomicBool>,
}

impl HardwareLoop {
    /// Spawn the producer thread.
    ///
    /// # Arguments
    ///
    /// * `config` - Fixed timing windows and hardware layout.
    /// * `battle` - Shared battle state (reset at round boundaries).
    /// * `hardware` - Backend from the hardware factory.
    /// * `sender` - Channel into the consumer's frame loop.
    pub fn spawn(
        config: GameConfig,
        battle: Arc<BattleState>,
        hardware: Box<dyn Hardware>,
        sender: Sender<GameEvent>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("broadside-hardware".to_string())
            .spawn(move || {
                let mut worker = Worker {
                    config,
                    battle,
                    hardware,
                    sender,
                    running: running_clone,
                    score: 0.0,
                    active_mole: None,
                    mole_lit_at: Instant::now(),
                };
                worker.run();
            })
            .expect("Failed to spawn hardware thread");

        Self {
            handle: Some(handle),
            running,
        }
    }

    /// Signal the loop to stop at its next polling point.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Stop and wait for the thread to exit, logging (not crashing)
    /// if it fails to finish within `timeout`.
    pub fn join(mut self, timeout: Duration) {
        self.stop();
        let Some(handle) = self.handle.take() else {
            return;
        };
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                error!("hardware thread did not exit within {timeout:?}");
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        let _ = handle.join();
    }
}

impl Drop for HardwareLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Thread-owned loop state.
struct Worker {
    config: GameConfig,
    battle: Arc<BattleState>,
    hardware: Box<dyn Hardware>,
    sender: Sender<GameEvent>,
    running: Arc<AtomicBool>,
    score: f32,
    active_mole: Option<usize>,
    mole_lit_at: Instant,
}

impl Worker {
    fn run(&mut self) {
        info!("hardware loop started");
        while self.is_running() {
            self.run_round();
        }
        self.hardware.cleanup();
        info!("hardware loop stopped");
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// One full round: start screen, countdown, play, game over,
    /// restart gate.
    fn run_round(&mut self) {
        // Round boundary: the only point where the producer mutates
        // battle state, before any event of the round is emitted.
        self.battle.reset_round();
        self.score = 0.0;
        self.active_mole = None;

        self.emit(GameEvent::StartScreen);
        self.lights_off();
        self.light(self.config.start_light(), Rgb::MOLE_GREEN);
        if !self.wait_for_start() {
            return;
        }

        self.countdown_sequence();
        if !self.is_running() {
            return;
        }

        let started = Instant::now();
        self.spawn_next_mole();
        let ended_by_stop = self.play_loop(started);

        // Game-over wash.
        if let Some(active) = self.active_mole.take() {
            self.light(active, Rgb::OFF);
        }
        self.all_lights(Rgb::WHITE);

        if ended_by_stop {
            return;
        }

        // Re-check the stop conditions in fixed priority order.
        let reason = if started.elapsed() >= self.config.game_duration() {
            GameOverReason::TimeUp
        } else if self.battle.fortress_depleted() {
            GameOverReason::Defeat
        } else {
            GameOverReason::Victory
        };
        info!(score = self.score, %reason, "round over");
        self.emit(GameEvent::GameOver {
            score: self.score,
            reason,
        });

        self.notify_automation();
        self.restart_gate();
        self.lights_off();
    }

    /// Poll until the start button is pressed. Returns false when the
    /// loop was stopped instead.
    fn wait_for_start(&mut self) -> bool {
        loop {
            if !self.is_running() {
                return false;
            }
            let started = self
                .read_events()
                .iter()
                .any(|event| event.pressed && event.code == START_KEY);
            if started {
                debug!("start button pressed");
                return true;
            }
            thread::sleep(self.config.poll_interval());
        }
    }

    /// All-blue flash, blank, then 3-2-1 on individual slots.
    fn countdown_sequence(&mut self) {
        self.emit(GameEvent::CountdownStart);
        let flash = self.config.countdown_flash();

        self.all_lights(Rgb::COUNTDOWN_BLUE);
        self.sleep_while_running(flash * 2);
        self.all_lights(Rgb::OFF);
        self.sleep_while_running(flash);

        for step in (0..3).rev() {
            self.light(step, Rgb::MOLE_GREEN);
            self.sleep_while_running(flash);
            self.light(step, Rgb::OFF);
            self.sleep_while_running(flash);
        }

        self.emit(GameEvent::CountdownFinished);
    }

    /// The play loop. Returns true when it exited because of `stop()`
    /// rather than a game-end condition.
    fn play_loop(&mut self, started: Instant) -> bool {
        loop {
            if !self.is_running() {
                return true;
            }
            if started.elapsed() >= self.config.game_duration()
                || self.battle.fortress_depleted()
                || self.battle.current_target().is_none()
            {
                return false;
            }

            // Mole lifetime expired: it escapes, a new one spawns.
            if self.active_mole.is_some() && self.mole_lit_at.elapsed() > self.config.mole_duration()
            {
                self.emit(GameEvent::MoleEscaped);
                self.spawn_next_mole();
            }

            for event in self.read_events() {
                if !event.pressed {
                    continue;
                }
                let Some(pressed_light) = self.config.light_for_key(event.code) else {
                    continue;
                };
                if self.active_mole == Some(pressed_light) {
                    self.score += 1.0;
                    self.emit(GameEvent::PlayerHit { score: self.score });
                    self.spawn_next_mole();
                } else {
                    self.score = (self.score - 0.5).max(0.0);
                    self.penalty_flash();
                    self.emit(GameEvent::PlayerMiss { score: self.score });
                    self.spawn_next_mole();
                }
            }

            thread::sleep(self.config.poll_interval());
        }
    }

    /// Turn off the previous mole and light a uniformly random slot.
    /// Repeating the same slot is allowed.
    fn spawn_next_mole(&mut self) {
        if let Some(previous) = self.active_mole.take() {
            self.light(previous, Rgb::OFF);
        }
        let next = rand::thread_rng().gen_range(0..self.config.num_lights);
        self.active_mole = Some(next);
        self.mole_lit_at = Instant::now();
        self.light(next, Rgb::MOLE_GREEN);
        self.emit(GameEvent::MoleSpawned { light: next });
    }

    /// All-red flash for the wrong-press penalty.
    fn penalty_flash(&mut self) {
        self.all_lights(Rgb::PENALTY_RED);
        self.sleep_while_running(self.config.penalty_flash());
        self.all_lights(Rgb::OFF);
    }

    /// Fire the automation webhook; failures are logged, never fatal.
    fn notify_automation(&self) {
        let Some(webhook) = self.config.webhook.clone() else {
            debug!("automation webhook not configured");
            return;
        };
        info!(score = self.score, "triggering automation job");
        let client = AutomationClient::new(webhook);
        if let Err(e) = client.notify_score(self.score) {
            error!(error = %e, "automation notification failed");
        }
    }

    /// Wait for the configured number of discrete key presses (any
    /// key counts) before the next round.
    fn restart_gate(&mut self) {
        let needed = self.config.restart_presses;
        let mut pressed = 0u32;
        while pressed < needed && self.is_running() {
            let presses = self
                .read_events()
                .iter()
                .filter(|event| event.pressed)
                .count() as u32;
            if presses > 0 {
                pressed += presses;
                debug!(pressed, needed, "restart gate press");
            } else {
                self.sleep_while_running(RESTART_POLL);
            }
        }
    }

    /// Read pending input; transient I/O failures are logged and
    /// treated as "no events this tick".
    fn read_events(&mut self) -> Vec<KeyEvent> {
        match self.hardware.read_input_events() {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "input read failed");
                Vec::new()
            }
        }
    }

    /// Sleep in poll-interval slices so `stop()` is observed within
    /// one interval.
    fn sleep_while_running(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let slice = self.config.poll_interval();
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(slice));
        }
    }

    fn emit(&mut self, event: GameEvent) {
        if self.sender.send(event).is_err() {
            // Receiver dropped; shut the loop down.
            warn!("event channel disconnected, stopping hardware loop");
            self.running.store(false, Ordering::Relaxed);
        }
    }

    fn light(&mut self, index: usize, color: Rgb) {
        let brightness = self.config.brightness;
        if let Err(e) = self.hardware.set_light(index, color, brightness) {
            warn!(error = %e, index, "light write failed");
        }
        self.show();
    }

    fn all_lights(&mut self, color: Rgb) {
        let brightness = self.config.brightness;
        if let Err(e) = self.hardware.set_all_lights(color, brightness) {
            warn!(error = %e, "strip write failed");
        }
        self.show();
    }

    fn lights_off(&mut self) {
        self.all_lights(Rgb::OFF);
    }

    fn show(&mut self) {
        if let Err(e) = self.hardware.show() {
            warn!(error = %e, "strip commit failed");
        }
    }
}
