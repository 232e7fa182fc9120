//! The consumer-side game state machine.
//!
//! Advanced once per frame from the render loop. Events drive the
//! phase transitions; the Playing phase additionally re-checks the
//! win/loss conditions on every update tick, so the machine reaches
//! GameOver even if it observes the condition before the explicit
//! event arrives.

use crate::battle::BattleState;
use crate::events::{GameEvent, GameOverReason};
use tracing::debug;

/// The four game phases. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    /// Waiting for the start button.
    #[default]
    StartScreen,
    /// The 3-2-1 countdown is running on the deck.
    Countdown,
    /// Moles are spawning; input applies.
    Playing,
    /// Round finished; waiting for the restart gate.
    GameOver,
}

/// Per-phase drawing hooks. The render layer implements this; the
/// state machine only delegates, it never draws.
pub trait Surface {
    /// Start-screen UI ("press 5 to start").
    fn draw_start_screen(&mut self);
    /// Countdown UI. The deck animation itself runs on the hardware.
    fn draw_countdown(&mut self);
    /// In-round UI: score readout.
    fn draw_playing(&mut self, score: f32);
    /// Results screen.
    fn draw_game_over(&mut self, score: f32, reason: GameOverReason);
}

/// Event-driven phase machine with a per-tick update hook.
#[derive(Debug, Default)]
pub struct GameStateMachine {
    phase: GamePhase,
    live_score: f32,
    last_score: f32,
    game_over_reason: Option<GameOverReason>,
}

impl GameStateMachine {
    /// Start at the start screen with no recorded results.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active phase.
    pub const fn phase(&self) -> GamePhase {
        self.phase
    }

    /// True while input should be applied and the battle drawn.
    pub const fn is_playing(&self) -> bool {
        matches!(self.phase, GamePhase::Playing)
    }

    /// True on the results screen.
    pub const fn is_game_over(&self) -> bool {
        matches!(self.phase, GamePhase::GameOver)
    }

    /// In-round score, as last mirrored from the event stream.
    pub const fn live_score(&self) -> f32 {
        self.live_score
    }

    /// Final score of the last finished round.
    pub const fn last_score(&self) -> f32 {
        self.last_score
    }

    /// Stop condition that ended the last round, if one has finished.
    pub const fn game_over_reason(&self) -> Option<GameOverReason> {
        self.game_over_reason
    }

    /// Apply one event. Events with no transition from the active
    /// phase are ignored.
    pub fn handle_event(&mut self, event: &GameEvent) {
        let next = match (self.phase, event) {
            // Idempotent reset while already on the start screen.
            (GamePhase::StartScreen, GameEvent::StartScreen) => Some(GamePhase::StartScreen),
            (GamePhase::StartScreen, GameEvent::CountdownStart) => Some(GamePhase::Countdown),
            (GamePhase::Countdown, GameEvent::CountdownFinished) => Some(GamePhase::Playing),
            (GamePhase::Playing, GameEvent::GameOver { score, reason }) => {
                self.last_score = *score;
                self.game_over_reason = Some(*reason);
                Some(GamePhase::GameOver)
            }
            (GamePhase::GameOver, GameEvent::StartScreen) => {
                self.live_score = 0.0;
                self.last_score = 0.0;
                self.game_over_reason = None;
                Some(GamePhase::StartScreen)
            }
            _ => None,
        };

        if let Some(next) = next {
            if next != self.phase {
                debug!(from = ?self.phase, to = ?next, "phase transition");
            }
            self.phase = next;
        }
    }

    /// Per-tick hook. In the Playing phase this re-checks the loss and
    /// victory conditions directly against the battle state, covering
    /// the window before the hardware loop's explicit `GameOver`
    /// event is drained.
    pub fn update(&mut self, battle: &BattleState) {
        if self.phase != GamePhase::Playing {
            return;
        }
        if battle.fortress_depleted() {
            self.game_over_reason = Some(GameOverReason::Defeat);
            self.phase = GamePhase::GameOver;
            debug!("update observed fortress depletion");
        } else if battle.current_target().is_none() {
            self.game_over_reason = Some(GameOverReason::Victory);
            self.phase = GamePhase::GameOver;
            debug!("update observed empty roster");
        }
    }

    /// Delegate to the active phase's drawing hook.
    pub fn draw(&self, surface: &mut dyn Surface) {
        match self.phase {
            GamePhase::StartScreen => surface.draw_start_screen(),
            GamePhase::Countdown => surface.draw_countdown(),
            GamePhase::Playing => surface.draw_playing(self.live_score),
            GamePhase::GameOver => {
                surface.draw_game_over(
                    self.last_score,
                    self.game_over_reason.unwrap_or(GameOverReason::TimeUp),
                );
            }
        }
    }

    /// Record the live score so the Playing phase can draw it.
    pub fn set_live_score(&mut self, score: f32) {
        if self.phase == GamePhase::Playing {
            self.live_score = score;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShipSpec;

    fn battle(ship_health: i32, fortress: f32) -> BattleState {
        let battle = BattleState::new(fortress);
        battle.initialize_roster(&[ShipSpec {
            name: "Sloop".to_string(),
            max_health: ship_health,
        }]);
        battle
    }

    fn all_events() -> Vec<GameEvent> {
        vec![
            GameEvent::StartScreen,
            GameEvent::CountdownStart,
            GameEvent::CountdownFinished,
            GameEvent::MoleSpawned { light: 0 },
            GameEvent::MoleEscaped,
            GameEvent::PlayerHit { score: 1.0 },
            GameEvent::PlayerMiss { score: 0.5 },
            GameEvent::ShipDestroyed {
                name: "Sloop".to_string(),
            },
            GameEvent::GameOver {
                score: 2.0,
                reason: GameOverReason::TimeUp,
            },
        ]
    }

    #[test]
    fn test_initial_phase() {
        let machine = GameStateMachine::new();
        assert_eq!(machine.phase(), GamePhase::StartScreen);
        assert!(!machine.is_playing());
    }

    #[test]
    fn test_start_screen_only_reacts_to_two_events() {
        for event in all_events() {
            let mut machine = GameStateMachine::new();
            machine.handle_event(&event);
            let expected = match event {
                GameEvent::CountdownStart => GamePhase::Countdown,
                _ => GamePhase::StartScreen,
            };
            assert_eq!(machine.phase(), expected, "event {event:?}");
        }
    }

    #[test]
    fn test_full_round_transitions() {
        let mut machine = GameStateMachine::new();
        machine.handle_event(&GameEvent::CountdownStart);
        assert_eq!(machine.phase(), GamePhase::Countdown);

        machine.handle_event(&GameEvent::CountdownFinished);
        assert!(machine.is_playing());

        machine.handle_event(&GameEvent::GameOver {
            score: 12.5,
            reason: GameOverReason::Victory,
        });
        assert!(machine.is_game_over());
        assert!((machine.last_score() - 12.5).abs() < f32::EPSILON);
        assert_eq!(machine.game_over_reason(), Some(GameOverReason::Victory));

        machine.handle_event(&GameEvent::StartScreen);
        assert_eq!(machine.phase(), GamePhase::StartScreen);
        assert!(machine.last_score().abs() < f32::EPSILON);
        assert_eq!(machine.game_over_reason(), None);
    }

    #[test]
    fn test_countdown_ignores_unrelated_events() {
        let mut machine = GameStateMachine::new();
        machine.handle_event(&GameEvent::CountdownStart);
        machine.handle_event(&GameEvent::PlayerHit { score: 1.0 });
        machine.handle_event(&GameEvent::StartScreen);
        assert_eq!(machine.phase(), GamePhase::Countdown);
    }

    #[test]
    fn test_update_detects_defeat() {
        let battle = battle(5, 10.0);
        let mut machine = GameStateMachine::new();
        machine.handle_event(&GameEvent::CountdownStart);
        machine.handle_event(&GameEvent::CountdownFinished);

        machine.update(&battle);
        assert!(machine.is_playing(), "healthy battle keeps playing");

        battle.damage_fortress(10.0);
        machine.update(&battle);
        assert!(machine.is_game_over());
        assert_eq!(machine.game_over_reason(), Some(GameOverReason::Defeat));

        // Idempotent: a second update (or a late GameOver event) does
        // not change the recorded outcome.
        machine.update(&battle);
        assert_eq!(machine.game_over_reason(), Some(GameOverReason::Defeat));
    }

    #[test]
    fn test_update_detects_victory() {
        let battle = battle(1, 10.0);
        let mut machine = GameStateMachine::new();
        machine.handle_event(&GameEvent::CountdownStart);
        machine.handle_event(&GameEvent::CountdownFinished);

        battle.apply_damage_to_current();
        machine.update(&battle);
        assert!(machine.is_game_over());
        assert_eq!(machine.game_over_reason(), Some(GameOverReason::Victory));
    }

    #[test]
    fn test_update_outside_playing_is_noop() {
        let battle = battle(1, 10.0);
        battle.damage_fortress(10.0);
        let mut machine = GameStateMachine::new();
        machine.update(&battle);
        assert_eq!(machine.phase(), GamePhase::StartScreen);
    }

    #[test]
    fn test_live_score_is_separate_from_final_score() {
        let mut machine = GameStateMachine::new();
        machine.handle_event(&GameEvent::CountdownStart);
        machine.handle_event(&GameEvent::CountdownFinished);

        machine.set_live_score(2.5);
        assert!((machine.live_score() - 2.5).abs() < f32::EPSILON);
        assert!(machine.last_score().abs() < f32::EPSILON);

        // The round result comes from the GameOver event, not from
        // whatever live value was mirrored last.
        machine.handle_event(&GameEvent::GameOver {
            score: 4.0,
            reason: GameOverReason::TimeUp,
        });
        assert!((machine.last_score() - 4.0).abs() < f32::EPSILON);
    }

    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<String>,
    }

    impl Surface for RecordingSurface {
        fn draw_start_screen(&mut self) {
            self.calls.push("start".to_string());
        }
        fn draw_countdown(&mut self) {
            self.calls.push("countdown".to_string());
        }
        fn draw_playing(&mut self, score: f32) {
            self.calls.push(format!("playing {score}"));
        }
        fn draw_game_over(&mut self, score: f32, reason: GameOverReason) {
            self.calls.push(format!("over {score} {reason}"));
        }
    }

    #[test]
    fn test_draw_delegates_to_active_phase() {
        let mut surface = RecordingSurface::default();
        let mut machine = GameStateMachine::new();
        machine.draw(&mut surface);

        machine.handle_event(&GameEvent::CountdownStart);
        machine.handle_event(&GameEvent::CountdownFinished);
        machine.set_live_score(3.5);
        machine.draw(&mut surface);

        machine.handle_event(&GameEvent::GameOver {
            score: 4.0,
            reason: GameOverReason::TimeUp,
        });
        machine.draw(&mut surface);

        assert_eq!(surface.calls, vec!["start", "playing 3.5", "over 4 time_up"]);
    }
}
