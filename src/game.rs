//! Game: the consumer-side coordinator.
//!
//! Owns the receiving end of the event channel, the dispatch bus, the
//! state machine, and the shared battle state. `tick()` is called once
//! per frame from the render loop: it drains the channel without
//! blocking, dispatches each event on the bus (which is where all
//! in-round battle mutation happens), feeds the state machine, and
//! runs the per-tick update hook. The consumer never touches hardware
//! I/O.

use crate::battle::{BattleState, DamageOutcome};
use crate::config::GameConfig;
use crate::error::GameError;
use crate::events::{EventBus, EventKind, GameEvent, GameOverReason};
use crate::hardware::{create_hardware, MockHandle};
use crate::producer::HardwareLoop;
use crate::state::{GamePhase, GameStateMachine, Surface};
use crossbeam_channel::{unbounded, Receiver};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Fortress healing per correct press.
const HIT_HEAL: f32 = 0.5;
/// Fortress damage per miss or escaped mole.
const MISS_DAMAGE: f32 = 1.0;

/// How long shutdown waits for the hardware thread.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// The assembled game: producer thread plus consumer state.
pub struct Game {
    rx: Receiver<GameEvent>,
    bus: EventBus,
    battle: Arc<BattleState>,
    machine: GameStateMachine,
    score: f32,
    /// Events emitted by bus handlers during dispatch (ship
    /// destruction), applied later in the same tick.
    followups: Rc<RefCell<Vec<GameEvent>>>,
    producer: Option<HardwareLoop>,
    mock_handle: Option<MockHandle>,
}

impl Game {
    /// Validate the configuration, build the hardware, and spawn the
    /// hardware loop.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`] for invalid configuration; this
    /// is the fatal-at-startup path.
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;

        let battle = Arc::new(BattleState::new(config.player_max_health));
        battle.initialize_roster(&config.ships);

        let (hardware, mock_handle) = create_hardware(&config);
        let (tx, rx) = unbounded();
        let producer = HardwareLoop::spawn(config, Arc::clone(&battle), hardware, tx);

        Ok(Self::assemble(battle, rx, Some(producer), mock_handle))
    }

    /// Wire a consumer without a producer thread; the test harness
    /// feeds the channel directly.
    #[cfg(test)]
    fn bare(battle: Arc<BattleState>) -> (Self, crossbeam_channel::Sender<GameEvent>) {
        let (tx, rx) = unbounded();
        (Self::assemble(battle, rx, None, None), tx)
    }

    fn assemble(
        battle: Arc<BattleState>,
        rx: Receiver<GameEvent>,
        producer: Option<HardwareLoop>,
        mock_handle: Option<MockHandle>,
    ) -> Self {
        let mut bus = EventBus::new();
        let followups = Rc::new(RefCell::new(Vec::new()));
        wire_mechanics(&mut bus, &battle, &followups);

        Self {
            rx,
            bus,
            battle,
            machine: GameStateMachine::new(),
            score: 0.0,
            followups,
            producer,
            mock_handle,
        }
    }

    /// Drain and apply everything the hardware loop produced since
    /// the last frame, then run the state machine's update hook.
    pub fn tick(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.apply(&event);
            // Handlers may emit follow-up events (ship destruction);
            // apply them in the same tick, in order.
            loop {
                let pending: Vec<GameEvent> = self.followups.borrow_mut().drain(..).collect();
                if pending.is_empty() {
                    break;
                }
                for event in &pending {
                    self.apply(event);
                }
            }
        }
        self.machine.update(&self.battle);
    }

    fn apply(&mut self, event: &GameEvent) {
        self.bus.dispatch(event);

        match event {
            GameEvent::StartScreen => self.score = 0.0,
            GameEvent::PlayerHit { score } | GameEvent::PlayerMiss { score } => {
                self.score = *score;
            }
            _ => {}
        }

        self.machine.handle_event(event);
        self.machine.set_live_score(self.score);
    }

    /// The active phase.
    pub const fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    /// True while gameplay input and battle visuals apply.
    pub const fn is_playing(&self) -> bool {
        self.machine.is_playing()
    }

    /// Live score mirror (authoritative value rides on the events).
    pub const fn score(&self) -> f32 {
        self.score
    }

    /// Final score of the last finished round.
    pub const fn last_score(&self) -> f32 {
        self.machine.last_score()
    }

    /// Stop condition that ended the last round.
    pub const fn game_over_reason(&self) -> Option<GameOverReason> {
        self.machine.game_over_reason()
    }

    /// Shared battle state, for the render boundary.
    pub const fn battle(&self) -> &Arc<BattleState> {
        &self.battle
    }

    /// The dispatch bus, for external subscribers (UI layers).
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Mock-hardware handle when the mock backend is active.
    pub const fn mock_handle(&self) -> Option<&MockHandle> {
        self.mock_handle.as_ref()
    }

    /// Delegate drawing to the active phase's hook.
    pub fn draw(&self, surface: &mut dyn Surface) {
        self.machine.draw(surface);
    }

    /// Stop the hardware loop and wait (bounded) for it to exit.
    pub fn stop(&mut self) {
        if let Some(producer) = self.producer.take() {
            info!("stopping hardware loop");
            producer.join(JOIN_TIMEOUT);
        }
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Register the gameplay mechanics on the bus. These handlers are the
/// only in-round writers of the battle state, and they always run on
/// the consumer thread.
fn wire_mechanics(
    bus: &mut EventBus,
    battle: &Arc<BattleState>,
    followups: &Rc<RefCell<Vec<GameEvent>>>,
) {
    // Correct press: cannonball into the current target, fortress
    // patches itself up a little.
    {
        let battle = Arc::clone(battle);
        let followups = Rc::clone(followups);
        bus.subscribe(EventKind::PlayerHit, move |_| {
            let Some(target) = battle.current_target() else {
                return;
            };
            let outcome = battle.apply_damage_to_current();
            battle.heal_fortress(HIT_HEAL);
            if outcome == Some(DamageOutcome::Destroyed) {
                followups
                    .borrow_mut()
                    .push(GameEvent::ShipDestroyed { name: target.name });
            }
        });
    }

    // Wrong press and escaped mole both cost the fortress, as long as
    // the battle is still live.
    for kind in [EventKind::PlayerMiss, EventKind::MoleEscaped] {
        let battle = Arc::clone(battle);
        bus.subscribe(kind, move |_| {
            if battle.current_target().is_some() && !battle.fortress_depleted() {
                battle.damage_fortress(MISS_DAMAGE);
            }
        });
    }
}
